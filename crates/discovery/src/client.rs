use crate::{DiscoveryError, Result};
use buildspec_protocol::{render_command, IndexCommand, IndexResponse};
use std::io::{self, BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Blocking JSON client for the index service's Unix socket.
///
/// One client serves one discovery call. The connection is shut down when
/// the client is dropped, and after a timeout the client refuses further
/// requests because a late reply would desynchronize the stream.
#[derive(Debug)]
pub struct SocketClient {
    path: PathBuf,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    closed: bool,
}

impl SocketClient {
    pub fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)?;
        let writer = stream.try_clone()?;
        log::trace!("Connected to index service at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(stream),
            writer,
            closed: false,
        })
    }

    /// Send `command` and wait up to `timeout` for its reply.
    ///
    /// Returns `Ok(None)` when the deadline passes. Replies flagged
    /// `unilateral` are skipped. Error fields are returned to the caller
    /// untouched.
    pub fn request<C: IndexCommand>(
        &mut self,
        timeout: Duration,
        command: &C,
    ) -> Result<Option<C::Response>> {
        if self.closed {
            return Err(DiscoveryError::IoError(io::Error::new(
                io::ErrorKind::NotConnected,
                "index client was closed after a timeout",
            )));
        }
        if timeout.is_zero() {
            return Ok(None);
        }

        let deadline = Instant::now() + timeout;
        let mut payload = serde_json::to_vec(command)?;
        payload.push(b'\n');
        self.writer.set_write_timeout(Some(timeout))?;
        if let Err(err) = self.writer.write_all(&payload).and_then(|_| self.writer.flush()) {
            return self.timed_out_or(err);
        }

        let mut line = String::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.expire();
            }
            self.reader.get_ref().set_read_timeout(Some(remaining))?;

            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    return Err(DiscoveryError::IoError(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "index service closed the connection during {}",
                            render_command(command)
                        ),
                    )))
                }
                Ok(_) => {}
                Err(err) => return self.timed_out_or(err),
            }
            if line.trim().is_empty() {
                continue;
            }

            let response: C::Response = serde_json::from_str(line.trim_end()).map_err(|err| {
                DiscoveryError::MalformedResponse(format!("{err} in reply to {}", command.name()))
            })?;
            if response.is_unilateral() {
                log::trace!("Skipping unilateral message from {}", self.path.display());
                continue;
            }
            return Ok(Some(response));
        }
    }

    fn timed_out_or<T>(&mut self, err: io::Error) -> Result<Option<T>> {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => self.expire(),
            _ => Err(err.into()),
        }
    }

    fn expire<T>(&mut self) -> Result<Option<T>> {
        self.closed = true;
        let _ = self.writer.shutdown(Shutdown::Both);
        Ok(None)
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.writer.shutdown(Shutdown::Both);
        }
        log::trace!("Released index client for {}", self.path.display());
    }
}
