use anyhow::{Context as AnyhowContext, Result};
use buildspec_discovery::{BuildFileFinder, DiscoveryConfig, DiscoveryError, SearchMethod};
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

mod patterns;

#[derive(Parser)]
#[command(name = "buildspec")]
#[command(about = "Find the build files matched by build target patterns", long_about = None)]
#[command(version)]
struct Cli {
    /// Patterns: `dir/...`, `dir`, or `//dir:target`
    #[arg(required = true)]
    patterns: Vec<String>,

    /// Project root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Build file name (overrides buildspec.toml)
    #[arg(long)]
    build_file_name: Option<String>,

    /// How recursive patterns are resolved
    #[arg(long, value_enum)]
    search_method: Option<SearchMethodArg>,

    /// Index service socket (overrides WATCHMAN_SOCK)
    #[arg(long)]
    watchman_socket: Option<PathBuf>,

    /// Print a JSON array instead of one path per line
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchMethodArg {
    Watchman,
    Filesystem,
}

impl From<SearchMethodArg> for SearchMethod {
    fn from(value: SearchMethodArg) -> Self {
        match value {
            SearchMethodArg::Watchman => SearchMethod::Watchman,
            SearchMethodArg::Filesystem => SearchMethod::Filesystem,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // User mistakes get the bare message; everything else the full chain.
            match err.downcast_ref::<DiscoveryError>() {
                Some(discovery) if discovery.is_human_readable() => eprintln!("{discovery}"),
                _ => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("read current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("resolve project root {}", root.display()))?;

    let mut config = DiscoveryConfig::load(&root)?;
    if let Some(name) = cli.build_file_name {
        config.build_file_name = name;
    }
    if let Some(method) = cli.search_method {
        config.search_method = method.into();
    }
    if let Some(socket) = cli.watchman_socket {
        config.watchman_socket = Some(socket);
    }

    let specs = cli
        .patterns
        .iter()
        .map(|raw| patterns::parse_pattern(raw, &root))
        .collect::<Result<Vec<_>>>()?;

    let finder = BuildFileFinder::open(&root, config)?;
    let mut build_files: Vec<PathBuf> = finder.find_all(&specs)?.into_iter().collect();
    build_files.sort();
    log::debug!("Found {} build files", build_files.len());

    let text = if cli.json {
        serde_json::to_string_pretty(&build_files)?
    } else {
        build_files
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    };
    print_stdout(&text)
}

fn print_stdout(text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}
