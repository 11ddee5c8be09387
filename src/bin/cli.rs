use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use pkgresolve::config::Config;
use pkgresolve::error::ResolveError;
use pkgresolve::output::OutputFormat;
use pkgresolve::resolver::Protocol;
use pkgresolve::Resolution;

#[derive(Parser)]
#[command(
    name = "pkgresolve",
    about = "Pin package specs to installable references",
    version,
    author
)]
struct Cli {
    /// Log per-platform lookups (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more name@version specs
    Resolve {
        /// Package specs, e.g. python@3.11.4 or runx:cli/cli@latest
        #[arg(required = true)]
        specs: Vec<String>,

        /// Config file path
        #[arg(long, short = 'c', default_value = ".pkgresolve.toml")]
        config: PathBuf,

        /// Search protocol (legacy, enriched)
        #[arg(long, short = 'p', env = "PKGRESOLVE_PROTOCOL")]
        protocol: Option<String>,

        /// Verify per-platform store paths against the binary cache
        #[arg(long)]
        store_paths: bool,

        /// Output format (console, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Generate a starter .pkgresolve.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = pkgresolve::logging::init(cli.verbose) {
        eprintln!("Warning: {}", e);
    }

    let result = match cli.command {
        Commands::Resolve {
            specs,
            config,
            protocol,
            store_paths,
            format,
            output,
        } => cmd_resolve(specs, config, protocol, store_paths, format, output).await,
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

async fn cmd_resolve(
    specs: Vec<String>,
    config_path: PathBuf,
    protocol_str: Option<String>,
    store_paths: bool,
    format_str: String,
    output_path: Option<PathBuf>,
) -> Result<i32, ResolveError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let config = Config::load(&config_path)?;
    let mut strategy = config.strategy();
    if let Some(s) = protocol_str {
        strategy.protocol = Protocol::from_str_lenient(&s)
            .ok_or_else(|| ResolveError::Config(format!("unknown protocol '{}'", s)))?;
    }
    if store_paths {
        strategy.store_paths = true;
    }

    let resolver = pkgresolve::resolver_from_config(&config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let results = pkgresolve::resolve_all(&resolver, &cancel, &specs, &strategy).await;
    ctrl_c.abort();

    let mut exit_code = 0;
    let mut resolutions = Vec::with_capacity(results.len());
    for (spec, result) in results {
        match result {
            Ok(package) => resolutions.push(Resolution { spec, package }),
            Err(e) => {
                eprintln!("Error: {}", e);
                exit_code = exit_code.max(e.exit_code());
            }
        }
    }

    let rendered = pkgresolve::output::render(&resolutions, format)?;
    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    Ok(exit_code)
}

fn cmd_init(force: bool) -> Result<i32, ResolveError> {
    let path = PathBuf::from(".pkgresolve.toml");

    if path.exists() && !force {
        eprintln!(".pkgresolve.toml already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created .pkgresolve.toml");

    Ok(0)
}
