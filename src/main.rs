use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strata::config::Config;
use strata::overlay;

#[derive(Parser)]
#[command(name = "strata", about = "Layered symlink overlay builder")]
struct Cli {
    /// Configuration file (defaults to `strata.*` in the working directory).
    #[arg(short, long, env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the overlay from the configured roots.
    Build,
    /// Print the built overlay's search path, one directory per line.
    Paths,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Build => {
            let manifest = overlay::create(&config)?;
            for sub in &manifest.search_path {
                println!("{sub}");
            }
        }
        Command::Paths => {
            for path in overlay::search_path(&config)? {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
