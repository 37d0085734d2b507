//! Covlift CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use covlift::cli::{handle_error, Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => covlift::cli::commands::init::execute(args, cli.json).await,
        Commands::Run(args) => covlift::cli::commands::run::execute(args, cli.json).await,
        Commands::Baseline(args) => {
            covlift::cli::commands::baseline::execute(args, cli.json).await
        }
        Commands::Attempts(args) => {
            covlift::cli::commands::attempts::execute(args, cli.json).await
        }
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
