//! CLI entry point.
//!
//! Loads `.env`, sets up logging on stderr (stdout may carry raw PCM),
//! bootstraps the context and dispatches to a handler. Known failures exit
//! with a sysexits-style code.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use readaloud_cli::{Cli, CliError, Commands, bootstrap, handlers};

const DEFAULT_FILTER: &str = "readaloud=info,readaloud_cli=info,readaloud_pipeline=info,readaloud_core=info";
const VERBOSE_FILTER: &str = "readaloud=debug,readaloud_cli=debug,readaloud_pipeline=debug,readaloud_core=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        if let Some(cli_error) = e.downcast_ref::<CliError>() {
            eprintln!("Error: {cli_error}");
            std::process::exit(cli_error.exit_code());
        }
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = bootstrap(&cli)?;

    match cli.command {
        Commands::Speak { text, channel } => {
            handlers::speak::execute(&ctx, &text, channel).await?;
        }
        Commands::Listen { channel } => {
            handlers::listen::execute(&ctx, channel).await?;
        }
        Commands::Voices { locale, json } => {
            handlers::voices::execute(&ctx, locale.as_deref(), json).await?;
        }
    }
    Ok(())
}
