use anyhow::anyhow;
use clap::Parser;
use console::style;

use pdfchat::Settings;
use pdfchat::cli::{Cli, Commands, commands};

#[tokio::main]
async fn main() {
    // A local .env may carry GOOGLE_API_KEY
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", style("Error:").red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        return commands::init::run_init(force);
    }

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow!("Configuration error: {e}"))?;

    pdfchat::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Serve { bind } => commands::serve::run(settings, bind).await,
        Commands::Process { paths, no_progress } => {
            commands::process::run(&settings, &paths, no_progress).await
        }
        Commands::Ask { question, json } => {
            commands::ask::run(&settings, &question.join(" "), json).await
        }
        Commands::Status { json } => commands::status::run(&settings, json),
    }
}
