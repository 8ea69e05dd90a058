use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use texsync::cli::{Cli, Commands};
use texsync::config::Config;
use texsync::tracing::LogFormat;
use texsync::{SyncService, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    texsync::tracing::init(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    });

    match &cli.command {
        Commands::Serve { config, .. } => {
            let config = Config::load(config.as_deref()).context("Failed to load configuration")?;
            let config = cli.command.apply_overrides(config);
            tracing::info!("Starting texsync server");
            server::run_server(config).await
        }
        Commands::Forward { line, tex, pdf } => {
            let result = SyncService::default()
                .forward(*line, tex, pdf)
                .await
                .with_context(|| format!("Forward search failed for {}:{}", tex.display(), line))?;
            print_json(&result)
        }
        Commands::Backward { page, x, y, pdf } => {
            let result = SyncService::default()
                .backward(*page, *x, *y, pdf)
                .await
                .with_context(|| format!("Backward search failed on page {} of {}", page, pdf.display()))?;
            print_json(&result)
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode result")?;
    println!("{}", json);
    Ok(())
}
