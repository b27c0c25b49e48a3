mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use apm_core::{load_dotenv, ApmConfig};
use apm_ingest::IngestClient;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries output messages only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    load_dotenv();

    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
        return Ok(());
    }
    config
        .connection
        .validate()
        .context("invalid connection config")?;
    config.log_summary();

    let client = Arc::new(IngestClient::from_config(&config).context("failed to build ingest client")?);

    if args.events {
        let mut rx = client.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(transition) => match serde_json::to_string(&transition) {
                        Ok(line) => eprintln!("{line}"),
                        Err(e) => warn!(error = %e, "failed to serialize status transition"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "status printer fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    // Runs once; an unauthenticated client keeps reading and drops input.
    if let Err(e) = client.start().await {
        warn!(error = %e, "continuing without an access token");
    }

    let shutdown = client.shutdown_token();
    {
        let client = client.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                client.shutdown();
            }
        });
    }

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open input: {path}"))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();
    let mut stdout = tokio::io::stdout();
    let mut lines_read = 0usize;

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("failed to read input")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        lines_read += 1;
        if let Some(output) = client.handle_raw_input(&line).await {
            let mut json = serde_json::to_string(&output).context("failed to serialize output")?;
            json.push('\n');
            stdout.write_all(json.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    client.shutdown();
    info!(lines_read, "input exhausted, exiting");
    Ok(())
}

/// Config file when given, otherwise environment (optionally profiled).
fn load_config(args: &CliArgs) -> Result<ApmConfig> {
    if let Some(path) = &args.config {
        let mut config = ApmConfig::from_file(path)
            .with_context(|| format!("failed to load config: {path}"))?;
        if let Some(profile) = &args.profile {
            config.profile = profile.to_uppercase();
        }
        return Ok(config);
    }
    Ok(match &args.profile {
        Some(profile) => ApmConfig::for_profile(profile),
        None => ApmConfig::from_env(),
    })
}
