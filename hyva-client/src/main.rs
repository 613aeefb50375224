//! hyva-client - Command-line runner for hypothesis validation
//!
//! Opens one validation session against the configured service, logs
//! progress and extracted findings as they arrive, and prints the final
//! `ValidationResult` as pretty JSON on stdout. Exits with status 1 when
//! the server explicitly fails the job.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info};

use hyva_client::ValidationController;
use hyva_common::config::ClientConfig;
use hyva_common::events::SessionUpdate;

#[derive(Parser, Debug)]
#[command(name = "hyva-client", version, about = "Run one hypothesis validation")]
struct Args {
    /// Hypothesis text to validate
    hypothesis: String,

    /// Significance level in (0, 1]
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Base URL of the validation service (overrides env and config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting HYVA client v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = ClientConfig::load(args.base_url.as_deref(), args.config.as_deref())?;
    info!("Validation service: {}", config.base_url);

    let controller = ValidationController::new(config)?;
    // Subscribe before starting: an instantly failing transport can
    // publish the terminal update before `start()` returns
    let mut updates = controller.subscribe();
    controller.start(&args.hypothesis, args.alpha).await?;

    loop {
        match updates.recv().await {
            Ok(SessionUpdate::Progress {
                phase,
                progress,
                message,
            }) => {
                info!(
                    phase = %phase,
                    progress,
                    message = message.as_deref().unwrap_or(""),
                    "Progress"
                );
            }
            Ok(SessionUpdate::Finding { finding }) => {
                info!(
                    test_name = %finding.test_name,
                    p_value = finding.p_value,
                    "Finding"
                );
            }
            Ok(SessionUpdate::Completed { result }) => {
                if result.is_simulated {
                    info!("Live stream unavailable; result is locally simulated");
                }
                println!("{}", serde_json::to_string_pretty(&result)?);
                break;
            }
            Ok(SessionUpdate::Failed { error: message }) => {
                error!("Validation failed: {}", message);
                return Err(hyva_common::Error::Server(message).into());
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Update receiver lagged");
            }
            Err(RecvError::Closed) => {
                // Session task ended without a terminal update; report
                // whatever the snapshot holds
                let snapshot = controller.snapshot().await;
                match snapshot.result {
                    Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                    None => error!("Session ended without a result"),
                }
                break;
            }
        }
    }

    Ok(())
}
