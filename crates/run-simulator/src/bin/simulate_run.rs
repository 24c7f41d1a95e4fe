//! Simulated run entry point
//!
//! Drives a training run through the lifecycle hooks and prints the final
//! message hub contents as JSON.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lifecycle::{HookDispatcher, RuntimeInfoHook};
use message_hub::MessageHub;
use run_simulator::{spawn_progress_reporter, LoggerHook, SimulatedRunner};
use runtime_core::RunConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "run_simulator=info,simulate_run=info,lifecycle=info,message_hub=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config from the first argument or use defaults
    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading run config from {}", path);
            RunConfig::from_json_file(path)?
        }
        None => RunConfig::default(),
    };

    let hub = Arc::new(MessageHub::new("simulate-run"));
    let mut dispatcher = HookDispatcher::new();
    dispatcher.register(Arc::new(RuntimeInfoHook::new(Arc::clone(&hub))));
    if config.reporter.log_interval > 0 {
        dispatcher.register(Arc::new(LoggerHook::new(
            Arc::clone(&hub),
            config.reporter.log_interval,
        )));
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reporter = spawn_progress_reporter(
        Arc::clone(&hub),
        config.reporter.interval,
        shutdown_rx,
    );

    // Hooks run synchronously, so keep the training loop off the async workers
    let mut runner = SimulatedRunner::new(config)?;
    let outcome = tokio::task::spawn_blocking(move || runner.run(&mut dispatcher)).await?;

    let _ = shutdown_tx.send(());
    let reports = reporter.await??;

    let summary = outcome?;
    tracing::info!(
        epochs = summary.epochs,
        iters = summary.iters,
        final_loss = ?summary.final_loss,
        reports = reports,
        "Run complete"
    );

    println!("{}", serde_json::to_string_pretty(&hub.snapshot())?);
    Ok(())
}
