//! End-to-end training simulation
//!
//! Runs the simulated training loop with the runtime info hook and a logger,
//! while independent consumers read the message hub from other threads.

use anyhow::Result;
use lifecycle::{keys, HookDispatcher, RuntimeInfoHook};
use message_hub::{MessageHub, MessageHubHandle};
use run_simulator::{read_progress, spawn_progress_reporter, LoggerHook, SimulatedRunner};
use runtime_core::RunConfig;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast;

fn config(epochs: u64, iters_per_epoch: u64) -> RunConfig {
    let mut config = RunConfig::default();
    config.experiment_name = Some("e2e".to_string());
    config.train.max_epochs = epochs;
    config.train.iters_per_epoch = iters_per_epoch;
    config.dataset.name = "synthetic".to_string();
    config.dataset.classes = vec!["cat".to_string(), "dog".to_string()];
    config
}

fn dispatcher_for(hub: &MessageHubHandle, log_interval: u64) -> (HookDispatcher, Arc<LoggerHook>) {
    let logger = Arc::new(LoggerHook::new(Arc::clone(hub), log_interval));
    let mut dispatcher = HookDispatcher::new();
    dispatcher.register(logger.clone());
    dispatcher.register(Arc::new(RuntimeInfoHook::new(Arc::clone(hub))));
    (dispatcher, logger)
}

#[test]
fn test_full_run_publishes_expected_keys() -> Result<()> {
    let hub = Arc::new(MessageHub::new("e2e"));
    let (mut dispatcher, logger) = dispatcher_for(&hub, 5);

    let mut runner = SimulatedRunner::new(config(4, 10))?;
    let summary = runner.run(&mut dispatcher)?;

    assert_eq!(summary.iters, 40);
    assert_eq!(logger.lines_emitted(), 8);

    assert_eq!(
        hub.info_keys(),
        vec![
            "cfg",
            "dataset_meta",
            "epoch",
            "experiment_name",
            "iter",
            "max_epochs",
            "max_iters",
            "runtime_version",
            "seed",
        ]
    );
    assert_eq!(
        hub.scalar_keys(),
        vec!["test/accuracy", "train/loss", "train/lr", "val/accuracy"]
    );

    let cfg: String = hub.get_info_as(keys::CFG)?;
    let parsed: RunConfig = serde_json::from_str(&cfg)?;
    assert_eq!(parsed.train.max_epochs, 4);

    // Step decay: gamma 0.1 every 2 epochs
    let lr = hub.get_scalar("train/lr")?;
    assert_eq!(lr.len(), 40);
    assert!((lr.values()[0] - 0.1).abs() < 1e-12);
    assert!((lr.values()[39] - 0.01).abs() < 1e-12);

    let loss = hub.get_scalar("train/loss")?;
    assert!(loss.values().windows(2).all(|w| w[1] < w[0]));
    assert_eq!(loss.current(), summary.final_loss);
    Ok(())
}

#[test]
fn test_concurrent_readers_see_monotonic_progress() -> Result<()> {
    let hub = Arc::new(MessageHub::new("e2e"));
    let (mut dispatcher, _logger) = dispatcher_for(&hub, 1000);
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let hub = Arc::clone(&hub);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_iter = 0;
                let mut last_len = 0;
                while !done.load(Ordering::Acquire) {
                    if let Ok(Some(progress)) = read_progress(&hub) {
                        assert!(progress.iter >= last_iter);
                        last_iter = progress.iter;
                    }
                    if let Ok(len) = hub.with_scalar("train/loss", |h| h.len()) {
                        assert!(len >= last_len);
                        last_len = len;
                    }
                }
                last_len
            })
        })
        .collect();

    let mut runner = SimulatedRunner::new(config(5, 200))?;
    runner.run(&mut dispatcher)?;
    done.store(true, Ordering::Release);

    for reader in readers {
        let seen = reader.join().expect("reader thread panicked");
        assert!(seen <= 1000);
    }
    assert_eq!(hub.get_scalar("train/loss")?.len(), 1000);
    Ok(())
}

#[test]
fn test_resume_from_snapshot_continues_histories() -> Result<()> {
    // First run stops after two of four epochs
    let first_hub = Arc::new(MessageHub::new("first"));
    let (mut dispatcher, _) = dispatcher_for(&first_hub, 1000);
    let mut first = config(4, 5);
    first.train.max_epochs = 2;
    SimulatedRunner::new(first)?.run(&mut dispatcher)?;
    let checkpoint = first_hub.snapshot();

    // Second run restores the hub and resumes at epoch 2
    let resumed_hub = Arc::new(MessageHub::new("resumed"));
    resumed_hub.restore(checkpoint)?;
    let (mut dispatcher, _) = dispatcher_for(&resumed_hub, 1000);
    let mut second = config(4, 5);
    second.train.resume_epoch = 2;
    second.train.resume_iter = 10;
    second.train.test_at_end = false;
    SimulatedRunner::new(second)?.run(&mut dispatcher)?;

    assert_eq!(resumed_hub.get_scalar("train/loss")?.len(), 20);
    assert_eq!(resumed_hub.get_scalar("val/accuracy")?.len(), 4);
    assert_eq!(resumed_hub.get_scalar("test/accuracy")?.len(), 1);
    assert_eq!(resumed_hub.get_info_as::<u64>(keys::ITER)?, 19);
    assert_eq!(resumed_hub.get_info_as::<u64>(keys::MAX_EPOCHS)?, 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reporter_runs_alongside_training() -> Result<()> {
    let hub = Arc::new(MessageHub::new("e2e"));
    let (mut dispatcher, _) = dispatcher_for(&hub, 1000);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reporter = spawn_progress_reporter(Arc::clone(&hub), Duration::from_millis(1), shutdown_rx);

    let mut runner = SimulatedRunner::new(config(2, 500))?;
    let summary = tokio::task::spawn_blocking(move || runner.run(&mut dispatcher)).await??;
    assert_eq!(summary.iters, 1000);

    // Let the reporter observe the final state at least once
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(())?;
    let reports = reporter.await??;
    assert!(reports >= 1);
    Ok(())
}

#[test]
fn test_run_from_config_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "{}", serde_json::to_string(&config(1, 3))?)?;

    let loaded = RunConfig::from_json_file(file.path())?;
    let hub = Arc::new(MessageHub::new("file"));
    let (mut dispatcher, _) = dispatcher_for(&hub, 1000);
    SimulatedRunner::new(loaded)?.run(&mut dispatcher)?;

    assert_eq!(hub.get_info_as::<String>(keys::EXPERIMENT_NAME)?, "e2e");
    assert_eq!(hub.get_info_as::<u64>(keys::SEED)?, 42);
    Ok(())
}
