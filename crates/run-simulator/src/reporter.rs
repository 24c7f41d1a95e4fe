//! Background progress reporter polling the message hub

use lifecycle::keys;
use message_hub::MessageHubHandle;
use runtime_core::Result;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Shutdown signal sender
pub type ShutdownSender = broadcast::Sender<()>;

/// Shutdown signal receiver
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// Training progress as seen by a hub reader
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub epoch: u64,
    pub iter: u64,
    pub max_iters: Option<u64>,
    pub loss: Option<f64>,
}

/// Read the current progress, or `None` while training has not started
pub fn read_progress(hub: &MessageHubHandle) -> Result<Option<Progress>> {
    let epoch = match hub.get_info_as::<u64>(keys::EPOCH) {
        Ok(epoch) => epoch,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };
    let iter = hub.get_info_as::<u64>(keys::ITER)?;
    let max_iters = hub.get_info_as::<Option<u64>>(keys::MAX_ITERS)?;

    let loss_key = keys::scalar_key(keys::TRAIN_PREFIX, "loss");
    let loss = match hub.with_scalar(&loss_key, |h| h.current()) {
        Ok(loss) => loss,
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    Ok(Some(Progress {
        epoch,
        iter,
        max_iters,
        loss,
    }))
}

/// Spawn a task logging hub progress every `interval` until shutdown.
///
/// Resolves to the number of progress reports logged.
pub fn spawn_progress_reporter(
    hub: MessageHubHandle,
    interval: Duration,
    mut shutdown_rx: ShutdownReceiver,
) -> JoinHandle<Result<u64>> {
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Starting progress reporter"
        );
        let mut reports: u64 = 0;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match read_progress(&hub)? {
                        Some(p) => {
                            reports += 1;
                            info!(
                                epoch = p.epoch,
                                iter = p.iter,
                                max_iters = ?p.max_iters,
                                loss = ?p.loss,
                                "Training progress"
                            );
                        }
                        None => debug!("Training state not published yet"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!(reports = reports, "Progress reporter shutting down");
                    break;
                }
            }
        }
        Ok::<_, runtime_core::Error>(reports)
    })
}
