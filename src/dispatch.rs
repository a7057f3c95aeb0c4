//! Trigger event dispatch.
//!
//! Couples the upload path to the pipeline worker the way a bucket
//! notification would: the uploader publishes a raw event payload onto the
//! bus, and the dispatcher spawns one independent worker invocation per
//! event. Delivery is at-least-once and possibly concurrent; the worker's
//! overwrite semantics absorb duplicates, so the dispatcher makes no attempt
//! to deduplicate.

use crate::worker::PipelineWorker;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Sender half of the trigger bus. Cloned into every publisher.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<String>,
}

impl EventBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish a raw event payload. Returns false when the dispatcher has
    /// shut down and the event cannot be delivered.
    pub fn publish(&self, raw_event: String) -> bool {
        self.tx.send(raw_event).is_ok()
    }
}

/// Drain the trigger bus, spawning one detached worker invocation per event.
///
/// Invocations run concurrently and independently; a panicking invocation
/// only takes down its own task. The dispatcher exits when every sender is
/// dropped.
pub fn spawn_dispatcher(
    worker: PipelineWorker,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("event dispatcher started");
        while let Some(raw_event) = rx.recv().await {
            debug!("dispatching trigger event");
            let worker = worker.clone();
            tokio::spawn(async move {
                worker.handle(&raw_event).await;
            });
        }
        info!("event dispatcher stopped");
    })
}
