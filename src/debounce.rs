//! Debounced background flushing.
//!
//! Every task mutation calls [`Debouncer::trigger`]. The flush callback runs
//! once the triggers have been quiet for the configured delay, so a burst of
//! edits publishes a single upcoming list.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    worker: JoinHandle<usize>,
}

impl Debouncer {
    /// Start the background worker on the current tokio runtime.
    pub fn spawn<F>(delay: Duration, mut flush: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let worker = tokio::spawn(async move {
            let mut flushes = 0usize;
            // Wait for the first trigger of a burst.
            while rx.recv().await.is_some() {
                let mut closed = false;
                loop {
                    tokio::select! {
                        received = rx.recv() => {
                            if received.is_none() {
                                closed = true;
                                break;
                            }
                        }
                        _ = tokio::time::sleep(delay) => break,
                    }
                }

                flushes += 1;
                if let Err(err) = flush() {
                    tracing::warn!(error = %err, "debounced flush failed");
                }
                if closed {
                    return flushes;
                }
            }
            flushes
        });

        Self { tx, worker }
    }

    /// Request a flush after the quiet period.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("debouncer already stopped");
        }
    }

    /// Stop accepting triggers and flush anything pending. Returns the number
    /// of flushes performed over the debouncer's lifetime.
    pub async fn shutdown(self) -> usize {
        let Debouncer { tx, worker } = self;
        drop(tx);
        match worker.await {
            Ok(flushes) => flushes,
            Err(err) => {
                tracing::warn!(error = %err, "debouncer worker panicked");
                0
            }
        }
    }
}
