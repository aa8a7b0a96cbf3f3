use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::trace;

pub const SEARCH_DELAY: Duration = Duration::from_millis(500);

/// Publishes the latest input once no new input arrived for `delay`.
/// Every new input restarts the timer.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    settled: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, mut rx) = mpsc::unbounded_channel::<T>();
        let (tx, settled) = watch::channel(initial);

        let task = tokio::spawn(async move {
            while let Some(mut pending) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(value) => pending = value,
                            None => break,
                        },
                        _ = tokio::time::sleep(delay) => break,
                    }
                }
                trace!("debounced input settled");
                tx.send_if_modified(|current| {
                    if *current == pending {
                        false
                    } else {
                        *current = pending.clone();
                        true
                    }
                });
            }
        });

        Self {
            input,
            settled,
            task,
        }
    }

    pub fn push(&self, value: T) {
        // The task only exits once this sender is dropped.
        let _ = self.input.send(value);
    }

    pub fn current(&self) -> T {
        self.settled.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled.clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
