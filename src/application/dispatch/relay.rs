//! Hand-off from worker threads to the single-threaded delivery scheduler.
//!
//! Workers push [`DeliveryAction`]s through a [`RelaySender`]; exactly one
//! [`RelayConsumer`] polls the queue on a fixed interval and runs each action.
//! Actions are delivered in the order they were completed, not submitted.

use crate::application::analysis::sections::panic_message;
use crate::domain::errors::DeliveryError;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub type DeliveryFuture = BoxFuture<'static, Result<(), DeliveryError>>;

/// A zero-argument outward delivery, consumed exactly once.
pub struct DeliveryAction {
    label: String,
    run: Box<dyn FnOnce() -> DeliveryFuture + Send>,
}

impl DeliveryAction {
    pub fn new<F, Fut>(label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), DeliveryError>> + Send + 'static,
    {
        Self {
            label: label.into(),
            run: Box::new(move || action().boxed()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn invoke(self) -> DeliveryFuture {
        (self.run)()
    }
}

impl std::fmt::Debug for DeliveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryAction")
            .field("label", &self.label)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Constructor for the relay channel pair
pub struct ResultRelay;

impl ResultRelay {
    pub fn channel(poll_interval: Duration) -> (RelaySender, RelayConsumer) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            RelaySender { tx },
            RelayConsumer {
                rx,
                poll_interval,
                stats: RelayStats::default(),
                disconnected: false,
            },
        )
    }
}

#[derive(Clone)]
pub struct RelaySender {
    tx: Sender<DeliveryAction>,
}

impl RelaySender {
    /// Never blocks. Fails only once the consumer has been dropped.
    pub fn enqueue(&self, action: DeliveryAction) -> Result<(), DeliveryAction> {
        self.tx.send(action).map_err(|e| e.into_inner())
    }

    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

pub struct RelayConsumer {
    rx: Receiver<DeliveryAction>,
    poll_interval: Duration,
    stats: RelayStats,
    disconnected: bool,
}

impl RelayConsumer {
    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Runs every action currently queued, yielding between actions.
    /// Returns the number of actions taken off the queue.
    pub async fn drain_ready(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.rx.try_recv() {
                Ok(action) => {
                    self.execute(action).await;
                    handled += 1;
                    tokio::task::yield_now().await;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        handled
    }

    /// Polls until `shutdown` flips to true (draining what is left) or every
    /// sender is gone and the queue is empty.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RelayStats {
        info!("Relay: Started (poll interval {:?})", self.poll_interval);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                self.drain_ready().await;
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain_ready().await;
                    if self.disconnected {
                        debug!("Relay: All senders dropped");
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.drain_ready().await;
                        break;
                    }
                }
            }
        }

        info!(
            "Relay: Stopped ({} delivered, {} failed)",
            self.stats.delivered, self.stats.failed
        );
        self.stats
    }

    async fn execute(&mut self, action: DeliveryAction) {
        let label = action.label.clone();
        let future = match catch_unwind(AssertUnwindSafe(|| action.invoke())) {
            Ok(future) => future,
            Err(panic) => {
                self.stats.failed += 1;
                error!("Relay: Delivery '{}' panicked: {}", label, panic_message(panic.as_ref()));
                return;
            }
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => {
                self.stats.delivered += 1;
                debug!("Relay: Delivered '{}'", label);
            }
            Ok(Err(e)) => {
                self.stats.failed += 1;
                warn!("Relay: Delivery '{}' failed: {}", label, e);
            }
            Err(panic) => {
                self.stats.failed += 1;
                error!("Relay: Delivery '{}' panicked: {}", label, panic_message(panic.as_ref()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn explode() -> Result<(), DeliveryError> {
        panic!("sink exploded")
    }

    fn counting_action(label: &str, counter: Arc<AtomicUsize>) -> DeliveryAction {
        DeliveryAction::new(label, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), DeliveryError>(())
        })
    }

    #[tokio::test]
    async fn test_drain_runs_every_queued_action() {
        let (tx, mut rx) = ResultRelay::channel(Duration::from_millis(10));
        let counter = Arc::new(AtomicUsize::new(0));
        for i in 0..5 {
            tx.enqueue(counting_action(&format!("a{}", i), counter.clone())).unwrap();
        }
        assert_eq!(tx.pending(), 5);
        assert_eq!(rx.drain_ready().await, 5);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(rx.stats().delivered, 5);
        assert_eq!(rx.drain_ready().await, 0);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let (tx, mut rx) = ResultRelay::channel(Duration::from_millis(10));
        let counter = Arc::new(AtomicUsize::new(0));

        tx.enqueue(DeliveryAction::new("broken", || async {
            Err::<(), DeliveryError>(DeliveryError::Transport {
                destination: "user:1".to_string(),
                reason: "socket closed".to_string(),
            })
        }))
        .unwrap();
        tx.enqueue(DeliveryAction::new("panicking", explode)).unwrap();
        tx.enqueue(counting_action("ok", counter.clone())).unwrap();

        assert_eq!(rx.drain_ready().await, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(rx.stats(), RelayStats { delivered: 1, failed: 2 });
    }

    #[tokio::test]
    async fn test_run_exits_when_senders_dropped() {
        let (tx, rx) = ResultRelay::channel(Duration::from_millis(5));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let counter = Arc::new(AtomicUsize::new(0));
        tx.enqueue(counting_action("last", counter.clone())).unwrap();
        drop(tx);

        let stats = rx.run(shutdown_rx).await;
        assert_eq!(stats.delivered, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_enqueue_after_consumer_dropped_returns_action() {
        let (tx, rx) = ResultRelay::channel(Duration::from_millis(5));
        drop(rx);
        let action = DeliveryAction::new("orphan", || async { Ok::<(), DeliveryError>(()) });
        let returned = tx.enqueue(action).unwrap_err();
        assert_eq!(returned.label(), "orphan");
    }
}
