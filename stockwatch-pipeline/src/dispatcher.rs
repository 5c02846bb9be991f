//! Outbound notification queue.
//!
//! The event handler pushes rendered messages onto a bounded channel and
//! returns immediately. A single worker task drains the channel and calls
//! the notifier with a per-call timeout. Failures are logged once per
//! message and counted; nothing flows back to the handler, so a slow or
//! failing endpoint never blocks ledger updates. When the queue is full the
//! new message is dropped and counted instead of growing the backlog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::AlertConfig;
use crate::error::PipelineError;
use crate::notifier::{Notifier, OutboundMessage};

/// Default number of messages the outbound queue holds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Delivery counters reported when the worker shuts down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
    /// Messages rejected because the queue was full.
    pub dropped: u64,
}

/// Cloneable sending side of the outbound queue.
#[derive(Clone, Debug)]
pub struct DispatchHandle {
    tx: mpsc::Sender<OutboundMessage>,
    dropped: Arc<AtomicU64>,
}

impl DispatchHandle {
    /// Queue a message without waiting. Returns `false` if the queue is full
    /// or the worker has already stopped; the message is then discarded.
    pub fn enqueue(&self, message: OutboundMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "transaction_id={} outbound queue full, message dropped",
                    message.transaction_id
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                log::error!(
                    "transaction_id={} dispatcher stopped, message dropped",
                    message.transaction_id
                );
                false
            }
        }
    }
}

pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    capacity: usize,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self {
            notifier,
            timeout,
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn from_config(notifier: Arc<dyn Notifier>, config: &AlertConfig) -> Self {
        Self::new(notifier, config.dispatch_timeout)
            .with_retries(config.max_retries, config.retry_backoff)
            .with_capacity(config.queue_capacity)
    }

    /// Retry failed deliveries up to `max_retries` times, doubling the delay
    /// after each attempt.
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// Queue capacity; values below one are raised to one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Start the worker. It runs until every `DispatchHandle` is dropped and
    /// the queue is drained, then returns its counters.
    pub fn spawn(self) -> (DispatchHandle, JoinHandle<DispatchStats>) {
        let (tx, mut rx) = mpsc::channel::<OutboundMessage>(self.capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let handle = DispatchHandle {
            tx,
            dropped: Arc::clone(&dropped),
        };
        let worker = tokio::spawn(async move {
            let mut stats = DispatchStats::default();
            while let Some(message) = rx.recv().await {
                if self.deliver(&message).await {
                    stats.delivered += 1;
                } else {
                    stats.failed += 1;
                }
            }
            // Every handle is gone by now, so no more drops can be recorded.
            stats.dropped = dropped.load(Ordering::Relaxed);
            log::info!(
                "dispatcher drained: {} delivered, {} failed, {} dropped",
                stats.delivered,
                stats.failed,
                stats.dropped
            );
            stats
        });
        (handle, worker)
    }

    /// Deliver one message, honouring timeout and retry settings.
    /// Logs exactly one error record if the message is finally given up on.
    pub async fn deliver(&self, message: &OutboundMessage) -> bool {
        let mut attempt = 0;
        loop {
            let call = self.notifier.send(message);
            let result = match tokio::time::timeout(self.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(PipelineError::Timeout(self.timeout)),
            };
            match result {
                Ok(()) => {
                    log::info!(
                        "transaction_id={} notifier={} alert sent",
                        message.transaction_id,
                        self.notifier.name()
                    );
                    return true;
                }
                Err(e) if attempt < self.max_retries => {
                    let delay = self.retry_backoff * 2u32.saturating_pow(attempt);
                    log::debug!(
                        "transaction_id={} attempt {} failed ({}), retrying in {:?}",
                        message.transaction_id,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!(
                        "transaction_id={} notifier={} delivery failed: {}",
                        message.transaction_id,
                        self.notifier.name(),
                        e
                    );
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyNotifier {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(&self, _message: &OutboundMessage) -> PipelineResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(PipelineError::Delivery("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    struct StalledNotifier;

    #[async_trait]
    impl Notifier for StalledNotifier {
        async fn send(&self, _message: &OutboundMessage) -> PipelineResult<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    fn message(id: &str) -> OutboundMessage {
        OutboundMessage {
            transaction_id: id.into(),
            alert_type: None,
            text: "hello".into(),
        }
    }

    #[tokio::test]
    async fn failure_without_retries_is_counted_once() {
        let notifier = Arc::new(FlakyNotifier {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let (handle, worker) = Dispatcher::new(notifier.clone(), Duration::from_secs(1)).spawn();
        assert!(handle.enqueue(message("T1")));
        drop(handle);
        let stats = worker.await.unwrap();
        assert_eq!(
            stats,
            DispatchStats {
                delivered: 0,
                failed: 1,
                dropped: 0
            }
        );
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_recover_transient_failures() {
        let notifier = Arc::new(FlakyNotifier {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let dispatcher = Dispatcher::new(notifier.clone(), Duration::from_secs(1))
            .with_retries(2, Duration::from_millis(1));
        assert!(dispatcher.deliver(&message("T1")).await);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let dispatcher = Dispatcher::new(Arc::new(StalledNotifier), Duration::from_millis(20));
        assert!(!dispatcher.deliver(&message("T1")).await);
    }

    #[tokio::test]
    async fn later_messages_still_go_out_after_a_failure() {
        let notifier = Arc::new(FlakyNotifier {
            failures: 1,
            calls: AtomicU32::new(0),
        });
        let (handle, worker) = Dispatcher::new(notifier, Duration::from_secs(1)).spawn();
        handle.enqueue(message("T1"));
        handle.enqueue(message("T2"));
        handle.enqueue(message("T3"));
        drop(handle);
        let stats = worker.await.unwrap();
        assert_eq!(
            stats,
            DispatchStats {
                delivered: 2,
                failed: 1,
                dropped: 0
            }
        );
    }

    #[tokio::test]
    async fn full_queue_drops_and_counts_overflow() {
        let notifier = Arc::new(FlakyNotifier {
            failures: 0,
            calls: AtomicU32::new(0),
        });
        let (handle, worker) = Dispatcher::new(notifier.clone(), Duration::from_secs(1))
            .with_capacity(2)
            .spawn();
        // The current-thread runtime does not run the worker until we yield,
        // so the endpoint is effectively stalled while we enqueue.
        let accepted: Vec<bool> = (0..5)
            .map(|i| handle.enqueue(message(&format!("T{}", i))))
            .collect();
        assert_eq!(accepted, vec![true, true, false, false, false]);
        drop(handle);
        let stats = worker.await.unwrap();
        assert_eq!(
            stats,
            DispatchStats {
                delivered: 2,
                failed: 0,
                dropped: 3
            }
        );
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn enqueue_after_worker_stopped_is_rejected() {
        let (handle, worker) =
            Dispatcher::new(Arc::new(StalledNotifier), Duration::from_millis(10)).spawn();
        worker.abort();
        let _ = worker.await;
        assert!(!handle.enqueue(message("T1")));
    }
}
