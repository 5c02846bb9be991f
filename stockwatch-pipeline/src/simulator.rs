//! Synthetic point-of-sale event generator.
//!
//! Stands in for a real POS feed: picks a random catalog product, applies a
//! small random discount and emits an internally consistent `SaleEvent`.
//! The run loop holds no durable state, so stopping it mid-stream is safe.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;

use crate::error::PipelineResult;
use crate::types::{Product, SaleEvent};
use crate::util;

/// Stores the simulator sells from.
pub const DEFAULT_STORES: [&str; 4] = ["Berlin_01", "Hamburg_02", "Munich_01", "Online_Store"];

/// Lowest discount factor applied to the base price.
const MIN_DISCOUNT_FACTOR: f64 = 0.85;

/// Where generated events go.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &SaleEvent) -> PipelineResult<()>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// Prints one line per event to stdout.
pub struct ConsoleSink;

#[async_trait]
impl EventSink for ConsoleSink {
    async fn publish(&self, event: &SaleEvent) -> PipelineResult<()> {
        println!(
            "\u{1f4e4} SALE: {} x{} = ${:.2} @ {}",
            event.product_name, event.quantity, event.total, event.store_id
        );
        Ok(())
    }
}

/// Loop settings for `run`.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Mean delay between events; each delay is jittered by +/-50%.
    pub interval: Duration,
    /// Stop after this many events. `None` runs until shutdown.
    pub count: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            count: None,
        }
    }
}

pub struct EventSimulator<R: Rng = StdRng> {
    rng: R,
    stores: Vec<String>,
}

impl EventSimulator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible event stream.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for EventSimulator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> EventSimulator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            stores: DEFAULT_STORES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_stores(mut self, stores: Vec<String>) -> Self {
        if !stores.is_empty() {
            self.stores = stores;
        }
        self
    }

    /// Generate one sale. Returns `None` for an empty catalog.
    pub fn next_event(&mut self, catalog: &[Product]) -> Option<SaleEvent> {
        let product = catalog.choose(&mut self.rng)?;
        let quantity: u32 = self.rng.gen_range(1..=3);
        let price = round_cents(product.base_price * self.rng.gen_range(MIN_DISCOUNT_FACTOR..=1.0));
        let store_id = self
            .stores
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_STORES[0].to_string());
        let suffix: u32 = self.rng.gen_range(1000..=9999);

        Some(SaleEvent {
            transaction_id: format!("TXN-{}-{}", Utc::now().timestamp_millis(), suffix),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            category: product.category.clone(),
            store_id,
            quantity,
            price,
            total: round_cents(price * f64::from(quantity)),
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        })
    }

    /// `interval` scaled by a uniform factor in [0.5, 1.5].
    pub fn jittered(&mut self, interval: Duration) -> Duration {
        interval.mul_f64(self.rng.gen_range(0.5..=1.5))
    }

    /// Emit events into `sink` until `count` is reached or `shutdown` flips
    /// to true (dropping the sender also stops the loop). Sink failures are
    /// logged and the loop keeps going. Returns the number of events sent.
    pub async fn run(
        &mut self,
        catalog: &[Product],
        config: &SimulatorConfig,
        sink: &dyn EventSink,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        log::info!(
            "simulator started: sink={} interval={:?} count={}",
            sink.name(),
            config.interval,
            config
                .count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "infinite".to_string())
        );

        let mut sent = 0u64;
        while config.count.map_or(true, |limit| sent < limit) {
            if *shutdown.borrow() {
                break;
            }
            let Some(event) = self.next_event(catalog) else {
                log::warn!("simulator has an empty catalog, stopping");
                break;
            };
            if let Err(e) = sink.publish(&event).await {
                log::error!("transaction_id={} publish failed: {}", event.transaction_id, e);
            }
            sent += 1;

            if config.count.is_some_and(|limit| sent >= limit) {
                break;
            }
            let delay = self.jittered(config.interval);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("simulator stopped after {} events", sent);
        sent
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
