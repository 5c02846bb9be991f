//! The inventory service: one object that owns the catalog, the stock ledger,
//! the alert policy and the outbound queue handle.
//!
//! `handle` is the single entry point for sale events. It updates the ledger,
//! evaluates the alert policy against the value its own sale produced, hands
//! any alerts to the dispatcher and returns a result value. It never waits
//! on the network and never fails; acknowledging or retrying the transport
//! message is the transport adapter's business.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::Serialize;

use crate::alert_policy::AlertPolicy;
use crate::catalog::{CatalogStats, CatalogStore};
use crate::catalog_loader::CatalogData;
use crate::config::AlertConfig;
use crate::dispatcher::DispatchHandle;
use crate::error::PipelineResult;
use crate::ledger::StockLedger;
use crate::message;
use crate::notifier::OutboundMessage;
use crate::reorder::ReorderCalculator;
use crate::simulator::EventSink;
use crate::types::{
    DispatchOutcome, ProcessingOutcome, ProcessingResult, ReorderRecommendation, SaleEvent,
    Urgency,
};

/// Running counters over the life of the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub events_processed: u64,
    pub events_dropped: u64,
    pub untracked_events: u64,
    pub alerts_raised: u64,
    pub alerts_queued: u64,
    pub alerts_skipped: u64,
}

#[derive(Default)]
struct Counters {
    events_processed: AtomicU64,
    events_dropped: AtomicU64,
    untracked_events: AtomicU64,
    alerts_raised: AtomicU64,
    alerts_queued: AtomicU64,
    alerts_skipped: AtomicU64,
}

pub struct InventoryService {
    catalog: RwLock<CatalogStore>,
    ledger: StockLedger,
    policy: AlertPolicy,
    reorder: ReorderCalculator,
    dispatch: Option<DispatchHandle>,
    counters: Counters,
}

impl InventoryService {
    /// Build a service over a loaded catalog. `dispatch` is `None` when no
    /// messaging credentials are configured; alerts are then computed and
    /// logged as skipped.
    pub fn new(data: CatalogData, config: &AlertConfig, dispatch: Option<DispatchHandle>) -> Self {
        let mut catalog = CatalogStore::new();
        catalog.upsert_suppliers(data.suppliers);
        catalog.upsert_products(data.products);

        let ledger = StockLedger::new(config.stock_floor);
        let tracked = ledger.seed(catalog.products());
        log::info!(
            "alert system synchronized: {} items tracked, stock floor {:?}",
            tracked,
            ledger.floor()
        );

        Self {
            catalog: RwLock::new(catalog),
            ledger,
            policy: AlertPolicy::from_config(config),
            reorder: ReorderCalculator::new(config.wholesale_factor),
            dispatch,
            counters: Counters::default(),
        }
    }

    /// Replace the default policy (for custom rule sets).
    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process one validated sale event.
    pub fn handle(&self, event: &SaleEvent) -> ProcessingResult {
        log::info!("processing transaction_id={}", event.transaction_id);

        let stock = self.ledger.apply_sale(&event.product_id, event.quantity);
        if !stock.is_tracked() {
            self.counters.untracked_events.fetch_add(1, Ordering::Relaxed);
            log::debug!(
                "transaction_id={} product {} is untracked, no stock alert possible",
                event.transaction_id,
                event.product_id
            );
        }

        let alerts = self.policy.evaluate(event, &stock);
        self.counters
            .alerts_raised
            .fetch_add(alerts.len() as u64, Ordering::Relaxed);

        let dispatch = if alerts.is_empty() {
            DispatchOutcome::Nothing
        } else {
            match &self.dispatch {
                Some(handle) => {
                    let queued = alerts
                        .iter()
                        .filter(|alert| {
                            handle.enqueue(OutboundMessage {
                                transaction_id: event.transaction_id.clone(),
                                alert_type: Some(alert.alert_type),
                                text: message::format_alert(alert, &event.timestamp),
                            })
                        })
                        .count();
                    self.counters
                        .alerts_queued
                        .fetch_add(queued as u64, Ordering::Relaxed);
                    DispatchOutcome::Queued(queued)
                }
                None => {
                    for alert in &alerts {
                        log::warn!(
                            "transaction_id={} messaging credentials not configured, skipped {} alert",
                            event.transaction_id,
                            alert.alert_type
                        );
                    }
                    self.counters
                        .alerts_skipped
                        .fetch_add(alerts.len() as u64, Ordering::Relaxed);
                    DispatchOutcome::Skipped(alerts.len())
                }
            }
        };

        self.counters.events_processed.fetch_add(1, Ordering::Relaxed);
        log::info!("processed transaction_id={}", event.transaction_id);
        ProcessingResult {
            transaction_id: event.transaction_id.clone(),
            stock,
            alerts,
            dispatch,
        }
    }

    /// Process a raw transport payload (bare JSON or Pub/Sub envelope).
    /// Malformed payloads are logged and dropped, never raised.
    pub fn handle_payload(&self, payload: &[u8]) -> ProcessingOutcome {
        match SaleEvent::from_payload(payload) {
            Ok(event) => ProcessingOutcome::Processed(self.handle(&event)),
            Err(e) => {
                self.counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                log::error!("failed to decode message: {}", e);
                ProcessingOutcome::Dropped {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Reorder recommendation for a product. Current stock defaults to the
    /// ledger, then the catalog.
    pub fn recommend_reorder(
        &self,
        product_id: &str,
        current_stock: Option<i64>,
        urgency: Urgency,
    ) -> PipelineResult<ReorderRecommendation> {
        let catalog = self.catalog_read();
        let current_stock = current_stock
            .or_else(|| self.ledger.stock_of(product_id))
            .or_else(|| catalog.product(product_id).map(|p| p.stock))
            .unwrap_or(0);
        self.reorder
            .calculate_for(&catalog, product_id, current_stock, urgency)
    }

    /// Queue a reorder recommendation as a chat message. Returns whether it
    /// was queued (false when dispatch is disabled).
    pub fn notify_reorder(&self, rec: &ReorderRecommendation) -> bool {
        match &self.dispatch {
            Some(handle) => handle.enqueue(OutboundMessage {
                transaction_id: format!("REORDER-{}", rec.product_id),
                alert_type: None,
                text: message::format_recommendation(rec),
            }),
            None => {
                log::warn!(
                    "messaging credentials not configured, skipped reorder message for {}",
                    rec.product_id
                );
                false
            }
        }
    }

    /// Upsert imported records and re-seed the ledger for imported products.
    /// Returns the number of products written.
    pub fn import(&self, data: CatalogData) -> usize {
        let mut catalog = self.catalog_write();
        catalog.upsert_suppliers(data.suppliers);
        let written = catalog.upsert_products(data.products.iter().cloned());
        self.ledger.seed(data.products.iter().filter(|p| !p.id.is_empty()));
        log::info!("catalog import: {} products upserted", written);
        written
    }

    /// Read access to the catalog for lookups.
    pub fn catalog(&self) -> RwLockReadGuard<'_, CatalogStore> {
        self.catalog_read()
    }

    pub fn catalog_stats(&self) -> CatalogStats {
        self.catalog_read().stats()
    }

    pub fn ledger(&self) -> &StockLedger {
        &self.ledger
    }

    pub fn dispatch_enabled(&self) -> bool {
        self.dispatch.is_some()
    }

    pub fn stats(&self) -> ServiceStats {
        let c = &self.counters;
        ServiceStats {
            events_processed: c.events_processed.load(Ordering::Relaxed),
            events_dropped: c.events_dropped.load(Ordering::Relaxed),
            untracked_events: c.untracked_events.load(Ordering::Relaxed),
            alerts_raised: c.alerts_raised.load(Ordering::Relaxed),
            alerts_queued: c.alerts_queued.load(Ordering::Relaxed),
            alerts_skipped: c.alerts_skipped.load(Ordering::Relaxed),
        }
    }

    fn catalog_read(&self) -> RwLockReadGuard<'_, CatalogStore> {
        self.catalog.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn catalog_write(&self) -> RwLockWriteGuard<'_, CatalogStore> {
        self.catalog.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Feeding simulated events straight into the service.
#[async_trait]
impl EventSink for InventoryService {
    async fn publish(&self, event: &SaleEvent) -> PipelineResult<()> {
        self.handle(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertType, StockUpdate};

    fn data() -> CatalogData {
        CatalogData {
            products: vec![crate::types::Product {
                id: "SKU005".into(),
                name: "Winter Jacket".into(),
                category: "Jacket".into(),
                base_price: 149.99,
                stock: 10,
                supplier_id: "SUP002".into(),
                reorder_point: 3,
                lead_time_days: 14,
                description: String::new(),
            }],
            suppliers: Vec::new(),
        }
    }

    fn event(quantity: u32, total: f64) -> SaleEvent {
        SaleEvent {
            transaction_id: "TEST-001".into(),
            product_id: "SKU005".into(),
            product_name: "Winter Jacket".into(),
            category: "Jacket".into(),
            store_id: "Berlin_01".into(),
            quantity,
            price: total / f64::from(quantity),
            total,
            timestamp: "2025-01-01T10:00:00".into(),
        }
    }

    #[test]
    fn no_credentials_means_skipped() {
        let service = InventoryService::new(data(), &AlertConfig::default(), None);
        let result = service.handle(&event(6, 60.0));
        assert_eq!(
            result.stock,
            StockUpdate::Applied {
                previous: 10,
                remaining: 4
            }
        );
        assert_eq!(result.alerts.len(), 1);
        assert_eq!(result.alerts[0].alert_type, AlertType::LowStock);
        assert_eq!(result.dispatch, DispatchOutcome::Skipped(1));
        assert_eq!(service.stats().alerts_skipped, 1);
    }

    #[test]
    fn reorder_uses_ledger_stock() {
        let service = InventoryService::new(data(), &AlertConfig::default(), None);
        service.handle(&event(8, 80.0));
        let rec = service
            .recommend_reorder("SKU005", None, Urgency::High)
            .unwrap();
        assert_eq!(rec.current_stock, 2);
        assert_eq!(rec.recommended_qty, 12);
        assert!(!service.notify_reorder(&rec));
    }

    #[test]
    fn import_reseeds_ledger() {
        let service = InventoryService::new(data(), &AlertConfig::default(), None);
        service.handle(&event(8, 80.0));
        let mut update = data();
        update.products[0].stock = 40;
        assert_eq!(service.import(update), 1);
        assert_eq!(service.ledger().stock_of("SKU005"), Some(40));
        assert_eq!(service.catalog_stats().total_stock_units, 40);
    }

    #[test]
    fn custom_policy_replaces_default_rules() {
        use crate::components::high_value_rule::HighValueRule;

        let policy = AlertPolicy::new(vec![Box::new(HighValueRule::new(50.0))]);
        let service =
            InventoryService::new(data(), &AlertConfig::default(), None).with_policy(policy);
        assert!(!service.dispatch_enabled());
        // 4 units left would trip the default low-stock rule.
        let result = service.handle(&event(6, 60.0));
        assert_eq!(result.alerts.len(), 1);
        assert_eq!(result.alerts[0].alert_type, AlertType::HighValue);
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let service = InventoryService::new(data(), &AlertConfig::default(), None);
        let outcome = service.handle_payload(b"{\"product_id\": \"SKU005\"}");
        assert!(matches!(outcome, ProcessingOutcome::Dropped { .. }));
        assert_eq!(service.stats().events_dropped, 1);
        assert_eq!(service.ledger().stock_of("SKU005"), Some(10));
    }
}
