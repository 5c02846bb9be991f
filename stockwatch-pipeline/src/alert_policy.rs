use crate::components::high_value_rule::HighValueRule;
use crate::components::low_stock_rule::LowStockRule;
use crate::config::AlertConfig;
use crate::types::{Alert, SaleEvent, StockUpdate};
use crate::util;

/// An alert rule inspects one sale (and the stock it left behind) and
/// decides whether to raise an alert. Rules are pure: the same inputs
/// always produce the same alert.
pub trait AlertRule: Send + Sync {
    /// Decide if this rule should run for the given event.
    fn enable(&self, _event: &SaleEvent) -> bool {
        true
    }

    /// Evaluate the rule against the event and its ledger outcome.
    fn evaluate(&self, event: &SaleEvent, stock: &StockUpdate) -> Option<Alert>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// Ordered set of alert rules. Alerts come out in rule order.
pub struct AlertPolicy {
    rules: Vec<Box<dyn AlertRule>>,
}

impl AlertPolicy {
    pub fn new(rules: Vec<Box<dyn AlertRule>>) -> Self {
        Self { rules }
    }

    /// The standard policy: low stock first, then high value.
    pub fn from_config(config: &AlertConfig) -> Self {
        Self::new(vec![
            Box::new(LowStockRule::new(config.low_stock_threshold)),
            Box::new(HighValueRule::new(config.high_value_threshold)),
        ])
    }

    pub fn evaluate(&self, event: &SaleEvent, stock: &StockUpdate) -> Vec<Alert> {
        self.rules
            .iter()
            .filter(|rule| rule.enable(event))
            .filter_map(|rule| {
                let alert = rule.evaluate(event, stock)?;
                log::info!(
                    "transaction_id={} rule={} raised {}",
                    event.transaction_id,
                    rule.name(),
                    alert.alert_type
                );
                Some(alert)
            })
            .collect()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::from_config(&AlertConfig::default())
    }
}
