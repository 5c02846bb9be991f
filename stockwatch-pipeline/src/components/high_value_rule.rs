use crate::alert_policy::AlertRule;
use crate::types::{Alert, AlertType, SaleEvent, StockUpdate};

/// Fires when a sale total is strictly above the threshold, whether or not
/// the product is tracked.
pub struct HighValueRule {
    pub threshold: f64,
}

impl HighValueRule {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for HighValueRule {
    fn default() -> Self {
        Self { threshold: 120.0 }
    }
}

impl AlertRule for HighValueRule {
    fn evaluate(&self, event: &SaleEvent, _stock: &StockUpdate) -> Option<Alert> {
        if event.total <= self.threshold {
            return None;
        }
        log::info!("HIGH VALUE: ${:.2} at {}", event.total, event.store_id);
        Some(Alert {
            alert_type: AlertType::HighValue,
            emoji: "\u{1f680}".to_string(),
            title: "High-Value Sale Detected!".to_string(),
            detail_lines: vec![
                format!("\u{1f4b0} Amount: ${:.2}", event.total),
                format!("\u{1f4e6} Product: {}", event.product_name),
                format!("\u{1f3ea} Store: {}", event.store_id),
                format!("\u{1f4c1} Category: {}", event.category),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(total: f64) -> SaleEvent {
        SaleEvent {
            transaction_id: "T1".into(),
            product_id: "SKU003".into(),
            product_name: "White Sneakers".into(),
            category: "Sneakers".into(),
            store_id: "Online_Store".into(),
            quantity: 1,
            price: total,
            total,
            timestamp: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn threshold_is_strict() {
        let rule = HighValueRule::default();
        assert!(rule.evaluate(&sale(120.0), &StockUpdate::Untracked).is_none());
        assert!(rule.evaluate(&sale(120.01), &StockUpdate::Untracked).is_some());
    }

    #[test]
    fn fires_regardless_of_stock() {
        let rule = HighValueRule::default();
        let tracked = StockUpdate::Applied {
            previous: 100,
            remaining: 99,
        };
        assert!(rule.evaluate(&sale(300.0), &tracked).is_some());
        assert!(rule.evaluate(&sale(300.0), &StockUpdate::Untracked).is_some());
    }

    #[test]
    fn amount_is_formatted_with_two_decimals() {
        let alert = HighValueRule::default()
            .evaluate(&sale(299.98), &StockUpdate::Untracked)
            .unwrap();
        assert_eq!(alert.detail_lines[0], "\u{1f4b0} Amount: $299.98");
        assert!(alert.detail_lines[3].contains("Sneakers"));
    }
}
