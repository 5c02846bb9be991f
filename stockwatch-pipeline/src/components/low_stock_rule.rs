use crate::alert_policy::AlertRule;
use crate::types::{Alert, AlertType, SaleEvent, StockUpdate};

/// Fires when a tracked product's post-sale stock is at or below the
/// threshold. Untracked products never fire.
pub struct LowStockRule {
    pub threshold: i64,
}

impl LowStockRule {
    pub fn new(threshold: i64) -> Self {
        Self { threshold }
    }
}

impl Default for LowStockRule {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

impl AlertRule for LowStockRule {
    fn evaluate(&self, event: &SaleEvent, stock: &StockUpdate) -> Option<Alert> {
        let remaining = stock.remaining()?;
        if remaining > self.threshold {
            return None;
        }
        log::warn!("LOW STOCK: {} = {} units", event.product_name, remaining);
        Some(Alert {
            alert_type: AlertType::LowStock,
            emoji: "\u{26a0}\u{fe0f}".to_string(),
            title: "Low Stock Alert!".to_string(),
            detail_lines: vec![
                format!("\u{1f4e6} Product: {}", event.product_name),
                format!("\u{1f4ca} Remaining: {} units", remaining),
                format!("\u{1f3ea} Last Sale: {}", event.store_id),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale() -> SaleEvent {
        SaleEvent {
            transaction_id: "T1".into(),
            product_id: "SKU005".into(),
            product_name: "Winter Jacket".into(),
            category: "Jacket".into(),
            store_id: "Hamburg_02".into(),
            quantity: 1,
            price: 10.0,
            total: 10.0,
            timestamp: "2025-01-01T00:00:00Z".into(),
        }
    }

    fn applied(remaining: i64) -> StockUpdate {
        StockUpdate::Applied {
            previous: remaining + 1,
            remaining,
        }
    }

    #[test]
    fn fires_at_threshold_inclusive() {
        let rule = LowStockRule::default();
        assert!(rule.evaluate(&sale(), &applied(5)).is_some());
        assert!(rule.evaluate(&sale(), &applied(6)).is_none());
        assert!(rule.evaluate(&sale(), &applied(-2)).is_some());
    }

    #[test]
    fn never_fires_for_untracked() {
        let rule = LowStockRule::new(i64::MAX);
        assert!(rule.evaluate(&sale(), &StockUpdate::Untracked).is_none());
    }

    #[test]
    fn detail_lines_carry_name_units_and_store() {
        let alert = LowStockRule::default().evaluate(&sale(), &applied(2)).unwrap();
        assert_eq!(alert.alert_type, AlertType::LowStock);
        assert_eq!(alert.detail_lines.len(), 3);
        assert!(alert.detail_lines[0].contains("Winter Jacket"));
        assert!(alert.detail_lines[1].contains("2 units"));
        assert!(alert.detail_lines[2].contains("Hamburg_02"));
    }
}
