//! Reorder recommendations.
//!
//! Order size is `floor(reorder_point x urgency_multiplier x 2)`. Status is
//! a function of current stock against the reorder point only:
//! - urgent:   stock <= reorder_point
//! - warning:  reorder_point < stock <= reorder_point x 1.5
//! - adequate: otherwise

use crate::catalog::CatalogStore;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{Product, ReorderRecommendation, ReorderStatus, Urgency};

/// Default fraction of retail price assumed for wholesale cost.
pub const DEFAULT_WHOLESALE_FACTOR: f64 = 0.6;

/// Band above the reorder point that still counts as "approaching".
const WARNING_BAND: f64 = 1.5;

/// Recommended order quantity for a reorder point and urgency.
pub fn recommended_quantity(reorder_point: u32, urgency: Urgency) -> u32 {
    (f64::from(reorder_point) * urgency.multiplier() * 2.0).floor() as u32
}

/// Classify current stock against the reorder point.
pub fn classify_stock(current_stock: i64, reorder_point: u32) -> ReorderStatus {
    let rp = i64::from(reorder_point);
    if current_stock <= rp {
        ReorderStatus::Urgent
    } else if (current_stock as f64) <= f64::from(reorder_point) * WARNING_BAND {
        ReorderStatus::Warning
    } else {
        ReorderStatus::Adequate
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReorderCalculator {
    pub wholesale_factor: f64,
}

impl Default for ReorderCalculator {
    fn default() -> Self {
        Self {
            wholesale_factor: DEFAULT_WHOLESALE_FACTOR,
        }
    }
}

impl ReorderCalculator {
    pub fn new(wholesale_factor: f64) -> Self {
        Self { wholesale_factor }
    }

    /// Build a recommendation for a resolved product.
    pub fn calculate(
        &self,
        product: &Product,
        supplier_name: &str,
        current_stock: i64,
        urgency: Urgency,
    ) -> ReorderRecommendation {
        let recommended_qty = recommended_quantity(product.reorder_point, urgency);
        let estimated_cost =
            product.base_price * self.wholesale_factor * f64::from(recommended_qty);
        ReorderRecommendation {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            current_stock,
            reorder_point: product.reorder_point,
            urgency,
            status: classify_stock(current_stock, product.reorder_point),
            recommended_qty,
            supplier_id: product.supplier_id.clone(),
            supplier_name: supplier_name.to_string(),
            lead_time_days: product.lead_time_days,
            estimated_cost,
        }
    }

    /// Resolve the product in the catalog, then calculate. A missing product
    /// yields `NotFound` and no recommendation.
    pub fn calculate_for(
        &self,
        catalog: &CatalogStore,
        product_id: &str,
        current_stock: i64,
        urgency: Urgency,
    ) -> PipelineResult<ReorderRecommendation> {
        let product = catalog
            .product(product_id)
            .ok_or_else(|| PipelineError::NotFound(product_id.to_string()))?;
        let supplier_name = catalog.supplier_name(&product.supplier_id);
        Ok(self.calculate(product, &supplier_name, current_stock, urgency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(reorder_point: u32, base_price: f64) -> Product {
        Product {
            id: "SKU005".into(),
            name: "Winter Jacket".into(),
            category: "Jacket".into(),
            base_price,
            stock: 10,
            supplier_id: "SUP002".into(),
            reorder_point,
            lead_time_days: 7,
            description: String::new(),
        }
    }

    #[test]
    fn high_urgency_below_reorder_point() {
        let rec = ReorderCalculator::default().calculate(&product(10, 1.0), "x", 3, Urgency::High);
        assert_eq!(rec.status, ReorderStatus::Urgent);
        assert_eq!(rec.recommended_qty, 40);
        assert_eq!(rec.lead_time_days, 7);
    }

    #[test]
    fn normal_urgency_in_warning_band() {
        let rec =
            ReorderCalculator::default().calculate(&product(10, 1.0), "x", 12, Urgency::Normal);
        assert_eq!(rec.status, ReorderStatus::Warning);
        assert_eq!(rec.recommended_qty, 30);
    }

    #[test]
    fn status_boundaries() {
        assert_eq!(classify_stock(10, 10), ReorderStatus::Urgent);
        assert_eq!(classify_stock(11, 10), ReorderStatus::Warning);
        assert_eq!(classify_stock(15, 10), ReorderStatus::Warning);
        assert_eq!(classify_stock(16, 10), ReorderStatus::Adequate);
        assert_eq!(classify_stock(-4, 0), ReorderStatus::Urgent);
        assert_eq!(classify_stock(1, 0), ReorderStatus::Adequate);
    }

    #[test]
    fn quantity_floors_fractional_results() {
        // 3 x 1.5 x 2 = 9; 5 x 1.0 x 2 = 10; 7 x 1.5 x 2 = 21
        assert_eq!(recommended_quantity(3, Urgency::Normal), 9);
        assert_eq!(recommended_quantity(5, Urgency::Low), 10);
        assert_eq!(recommended_quantity(7, Urgency::parse("unknown")), 21);
        assert_eq!(recommended_quantity(0, Urgency::High), 0);
    }

    #[test]
    fn estimated_cost_uses_wholesale_factor() {
        let rec =
            ReorderCalculator::default().calculate(&product(3, 149.99), "x", 2, Urgency::Normal);
        // 149.99 x 0.6 x 9
        assert!((rec.estimated_cost - 809.946).abs() < 1e-6);

        let rec = ReorderCalculator::new(0.5).calculate(&product(3, 100.0), "x", 2, Urgency::Low);
        assert!((rec.estimated_cost - 300.0).abs() < 1e-9);
    }

    #[test]
    fn missing_product_is_not_found() {
        let catalog = CatalogStore::new();
        let err = ReorderCalculator::default()
            .calculate_for(&catalog, "SKU999", 0, Urgency::Normal)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(id) if id == "SKU999"));
    }

    #[test]
    fn resolves_supplier_name_from_catalog() {
        let mut catalog = CatalogStore::new();
        catalog.upsert_products(vec![product(10, 20.0)]);
        let rec = ReorderCalculator::default()
            .calculate_for(&catalog, "SKU005", 3, Urgency::High)
            .unwrap();
        assert_eq!(rec.supplier_name, "Unknown");
        assert_eq!(rec.recommended_qty, 40);
    }
}
