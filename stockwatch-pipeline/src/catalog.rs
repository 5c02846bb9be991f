//! Product and supplier catalog.
//!
//! Holds the records loaded by `catalog_loader` and answers the lookups the
//! chat/agent front end and the reorder calculator need. Imports are upserts
//! keyed by id; nothing is ever removed.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{Product, Supplier};

/// Threshold used by the low-stock listing when the caller has none.
pub const DEFAULT_LISTING_THRESHOLD: i64 = 15;

/// Supplier name shown when a product's supplier is not in the catalog.
pub const UNKNOWN_SUPPLIER: &str = "Unknown";

/// A product together with its resolved supplier name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductView {
    pub product: Product,
    pub supplier_name: String,
}

/// Aggregate counts over the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub product_count: usize,
    pub supplier_count: usize,
    pub total_stock_units: i64,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogStore {
    products: BTreeMap<String, Product>,
    suppliers: BTreeMap<String, Supplier>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite products by id. Returns how many were written.
    pub fn upsert_products<I>(&mut self, products: I) -> usize
    where
        I: IntoIterator<Item = Product>,
    {
        let mut count = 0;
        for product in products {
            if product.id.is_empty() {
                continue;
            }
            self.products.insert(product.id.clone(), product);
            count += 1;
        }
        count
    }

    pub fn upsert_suppliers<I>(&mut self, suppliers: I) -> usize
    where
        I: IntoIterator<Item = Supplier>,
    {
        let mut count = 0;
        for supplier in suppliers {
            if supplier.id.is_empty() {
                continue;
            }
            self.suppliers.insert(supplier.id.clone(), supplier);
            count += 1;
        }
        count
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    pub fn supplier(&self, id: &str) -> Option<&Supplier> {
        self.suppliers.get(id)
    }

    /// Supplier display name, degrading to "Unknown" for dangling references.
    pub fn supplier_name(&self, supplier_id: &str) -> String {
        self.supplier(supplier_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string())
    }

    pub fn lookup_product(&self, id: &str) -> Option<ProductView> {
        self.products.get(id).map(|p| ProductView {
            product: p.clone(),
            supplier_name: self.supplier_name(&p.supplier_id),
        })
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn suppliers(&self) -> impl Iterator<Item = &Supplier> {
        self.suppliers.values()
    }

    /// Suppliers that serve a category (exact match), best rated first.
    pub fn find_suppliers(&self, category: &str) -> Vec<&Supplier> {
        let mut found: Vec<&Supplier> = self
            .suppliers
            .values()
            .filter(|s| s.categories.contains(category))
            .collect();
        found.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        found
    }

    /// Case-insensitive substring search over id, name and category.
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let needle = term.trim().to_lowercase();
        self.products
            .values()
            .filter(|p| {
                p.id.to_lowercase().contains(&needle)
                    || p.name.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Products with catalog stock strictly below `threshold`, lowest first.
    pub fn low_stock(&self, threshold: i64) -> Vec<&Product> {
        let mut low: Vec<&Product> = self
            .products
            .values()
            .filter(|p| p.stock < threshold)
            .collect();
        low.sort_by_key(|p| p.stock);
        low
    }

    /// A page of products in id order.
    pub fn page(&self, offset: usize, limit: usize) -> Vec<&Product> {
        self.products.values().skip(offset).take(limit).collect()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn total_stock_units(&self) -> i64 {
        self.products.values().map(|p| p.stock).sum()
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            product_count: self.products.len(),
            supplier_count: self.suppliers.len(),
            total_stock_units: self.total_stock_units(),
        }
    }
}
