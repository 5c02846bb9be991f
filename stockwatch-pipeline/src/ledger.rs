//! In-memory stock ledger.
//!
//! Maps product id to current stock. Seeded from the catalog and mutated by
//! sale events. Each mutation is a single read-modify-write under the lock,
//! so concurrent consumers never lose updates and every caller sees the
//! value its own sale produced.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::types::{Product, StockUpdate};

/// What to do when a sale would take stock below zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum StockFloor {
    /// Plain subtraction. Oversells show up as negative stock (back-orders).
    #[default]
    Unclamped,
    /// Stop at zero.
    ClampAtZero,
}

#[derive(Debug, Default)]
pub struct StockLedger {
    levels: Mutex<HashMap<String, i64>>,
    floor: StockFloor,
}

impl StockLedger {
    pub fn new(floor: StockFloor) -> Self {
        Self {
            levels: Mutex::new(HashMap::new()),
            floor,
        }
    }

    /// Seed (or re-seed) stock for the given products. Products not listed
    /// keep their current entry; unknown ids stay absent.
    pub fn seed<'a, I>(&self, products: I) -> usize
    where
        I: IntoIterator<Item = &'a Product>,
    {
        let mut levels = self.lock();
        let mut count = 0;
        for product in products {
            levels.insert(product.id.clone(), product.stock);
            count += 1;
        }
        count
    }

    /// Decrement stock for a sale. Untracked products are left alone and
    /// no entry is created for them.
    pub fn apply_sale(&self, product_id: &str, quantity: u32) -> StockUpdate {
        let mut levels = self.lock();
        match levels.get_mut(product_id) {
            Some(level) => {
                let previous = *level;
                let mut remaining = previous - i64::from(quantity);
                if self.floor == StockFloor::ClampAtZero && remaining < 0 {
                    remaining = 0;
                }
                *level = remaining;
                StockUpdate::Applied {
                    previous,
                    remaining,
                }
            }
            None => StockUpdate::Untracked,
        }
    }

    /// Add received units to a tracked product. Returns the new level.
    pub fn restock(&self, product_id: &str, quantity: u32) -> Option<i64> {
        let mut levels = self.lock();
        levels.get_mut(product_id).map(|level| {
            *level += i64::from(quantity);
            *level
        })
    }

    pub fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.lock().get(product_id).copied()
    }

    pub fn is_tracked(&self, product_id: &str) -> bool {
        self.lock().contains_key(product_id)
    }

    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    pub fn floor(&self) -> StockFloor {
        self.floor
    }

    /// Copy of all levels, sorted by product id.
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        let mut levels: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, level)| (id.clone(), *level))
            .collect();
        levels.sort_by(|a, b| a.0.cmp(&b.0));
        levels
    }

    // A panic while holding the guard cannot leave a half-written level,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.levels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
