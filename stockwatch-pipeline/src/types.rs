use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// A product as held by the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub base_price: f64,
    /// Units on hand at catalog load time.
    pub stock: i64,
    pub supplier_id: String,
    pub reorder_point: u32,
    pub lead_time_days: u32,
    #[serde(default)]
    pub description: String,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: "Unknown".to_string(),
            category: "Miscellaneous".to_string(),
            base_price: 0.0,
            stock: 0,
            supplier_id: "Unknown".to_string(),
            reorder_point: 10,
            lead_time_days: 7,
            description: String::new(),
        }
    }
}

/// A supplier record. Products point at suppliers by id only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub categories: BTreeSet<String>,
    pub avg_lead_time_days: u32,
    /// Rating on a 0-5 scale.
    pub rating: f64,
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A validated point-of-sale event. Built once at the ingestion boundary
/// (see `event`), passed around fully typed afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SaleEvent {
    pub transaction_id: String,
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub store_id: String,
    pub quantity: u32,
    pub price: f64,
    pub total: f64,
    /// ISO-8601 timestamp as received (or assigned at ingestion).
    pub timestamp: String,
}

/// Result of applying a sale to the stock ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StockUpdate {
    /// The product is tracked; its stock moved from `previous` to `remaining`.
    Applied { previous: i64, remaining: i64 },
    /// The product is not tracked by the ledger. Nothing was changed.
    Untracked,
}

impl StockUpdate {
    /// Post-sale stock, if the product is tracked.
    pub fn remaining(&self) -> Option<i64> {
        match self {
            StockUpdate::Applied { remaining, .. } => Some(*remaining),
            StockUpdate::Untracked => None,
        }
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, StockUpdate::Applied { .. })
    }
}

// ---------------------------------------------------------------------------
// Alert types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AlertType {
    LowStock,
    HighValue,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertType::LowStock => write!(f, "LOW_STOCK"),
            AlertType::HighValue => write!(f, "HIGH_VALUE"),
        }
    }
}

/// An alert produced by the policy engine for a single sale event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub emoji: String,
    pub title: String,
    pub detail_lines: Vec<String>,
}

// ---------------------------------------------------------------------------
// Reorder types
// ---------------------------------------------------------------------------

/// How aggressively to size a reorder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
}

impl Urgency {
    /// Parse a free-form urgency label. Anything unrecognised is `Normal`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => Urgency::Low,
            "high" => Urgency::High,
            _ => Urgency::Normal,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Urgency::Low => 1.0,
            Urgency::Normal => 1.5,
            Urgency::High => 2.0,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Low => write!(f, "low"),
            Urgency::Normal => write!(f, "normal"),
            Urgency::High => write!(f, "high"),
        }
    }
}

/// Where current stock sits relative to the reorder point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ReorderStatus {
    Urgent,
    Warning,
    Adequate,
}

impl fmt::Display for ReorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderStatus::Urgent => write!(f, "\u{1f6a8} URGENT: Below reorder point!"),
            ReorderStatus::Warning => {
                write!(f, "\u{26a0}\u{fe0f} WARNING: Approaching reorder point")
            }
            ReorderStatus::Adequate => write!(f, "\u{2705} Stock levels adequate"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReorderRecommendation {
    pub product_id: String,
    pub product_name: String,
    pub current_stock: i64,
    pub reorder_point: u32,
    pub urgency: Urgency,
    pub status: ReorderStatus,
    pub recommended_qty: u32,
    pub supplier_id: String,
    pub supplier_name: String,
    pub lead_time_days: u32,
    pub estimated_cost: f64,
}

// ---------------------------------------------------------------------------
// Processing results
// ---------------------------------------------------------------------------

/// What happened to the alerts of one event on the way out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DispatchOutcome {
    /// No alerts fired.
    Nothing,
    /// Alerts were handed to the outbound queue.
    Queued(usize),
    /// Alerts fired but dispatch is disabled (no credentials).
    Skipped(usize),
}

/// Result of handling one well-formed sale event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessingResult {
    pub transaction_id: String,
    pub stock: StockUpdate,
    pub alerts: Vec<Alert>,
    pub dispatch: DispatchOutcome,
}

/// Result of handling a raw transport payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ProcessingOutcome {
    Processed(ProcessingResult),
    /// The payload could not be turned into a `SaleEvent` and was dropped.
    Dropped { reason: String },
}

impl ProcessingOutcome {
    pub fn processed(&self) -> Option<&ProcessingResult> {
        match self {
            ProcessingOutcome::Processed(result) => Some(result),
            ProcessingOutcome::Dropped { .. } => None,
        }
    }
}
