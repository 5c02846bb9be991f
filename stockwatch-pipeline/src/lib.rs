//! Stockwatch pipeline: sale events in, stock alerts out.
//!
//! A sale event goes through a fixed sequence:
//! - `event` validates the payload into a typed `SaleEvent`
//! - `ledger` applies the sale to the in-memory stock level
//! - `alert_policy` runs the low-stock and high-value rules
//! - `dispatcher` delivers rendered alerts off the decision path
//!
//! `service::InventoryService` ties these together behind one `handle`
//! call. `reorder` and `catalog` answer on-demand questions; `simulator`
//! generates synthetic traffic.

pub mod alert_policy;
pub mod catalog;
pub mod catalog_loader;
pub mod components;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod ledger;
pub mod message;
pub mod notifier;
pub mod reorder;
pub mod service;
pub mod simulator;
pub mod types;
pub mod util;

pub use alert_policy::{AlertPolicy, AlertRule};
pub use catalog::CatalogStore;
pub use catalog_loader::{load_catalog_file, CatalogData};
pub use config::{AlertConfig, BotCredentials};
pub use dispatcher::{DispatchHandle, DispatchStats, Dispatcher};
pub use error::{PipelineError, PipelineResult};
pub use ledger::{StockFloor, StockLedger};
pub use notifier::{Notifier, OutboundMessage};
pub use reorder::ReorderCalculator;
pub use service::InventoryService;
