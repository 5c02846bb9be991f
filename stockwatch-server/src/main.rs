//! # stockwatch-server
//!
//! Command-line host for the stockwatch pipeline.
//!
//! ```bash
//! # Process newline-delimited sale events (bare JSON or Pub/Sub envelopes)
//! stockwatch-server --catalog knowledge_base/products.json process events.ndjson
//! cat events.ndjson | stockwatch-server process
//!
//! # Generate synthetic sales and run them through the alert pipeline
//! stockwatch-server simulate --interval 2 --count 20
//!
//! # Catalog queries
//! stockwatch-server reorder SKU005 --stock 2 --urgency high --notify
//! stockwatch-server low-stock --threshold 15 --json
//! ```
//!
//! Messaging credentials come from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`
//! (or the `--config` file). Without them alerts are computed and logged
//! as skipped.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use stockwatch_pipeline::catalog::DEFAULT_LISTING_THRESHOLD;
use stockwatch_pipeline::catalog_loader::demo_catalog;
use stockwatch_pipeline::components::telegram_notifier::TelegramNotifier;
use stockwatch_pipeline::message;
use stockwatch_pipeline::simulator::{ConsoleSink, EventSimulator, SimulatorConfig};
use stockwatch_pipeline::types::{DispatchOutcome, ProcessingOutcome, StockUpdate, Urgency};
use stockwatch_pipeline::{
    load_catalog_file, AlertConfig, CatalogData, DispatchStats, Dispatcher, InventoryService,
};

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "stockwatch-server")]
#[command(about = "Real-time stock and high-value sale alerts")]
#[command(version)]
struct Cli {
    /// Catalog file (.json or .csv). A small built-in catalog is used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "knowledge_base/products.json")]
    catalog: PathBuf,

    /// JSON config file; environment variables override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process newline-delimited sale events from a file or stdin
    Process {
        /// Event file; reads stdin when omitted
        input: Option<PathBuf>,
    },
    /// Generate synthetic sale events
    Simulate {
        /// Mean seconds between events (jittered by +/-50%)
        #[arg(long, default_value_t = 1.0)]
        interval: f64,
        /// Stop after this many events; runs until Ctrl-C otherwise
        #[arg(long)]
        count: Option<u64>,
        /// Only print the generated events, do not run the alert pipeline
        #[arg(long)]
        publish_only: bool,
        /// Seed for a reproducible event stream
        #[arg(long)]
        seed: Option<u64>,
        /// Comma-separated store ids to sell from
        #[arg(long, value_delimiter = ',')]
        stores: Vec<String>,
    },
    /// Reorder recommendation for one product
    Reorder {
        sku: String,
        /// Current stock; defaults to the catalog value
        #[arg(long)]
        stock: Option<i64>,
        /// low, normal or high
        #[arg(long, default_value = "normal")]
        urgency: String,
        /// Also send the recommendation as a chat message
        #[arg(long)]
        notify: bool,
    },
    /// Products whose stock is below a threshold
    LowStock {
        #[arg(long, default_value_t = DEFAULT_LISTING_THRESHOLD)]
        threshold: i64,
    },
    /// Suppliers serving a category, or every supplier when none is given
    Suppliers { category: Option<String> },
    /// Case-insensitive search over product names, categories and ids
    Search { term: String },
    /// Full record for one product
    Lookup { sku: String },
    /// Page through the catalog in id order
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Catalog totals
    Stats,
}

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunSummaryJson {
    finished_at: String,
    events: u64,
    service: stockwatch_pipeline::service::ServiceStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispatch: Option<DispatchStats>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<AlertConfig> {
    let config = match path {
        Some(path) => AlertConfig::from_file_and_env(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AlertConfig::from_env().context("reading configuration from environment")?,
    };
    Ok(config)
}

fn load_catalog(path: &Path) -> Result<CatalogData> {
    if !path.exists() {
        log::warn!(
            "catalog {} not found, using the built-in demo catalog",
            path.display()
        );
        return Ok(demo_catalog());
    }
    let data =
        load_catalog_file(path).with_context(|| format!("loading catalog {}", path.display()))?;
    log::info!(
        "loaded {} products and {} suppliers from {}",
        data.products.len(),
        data.suppliers.len(),
        path.display()
    );
    Ok(data)
}

/// The service plus the dispatch worker it feeds, if messaging is configured.
struct Runtime {
    service: InventoryService,
    worker: Option<JoinHandle<DispatchStats>>,
}

impl Runtime {
    fn start(cli: &Cli) -> Result<Self> {
        let config = load_config(cli.config.as_deref())?;
        let data = load_catalog(&cli.catalog)?;

        let (handle, worker) = match config.credentials() {
            Some(credentials) => {
                let notifier =
                    TelegramNotifier::new(&config.api_base, credentials, config.dispatch_timeout)
                        .context("building messaging client")?;
                let (handle, worker) =
                    Dispatcher::from_config(Arc::new(notifier), &config).spawn();
                (Some(handle), Some(worker))
            }
            None => {
                log::warn!(
                    "TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, alerts will not be sent"
                );
                (None, None)
            }
        };

        Ok(Self {
            service: InventoryService::new(data, &config, handle),
            worker,
        })
    }

    /// Close the outbound queue and wait for queued messages to drain.
    async fn shutdown(self) -> Result<Option<DispatchStats>> {
        let Runtime { service, worker } = self;
        drop(service);
        match worker {
            Some(worker) => {
                let stats = worker.await.context("dispatch worker panicked")?;
                log::info!(
                    "dispatch finished: {} delivered, {} failed",
                    stats.delivered,
                    stats.failed
                );
                Ok(Some(stats))
            }
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn read_input(input: Option<&Path>) -> Result<String> {
    let mut buf = String::new();
    match input {
        Some(path) => {
            buf = std::fs::read_to_string(path)
                .with_context(|| format!("reading events from {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading events from stdin")?;
        }
    }
    Ok(buf)
}

fn describe_outcome(outcome: &ProcessingOutcome) -> String {
    let result = match outcome {
        ProcessingOutcome::Processed(result) => result,
        ProcessingOutcome::Dropped { reason } => return format!("\u{274c} dropped: {}", reason),
    };
    let stock = match result.stock {
        StockUpdate::Applied { remaining, .. } => format!("stock {}", remaining),
        StockUpdate::Untracked => "untracked".to_string(),
    };
    let alerts: Vec<String> = result
        .alerts
        .iter()
        .map(|a| a.alert_type.to_string())
        .collect();
    let dispatch = match result.dispatch {
        DispatchOutcome::Nothing => String::new(),
        DispatchOutcome::Queued(n) => format!(" ({} queued)", n),
        DispatchOutcome::Skipped(n) => format!(" ({} skipped)", n),
    };
    if alerts.is_empty() {
        format!("\u{2705} {} {}", result.transaction_id, stock)
    } else {
        format!(
            "\u{1f6a8} {} {} alerts: {}{}",
            result.transaction_id,
            stock,
            alerts.join(", "),
            dispatch
        )
    }
}

async fn run_process(cli: &Cli, input: Option<&Path>) -> Result<()> {
    let payloads = read_input(input)?;
    let runtime = Runtime::start(cli)?;

    let mut outcomes = Vec::new();
    for line in payloads.lines().filter(|l| !l.trim().is_empty()) {
        let outcome = runtime.service.handle_payload(line.as_bytes());
        if !cli.json {
            println!("{}", describe_outcome(&outcome));
        }
        outcomes.push(outcome);
    }

    let service_stats = runtime.service.stats();
    let dispatch = runtime.shutdown().await?;
    if cli.json {
        print_json(&serde_json::json!({
            "outcomes": outcomes,
            "summary": RunSummaryJson {
                finished_at: Utc::now().to_rfc3339(),
                events: outcomes.len() as u64,
                service: service_stats,
                dispatch,
            },
        }))?;
    } else {
        print_summary(outcomes.len() as u64, &service_stats, dispatch.as_ref());
    }
    Ok(())
}

fn print_summary(
    events: u64,
    stats: &stockwatch_pipeline::service::ServiceStats,
    dispatch: Option<&DispatchStats>,
) {
    println!();
    println!("Events read:      {}", events);
    println!("Processed:        {}", stats.events_processed);
    println!("Dropped:          {}", stats.events_dropped);
    println!("Untracked:        {}", stats.untracked_events);
    println!("Alerts raised:    {}", stats.alerts_raised);
    match dispatch {
        Some(d) => println!(
            "Alerts delivered: {} ({} failed, {} dropped on a full queue)",
            d.delivered, d.failed, d.dropped
        ),
        None => println!("Alerts skipped:   {}", stats.alerts_skipped),
    }
}

async fn run_simulate(
    cli: &Cli,
    interval: f64,
    count: Option<u64>,
    publish_only: bool,
    seed: Option<u64>,
    stores: &[String],
) -> Result<()> {
    if !interval.is_finite() || interval < 0.0 {
        bail!("--interval must be a non-negative number of seconds");
    }
    let config = SimulatorConfig {
        interval: Duration::from_secs_f64(interval),
        count,
    };
    let simulator = match seed {
        Some(seed) => EventSimulator::seeded(seed),
        None => EventSimulator::new(),
    };
    let mut simulator = simulator.with_stores(stores.to_vec());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, stopping simulator");
            let _ = shutdown_tx.send(true);
        }
    });

    if publish_only {
        let catalog = load_catalog(&cli.catalog)?.products;
        let sent = simulator.run(&catalog, &config, &ConsoleSink, shutdown_rx).await;
        println!("\u{2705} published {} events", sent);
        return Ok(());
    }

    let runtime = Runtime::start(cli)?;
    let catalog: Vec<_> = runtime.service.catalog().products().cloned().collect();
    let sent = simulator.run(&catalog, &config, &runtime.service, shutdown_rx).await;

    let service_stats = runtime.service.stats();
    let dispatch = runtime.shutdown().await?;
    if cli.json {
        print_json(&RunSummaryJson {
            finished_at: Utc::now().to_rfc3339(),
            events: sent,
            service: service_stats,
            dispatch,
        })?;
    } else {
        print_summary(sent, &service_stats, dispatch.as_ref());
    }
    Ok(())
}

async fn run_reorder(
    cli: &Cli,
    sku: &str,
    stock: Option<i64>,
    urgency: &str,
    notify: bool,
) -> Result<()> {
    let runtime = Runtime::start(cli)?;
    let rec = runtime
        .service
        .recommend_reorder(sku, stock, Urgency::parse(urgency))?;

    if cli.json {
        print_json(&rec)?;
    } else {
        println!("{}", message::format_recommendation(&rec));
    }

    if notify {
        if !runtime.service.dispatch_enabled() {
            log::warn!("--notify given but messaging credentials are not configured");
        } else if !runtime.service.notify_reorder(&rec) {
            log::warn!("reorder message for {} was not queued", rec.product_id);
        }
    }
    runtime.shutdown().await?;
    Ok(())
}

fn run_query(cli: &Cli, command: &Command) -> Result<()> {
    let mut catalog_store = stockwatch_pipeline::CatalogStore::new();
    let data = load_catalog(&cli.catalog)?;
    catalog_store.upsert_suppliers(data.suppliers);
    catalog_store.upsert_products(data.products);
    let catalog = &catalog_store;

    match command {
        Command::LowStock { threshold } => {
            let products = catalog.low_stock(*threshold);
            if cli.json {
                return print_json(&products);
            }
            if products.is_empty() {
                println!("\u{2705} No products below {} units", threshold);
            }
            for p in products {
                println!("\u{26a0}\u{fe0f} {} ({}): {} units", p.name, p.id, p.stock);
            }
        }
        Command::Suppliers { category } => {
            let suppliers = match category {
                Some(category) => catalog.find_suppliers(category),
                None => catalog.suppliers().collect(),
            };
            if cli.json {
                return print_json(&suppliers);
            }
            if suppliers.is_empty() {
                println!(
                    "No suppliers found for category '{}'",
                    category.as_deref().unwrap_or("*")
                );
            }
            for s in suppliers {
                println!("{}\n", message::format_supplier(s));
            }
        }
        Command::Search { term } => {
            let products = catalog.search(term);
            if cli.json {
                return print_json(&products);
            }
            if products.is_empty() {
                println!("No products match '{}'", term);
            }
            for p in products {
                println!(
                    "{} | {} | {} | ${:.2} | {} units",
                    p.id, p.name, p.category, p.base_price, p.stock
                );
            }
        }
        Command::Lookup { sku } => {
            let Some(view) = catalog.lookup_product(sku) else {
                bail!("product {} not found", sku);
            };
            if cli.json {
                return print_json(&view);
            }
            println!("{}", message::format_product(&view));
        }
        Command::List { offset, limit } => {
            let products = catalog.page(*offset, *limit);
            if cli.json {
                return print_json(&products);
            }
            for p in products {
                println!("{} | {} | {} units", p.id, p.name, p.stock);
            }
        }
        Command::Stats => {
            let stats = catalog.stats();
            if cli.json {
                return print_json(&stats);
            }
            println!("Products:    {}", stats.product_count);
            println!("Suppliers:   {}", stats.supplier_count);
            println!("Stock units: {}", stats.total_stock_units);
        }
        Command::Process { .. } | Command::Simulate { .. } | Command::Reorder { .. } => {
            bail!("not a catalog query")
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Process { input } => run_process(&cli, input.as_deref()).await,
        Command::Simulate {
            interval,
            count,
            publish_only,
            seed,
            stores,
        } => run_simulate(&cli, *interval, *count, *publish_only, *seed, stores).await,
        Command::Reorder {
            sku,
            stock,
            urgency,
            notify,
        } => run_reorder(&cli, sku, *stock, urgency, *notify).await,
        other => run_query(&cli, other),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "stockwatch-server",
            "low-stock",
            "--threshold",
            "8",
            "--json",
            "--catalog",
            "cat.csv",
        ]);
        assert!(cli.json);
        assert_eq!(cli.catalog, PathBuf::from("cat.csv"));
        assert!(matches!(cli.command, Command::LowStock { threshold: 8 }));
    }

    #[test]
    fn simulate_accepts_store_list_and_bare_suppliers() {
        let cli = Cli::parse_from([
            "stockwatch-server",
            "simulate",
            "--count",
            "3",
            "--stores",
            "Berlin_01,Online_Store",
        ]);
        match cli.command {
            Command::Simulate { count, stores, .. } => {
                assert_eq!(count, Some(3));
                assert_eq!(stores, vec!["Berlin_01", "Online_Store"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = Cli::parse_from(["stockwatch-server", "suppliers"]);
        assert!(matches!(cli.command, Command::Suppliers { category: None }));
    }

    #[test]
    fn dropped_outcome_is_described() {
        let outcome = ProcessingOutcome::Dropped {
            reason: "bad".to_string(),
        };
        assert!(describe_outcome(&outcome).contains("dropped: bad"));
    }
}
