pub mod cash_flow;
pub mod catalog;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod ledger;
pub mod models;
pub mod money;
pub mod pos;
pub mod receipt;
pub mod settings;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::Local;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::load_app_configuration;
use db::{Database, SqliteStore};

pub use error::{Error, Result, ValidationError};
pub use pos::Pos;

/// Starts the till headless: logging, configuration, database, then the
/// restored `Pos`, whose status is logged.
pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = load_app_configuration()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    info!(path = %config.database_path, "Opening till database");
    let db = Arc::new(Database::open(&config.database_path)?);
    db.initialize()?;

    let store = SqliteStore::new(db, config.store_id());
    info!(store = store.store_id().as_str(), "Using snapshot store");

    let pos = Pos::open(Box::new(store))?.with_recent_window(config.recent_window_days);

    // Status is read straight from the snapshot; the commands stay locked until sign-in.
    let state = pos.state();
    let today = pos.now().with_timezone(&Local).date_naive();
    let (orders_today, revenue_today) = state
        .orders
        .orders_on(today, &Local)
        .fold((0usize, Decimal::ZERO), |(count, sum), o| (count + 1, sum + o.total));
    info!(
        products = state.products.len(),
        date = %today,
        orders_today,
        revenue_today = %revenue_today,
        "Till ready"
    );

    match state.cash_flows.active() {
        Some(session) => {
            let totals = cash_flow::compute_totals(session, &state.orders, pos.now());
            info!(
                session_id = %session.id,
                opened_at = %session.opened_at,
                total_sales = %totals.total_sales(),
                "Cash flow session open"
            );
        }
        None => info!("No cash flow session open"),
    }

    Ok(())
}
