//! Booker Ledger - command line entry point
//!
//! Opens (and migrates) the ledger database, prints the monthly analytics and
//! month-over-month comparison for the current month or a `YYYY-MM` argument,
//! then closes the database.

use anyhow::Context;
use booker_ledger::{Ledger, LedgerConfig};
use chrono::Utc;
use shared::YearMonth;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booker_ledger=debug,ledger=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = LedgerConfig::load()?;

    tracing::info!("Starting Booker Ledger");
    tracing::info!("Environment: {}", config.environment);

    let period = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<YearMonth>()
            .with_context(|| format!("invalid month argument `{}`", arg))?,
        None => YearMonth::of(Utc::now().date_naive()),
    };

    let ledger = Ledger::open(&config).await?;
    let outcome = report(&ledger, period).await;
    ledger.close().await;
    outcome
}

async fn report(ledger: &Ledger, period: YearMonth) -> anyhow::Result<()> {
    let analytics = ledger
        .daily_entries
        .monthly_analytics(period.year, period.month)
        .await?;
    println!("{}", serde_json::to_string_pretty(&analytics)?);

    let comparison = ledger
        .reports
        .comparison_report(period.year, period.month)
        .await?;
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}
