//! Booker Ledger - Backend core
//!
//! Sales and purchase-order ledger for a distributor's field order bookers:
//! reference data, daily sales entries, orders, monthly targets and the
//! reports built from them, persisted in a single-writer SQLite database.

pub mod config;
pub mod error;
pub mod notify;
pub mod services;
pub mod storage;

pub use config::LedgerConfig;
pub use error::{AppError, AppResult};

use notify::ChangeNotifier;
use services::{
    CompanyService, DailyEntryService, MonthlyTargetService, OrderBookerService,
    OrderReportService, OrderService, ProductService, ReportingService,
};
use storage::{Database, RetryPolicy};

/// Every service wired to one database handle and one notifier
#[derive(Clone)]
pub struct Ledger {
    pub db: Database,
    pub notifier: ChangeNotifier,
    pub companies: CompanyService,
    pub products: ProductService,
    pub order_bookers: OrderBookerService,
    pub daily_entries: DailyEntryService,
    pub orders: OrderService,
    pub targets: MonthlyTargetService,
    pub reports: ReportingService,
    pub order_reports: OrderReportService,
}

impl Ledger {
    /// Build the services. The database stays closed until [`Ledger::open`].
    pub fn new(config: &LedgerConfig) -> Self {
        let db = Database::new(config.database.clone(), RetryPolicy::from(&config.retry));
        let notifier = ChangeNotifier::new(config.notifications.capacity);

        let companies = CompanyService::new(db.clone(), notifier.clone());
        let products = ProductService::new(db.clone(), notifier.clone());
        let order_bookers = OrderBookerService::new(db.clone(), notifier.clone());
        let daily_entries = DailyEntryService::new(db.clone(), notifier.clone());
        let orders = OrderService::new(db.clone(), notifier.clone());
        let order_reports = OrderReportService::new(db.clone());
        let targets = MonthlyTargetService::new(db.clone(), notifier.clone());
        let reports = ReportingService::new(
            order_bookers.clone(),
            daily_entries.clone(),
            products.clone(),
            targets.clone(),
        );

        Self {
            db,
            notifier,
            companies,
            products,
            order_bookers,
            daily_entries,
            orders,
            targets,
            reports,
            order_reports,
        }
    }

    /// Build the services and open the database
    pub async fn open(config: &LedgerConfig) -> AppResult<Self> {
        let ledger = Self::new(config);
        ledger.db.initialize().await?;
        Ok(ledger)
    }

    pub async fn close(&self) {
        self.db.shutdown().await;
    }
}
