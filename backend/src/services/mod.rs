//! Query and command services for the ledger entities

pub mod company;
pub mod daily_entry;
pub mod monthly_target;
pub mod order;
pub mod order_booker;
pub mod order_report;
pub mod product;
pub mod reporting;

pub use company::CompanyService;
pub use daily_entry::DailyEntryService;
pub use monthly_target::MonthlyTargetService;
pub use order::OrderService;
pub use order_booker::OrderBookerService;
pub use order_report::OrderReportService;
pub use product::ProductService;
pub use reporting::ReportingService;

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::error::{AppError, AppResult};

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Lift a shared validation rule into an `AppError` for `field`
pub(crate) fn rule(field: &'static str, result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|message| AppError::validation(field, message))
}

pub(crate) fn non_blank(field: &'static str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, format!("{} is required", field)));
    }
    Ok(())
}

/// Tables other rows point at
#[derive(Debug, Clone, Copy)]
pub(crate) enum Referenced {
    Company,
    Product,
    OrderBooker,
}

impl Referenced {
    fn sql(&self) -> &'static str {
        match self {
            Referenced::Company => "SELECT 1 FROM companies WHERE id = ?",
            Referenced::Product => "SELECT 1 FROM products WHERE id = ?",
            Referenced::OrderBooker => "SELECT 1 FROM order_bookers WHERE id = ?",
        }
    }

    pub(crate) fn entity(&self) -> &'static str {
        match self {
            Referenced::Company => "company",
            Referenced::Product => "product",
            Referenced::OrderBooker => "order booker",
        }
    }
}

/// Fail with `ReferenceNotFound` unless the referenced row exists
pub(crate) async fn ensure_reference<'e, E>(executor: E, table: Referenced, id: &str) -> AppResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found = sqlx::query_scalar::<_, i64>(table.sql())
        .bind(id)
        .fetch_optional(executor)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::ReferenceNotFound {
            entity: table.entity(),
            id: id.to_string(),
        }),
    }
}
