//! Daily entry models
//!
//! A daily entry records one booker's sales and returns for a single date.
//! Header totals are always derived from the items and never accepted as input.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Header row of a daily entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyEntry {
    pub id: String,
    pub order_booker_id: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    /// Gross sales, sold quantity times sell price
    pub total_amount: Decimal,
    /// Returned quantity times sell price
    pub total_return_amount: Decimal,
    /// `total_amount - total_return_amount`
    pub net_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product line of a daily entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyEntryItem {
    pub id: String,
    pub daily_entry_id: String,
    pub product_id: String,
    pub quantity_sold: i64,
    pub quantity_returned: i64,
    pub net_quantity: i64,
    pub cost_price_override: Option<Decimal>,
    pub sell_price_override: Option<Decimal>,
    /// Cost price in effect when the line was recorded
    pub cost_price: Decimal,
    /// Sell price in effect when the line was recorded; returns are valued at it
    pub sell_price: Decimal,
    pub total_cost: Decimal,
    pub total_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyEntryItem {
    pub fn profit(&self) -> Decimal {
        self.total_revenue - self.total_cost
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyEntryWithItems {
    #[serde(flatten)]
    pub entry: DailyEntry,
    pub items: Vec<DailyEntryItem>,
}

/// Month rollup of daily entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonthlyAnalytics {
    pub year: i32,
    pub month: u32,
    pub entries_count: i64,
    pub items_count: i64,
    pub total_amount: Decimal,
    pub total_return_amount: Decimal,
    pub net_amount: Decimal,
    pub quantity_sold: i64,
    pub quantity_returned: i64,
    pub net_quantity: i64,
    /// `net_amount / entries_count`, 0 without entries
    pub average_daily_amount: Decimal,
    /// Returned amount as a percentage of gross sales
    pub return_rate: Decimal,
    /// Returned units as a percentage of sold units
    pub quantity_return_rate: Decimal,
}
