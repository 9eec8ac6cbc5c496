//! Monthly target models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A booker's sales goal for one calendar month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyTarget {
    pub id: String,
    pub order_booker_id: String,
    pub year: i32,
    pub month: u32,
    pub target_amount: Decimal,
    /// Sum of the booker's daily-entry net amounts in the month
    pub achieved_amount: Decimal,
    pub remaining_amount: Decimal,
    pub achievement_percentage: Decimal,
    pub days_in_month: u32,
    pub working_days_in_month: u32,
    pub daily_target_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
