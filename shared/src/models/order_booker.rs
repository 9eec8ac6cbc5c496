//! Order booker models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A field sales agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderBooker {
    pub id: String,
    pub name: String,
    pub name_urdu: String,
    pub phone: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub join_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booker joined with one month's target progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderBookerWithTarget {
    #[serde(flatten)]
    pub order_booker: OrderBooker,
    pub target_amount: Decimal,
    pub achieved_amount: Decimal,
    pub remaining_amount: Decimal,
    pub achievement_percentage: Decimal,
}
