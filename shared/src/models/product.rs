//! Product models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::{carton_breakdown, fractional_cartons, CartonBreakdown};

/// A product sold in cartons of `unit_per_carton` units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub cost_price: Decimal,
    pub sell_price: Decimal,
    pub unit_per_carton: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit margin at list prices
    pub fn unit_margin(&self) -> Decimal {
        self.sell_price - self.cost_price
    }

    /// Fractional carton count for a unit quantity
    pub fn cartons(&self, units: i64) -> Decimal {
        fractional_cartons(units, self.unit_per_carton)
    }

    /// Whole cartons plus loose units
    pub fn breakdown(&self, units: i64) -> CartonBreakdown {
        carton_breakdown(units, self.unit_per_carton)
    }
}
