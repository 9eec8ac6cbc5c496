//! Order models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::OrderItemTotals;

/// Purchase order header; every total is the sum of its items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub order_booker_id: String,
    pub order_date: NaiveDate,
    pub supply_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub total_amount: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub return_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fulfilment state of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Supplied,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Supplied => "supplied",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "supplied" => Some(OrderStatus::Supplied),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Supplied => write!(f, "Supplied"),
            OrderStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// One product line of an order. `quantity` is in units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub sell_price: Decimal,
    pub total_cost: Decimal,
    pub total_amount: Decimal,
    pub profit: Decimal,
    pub cartons: Decimal,
    pub return_quantity: i64,
    pub return_amount: Decimal,
    pub return_cartons: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// The derived columns of this line
    pub fn totals(&self) -> OrderItemTotals {
        OrderItemTotals {
            total_cost: self.total_cost,
            total_amount: self.total_amount,
            profit: self.profit,
            cartons: self.cartons,
            return_amount: self.return_amount,
            return_cartons: self.return_cartons,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Rollup over a filtered set of orders
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub total_orders: i64,
    pub total_amount: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_cartons: Decimal,
    pub return_amount: Decimal,
    pub pending_orders: i64,
    pub supplied_orders: i64,
    pub completed_orders: i64,
}

impl OrderSummary {
    pub fn add(&mut self, order: &Order) {
        self.total_orders += 1;
        self.total_amount += order.total_amount;
        self.total_cost += order.total_cost;
        self.total_profit += order.total_profit;
        self.total_cartons += order.total_cartons;
        self.return_amount += order.return_amount;
        match order.status {
            OrderStatus::Pending => self.pending_orders += 1,
            OrderStatus::Supplied => self.supplied_orders += 1,
            OrderStatus::Completed => self.completed_orders += 1,
        }
    }
}
