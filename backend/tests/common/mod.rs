//! Fixtures shared by the integration tests

#![allow(dead_code)]

use booker_ledger::services::company::CreateCompanyInput;
use booker_ledger::services::order_booker::CreateOrderBookerInput;
use booker_ledger::services::product::CreateProductInput;
use booker_ledger::{Ledger, LedgerConfig};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{OrderBooker, Product};

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A fresh, migrated in-memory ledger
pub async fn ledger() -> Ledger {
    Ledger::open(&LedgerConfig::in_memory()).await.unwrap()
}

pub async fn company(ledger: &Ledger, name: &str) -> String {
    ledger
        .companies
        .create(CreateCompanyInput {
            name: name.to_string(),
            address: Some("Mall Road, Lahore".to_string()),
            email: None,
            phone: None,
        })
        .await
        .unwrap()
        .id
}

pub async fn product(
    ledger: &Ledger,
    company_id: &str,
    name: &str,
    cost_price: i64,
    sell_price: i64,
    unit_per_carton: i64,
) -> Product {
    ledger
        .products
        .create(CreateProductInput {
            company_id: company_id.to_string(),
            name: name.to_string(),
            cost_price: dec(cost_price),
            sell_price: dec(sell_price),
            unit_per_carton,
        })
        .await
        .unwrap()
}

pub async fn booker(ledger: &Ledger, name: &str) -> OrderBooker {
    ledger
        .order_bookers
        .create(CreateOrderBookerInput {
            name: name.to_string(),
            name_urdu: "بکر".to_string(),
            phone: "0300-1234567".to_string(),
            email: None,
            join_date: Some(date(2024, 1, 1)),
            is_active: Some(true),
        })
        .await
        .unwrap()
}

/// One company, product P1 (cost 100, sell 150, 24 per carton) and booker OB1
pub struct Seed {
    pub company_id: String,
    pub product: Product,
    pub booker: OrderBooker,
}

pub async fn seed(ledger: &Ledger) -> Seed {
    let company_id = company(ledger, "National Foods").await;
    let product = product(ledger, &company_id, "P1", 100, 150, 24).await;
    let booker = booker(ledger, "OB1").await;
    Seed {
        company_id,
        product,
        booker,
    }
}
