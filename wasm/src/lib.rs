//! WebAssembly module for the booker ledger
//!
//! Provides client-side computation for:
//! - Carton / unit conversion
//! - Order and daily-entry line totals
//! - Target achievement and performance tiers
//! - Form validation before anything reaches the database

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::calculations::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("booker ledger calculations loaded"));
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn check_line(quantity: i64, return_quantity: i64, cost_price: Decimal, sell_price: Decimal) -> Result<(), &'static str> {
    validate_order_quantity(quantity, return_quantity)?;
    validate_price(cost_price)?;
    validate_price(sell_price)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}

/// Split a unit quantity into `{ cartons, remainder }`
#[wasm_bindgen]
pub fn calculate_carton_breakdown(units: i32, unit_per_carton: i32) -> Result<String, JsValue> {
    to_json(&carton_breakdown(units.into(), unit_per_carton.into()))
}

#[wasm_bindgen]
pub fn calculate_units_from_cartons(cartons: i32, unit_per_carton: i32) -> f64 {
    units_from_cartons(cartons.into(), unit_per_carton.into()) as f64
}

/// Whole cartons needed to ship `units`, partial cartons rounded up
#[wasm_bindgen]
pub fn calculate_cartons_needed(units: i32, unit_per_carton: i32) -> f64 {
    cartons_needed(units.into(), unit_per_carton.into()) as f64
}

#[wasm_bindgen]
pub fn calculate_fractional_cartons(units: i32, unit_per_carton: i32) -> f64 {
    to_f64(fractional_cartons(units.into(), unit_per_carton.into()))
}

#[derive(Debug, Deserialize)]
struct OrderLine {
    quantity: i64,
    cost_price: Decimal,
    sell_price: Decimal,
    unit_per_carton: i64,
    #[serde(default)]
    return_quantity: i64,
}

/// Totals of one order line from
/// `{ quantity, cost_price, sell_price, unit_per_carton, return_quantity? }`
#[wasm_bindgen]
pub fn calculate_order_line(line_json: &str) -> Result<String, JsValue> {
    let line: OrderLine = serde_json::from_str(line_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid order line JSON: {}", e)))?;
    check_line(line.quantity, line.return_quantity, line.cost_price, line.sell_price).map_err(JsValue::from_str)?;

    to_json(&order_item_totals(
        line.quantity,
        line.cost_price,
        line.sell_price,
        line.unit_per_carton,
        line.return_quantity,
    ))
}

/// Header totals for a list of order lines
#[wasm_bindgen]
pub fn calculate_order_totals(lines_json: &str) -> Result<String, JsValue> {
    let lines: Vec<OrderLine> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid order lines JSON: {}", e)))?;

    let mut totals = Vec::with_capacity(lines.len());
    for l in &lines {
        check_line(l.quantity, l.return_quantity, l.cost_price, l.sell_price).map_err(JsValue::from_str)?;
        totals.push(order_item_totals(l.quantity, l.cost_price, l.sell_price, l.unit_per_carton, l.return_quantity));
    }
    to_json(&OrderTotals::from_lines(&totals))
}

/// Totals of one daily-entry line
#[wasm_bindgen]
pub fn calculate_daily_entry_line(
    quantity_sold: i32,
    quantity_returned: i32,
    cost_price: f64,
    sell_price: f64,
) -> Result<String, JsValue> {
    validate_sold_and_returned(quantity_sold.into(), quantity_returned.into()).map_err(JsValue::from_str)?;
    let (cost_price, sell_price) = (to_decimal(cost_price), to_decimal(sell_price));
    validate_price(cost_price).map_err(JsValue::from_str)?;
    validate_price(sell_price).map_err(JsValue::from_str)?;
    to_json(&daily_entry_item_totals(
        quantity_sold.into(),
        quantity_returned.into(),
        cost_price,
        sell_price,
    ))
}

#[wasm_bindgen]
pub fn calculate_achievement(achieved: f64, target: f64) -> f64 {
    to_f64(achievement_percentage(to_decimal(achieved), to_decimal(target)))
}

/// Target per working day of the given month
#[wasm_bindgen]
pub fn calculate_daily_target(target_amount: f64, year: i32, month: u32) -> Result<f64, JsValue> {
    let period = YearMonth::new(year, month).ok_or_else(|| JsValue::from_str("Month must be between 1 and 12"))?;
    let working = working_days(period.days());
    Ok(to_f64(daily_target(to_decimal(target_amount), working)))
}

#[wasm_bindgen]
pub fn calculate_growth_rate(current: f64, previous: f64) -> f64 {
    to_f64(growth_rate(to_decimal(current), to_decimal(previous)))
}

/// Performance tier label for an achievement percentage
#[wasm_bindgen]
pub fn classify_performance(achievement: f64) -> String {
    format!("{}", PerformanceStatus::from_achievement(to_decimal(achievement)))
}

#[wasm_bindgen]
pub fn validate_entry_quantities(quantity_sold: i32, quantity_returned: i32) -> bool {
    validate_sold_and_returned(quantity_sold.into(), quantity_returned.into()).is_ok()
}

#[wasm_bindgen]
pub fn validate_phone_number(phone: &str) -> bool {
    validate_phone(phone).is_ok()
}

/// Check a `YYYY-MM` month string
#[wasm_bindgen]
pub fn validate_month_string(value: &str) -> bool {
    value.parse::<YearMonth>().is_ok()
}

/// The current month as `YYYY-MM`, from the browser clock
#[wasm_bindgen]
pub fn current_month() -> String {
    let now = js_sys::Date::new_0();
    format!("{:04}-{:02}", now.get_full_year(), now.get_month() + 1)
}
