//! Ledger arithmetic
//!
//! Pure functions turning raw quantities and prices into line totals, header
//! totals and rollups. Every rate or average divides through [`safe_div`], so a
//! zero divisor yields 0 instead of panicking. Products saturate at the
//! `Decimal` bounds; inputs are kept far below them by the validation rules.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::models::{DailyEntry, MonthlyAnalytics, TrendDirection};

/// Decimal places kept for fractional carton counts
pub const CARTON_SCALE: u32 = 4;

/// Net-sales growth beyond which a trend counts as up or down
pub const TREND_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

// ============================================================================
// Division helpers
// ============================================================================

/// `numerator / denominator`, or 0 when the denominator is 0
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// `part / whole * 100`, or 0 when `whole` is 0
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    match part.checked_mul(Decimal::ONE_HUNDRED) {
        Some(scaled) => safe_div(scaled, whole),
        None => safe_div(part, whole).saturating_mul(Decimal::ONE_HUNDRED),
    }
}

// ============================================================================
// Carton / unit conversion
// ============================================================================

/// Whole cartons and loose units for a unit quantity
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartonBreakdown {
    pub cartons: i64,
    pub remainder: i64,
}

pub fn units_from_cartons(cartons: i64, unit_per_carton: i64) -> i64 {
    cartons.saturating_mul(unit_per_carton)
}

/// Floor division into whole cartons. A `unit_per_carton` below 1 yields no
/// cartons and leaves every unit as remainder.
pub fn carton_breakdown(units: i64, unit_per_carton: i64) -> CartonBreakdown {
    if unit_per_carton < 1 {
        return CartonBreakdown {
            cartons: 0,
            remainder: units,
        };
    }
    CartonBreakdown {
        cartons: units.div_euclid(unit_per_carton),
        remainder: units.rem_euclid(unit_per_carton),
    }
}

/// Cartons required to ship `units`, rounding any partial carton up
pub fn cartons_needed(units: i64, unit_per_carton: i64) -> i64 {
    if unit_per_carton < 1 || units <= 0 {
        return 0;
    }
    let breakdown = carton_breakdown(units, unit_per_carton);
    if breakdown.remainder > 0 {
        breakdown.cartons + 1
    } else {
        breakdown.cartons
    }
}

/// `units / unit_per_carton` rounded to [`CARTON_SCALE`] places
pub fn fractional_cartons(units: i64, unit_per_carton: i64) -> Decimal {
    if unit_per_carton < 1 {
        return Decimal::ZERO;
    }
    safe_div(Decimal::from(units), Decimal::from(unit_per_carton)).round_dp(CARTON_SCALE)
}

// ============================================================================
// Order lines
// ============================================================================

/// Derived columns of one order line
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderItemTotals {
    pub total_cost: Decimal,
    pub total_amount: Decimal,
    pub profit: Decimal,
    pub cartons: Decimal,
    pub return_amount: Decimal,
    pub return_cartons: Decimal,
}

pub fn order_item_totals(
    quantity: i64,
    cost_price: Decimal,
    sell_price: Decimal,
    unit_per_carton: i64,
    return_quantity: i64,
) -> OrderItemTotals {
    let qty = Decimal::from(quantity);
    let total_cost = qty.saturating_mul(cost_price);
    let total_amount = qty.saturating_mul(sell_price);
    OrderItemTotals {
        total_cost,
        total_amount,
        profit: total_amount.saturating_sub(total_cost),
        cartons: fractional_cartons(quantity, unit_per_carton),
        return_amount: Decimal::from(return_quantity).saturating_mul(sell_price),
        return_cartons: fractional_cartons(return_quantity, unit_per_carton),
    }
}

/// Order header totals, the running sum of its lines
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub return_amount: Decimal,
}

impl OrderTotals {
    pub fn add(&mut self, line: &OrderItemTotals) {
        self.total_amount += line.total_amount;
        self.total_cost += line.total_cost;
        self.total_cartons += line.cartons;
        self.return_cartons += line.return_cartons;
        self.return_amount += line.return_amount;
        self.total_profit = self.total_amount - self.total_cost;
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a OrderItemTotals>) -> Self {
        let mut totals = Self::default();
        for line in lines {
            totals.add(line);
        }
        totals
    }
}

// ============================================================================
// Daily entry lines
// ============================================================================

/// Derived columns of one daily-entry line
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DailyEntryItemTotals {
    pub net_quantity: i64,
    /// Net quantity times cost price
    pub total_cost: Decimal,
    /// Net quantity times sell price
    pub total_revenue: Decimal,
    /// Sold quantity times sell price, feeds the header gross
    pub gross_amount: Decimal,
    /// Returned quantity times sell price
    pub return_amount: Decimal,
}

pub fn daily_entry_item_totals(
    quantity_sold: i64,
    quantity_returned: i64,
    cost_price: Decimal,
    sell_price: Decimal,
) -> DailyEntryItemTotals {
    let net_quantity = quantity_sold - quantity_returned;
    let net = Decimal::from(net_quantity);
    DailyEntryItemTotals {
        net_quantity,
        total_cost: net.saturating_mul(cost_price),
        total_revenue: net.saturating_mul(sell_price),
        gross_amount: Decimal::from(quantity_sold).saturating_mul(sell_price),
        return_amount: Decimal::from(quantity_returned).saturating_mul(sell_price),
    }
}

/// Daily entry header totals
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DailyEntryTotals {
    pub total_amount: Decimal,
    pub total_return_amount: Decimal,
    pub net_amount: Decimal,
}

impl DailyEntryTotals {
    pub fn add(&mut self, line: &DailyEntryItemTotals) {
        self.total_amount += line.gross_amount;
        self.total_return_amount += line.return_amount;
        self.net_amount = self.total_amount - self.total_return_amount;
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a DailyEntryItemTotals>) -> Self {
        lines.into_iter().fold(Self::default(), |mut totals, line| {
            totals.add(line);
            totals
        })
    }
}

// ============================================================================
// Rollups
// ============================================================================

/// Item quantity sums for a set of entries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuantityTotals {
    pub items: i64,
    pub sold: i64,
    pub returned: i64,
}

/// Roll a month of entries up into [`MonthlyAnalytics`]
pub fn aggregate_monthly(
    year: i32,
    month: u32,
    entries: &[DailyEntry],
    quantities: QuantityTotals,
) -> MonthlyAnalytics {
    let total_amount: Decimal = entries.iter().map(|e| e.total_amount).sum();
    let total_return_amount: Decimal = entries.iter().map(|e| e.total_return_amount).sum();
    let net_amount: Decimal = entries.iter().map(|e| e.net_amount).sum();
    let entries_count = entries.len() as i64;

    MonthlyAnalytics {
        year,
        month,
        entries_count,
        items_count: quantities.items,
        total_amount,
        total_return_amount,
        net_amount,
        quantity_sold: quantities.sold,
        quantity_returned: quantities.returned,
        net_quantity: quantities.sold - quantities.returned,
        average_daily_amount: safe_div(net_amount, Decimal::from(entries_count)),
        return_rate: percentage(total_return_amount, total_amount),
        quantity_return_rate: percentage(
            Decimal::from(quantities.returned),
            Decimal::from(quantities.sold),
        ),
    }
}

// ============================================================================
// Targets
// ============================================================================

/// Achieved share of a target; 0 unless the target is positive
pub fn achievement_percentage(achieved: Decimal, target: Decimal) -> Decimal {
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    percentage(achieved, target)
}

/// Working days assumed for a month of `days_in_month` days (five per week)
pub fn working_days(days_in_month: u32) -> u32 {
    days_in_month * 5 / 7
}

pub fn daily_target(target_amount: Decimal, working_days: u32) -> Decimal {
    safe_div(target_amount, Decimal::from(working_days))
}

/// Achieved, remaining and percentage for a target
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetProgress {
    pub achieved_amount: Decimal,
    pub remaining_amount: Decimal,
    pub achievement_percentage: Decimal,
}

pub fn target_progress(target_amount: Decimal, achieved_amount: Decimal) -> TargetProgress {
    TargetProgress {
        achieved_amount,
        remaining_amount: target_amount - achieved_amount,
        achievement_percentage: achievement_percentage(achieved_amount, target_amount),
    }
}

// ============================================================================
// Performance heuristics
// ============================================================================

/// Percentage change from `previous` to `current`, 0 when `previous` is 0
pub fn growth_rate(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    percentage(current.saturating_sub(previous), previous.abs())
}

fn mean(values: &[Decimal]) -> Decimal {
    let total: Decimal = values.iter().sum();
    safe_div(total, Decimal::from(values.len() as u64))
}

/// Mean of the last `window` values, 0 when fewer are available
pub fn moving_average(values: &[Decimal], window: usize) -> Decimal {
    if window == 0 || values.len() < window {
        return Decimal::ZERO;
    }
    mean(&values[values.len() - window..])
}

/// Growth of the second half's average over the first half's, for values in
/// chronological order
pub fn split_growth(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }
    let (first, second) = values.split_at(values.len() / 2);
    growth_rate(mean(second), mean(first))
}

/// `100 - coefficient of variation * 100`, clamped to 0..=100.
///
/// An empty set or a non-positive mean scores 0.
pub fn consistency_score(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let avg = mean(values);
    if avg <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let variance = safe_div(
        values
            .iter()
            .map(|v| {
                let deviation = v.saturating_sub(avg);
                deviation.saturating_mul(deviation)
            })
            .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d)),
        Decimal::from(values.len() as u64),
    );
    let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);
    let cv = safe_div(std_dev, avg);
    (Decimal::ONE_HUNDRED - cv.saturating_mul(Decimal::ONE_HUNDRED))
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .round_dp(2)
}

/// Net sales per day worked
pub fn efficiency(net_sales: Decimal, days_worked: u32) -> Decimal {
    safe_div(net_sales, Decimal::from(days_worked))
}

pub fn classify_trend(net_sales_growth: Decimal) -> TrendDirection {
    if net_sales_growth > TREND_THRESHOLD {
        TrendDirection::Up
    } else if net_sales_growth < -TREND_THRESHOLD {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}
