//! Report shapes produced by the aggregation layer

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderBooker;
use crate::types::DateRange;

/// Five-tier classification of target achievement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceStatus {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl PerformanceStatus {
    /// Classify an achievement percentage
    pub fn from_achievement(percentage: Decimal) -> Self {
        if percentage >= Decimal::from(100) {
            PerformanceStatus::Excellent
        } else if percentage >= Decimal::from(80) {
            PerformanceStatus::Good
        } else if percentage >= Decimal::from(60) {
            PerformanceStatus::Average
        } else if percentage >= Decimal::from(40) {
            PerformanceStatus::BelowAverage
        } else {
            PerformanceStatus::Poor
        }
    }
}

impl std::fmt::Display for PerformanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerformanceStatus::Excellent => write!(f, "Excellent"),
            PerformanceStatus::Good => write!(f, "Good"),
            PerformanceStatus::Average => write!(f, "Average"),
            PerformanceStatus::BelowAverage => write!(f, "Below Average"),
            PerformanceStatus::Poor => write!(f, "Poor"),
        }
    }
}

/// Filters shared by every report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilters {
    /// Defaults to the current calendar month
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub order_booker_ids: Vec<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    /// Second half of the window against the first half, in percent
    pub sales_growth: Decimal,
    /// 0-100, higher when daily net sales vary less
    pub consistency: Decimal,
    /// Net sales per day worked
    pub efficiency: Decimal,
}

/// One booker's standing over a report window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceData {
    pub order_booker: OrderBooker,
    pub total_sales: Decimal,
    pub total_returns: Decimal,
    pub net_sales: Decimal,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub net_cartons: Decimal,
    pub target_amount: Decimal,
    pub achievement_percentage: Decimal,
    pub status: PerformanceStatus,
    /// 1-based, by net sales descending
    pub rank: u32,
    pub total_days_with_sales: u32,
    pub last_sale_date: Option<NaiveDate>,
    pub average_daily_sales: Decimal,
    pub days_worked: u32,
    pub days_inactive: u32,
    pub performance: PerformanceMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformerSummary {
    pub order_booker_id: String,
    pub name: String,
    pub sales: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReportRow {
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub total_returns: Decimal,
    pub net_sales: Decimal,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub net_cartons: Decimal,
    pub active_order_bookers: u32,
    pub avg_sales_per_order_booker: Decimal,
    pub top_performer: Option<PerformerSummary>,
    pub lowest_performer: Option<PerformerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopPerformer {
    pub order_booker_id: String,
    pub name: String,
    pub sales: Decimal,
    pub achievement_percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyReportRow {
    pub year: i32,
    pub month: u32,
    pub total_sales: Decimal,
    pub total_returns: Decimal,
    pub net_sales: Decimal,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub net_cartons: Decimal,
    pub total_target: Decimal,
    pub target_achievement_percentage: Decimal,
    pub active_order_bookers: u32,
    pub avg_sales_per_order_booker: Decimal,
    pub top_performers: Vec<TopPerformer>,
    /// Net sales growth against the previous row, 0 for the first row
    pub growth_rate: Decimal,
    pub consistency_score: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PeriodSnapshot {
    /// `YYYY-MM`
    pub period: String,
    pub sales: Decimal,
    pub returns: Decimal,
    pub net_sales: Decimal,
    pub cartons: Decimal,
    pub achievement_percentage: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GrowthMetrics {
    pub sales: Decimal,
    pub returns: Decimal,
    pub net_sales: Decimal,
    pub cartons: Decimal,
    pub achievement: Decimal,
}

/// Month-over-month direction of net sales
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    /// Share of active bookers that moved with the overall trend, 0-100
    pub confidence: Decimal,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonReport {
    pub current: PeriodSnapshot,
    pub previous: PeriodSnapshot,
    pub growth: GrowthMetrics,
    pub trend: TrendSummary,
}

/// Headline figures across every booker in a window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportAnalytics {
    pub total_revenue: Decimal,
    pub total_returns: Decimal,
    pub net_revenue: Decimal,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub net_cartons: Decimal,
    pub order_booker_count: u32,
    pub active_order_booker_count: u32,
    pub avg_revenue_per_order_booker: Decimal,
    pub avg_cartons_per_order_booker: Decimal,
    pub top_performer_revenue: Decimal,
    pub low_performer_revenue: Decimal,
    pub consistency_score: Decimal,
    pub growth_rate: Decimal,
    pub return_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tiers() {
        assert_eq!(PerformanceStatus::from_achievement(Decimal::from(120)), PerformanceStatus::Excellent);
        assert_eq!(PerformanceStatus::from_achievement(Decimal::from(100)), PerformanceStatus::Excellent);
        assert_eq!(PerformanceStatus::from_achievement(Decimal::new(9999, 2)), PerformanceStatus::Good);
        assert_eq!(PerformanceStatus::from_achievement(Decimal::from(80)), PerformanceStatus::Good);
        assert_eq!(PerformanceStatus::from_achievement(Decimal::from(60)), PerformanceStatus::Average);
        assert_eq!(PerformanceStatus::from_achievement(Decimal::from(40)), PerformanceStatus::BelowAverage);
        assert_eq!(PerformanceStatus::from_achievement(Decimal::new(3999, 2)), PerformanceStatus::Poor);
        assert_eq!(PerformanceStatus::from_achievement(Decimal::ZERO), PerformanceStatus::Poor);
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&PerformanceStatus::BelowAverage).unwrap();
        assert_eq!(json, "\"below-average\"");
    }
}
