//! Order-based dashboard metrics
//!
//! Revenue, margin, return and target figures come from orders rather than
//! daily entries, so they follow what was booked and supplied.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::{achievement_percentage, moving_average, percentage, safe_div};
use crate::types::{days_in_month, DateRange};

/// Margin every booker is measured against, in percent
pub const TARGET_MARGIN: Decimal = Decimal::from_parts(20, 0, 0, false, 0);
pub const HEALTHY_MARGIN: Decimal = Decimal::from_parts(25, 0, 0, false, 0);
pub const WARNING_MARGIN: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

/// Return rates above these percentages raise a warning / go critical
pub const RETURN_RATE_WARNING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
pub const RETURN_RATE_CRITICAL: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Achievement below these percentages is a target risk / critical
pub const TARGET_RISK: Decimal = Decimal::from_parts(70, 0, 0, false, 0);
pub const TARGET_CRITICAL: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardFilters {
    /// Defaults to the current calendar month
    pub date_range: Option<DateRange>,
    /// Empty means every booker
    #[serde(default)]
    pub order_booker_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RevenueMetrics {
    pub current_revenue: Decimal,
    pub order_count: i64,
    /// Same window one month earlier
    pub previous_revenue: Decimal,
    /// Sum of targets for the window's first month
    pub target_revenue: Decimal,
    pub achievement_percentage: Decimal,
    pub growth_percentage: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarginStatus {
    Healthy,
    Warning,
    Critical,
}

impl MarginStatus {
    pub fn from_margin(margin: Decimal) -> Self {
        if margin >= HEALTHY_MARGIN {
            MarginStatus::Healthy
        } else if margin >= WARNING_MARGIN {
            MarginStatus::Warning
        } else {
            MarginStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfitMargin {
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub margin_percentage: Decimal,
    pub target_margin_percentage: Decimal,
    /// `margin_percentage - target_margin_percentage`
    pub variance: Decimal,
    pub status: MarginStatus,
}

impl ProfitMargin {
    pub fn new(total_revenue: Decimal, total_cost: Decimal, total_profit: Decimal) -> Self {
        let margin_percentage = percentage(total_profit, total_revenue);
        Self {
            total_revenue,
            total_cost,
            total_profit,
            margin_percentage,
            target_margin_percentage: TARGET_MARGIN,
            variance: margin_percentage - TARGET_MARGIN,
            status: MarginStatus::from_margin(margin_percentage),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Normal,
    Warning,
    Critical,
}

impl ReturnStatus {
    pub fn from_rate(rate: Decimal) -> Self {
        if rate > RETURN_RATE_CRITICAL {
            ReturnStatus::Critical
        } else if rate > RETURN_RATE_WARNING {
            ReturnStatus::Warning
        } else {
            ReturnStatus::Normal
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductReturnRate {
    pub product_id: String,
    pub product_name: String,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub return_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnRates {
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    /// Returned cartons as a percentage of ordered cartons
    pub overall_rate: Decimal,
    pub status: ReturnStatus,
    /// Worst products first, at most five, only those with returns
    pub by_product: Vec<ProductReturnRate>,
}

impl ReturnRates {
    pub fn new(total_cartons: Decimal, return_cartons: Decimal, by_product: Vec<ProductReturnRate>) -> Self {
        let overall_rate = percentage(return_cartons, total_cartons);
        Self {
            total_cartons,
            return_cartons,
            overall_rate,
            status: ReturnStatus::from_rate(overall_rate),
            by_product,
        }
    }
}

/// A booker's orders against their target for the window's month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookerStanding {
    pub order_booker_id: String,
    pub name: String,
    pub target_amount: Decimal,
    pub achieved_amount: Decimal,
    pub achievement_percentage: Decimal,
    pub order_count: i64,
    /// 1-based
    pub rank: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TargetPace {
    Ahead,
    OnTrack,
    AtRisk,
    Behind,
}

impl TargetPace {
    /// Compare the pace so far with the pace still required
    pub fn assess(
        achievement: Decimal,
        current_daily_average: Decimal,
        required_daily_average: Decimal,
        days_remaining: u32,
    ) -> Self {
        if achievement >= Decimal::ONE_HUNDRED {
            return TargetPace::Ahead;
        }
        if days_remaining == 0 {
            return TargetPace::Behind;
        }
        let pace = |factor: Decimal| required_daily_average.saturating_mul(factor);
        if current_daily_average >= pace(Decimal::new(11, 1)) {
            TargetPace::Ahead
        } else if current_daily_average >= pace(Decimal::new(9, 1)) {
            TargetPace::OnTrack
        } else if current_daily_average >= pace(Decimal::new(7, 1)) {
            TargetPace::AtRisk
        } else {
            TargetPace::Behind
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetPaceRow {
    pub order_booker_id: String,
    pub name: String,
    pub target_amount: Decimal,
    pub achieved_amount: Decimal,
    pub achievement_percentage: Decimal,
    pub order_count: i64,
    pub days_remaining: u32,
    pub current_daily_average: Decimal,
    pub required_daily_average: Decimal,
    /// Achievement at month end if the current pace holds
    pub projected_achievement: Decimal,
    pub pace: TargetPace,
}

impl TargetPaceRow {
    /// Pace of `standing` when the window ends on `as_of`.
    ///
    /// Days elapsed count from the first of `as_of`'s month.
    pub fn new(standing: &BookerStanding, as_of: NaiveDate) -> Self {
        let month_days = days_in_month(as_of.year(), as_of.month());
        let elapsed = as_of.day();
        let days_remaining = month_days.saturating_sub(elapsed);
        let target = standing.target_amount;
        let achieved = standing.achieved_amount;

        let current_daily_average = safe_div(achieved, Decimal::from(elapsed));
        let required_daily_average = if days_remaining > 0 {
            safe_div(target - achieved, Decimal::from(days_remaining))
        } else {
            Decimal::ZERO
        };
        let projected_achievement = if current_daily_average > Decimal::ZERO {
            achievement_percentage(
                current_daily_average.saturating_mul(Decimal::from(month_days)),
                target,
            )
        } else {
            standing.achievement_percentage
        };

        Self {
            order_booker_id: standing.order_booker_id.clone(),
            name: standing.name.clone(),
            target_amount: target,
            achieved_amount: achieved,
            achievement_percentage: standing.achievement_percentage,
            order_count: standing.order_count,
            days_remaining,
            current_daily_average,
            required_daily_average,
            projected_achievement,
            pace: TargetPace::assess(
                standing.achievement_percentage,
                current_daily_average,
                required_daily_average,
                days_remaining,
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SalesTrend {
    pub daily: Vec<DailyRevenue>,
    /// Mean of the last 7 days with orders, 0 with fewer
    pub seven_day_average: Decimal,
    pub thirty_day_average: Decimal,
    /// Weekday days average over 20% more than weekend days
    pub weekend_low: bool,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl SalesTrend {
    /// `daily` must be in date order
    pub fn from_daily(daily: Vec<DailyRevenue>) -> Self {
        let values: Vec<Decimal> = daily.iter().map(|d| d.revenue).collect();
        let weekend_low = daily.len() >= 7 && {
            let (weekend, weekday): (Vec<&DailyRevenue>, Vec<&DailyRevenue>) =
                daily.iter().partition(|d| is_weekend(d.date));
            let average = |days: &[&DailyRevenue]| {
                let total: Decimal = days.iter().map(|d| d.revenue).sum();
                (total, safe_div(total, Decimal::from(days.len() as u64)))
            };
            let (weekend_total, weekend_average) = average(&weekend[..]);
            let (weekday_total, weekday_average) = average(&weekday[..]);
            weekend_total > Decimal::ZERO
                && weekday_total > Decimal::ZERO
                && weekday_average > weekend_average.saturating_mul(Decimal::new(12, 1))
        };
        Self {
            seven_day_average: moving_average(&values, 7),
            thirty_day_average: moving_average(&values, 30),
            daily,
            weekend_low,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    HighReturnRate,
    TargetMissRisk,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub value: Decimal,
    pub threshold: Decimal,
    pub order_booker_id: Option<String>,
}

impl DashboardAlert {
    /// Raised when the overall return rate passes the warning level
    pub fn high_return_rate(rate: Decimal) -> Option<Self> {
        if rate <= RETURN_RATE_WARNING {
            return None;
        }
        let severity = if rate > RETURN_RATE_CRITICAL {
            AlertSeverity::Critical
        } else {
            AlertSeverity::High
        };
        Some(Self {
            kind: AlertKind::HighReturnRate,
            severity,
            title: "High return rate".to_string(),
            description: format!("Overall return rate is {}%", rate.round_dp(1)),
            value: rate,
            threshold: RETURN_RATE_WARNING,
            order_booker_id: None,
        })
    }

    /// Raised for a booker with a target who is below the risk level
    pub fn target_miss_risk(standing: &BookerStanding) -> Option<Self> {
        if standing.target_amount <= Decimal::ZERO || standing.achievement_percentage >= TARGET_RISK {
            return None;
        }
        let severity = if standing.achievement_percentage < TARGET_CRITICAL {
            AlertSeverity::Critical
        } else {
            AlertSeverity::High
        };
        Some(Self {
            kind: AlertKind::TargetMissRisk,
            severity,
            title: "Target achievement risk".to_string(),
            description: format!(
                "{} is at {}% of target",
                standing.name,
                standing.achievement_percentage.round_dp(1)
            ),
            value: standing.achievement_percentage,
            threshold: TARGET_RISK,
            order_booker_id: Some(standing.order_booker_id.clone()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardMetrics {
    pub range: DateRange,
    pub revenue: RevenueMetrics,
    pub profit_margin: ProfitMargin,
    pub return_rates: ReturnRates,
    /// Best achievement first, at most ten
    pub top_performers: Vec<BookerStanding>,
    pub target_progress: Vec<TargetPaceRow>,
    pub sales_trend: SalesTrend,
    pub alerts: Vec<DashboardAlert>,
}

impl DashboardMetrics {
    pub fn critical_alerts(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.severity == AlertSeverity::Critical)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn standing(target: i64, achievement: i64) -> BookerStanding {
        BookerStanding {
            order_booker_id: "ob1".to_string(),
            name: "OB1".to_string(),
            target_amount: dec(target),
            achieved_amount: Decimal::ZERO,
            achievement_percentage: dec(achievement),
            order_count: 0,
            rank: 1,
        }
    }

    #[test]
    fn margin_and_return_tiers() {
        assert_eq!(MarginStatus::from_margin(dec(25)), MarginStatus::Healthy);
        assert_eq!(MarginStatus::from_margin(dec(15)), MarginStatus::Warning);
        assert_eq!(MarginStatus::from_margin(Decimal::new(1499, 2)), MarginStatus::Critical);
        assert_eq!(ReturnStatus::from_rate(dec(5)), ReturnStatus::Normal);
        assert_eq!(ReturnStatus::from_rate(Decimal::new(51, 1)), ReturnStatus::Warning);
        assert_eq!(ReturnStatus::from_rate(Decimal::new(101, 1)), ReturnStatus::Critical);
    }

    #[test]
    fn pace_against_required_average() {
        assert_eq!(TargetPace::assess(dec(100), dec(0), dec(500), 3), TargetPace::Ahead);
        assert_eq!(TargetPace::assess(dec(50), dec(1100), dec(1000), 10), TargetPace::Ahead);
        assert_eq!(TargetPace::assess(dec(50), dec(900), dec(1000), 10), TargetPace::OnTrack);
        assert_eq!(TargetPace::assess(dec(50), dec(700), dec(1000), 10), TargetPace::AtRisk);
        assert_eq!(TargetPace::assess(dec(50), dec(699), dec(1000), 10), TargetPace::Behind);
        assert_eq!(TargetPace::assess(dec(99), dec(5000), dec(0), 0), TargetPace::Behind);
    }

    #[test]
    fn margin_against_target() {
        let margin = ProfitMargin::new(dec(10_000), dec(8_200), dec(1_800));
        assert_eq!(margin.margin_percentage, dec(18));
        assert_eq!(margin.variance, dec(-2));
        assert_eq!(margin.status, MarginStatus::Warning);

        let empty = ProfitMargin::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(empty.margin_percentage, Decimal::ZERO);
        assert_eq!(empty.status, MarginStatus::Critical);

        let rates = ReturnRates::new(dec(40), dec(3), Vec::new());
        assert_eq!(rates.overall_rate, Decimal::new(75, 1));
        assert_eq!(rates.status, ReturnStatus::Warning);
    }

    #[test]
    fn pace_row_from_mid_month_standing() {
        let mut s = standing(30_000, 40);
        s.achieved_amount = dec(12_000);
        // June has 30 days; 10 elapsed, 20 remaining
        let row = TargetPaceRow::new(&s, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(row.days_remaining, 20);
        assert_eq!(row.current_daily_average, dec(1_200));
        assert_eq!(row.required_daily_average, dec(900));
        assert_eq!(row.projected_achievement, dec(120));
        assert_eq!(row.pace, TargetPace::Ahead);

        let last_day = TargetPaceRow::new(&s, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(last_day.days_remaining, 0);
        assert_eq!(last_day.required_daily_average, Decimal::ZERO);
        assert_eq!(last_day.pace, TargetPace::Behind);
    }

    fn day(d: u32, revenue: i64) -> DailyRevenue {
        DailyRevenue {
            date: NaiveDate::from_ymd_opt(2024, 6, d).unwrap(),
            revenue: dec(revenue),
            orders: 1,
        }
    }

    #[test]
    fn trend_averages_and_weekend_dip() {
        // 2024-06-03 is a Monday
        let week: Vec<DailyRevenue> = (3..=9)
            .map(|d| day(d, if d >= 8 { 100 } else { 1_000 }))
            .collect();
        let trend = SalesTrend::from_daily(week);
        assert_eq!(trend.seven_day_average, dec(5_200) / dec(7));
        assert_eq!(trend.thirty_day_average, Decimal::ZERO);
        assert!(trend.weekend_low);

        let flat = SalesTrend::from_daily((3..=9).map(|d| day(d, 500)).collect());
        assert!(!flat.weekend_low);

        let short = SalesTrend::from_daily((3..=5).map(|d| day(d, 500)).collect());
        assert!(!short.weekend_low);
        assert_eq!(short.seven_day_average, Decimal::ZERO);
    }

    #[test]
    fn alerts_fire_past_thresholds() {
        assert!(DashboardAlert::high_return_rate(dec(5)).is_none());
        let high = DashboardAlert::high_return_rate(dec(8)).unwrap();
        assert_eq!(high.severity, AlertSeverity::High);
        assert_eq!(high.description, "Overall return rate is 8%");
        assert_eq!(
            DashboardAlert::high_return_rate(dec(12)).unwrap().severity,
            AlertSeverity::Critical
        );

        assert!(DashboardAlert::target_miss_risk(&standing(0, 0)).is_none());
        assert!(DashboardAlert::target_miss_risk(&standing(1000, 70)).is_none());
        let risk = DashboardAlert::target_miss_risk(&standing(1000, 60)).unwrap();
        assert_eq!(risk.severity, AlertSeverity::High);
        assert_eq!(risk.order_booker_id.as_deref(), Some("ob1"));
        assert_eq!(
            DashboardAlert::target_miss_risk(&standing(1000, 49)).unwrap().severity,
            AlertSeverity::Critical
        );
    }
}
