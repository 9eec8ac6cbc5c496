//! Aggregation and reporting
//!
//! Reports fetch bookers, daily entries (with items), products and targets
//! through the other services, then aggregate in memory. Nothing here writes.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    achievement_percentage, classify_trend, consistency_score, efficiency, fractional_cartons,
    growth_rate, percentage, safe_div, split_growth, validate_month, ComparisonReport,
    DailyEntryWithItems, DailyReportRow, DateRange, GrowthMetrics, MonthlyReportRow,
    MonthlyTarget, OrderBooker, PerformanceData, PerformanceMetrics, PerformanceStatus,
    PerformerSummary, PeriodSnapshot, ReportAnalytics, ReportFilters,
    TopPerformer, TrendDirection, TrendSummary, YearMonth, TREND_THRESHOLD,
};
use tracing::debug;

use super::daily_entry::DailyEntryFilters;
use super::monthly_target::MonthlyTargetFilters;
use super::order_booker::OrderBookerFilters;
use super::product::ProductFilters;
use super::{rule, DailyEntryService, MonthlyTargetService, OrderBookerService, ProductService};
use crate::error::{AppError, AppResult};

const TOP_PERFORMERS: usize = 3;

#[derive(Clone)]
pub struct ReportingService {
    order_bookers: OrderBookerService,
    daily_entries: DailyEntryService,
    products: ProductService,
    targets: MonthlyTargetService,
}

/// Sales, returns and cartons of some set of entries
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Figures {
    sales: Decimal,
    returns: Decimal,
    net: Decimal,
    cartons: Decimal,
    return_cartons: Decimal,
}

impl Figures {
    fn add(&mut self, other: &Figures) {
        self.sales += other.sales;
        self.returns += other.returns;
        self.net += other.net;
        self.cartons += other.cartons;
        self.return_cartons += other.return_cartons;
    }

    fn net_cartons(&self) -> Decimal {
        self.cartons - self.return_cartons
    }
}

/// Everything a report window needs, fetched once
struct ReportData {
    range: DateRange,
    bookers: Vec<OrderBooker>,
    entries: Vec<DailyEntryWithItems>,
    units_per_carton: HashMap<String, i64>,
    targets: Vec<MonthlyTarget>,
}

impl ReportData {
    fn figures(&self, entry: &DailyEntryWithItems) -> Figures {
        let mut cartons = Decimal::ZERO;
        let mut return_cartons = Decimal::ZERO;
        for item in &entry.items {
            let upc = self.units_per_carton.get(&item.product_id).copied().unwrap_or(1);
            cartons += fractional_cartons(item.quantity_sold, upc);
            return_cartons += fractional_cartons(item.quantity_returned, upc);
        }
        Figures {
            sales: entry.entry.total_amount,
            returns: entry.entry.total_return_amount,
            net: entry.entry.net_amount,
            cartons,
            return_cartons,
        }
    }

    fn name_of(&self, order_booker_id: &str) -> String {
        self.bookers
            .iter()
            .find(|b| b.id == order_booker_id)
            .map(|b| b.name.clone())
            .unwrap_or_default()
    }

    fn target_for(&self, order_booker_id: &str, months: &[YearMonth]) -> Decimal {
        self.targets
            .iter()
            .filter(|t| t.order_booker_id == order_booker_id)
            .filter(|t| months.iter().any(|m| m.year == t.year && m.month == t.month))
            .map(|t| t.target_amount)
            .sum()
    }

    fn entries_in<'a>(&'a self, range: DateRange) -> impl Iterator<Item = &'a DailyEntryWithItems> + 'a {
        self.entries.iter().filter(move |e| range.contains(e.entry.date))
    }

    /// Per-booker figures over `entries`, in first-seen order
    fn by_booker<'a>(
        &self,
        entries: impl Iterator<Item = &'a DailyEntryWithItems>,
    ) -> Vec<(String, Figures)> {
        let mut totals: Vec<(String, Figures)> = Vec::new();
        for entry in entries {
            let figures = self.figures(entry);
            match totals.iter_mut().find(|(id, _)| *id == entry.entry.order_booker_id) {
                Some((_, existing)) => existing.add(&figures),
                None => totals.push((entry.entry.order_booker_id.clone(), figures)),
            }
        }
        totals
    }

    /// Net sales per calendar day, chronological
    fn daily_net(&self, order_booker_id: Option<&str>) -> BTreeMap<NaiveDate, Figures> {
        let mut daily: BTreeMap<NaiveDate, Figures> = BTreeMap::new();
        for entry in &self.entries {
            if order_booker_id.is_some_and(|id| id != entry.entry.order_booker_id) {
                continue;
            }
            daily.entry(entry.entry.date).or_default().add(&self.figures(entry));
        }
        daily
    }

    fn performance(&self) -> Vec<PerformanceData> {
        let months = self.range.months();
        let window_days = u32::try_from(self.range.days()).unwrap_or(0);

        let mut rows: Vec<PerformanceData> = self
            .bookers
            .iter()
            .map(|booker| {
                let daily = self.daily_net(Some(booker.id.as_str()));
                let mut figures = Figures::default();
                for day in daily.values() {
                    figures.add(day);
                }

                let daily_net: Vec<Decimal> = daily.values().map(|f| f.net).collect();
                let sale_days: Vec<NaiveDate> = daily
                    .iter()
                    .filter(|(_, f)| f.sales > Decimal::ZERO)
                    .map(|(date, _)| *date)
                    .collect();
                let days_worked = daily.len() as u32;
                let days_with_sales = sale_days.len() as u32;

                let target_amount = self.target_for(&booker.id, &months);
                let achievement = achievement_percentage(figures.net, target_amount);

                PerformanceData {
                    order_booker: booker.clone(),
                    total_sales: figures.sales,
                    total_returns: figures.returns,
                    net_sales: figures.net,
                    total_cartons: figures.cartons,
                    return_cartons: figures.return_cartons,
                    net_cartons: figures.net_cartons(),
                    target_amount,
                    achievement_percentage: achievement,
                    status: PerformanceStatus::from_achievement(achievement),
                    rank: 0,
                    total_days_with_sales: days_with_sales,
                    last_sale_date: sale_days.last().copied(),
                    average_daily_sales: safe_div(figures.net, Decimal::from(days_with_sales)),
                    days_worked,
                    days_inactive: window_days.saturating_sub(days_worked),
                    performance: PerformanceMetrics {
                        sales_growth: split_growth(&daily_net),
                        consistency: consistency_score(&daily_net),
                        efficiency: efficiency(figures.net, days_worked),
                    },
                }
            })
            .collect();

        // Stable: equal net sales keep booker order
        rows.sort_by(|a, b| b.net_sales.cmp(&a.net_sales));
        for (index, row) in rows.iter_mut().enumerate() {
            row.rank = index as u32 + 1;
        }
        rows
    }

    fn daily_rows(&self) -> Vec<DailyReportRow> {
        let mut by_date: BTreeMap<NaiveDate, Vec<&DailyEntryWithItems>> = BTreeMap::new();
        for entry in &self.entries {
            by_date.entry(entry.entry.date).or_default().push(entry);
        }

        by_date
            .into_iter()
            .map(|(date, entries)| {
                let per_booker = self.by_booker(entries.into_iter());
                let mut totals = Figures::default();
                for (_, figures) in &per_booker {
                    totals.add(figures);
                }
                let active = per_booker.len() as u32;

                DailyReportRow {
                    date,
                    total_sales: totals.sales,
                    total_returns: totals.returns,
                    net_sales: totals.net,
                    total_cartons: totals.cartons,
                    return_cartons: totals.return_cartons,
                    net_cartons: totals.net_cartons(),
                    active_order_bookers: active,
                    avg_sales_per_order_booker: safe_div(totals.net, Decimal::from(active)),
                    top_performer: self.extreme(&per_booker, |candidate, best| candidate > best),
                    lowest_performer: self.extreme(&per_booker, |candidate, best| candidate < best),
                }
            })
            .collect()
    }

    /// First booker whose net sales beat every earlier one under `better`
    fn extreme(
        &self,
        per_booker: &[(String, Figures)],
        better: impl Fn(Decimal, Decimal) -> bool,
    ) -> Option<PerformerSummary> {
        let mut best: Option<&(String, Figures)> = None;
        for candidate in per_booker {
            let replace = match best {
                Some((_, current)) => better(candidate.1.net, current.net),
                None => true,
            };
            if replace {
                best = Some(candidate);
            }
        }
        best.map(|(id, figures)| PerformerSummary {
            order_booker_id: id.clone(),
            name: self.name_of(id),
            sales: figures.net,
        })
    }

    fn monthly_rows(&self) -> Vec<MonthlyReportRow> {
        let mut rows: Vec<MonthlyReportRow> = Vec::new();
        for period in self.range.months() {
            let mut per_booker = self.by_booker(self.entries_in(period.range()));
            let mut totals = Figures::default();
            for (_, figures) in &per_booker {
                totals.add(figures);
            }

            let total_target: Decimal = self
                .targets
                .iter()
                .filter(|t| t.year == period.year && t.month == period.month)
                .map(|t| t.target_amount)
                .sum();
            let nets: Vec<Decimal> = per_booker.iter().map(|(_, f)| f.net).collect();
            let active = per_booker.len() as u32;
            let growth = rows
                .last()
                .map(|previous| growth_rate(totals.net, previous.net_sales))
                .unwrap_or(Decimal::ZERO);

            per_booker.sort_by(|a, b| b.1.net.cmp(&a.1.net));
            let top_performers = per_booker
                .iter()
                .take(TOP_PERFORMERS)
                .map(|(id, figures)| TopPerformer {
                    order_booker_id: id.clone(),
                    name: self.name_of(id),
                    sales: figures.net,
                    achievement_percentage: achievement_percentage(
                        figures.net,
                        self.target_for(id, &[period]),
                    ),
                })
                .collect();

            rows.push(MonthlyReportRow {
                year: period.year,
                month: period.month,
                total_sales: totals.sales,
                total_returns: totals.returns,
                net_sales: totals.net,
                total_cartons: totals.cartons,
                return_cartons: totals.return_cartons,
                net_cartons: totals.net_cartons(),
                total_target,
                target_achievement_percentage: achievement_percentage(totals.net, total_target),
                active_order_bookers: active,
                avg_sales_per_order_booker: safe_div(totals.net, Decimal::from(active)),
                top_performers,
                growth_rate: growth,
                consistency_score: consistency_score(&nets),
            });
        }
        rows
    }

    fn snapshot(&self, period: YearMonth) -> PeriodSnapshot {
        let mut totals = Figures::default();
        for entry in self.entries_in(period.range()) {
            totals.add(&self.figures(entry));
        }
        let target: Decimal = self
            .targets
            .iter()
            .filter(|t| t.year == period.year && t.month == period.month)
            .map(|t| t.target_amount)
            .sum();

        PeriodSnapshot {
            period: period.to_string(),
            sales: totals.sales,
            returns: totals.returns,
            net_sales: totals.net,
            cartons: totals.cartons,
            achievement_percentage: achievement_percentage(totals.net, target),
        }
    }

    fn comparison(&self, current: YearMonth, previous: YearMonth) -> ComparisonReport {
        let now = self.snapshot(current);
        let before = self.snapshot(previous);
        let growth = GrowthMetrics {
            sales: growth_rate(now.sales, before.sales),
            returns: growth_rate(now.returns, before.returns),
            net_sales: growth_rate(now.net_sales, before.net_sales),
            cartons: growth_rate(now.cartons, before.cartons),
            achievement: growth_rate(now.achievement_percentage, before.achievement_percentage),
        };
        let direction = classify_trend(growth.net_sales);

        // Bookers active in either month, and how many moved with the trend
        let current_nets = self.by_booker(self.entries_in(current.range()));
        let previous_nets = self.by_booker(self.entries_in(previous.range()));
        let mut ids: Vec<&str> = current_nets.iter().map(|(id, _)| id.as_str()).collect();
        for (id, _) in &previous_nets {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        let aligned = ids
            .iter()
            .filter(|id| {
                let (now_net, before_net) = (net_of(&current_nets, id), net_of(&previous_nets, id));
                match direction {
                    TrendDirection::Up => now_net > before_net,
                    TrendDirection::Down => now_net < before_net,
                    TrendDirection::Stable => growth_rate(now_net, before_net).abs() <= TREND_THRESHOLD,
                }
            })
            .count();
        let confidence = percentage(Decimal::from(aligned as u64), Decimal::from(ids.len() as u64)).round_dp(2);

        let insights = comparison_insights(&now, &before, &growth);
        ComparisonReport {
            current: now,
            previous: before,
            growth,
            trend: TrendSummary {
                direction,
                confidence,
                insights,
            },
        }
    }

    fn analytics(&self) -> ReportAnalytics {
        let performance = self.performance();
        let active: Vec<&PerformanceData> = performance.iter().filter(|p| p.days_worked > 0).collect();

        let mut totals = Figures::default();
        for entry in &self.entries {
            totals.add(&self.figures(entry));
        }
        let active_count = active.len() as u32;
        let nets: Vec<Decimal> = active.iter().map(|p| p.net_sales).collect();
        let daily_net: Vec<Decimal> = self.daily_net(None).values().map(|f| f.net).collect();

        ReportAnalytics {
            total_revenue: totals.sales,
            total_returns: totals.returns,
            net_revenue: totals.net,
            total_cartons: totals.cartons,
            return_cartons: totals.return_cartons,
            net_cartons: totals.net_cartons(),
            order_booker_count: self.bookers.len() as u32,
            active_order_booker_count: active_count,
            avg_revenue_per_order_booker: safe_div(totals.net, Decimal::from(active_count)),
            avg_cartons_per_order_booker: safe_div(totals.net_cartons(), Decimal::from(active_count)),
            top_performer_revenue: nets.iter().copied().max().unwrap_or(Decimal::ZERO),
            low_performer_revenue: nets.iter().copied().min().unwrap_or(Decimal::ZERO),
            consistency_score: consistency_score(&nets),
            growth_rate: split_growth(&daily_net),
            return_rate: percentage(totals.returns, totals.sales),
        }
    }
}

fn net_of(per_booker: &[(String, Figures)], order_booker_id: &str) -> Decimal {
    per_booker
        .iter()
        .find(|(id, _)| id == order_booker_id)
        .map(|(_, f)| f.net)
        .unwrap_or(Decimal::ZERO)
}

fn comparison_insights(
    current: &PeriodSnapshot,
    previous: &PeriodSnapshot,
    growth: &GrowthMetrics,
) -> Vec<String> {
    let mut insights = Vec::new();
    if current.sales.is_zero() && previous.sales.is_zero() {
        insights.push(format!(
            "No sales recorded in {} or {}",
            current.period, previous.period
        ));
        return insights;
    }

    match classify_trend(growth.net_sales) {
        TrendDirection::Up => insights.push(format!(
            "Net sales rose {}% against {}",
            growth.net_sales.round_dp(2),
            previous.period
        )),
        TrendDirection::Down => insights.push(format!(
            "Net sales fell {}% against {}",
            growth.net_sales.abs().round_dp(2),
            previous.period
        )),
        TrendDirection::Stable => insights.push(format!(
            "Net sales held steady against {}",
            previous.period
        )),
    }

    if growth.returns > Decimal::ZERO {
        insights.push(format!("Returns grew {}%", growth.returns.round_dp(2)));
    } else if growth.returns < Decimal::ZERO {
        insights.push(format!("Returns dropped {}%", growth.returns.abs().round_dp(2)));
    }

    if current.achievement_percentage >= Decimal::ONE_HUNDRED {
        insights.push(format!(
            "Team target met at {}%",
            current.achievement_percentage.round_dp(2)
        ));
    } else if current.achievement_percentage > Decimal::ZERO {
        insights.push(format!(
            "Team at {}% of target",
            current.achievement_percentage.round_dp(2)
        ));
    }
    insights
}

impl ReportingService {
    pub fn new(
        order_bookers: OrderBookerService,
        daily_entries: DailyEntryService,
        products: ProductService,
        targets: MonthlyTargetService,
    ) -> Self {
        Self {
            order_bookers,
            daily_entries,
            products,
            targets,
        }
    }

    async fn collect(&self, filters: &ReportFilters, range: DateRange) -> AppResult<ReportData> {
        let bookers: Vec<OrderBooker> = self
            .order_bookers
            .list(&OrderBookerFilters {
                is_active: (!filters.include_inactive).then_some(true),
                ..Default::default()
            })
            .await?
            .into_iter()
            .filter(|b| filters.order_booker_ids.is_empty() || filters.order_booker_ids.contains(&b.id))
            .collect();

        let mut data = ReportData {
            range,
            bookers,
            entries: Vec::new(),
            units_per_carton: HashMap::new(),
            targets: Vec::new(),
        };
        // An empty id list would mean "every booker" to the filters below
        if data.bookers.is_empty() {
            return Ok(data);
        }
        let ids: Vec<String> = data.bookers.iter().map(|b| b.id.clone()).collect();

        data.entries = self
            .daily_entries
            .list_with_items(&DailyEntryFilters {
                order_booker_ids: ids.clone(),
                date_range: Some(range),
                ..Default::default()
            })
            .await?;
        data.units_per_carton = self
            .products
            .list(&ProductFilters::default())
            .await?
            .into_iter()
            .map(|p| (p.id, p.unit_per_carton))
            .collect();
        for period in range.months() {
            let targets = self
                .targets
                .list(&MonthlyTargetFilters {
                    year: Some(period.year),
                    month: Some(period.month),
                    order_booker_ids: ids.clone(),
                })
                .await?;
            data.targets.extend(targets);
        }

        debug!(
            start = %range.start,
            end = %range.end,
            bookers = data.bookers.len(),
            entries = data.entries.len(),
            "Report data collected"
        );
        Ok(data)
    }

    fn window(filters: &ReportFilters) -> DateRange {
        filters
            .date_range
            .unwrap_or_else(|| YearMonth::of(Utc::now().date_naive()).range())
    }

    /// Per-booker standing, best net sales first
    pub async fn performance_report(&self, filters: &ReportFilters) -> AppResult<Vec<PerformanceData>> {
        let data = self.collect(filters, Self::window(filters)).await?;
        Ok(data.performance())
    }

    /// One row per date with entries, ascending
    pub async fn daily_report(&self, filters: &ReportFilters) -> AppResult<Vec<DailyReportRow>> {
        let data = self.collect(filters, Self::window(filters)).await?;
        Ok(data.daily_rows())
    }

    /// One row per calendar month touched by the window
    pub async fn monthly_report(&self, filters: &ReportFilters) -> AppResult<Vec<MonthlyReportRow>> {
        let data = self.collect(filters, Self::window(filters)).await?;
        Ok(data.monthly_rows())
    }

    /// `year`-`month` against the month before it, across every booker
    pub async fn comparison_report(&self, year: i32, month: u32) -> AppResult<ComparisonReport> {
        rule("month", validate_month(month))?;
        let current = YearMonth::new(year, month)
            .ok_or_else(|| AppError::validation("month", "Month must be between 1 and 12"))?;
        let previous = current.previous();
        let range = DateRange::new(previous.range().start, current.range().end);

        let filters = ReportFilters {
            date_range: Some(range),
            order_booker_ids: Vec::new(),
            include_inactive: true,
        };
        let data = self.collect(&filters, range).await?;
        Ok(data.comparison(current, previous))
    }

    pub async fn report_analytics(&self, filters: &ReportFilters) -> AppResult<ReportAnalytics> {
        let data = self.collect(filters, Self::window(filters)).await?;
        Ok(data.analytics())
    }
}
