//! Order-based reports
//!
//! The product-wise sales report and the dashboard figures are aggregated in
//! SQL over `orders` and `order_items`, so they reflect what was booked and
//! supplied rather than the daily entries.

use chrono::{Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    achievement_percentage, growth_rate, percentage, BookerStanding, DailyRevenue,
    DashboardAlert, DashboardFilters, DashboardMetrics, DateRange, ProductReturnRate,
    ProductSalesFilters, ProductSalesReport, ProductSalesRow, ProductSalesSummary, ProfitMargin,
    ReturnRates, RevenueMetrics, SalesTrend, TargetPaceRow, YearMonth,
};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::storage::{Database, SqlDecimal, SqlFilter};

const TOP_PERFORMERS: usize = 10;

#[derive(Clone)]
pub struct OrderReportService {
    db: Database,
}

#[derive(Debug, FromRow)]
struct ProductSalesQueryRow {
    product_id: String,
    product_name: String,
    sell_price: SqlDecimal,
    cost_price: SqlDecimal,
    quantity: i64,
    return_quantity: i64,
    total_cartons: SqlDecimal,
    return_cartons: SqlDecimal,
    total_amount: SqlDecimal,
    return_amount: SqlDecimal,
}

impl From<ProductSalesQueryRow> for ProductSalesRow {
    fn from(row: ProductSalesQueryRow) -> Self {
        ProductSalesRow::new(
            row.product_id,
            row.product_name,
            row.sell_price.0,
            row.cost_price.0,
            row.quantity,
            row.return_quantity,
            row.total_cartons.0,
            row.return_cartons.0,
            row.total_amount.0,
            row.return_amount.0,
        )
    }
}

#[derive(Debug, FromRow)]
struct OrderTotalsRow {
    order_count: i64,
    revenue: SqlDecimal,
    cost: SqlDecimal,
    profit: SqlDecimal,
    total_cartons: SqlDecimal,
    return_cartons: SqlDecimal,
}

#[derive(Debug, FromRow)]
struct ReturnRateRow {
    product_id: String,
    product_name: String,
    total_cartons: SqlDecimal,
    return_cartons: SqlDecimal,
}

#[derive(Debug, FromRow)]
struct StandingRow {
    order_booker_id: String,
    name: String,
    target_amount: SqlDecimal,
    has_target: bool,
    achieved_amount: SqlDecimal,
    order_count: i64,
}

#[derive(Debug, FromRow)]
struct DailyRow {
    date: NaiveDate,
    revenue: SqlDecimal,
    orders: i64,
}

/// Raw query results behind one dashboard
struct DashboardData {
    current: OrderTotalsRow,
    previous_revenue: Decimal,
    target_revenue: Decimal,
    product_returns: Vec<ReturnRateRow>,
    standings: Vec<StandingRow>,
    daily: Vec<DailyRow>,
}

/// The same window one calendar month earlier, clamped to month ends
fn previous_window(range: DateRange) -> DateRange {
    let back = |date: NaiveDate| date.checked_sub_months(Months::new(1)).unwrap_or(date);
    DateRange::new(back(range.start), back(range.end))
}

async fn order_totals(pool: &SqlitePool, range: DateRange, booker_ids: &[String]) -> AppResult<OrderTotalsRow> {
    let mut filter = SqlFilter::new(
        r#"
        SELECT COUNT(*) AS order_count,
               COALESCE(SUM(total_amount), 0) AS revenue,
               COALESCE(SUM(total_cost), 0) AS cost,
               COALESCE(SUM(total_profit), 0) AS profit,
               COALESCE(SUM(total_cartons), 0) AS total_cartons,
               COALESCE(SUM(return_cartons), 0) AS return_cartons
        FROM orders
        "#,
    );
    filter
        .date_range("order_date", Some(range))
        .in_list("order_booker_id", booker_ids);
    let mut query = filter.finish();
    let row = query.build_query_as::<OrderTotalsRow>().fetch_one(pool).await?;
    Ok(row)
}

async fn target_total(pool: &SqlitePool, period: YearMonth, booker_ids: &[String]) -> AppResult<Decimal> {
    let mut filter = SqlFilter::new("SELECT COALESCE(SUM(target_amount), 0) FROM monthly_targets");
    filter
        .eq("year", period.year)
        .eq("month", period.month as i64)
        .in_list("order_booker_id", booker_ids);
    let mut query = filter.finish();
    let total = query.build_query_scalar::<SqlDecimal>().fetch_one(pool).await?;
    Ok(total.0)
}

async fn product_return_rates(
    pool: &SqlitePool,
    range: DateRange,
    booker_ids: &[String],
) -> AppResult<Vec<ReturnRateRow>> {
    let mut filter = SqlFilter::new(
        r#"
        SELECT p.id AS product_id, p.name AS product_name,
               COALESCE(SUM(oi.cartons), 0) AS total_cartons,
               COALESCE(SUM(oi.return_cartons), 0) AS return_cartons
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        JOIN orders o ON o.id = oi.order_id
        "#,
    );
    filter
        .date_range("o.order_date", Some(range))
        .in_list("o.order_booker_id", booker_ids)
        .push(
            " GROUP BY p.id, p.name HAVING SUM(oi.return_cartons) > 0 \
             ORDER BY SUM(oi.return_cartons) / NULLIF(SUM(oi.cartons), 0) DESC, p.name LIMIT 5",
        );
    let mut query = filter.finish();
    let rows = query.build_query_as::<ReturnRateRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Every booker's target for `period` and their orders inside `range`
async fn standings(
    pool: &SqlitePool,
    range: DateRange,
    period: YearMonth,
    booker_ids: &[String],
) -> AppResult<Vec<StandingRow>> {
    let mut filter = SqlFilter::new(
        r#"
        SELECT ob.id AS order_booker_id, ob.name AS name,
               COALESCE(mt.target_amount, 0) AS target_amount,
               mt.id IS NOT NULL AS has_target,
               COALESCE(SUM(o.total_amount), 0) AS achieved_amount,
               COUNT(o.id) AS order_count
        FROM order_bookers ob
        LEFT JOIN monthly_targets mt
          ON mt.order_booker_id = ob.id AND mt.year = "#,
    );
    filter
        .push_bind(period.year)
        .push(" AND mt.month = ")
        .push_bind(period.month as i64)
        .push(" LEFT JOIN orders o ON o.order_booker_id = ob.id AND o.order_date >= ")
        .push_bind(range.start)
        .push(" AND o.order_date <= ")
        .push_bind(range.end)
        .in_list("ob.id", booker_ids)
        .push(" GROUP BY ob.id, ob.name, mt.id, mt.target_amount ORDER BY ob.name");
    let mut query = filter.finish();
    let rows = query.build_query_as::<StandingRow>().fetch_all(pool).await?;
    Ok(rows)
}

async fn daily_revenue(pool: &SqlitePool, range: DateRange, booker_ids: &[String]) -> AppResult<Vec<DailyRow>> {
    let mut filter = SqlFilter::new(
        r#"
        SELECT order_date AS date, COALESCE(SUM(total_amount), 0) AS revenue, COUNT(*) AS orders
        FROM orders
        "#,
    );
    filter
        .date_range("order_date", Some(range))
        .in_list("order_booker_id", booker_ids)
        .push(" GROUP BY order_date ORDER BY order_date");
    let mut query = filter.finish();
    let rows = query.build_query_as::<DailyRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Rank by achievement, then achieved amount. Ties keep name order.
fn rank_standings(rows: Vec<StandingRow>) -> Vec<(BookerStanding, bool)> {
    let mut standings: Vec<(BookerStanding, bool)> = rows
        .into_iter()
        .map(|row| {
            let standing = BookerStanding {
                achievement_percentage: achievement_percentage(row.achieved_amount.0, row.target_amount.0),
                order_booker_id: row.order_booker_id,
                name: row.name,
                target_amount: row.target_amount.0,
                achieved_amount: row.achieved_amount.0,
                order_count: row.order_count,
                rank: 0,
            };
            (standing, row.has_target)
        })
        .collect();
    standings.sort_by(|(a, _), (b, _)| {
        b.achievement_percentage
            .cmp(&a.achievement_percentage)
            .then_with(|| b.achieved_amount.cmp(&a.achieved_amount))
    });
    for (i, (standing, _)) in standings.iter_mut().enumerate() {
        standing.rank = u32::try_from(i + 1).unwrap_or(u32::MAX);
    }
    standings
}

impl OrderReportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Sales per product and price pair, name then sell price order
    pub async fn product_sales(&self, filters: &ProductSalesFilters) -> AppResult<ProductSalesReport> {
        let range = filters.date_range;
        let rows = self
            .db
            .execute_with_retry("product_sales_report", |pool| async move {
                let mut filter = SqlFilter::new(
                    r#"
                    SELECT p.id AS product_id, p.name AS product_name, oi.sell_price, oi.cost_price,
                           SUM(oi.quantity) AS quantity,
                           SUM(oi.return_quantity) AS return_quantity,
                           SUM(oi.cartons) AS total_cartons,
                           SUM(oi.return_cartons) AS return_cartons,
                           SUM(oi.total_amount) AS total_amount,
                           SUM(oi.return_amount) AS return_amount
                    FROM order_items oi
                    JOIN products p ON p.id = oi.product_id
                    JOIN orders o ON o.id = oi.order_id
                    "#,
                );
                filter
                    .date_range("o.order_date", range)
                    .push(
                        " GROUP BY p.id, p.name, oi.sell_price, oi.cost_price \
                         ORDER BY p.name, oi.sell_price",
                    );
                let mut query = filter.finish();
                let rows = query.build_query_as::<ProductSalesQueryRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        let rows: Vec<ProductSalesRow> = rows.into_iter().map(ProductSalesRow::from).collect();
        let summary = ProductSalesSummary::from_rows(&rows);
        debug!(rows = rows.len(), net = %summary.total_net_amount, "Built product sales report");
        Ok(ProductSalesReport { rows, summary })
    }

    /// Revenue, margin, returns, target pace and alerts over orders.
    ///
    /// Targets are those of the month the window starts in.
    pub async fn dashboard(&self, filters: &DashboardFilters) -> AppResult<DashboardMetrics> {
        let range = filters
            .date_range
            .unwrap_or_else(|| YearMonth::of(Utc::now().date_naive()).range());
        let period = YearMonth::of(range.start);
        let booker_ids = filters.order_booker_ids.as_slice();

        let data = self
            .db
            .execute_with_retry("dashboard_metrics", |pool| async move {
                Ok::<_, AppError>(DashboardData {
                    current: order_totals(&pool, range, booker_ids).await?,
                    previous_revenue: order_totals(&pool, previous_window(range), booker_ids)
                        .await?
                        .revenue
                        .0,
                    target_revenue: target_total(&pool, period, booker_ids).await?,
                    product_returns: product_return_rates(&pool, range, booker_ids).await?,
                    standings: standings(&pool, range, period, booker_ids).await?,
                    daily: daily_revenue(&pool, range, booker_ids).await?,
                })
            })
            .await?;

        let current_revenue = data.current.revenue.0;
        let revenue = RevenueMetrics {
            current_revenue,
            order_count: data.current.order_count,
            previous_revenue: data.previous_revenue,
            target_revenue: data.target_revenue,
            achievement_percentage: achievement_percentage(current_revenue, data.target_revenue),
            growth_percentage: growth_rate(current_revenue, data.previous_revenue),
        };

        let profit_margin = ProfitMargin::new(current_revenue, data.current.cost.0, data.current.profit.0);

        let by_product = data
            .product_returns
            .into_iter()
            .map(|row| ProductReturnRate {
                return_rate: percentage(row.return_cartons.0, row.total_cartons.0),
                product_id: row.product_id,
                product_name: row.product_name,
                total_cartons: row.total_cartons.0,
                return_cartons: row.return_cartons.0,
            })
            .collect();
        let return_rates = ReturnRates::new(
            data.current.total_cartons.0,
            data.current.return_cartons.0,
            by_product,
        );

        let ranked = rank_standings(data.standings);
        let with_target: Vec<&BookerStanding> = ranked
            .iter()
            .filter(|(s, has_target)| *has_target && s.target_amount > Decimal::ZERO)
            .map(|(s, _)| s)
            .collect();
        let target_progress = with_target
            .iter()
            .map(|s| TargetPaceRow::new(s, range.end))
            .collect();

        let mut alerts: Vec<DashboardAlert> = DashboardAlert::high_return_rate(return_rates.overall_rate)
            .into_iter()
            .collect();
        alerts.extend(with_target.iter().filter_map(|s| DashboardAlert::target_miss_risk(s)));

        let top_performers = ranked
            .iter()
            .take(TOP_PERFORMERS)
            .map(|(s, _)| s.clone())
            .collect();

        let sales_trend = SalesTrend::from_daily(
            data.daily
                .into_iter()
                .map(|row| DailyRevenue {
                    date: row.date,
                    revenue: row.revenue.0,
                    orders: row.orders,
                })
                .collect(),
        );

        debug!(
            start = %range.start,
            end = %range.end,
            orders = revenue.order_count,
            alerts = alerts.len(),
            "Built dashboard metrics"
        );

        Ok(DashboardMetrics {
            range,
            revenue,
            profit_margin,
            return_rates,
            top_performers,
            target_progress,
            sales_trend,
            alerts,
        })
    }
}
