//! Monthly target service
//!
//! Achieved amounts are never entered by hand: they are the sum of the booker's
//! daily-entry net amounts for the month, refreshed whenever an entry changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    daily_target, new_id, target_progress, validate_month, validate_target_amount, validate_year,
    working_days, MonthlyTarget, YearMonth,
};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};
use tracing::debug;

use super::{ensure_reference, now, rule, Referenced};
use crate::error::{AppError, AppResult};
use crate::notify::{month_key, order_booker_key, ChangeKind, ChangeNotifier, EntityKind, LedgerChange};
use crate::storage::{Database, SqlDecimal, SqlFilter};

const SELECT_TARGETS: &str = r#"
    SELECT id, order_booker_id, year, month, target_amount, achieved_amount, remaining_amount,
           achievement_percentage, days_in_month, working_days_in_month, daily_target_amount,
           created_at, updated_at
    FROM monthly_targets
"#;

#[derive(Clone)]
pub struct MonthlyTargetService {
    db: Database,
    notifier: ChangeNotifier,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetInput {
    pub order_booker_id: String,
    pub year: i32,
    pub month: u32,
    pub target_amount: Decimal,
}

impl TargetInput {
    fn validate(&self) -> AppResult<YearMonth> {
        rule("year", validate_year(self.year))?;
        rule("month", validate_month(self.month))?;
        rule("target_amount", validate_target_amount(self.target_amount))?;
        YearMonth::new(self.year, self.month)
            .ok_or_else(|| AppError::validation("month", "Month must be between 1 and 12"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyTargetFilters {
    pub year: Option<i32>,
    pub month: Option<u32>,
    #[serde(default)]
    pub order_booker_ids: Vec<String>,
}

#[derive(Debug, FromRow)]
struct TargetRow {
    id: String,
    order_booker_id: String,
    year: i64,
    month: i64,
    target_amount: SqlDecimal,
    achieved_amount: SqlDecimal,
    remaining_amount: SqlDecimal,
    achievement_percentage: SqlDecimal,
    days_in_month: i64,
    working_days_in_month: i64,
    daily_target_amount: SqlDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TargetRow> for MonthlyTarget {
    fn from(row: TargetRow) -> Self {
        MonthlyTarget {
            id: row.id,
            order_booker_id: row.order_booker_id,
            year: row.year as i32,
            month: row.month as u32,
            target_amount: row.target_amount.into(),
            achieved_amount: row.achieved_amount.into(),
            remaining_amount: row.remaining_amount.into(),
            achievement_percentage: row.achievement_percentage.into(),
            days_in_month: row.days_in_month as u32,
            working_days_in_month: row.working_days_in_month as u32,
            daily_target_amount: row.daily_target_amount.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

async fn fetch_target<'e, E>(executor: E, id: &str) -> AppResult<Option<MonthlyTarget>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TargetRow>(&format!("{} WHERE id = ?", SELECT_TARGETS))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(MonthlyTarget::from))
}

async fn fetch_target_for<'e, E>(
    executor: E,
    order_booker_id: &str,
    period: YearMonth,
) -> AppResult<Option<MonthlyTarget>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TargetRow>(&format!(
        "{} WHERE order_booker_id = ? AND year = ? AND month = ?",
        SELECT_TARGETS
    ))
    .bind(order_booker_id)
    .bind(period.year)
    .bind(period.month as i64)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(MonthlyTarget::from))
}

/// Net amount a booker's daily entries add up to in `period`
async fn achieved_in(
    conn: &mut SqliteConnection,
    order_booker_id: &str,
    period: YearMonth,
) -> AppResult<Decimal> {
    let range = period.range();
    let total = sqlx::query_scalar::<_, SqlDecimal>(
        r#"
        SELECT COALESCE(SUM(net_amount), 0)
        FROM daily_entries
        WHERE order_booker_id = ? AND date >= ? AND date <= ?
        "#,
    )
    .bind(order_booker_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_one(&mut *conn)
    .await?;
    Ok(total.into())
}

/// Insert or overwrite the target for (booker, month), deriving every other column
async fn write_target(
    conn: &mut SqliteConnection,
    order_booker_id: &str,
    period: YearMonth,
    target_amount: Decimal,
) -> AppResult<String> {
    let achieved = achieved_in(conn, order_booker_id, period).await?;
    let progress = target_progress(target_amount, achieved);
    let days = period.days();
    let working = working_days(days);
    let timestamp = now();

    let id = sqlx::query_scalar::<_, String>(
        r#"
        INSERT INTO monthly_targets (
            id, order_booker_id, year, month, target_amount, achieved_amount, remaining_amount,
            achievement_percentage, days_in_month, working_days_in_month, daily_target_amount,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (order_booker_id, year, month) DO UPDATE SET
            target_amount = excluded.target_amount,
            achieved_amount = excluded.achieved_amount,
            remaining_amount = excluded.remaining_amount,
            achievement_percentage = excluded.achievement_percentage,
            daily_target_amount = excluded.daily_target_amount,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(new_id())
    .bind(order_booker_id)
    .bind(period.year)
    .bind(period.month as i64)
    .bind(SqlDecimal(target_amount))
    .bind(SqlDecimal(progress.achieved_amount))
    .bind(SqlDecimal(progress.remaining_amount))
    .bind(SqlDecimal(progress.achievement_percentage))
    .bind(days as i64)
    .bind(working as i64)
    .bind(SqlDecimal(daily_target(target_amount, working)))
    .bind(timestamp)
    .bind(timestamp)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Recompute the stored progress of the booker's target for `period`, if one exists.
///
/// Runs on the caller's connection so it shares the caller's transaction.
pub(crate) async fn refresh_achievement(
    conn: &mut SqliteConnection,
    order_booker_id: &str,
    period: YearMonth,
) -> AppResult<()> {
    let Some(target) = fetch_target_for(&mut *conn, order_booker_id, period).await? else {
        return Ok(());
    };
    let achieved = achieved_in(conn, order_booker_id, period).await?;
    let progress = target_progress(target.target_amount, achieved);

    sqlx::query(
        r#"
        UPDATE monthly_targets
        SET achieved_amount = ?, remaining_amount = ?, achievement_percentage = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(SqlDecimal(progress.achieved_amount))
    .bind(SqlDecimal(progress.remaining_amount))
    .bind(SqlDecimal(progress.achievement_percentage))
    .bind(now())
    .bind(&target.id)
    .execute(&mut *conn)
    .await?;

    debug!(
        order_booker_id,
        period = %period,
        achieved = %progress.achieved_amount,
        "Target achievement refreshed"
    );
    Ok(())
}

async fn create_target(conn: &mut SqliteConnection, input: &TargetInput, period: YearMonth) -> AppResult<String> {
    ensure_reference(&mut *conn, Referenced::OrderBooker, &input.order_booker_id).await?;
    if fetch_target_for(&mut *conn, &input.order_booker_id, period).await?.is_some() {
        return Err(AppError::Conflict {
            resource: "monthly_target".to_string(),
            message: format!("A target for {} already exists for this booker", period),
        });
    }
    write_target(conn, &input.order_booker_id, period, input.target_amount).await
}

async fn update_target_amount(conn: &mut SqliteConnection, id: &str, target_amount: Decimal) -> AppResult<MonthlyTarget> {
    let existing = fetch_target(&mut *conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Monthly target".to_string()))?;
    let period = YearMonth::new(existing.year, existing.month)
        .ok_or_else(|| AppError::Internal(format!("target {} has invalid month", id)))?;
    write_target(conn, &existing.order_booker_id, period, target_amount).await?;
    fetch_target(&mut *conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Monthly target".to_string()))
}

async fn upsert_all(conn: &mut SqliteConnection, inputs: &[(TargetInput, YearMonth)]) -> AppResult<Vec<String>> {
    let mut ids = Vec::with_capacity(inputs.len());
    for (input, period) in inputs {
        ensure_reference(&mut *conn, Referenced::OrderBooker, &input.order_booker_id).await?;
        ids.push(write_target(conn, &input.order_booker_id, *period, input.target_amount).await?);
    }
    Ok(ids)
}

async fn copy_targets(
    conn: &mut SqliteConnection,
    from: YearMonth,
    to: YearMonth,
    order_booker_ids: &[String],
) -> AppResult<Vec<String>> {
    let mut filter = SqlFilter::new(SELECT_TARGETS);
    filter
        .eq("year", from.year)
        .eq("month", from.month as i64)
        .in_list("order_booker_id", order_booker_ids);
    let mut query = filter.finish();
    let sources = query.build_query_as::<TargetRow>().fetch_all(&mut *conn).await?;

    let mut ids = Vec::new();
    for source in sources {
        if fetch_target_for(&mut *conn, &source.order_booker_id, to).await?.is_some() {
            continue;
        }
        ids.push(write_target(conn, &source.order_booker_id, to, source.target_amount.into()).await?);
    }
    Ok(ids)
}

impl MonthlyTargetService {
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    /// Newest month first, larger targets first within a month
    pub async fn list(&self, filters: &MonthlyTargetFilters) -> AppResult<Vec<MonthlyTarget>> {
        let rows = self
            .db
            .execute_with_retry("list_monthly_targets", |pool| async move {
                let mut filter = SqlFilter::new(SELECT_TARGETS);
                filter
                    .eq_opt("year", filters.year)
                    .eq_opt("month", filters.month.map(i64::from))
                    .in_list("order_booker_id", &filters.order_booker_ids)
                    .push(" ORDER BY year DESC, month DESC, target_amount DESC");
                let mut query = filter.finish();
                let rows = query.build_query_as::<TargetRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows.into_iter().map(MonthlyTarget::from).collect())
    }

    pub async fn by_month(&self, year: i32, month: u32) -> AppResult<Vec<MonthlyTarget>> {
        self.list(&MonthlyTargetFilters {
            year: Some(year),
            month: Some(month),
            ..Default::default()
        })
        .await
    }

    pub async fn by_order_booker(&self, order_booker_id: &str) -> AppResult<Vec<MonthlyTarget>> {
        self.list(&MonthlyTargetFilters {
            order_booker_ids: vec![order_booker_id.to_string()],
            ..Default::default()
        })
        .await
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<MonthlyTarget>> {
        self.db
            .execute_with_retry("get_monthly_target", |pool| async move {
                fetch_target(&pool, id).await
            })
            .await
    }

    /// Create a target; achieved is seeded from entries already recorded
    pub async fn create(&self, input: TargetInput) -> AppResult<MonthlyTarget> {
        let period = input.validate()?;

        let id = self
            .db
            .execute_transaction("create_monthly_target", move |conn| {
                let input = input.clone();
                Box::pin(async move { create_target(conn, &input, period).await })
            })
            .await
            .map_err(|e| e.into_creation_failed("monthly target"))?;

        let target = self
            .get_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("created target vanished".to_string()))?;
        self.publish(ChangeKind::Created, &target);
        Ok(target)
    }

    /// Change the target amount, re-deriving remaining, percentage and daily target
    pub async fn update(&self, id: &str, target_amount: Decimal) -> AppResult<MonthlyTarget> {
        rule("target_amount", validate_target_amount(target_amount))?;
        let id = id.to_string();

        let target = self
            .db
            .execute_transaction("update_monthly_target", move |conn| {
                let id = id.clone();
                Box::pin(async move { update_target_amount(conn, &id, target_amount).await })
            })
            .await
            .map_err(|e| e.into_update_failed("monthly target"))?;

        self.publish(ChangeKind::Updated, &target);
        Ok(target)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Monthly target".to_string()))?;

        let result = self
            .db
            .execute_with_retry("delete_monthly_target", |pool| async move {
                let result = sqlx::query("DELETE FROM monthly_targets WHERE id = ?")
                    .bind(id)
                    .execute(&pool)
                    .await?;
                Ok::<_, AppError>(result)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Monthly target".to_string()));
        }
        self.publish(ChangeKind::Deleted, &existing);
        Ok(())
    }

    /// Create or overwrite many targets in one transaction
    pub async fn batch_upsert(&self, inputs: Vec<TargetInput>) -> AppResult<Vec<MonthlyTarget>> {
        let mut validated = Vec::with_capacity(inputs.len());
        for input in inputs {
            let period = input.validate()?;
            validated.push((input, period));
        }

        let ids = self
            .db
            .execute_transaction("batch_upsert_monthly_targets", move |conn| {
                let validated = validated.clone();
                Box::pin(async move { upsert_all(conn, &validated).await })
            })
            .await
            .map_err(|e| e.into_update_failed("monthly targets"))?;

        self.collect_and_publish(ids, ChangeKind::Updated).await
    }

    /// Copy `from`'s targets into `to`, skipping bookers that already have one.
    ///
    /// An empty `order_booker_ids` copies every booker's target.
    pub async fn copy_from_month(
        &self,
        from: YearMonth,
        to: YearMonth,
        order_booker_ids: Vec<String>,
    ) -> AppResult<Vec<MonthlyTarget>> {
        let ids = self
            .db
            .execute_transaction("copy_monthly_targets", move |conn| {
                let order_booker_ids = order_booker_ids.clone();
                Box::pin(async move { copy_targets(conn, from, to, &order_booker_ids).await })
            })
            .await
            .map_err(|e| e.into_creation_failed("monthly targets"))?;

        self.collect_and_publish(ids, ChangeKind::Created).await
    }

    async fn collect_and_publish(&self, ids: Vec<String>, kind: ChangeKind) -> AppResult<Vec<MonthlyTarget>> {
        let mut targets = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(target) = self.get_by_id(&id).await? {
                self.publish(kind, &target);
                targets.push(target);
            }
        }
        Ok(targets)
    }

    fn publish(&self, kind: ChangeKind, target: &MonthlyTarget) {
        let mut change = LedgerChange::new(EntityKind::MonthlyTarget, kind, &target.id)
            .with_key(order_booker_key(&target.order_booker_id));
        if let Some(period) = YearMonth::new(target.year, target.month) {
            change = change.with_key(month_key(period));
        }
        self.notifier.publish(change);
    }
}
