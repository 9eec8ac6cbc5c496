//! Daily entry service
//!
//! Composite writes (entry plus items) run in one immediate transaction: the
//! header is inserted with zero totals, each item is priced and inserted, then
//! the header totals and the booker's monthly target are brought up to date.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    aggregate_monthly, daily_entry_item_totals, new_id, validate_month, validate_price,
    validate_sold_and_returned, DailyEntry, DailyEntryItem, DailyEntryTotals, DailyEntryWithItems,
    DateRange, MonthlyAnalytics, QuantityTotals, YearMonth,
};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};
use tracing::debug;
use validator::Validate;

use super::monthly_target::refresh_achievement;
use super::product::fetch_referenced_product;
use super::{ensure_reference, now, rule, Referenced};
use crate::error::{AppError, AppResult};
use crate::notify::{order_booker_key, ChangeKind, ChangeNotifier, EntityKind, LedgerChange};
use crate::storage::{Database, SqlDecimal, SqlFilter};

const SELECT_ENTRIES: &str = r#"
    SELECT id, order_booker_id, date, notes, total_amount, total_return_amount, net_amount,
           created_at, updated_at
    FROM daily_entries
"#;

const SELECT_ITEMS: &str = r#"
    SELECT id, daily_entry_id, product_id, quantity_sold, quantity_returned, net_quantity,
           cost_price_override, sell_price_override, cost_price, sell_price,
           total_cost, total_revenue, created_at, updated_at
    FROM daily_entry_items
"#;

#[derive(Clone)]
pub struct DailyEntryService {
    db: Database,
    notifier: ChangeNotifier,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DailyEntryItemInput {
    #[validate(length(min = 1, message = "Product is required"))]
    pub product_id: String,
    pub quantity_sold: i64,
    #[serde(default)]
    pub quantity_returned: i64,
    pub cost_price_override: Option<Decimal>,
    pub sell_price_override: Option<Decimal>,
}

impl DailyEntryItemInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        rule(
            "quantity_returned",
            validate_sold_and_returned(self.quantity_sold, self.quantity_returned),
        )?;
        if let Some(cost) = self.cost_price_override {
            rule("cost_price_override", validate_price(cost))?;
        }
        if let Some(sell) = self.sell_price_override {
            rule("sell_price_override", validate_price(sell))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDailyEntryInput {
    #[validate(length(min = 1, message = "Order booker is required"))]
    pub order_booker_id: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub items: Vec<DailyEntryItemInput>,
}

/// Patch for an entry. `items: Some(..)` replaces the whole item set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDailyEntryInput {
    pub notes: Option<String>,
    pub items: Option<Vec<DailyEntryItemInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyEntryFilters {
    #[serde(default)]
    pub order_booker_ids: Vec<String>,
    pub date_range: Option<DateRange>,
    /// With `month`, restricts to that calendar month when no range is given
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl DailyEntryFilters {
    fn effective_range(&self) -> Option<DateRange> {
        self.date_range.or_else(|| match (self.year, self.month) {
            (Some(year), Some(month)) => DateRange::month(year, month),
            _ => None,
        })
    }
}

/// A sold line that can still take returns
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReturnableItem {
    #[serde(flatten)]
    pub item: DailyEntryItem,
    pub date: NaiveDate,
    pub product_name: String,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: String,
    order_booker_id: String,
    date: NaiveDate,
    notes: Option<String>,
    total_amount: SqlDecimal,
    total_return_amount: SqlDecimal,
    net_amount: SqlDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EntryRow> for DailyEntry {
    fn from(row: EntryRow) -> Self {
        DailyEntry {
            id: row.id,
            order_booker_id: row.order_booker_id,
            date: row.date,
            notes: row.notes,
            total_amount: row.total_amount.into(),
            total_return_amount: row.total_return_amount.into(),
            net_amount: row.net_amount.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    daily_entry_id: String,
    product_id: String,
    quantity_sold: i64,
    quantity_returned: i64,
    net_quantity: i64,
    cost_price_override: Option<SqlDecimal>,
    sell_price_override: Option<SqlDecimal>,
    cost_price: SqlDecimal,
    sell_price: SqlDecimal,
    total_cost: SqlDecimal,
    total_revenue: SqlDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for DailyEntryItem {
    fn from(row: ItemRow) -> Self {
        DailyEntryItem {
            id: row.id,
            daily_entry_id: row.daily_entry_id,
            product_id: row.product_id,
            quantity_sold: row.quantity_sold,
            quantity_returned: row.quantity_returned,
            net_quantity: row.net_quantity,
            cost_price_override: row.cost_price_override.map(Into::into),
            sell_price_override: row.sell_price_override.map(Into::into),
            cost_price: row.cost_price.into(),
            sell_price: row.sell_price.into(),
            total_cost: row.total_cost.into(),
            total_revenue: row.total_revenue.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReturnableRow {
    #[sqlx(flatten)]
    item: ItemRow,
    date: NaiveDate,
    product_name: String,
}

#[derive(Debug, FromRow)]
struct QuantityRow {
    items: i64,
    sold: i64,
    returned: i64,
}

// ============================================================================
// Statements shared by the transactional paths
// ============================================================================

async fn fetch_entry<'e, E>(executor: E, id: &str) -> AppResult<Option<DailyEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, EntryRow>(&format!("{} WHERE id = ?", SELECT_ENTRIES))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(DailyEntry::from))
}

async fn fetch_items<'e, E>(executor: E, entry_id: &str) -> AppResult<Vec<DailyEntryItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "{} WHERE daily_entry_id = ? ORDER BY rowid ASC",
        SELECT_ITEMS
    ))
    .bind(entry_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(DailyEntryItem::from).collect())
}

/// Price and insert every item at the product's current prices unless overridden
async fn insert_items(
    conn: &mut SqliteConnection,
    entry_id: &str,
    items: &[DailyEntryItemInput],
    timestamp: DateTime<Utc>,
) -> AppResult<()> {
    for item in items {
        let product = fetch_referenced_product(&mut *conn, &item.product_id).await?;
        let cost_price = item.cost_price_override.unwrap_or(product.cost_price);
        let sell_price = item.sell_price_override.unwrap_or(product.sell_price);
        let line = daily_entry_item_totals(
            item.quantity_sold,
            item.quantity_returned,
            cost_price,
            sell_price,
        );

        sqlx::query(
            r#"
            INSERT INTO daily_entry_items (
                id, daily_entry_id, product_id, quantity_sold, quantity_returned, net_quantity,
                cost_price_override, sell_price_override, cost_price, sell_price,
                total_cost, total_revenue, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(entry_id)
        .bind(&item.product_id)
        .bind(item.quantity_sold)
        .bind(item.quantity_returned)
        .bind(line.net_quantity)
        .bind(item.cost_price_override.map(SqlDecimal))
        .bind(item.sell_price_override.map(SqlDecimal))
        .bind(SqlDecimal(cost_price))
        .bind(SqlDecimal(sell_price))
        .bind(SqlDecimal(line.total_cost))
        .bind(SqlDecimal(line.total_revenue))
        .bind(timestamp)
        .bind(timestamp)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Re-derive the header totals from the stored lines and their recorded prices
async fn recalculate(conn: &mut SqliteConnection, entry_id: &str, timestamp: DateTime<Utc>) -> AppResult<()> {
    let lines: Vec<_> = fetch_items(&mut *conn, entry_id)
        .await?
        .iter()
        .map(|item| {
            daily_entry_item_totals(
                item.quantity_sold,
                item.quantity_returned,
                item.cost_price,
                item.sell_price,
            )
        })
        .collect();
    let totals = DailyEntryTotals::from_lines(&lines);

    sqlx::query(
        r#"
        UPDATE daily_entries
        SET total_amount = ?, total_return_amount = ?, net_amount = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(SqlDecimal(totals.total_amount))
    .bind(SqlDecimal(totals.total_return_amount))
    .bind(SqlDecimal(totals.net_amount))
    .bind(timestamp)
    .bind(entry_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_entry(
    conn: &mut SqliteConnection,
    entry_id: &str,
    input: &CreateDailyEntryInput,
) -> AppResult<DailyEntry> {
    ensure_reference(&mut *conn, Referenced::OrderBooker, &input.order_booker_id).await?;
    let timestamp = now();

    sqlx::query(
        r#"
        INSERT INTO daily_entries (
            id, order_booker_id, date, notes, total_amount, total_return_amount, net_amount,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, 0, 0, 0, ?, ?)
        "#,
    )
    .bind(entry_id)
    .bind(&input.order_booker_id)
    .bind(input.date)
    .bind(&input.notes)
    .bind(timestamp)
    .bind(timestamp)
    .execute(&mut *conn)
    .await?;

    insert_items(conn, entry_id, &input.items, timestamp).await?;
    recalculate(conn, entry_id, timestamp).await?;
    refresh_achievement(conn, &input.order_booker_id, YearMonth::of(input.date)).await?;

    fetch_entry(&mut *conn, entry_id)
        .await?
        .ok_or_else(|| AppError::Internal("daily entry missing after insert".to_string()))
}

async fn update_entry(
    conn: &mut SqliteConnection,
    entry_id: &str,
    patch: &UpdateDailyEntryInput,
) -> AppResult<DailyEntry> {
    let existing = fetch_entry(&mut *conn, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily entry".to_string()))?;
    let timestamp = now();

    if let Some(notes) = &patch.notes {
        sqlx::query("UPDATE daily_entries SET notes = ?, updated_at = ? WHERE id = ?")
            .bind(notes)
            .bind(timestamp)
            .bind(entry_id)
            .execute(&mut *conn)
            .await?;
    }

    if let Some(items) = &patch.items {
        sqlx::query("DELETE FROM daily_entry_items WHERE daily_entry_id = ?")
            .bind(entry_id)
            .execute(&mut *conn)
            .await?;
        insert_items(conn, entry_id, items, timestamp).await?;
        recalculate(conn, entry_id, timestamp).await?;
        refresh_achievement(conn, &existing.order_booker_id, YearMonth::of(existing.date)).await?;
    }

    fetch_entry(&mut *conn, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily entry".to_string()))
}

async fn delete_entry(conn: &mut SqliteConnection, entry_id: &str) -> AppResult<DailyEntry> {
    let existing = fetch_entry(&mut *conn, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily entry".to_string()))?;

    sqlx::query("DELETE FROM daily_entry_items WHERE daily_entry_id = ?")
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM daily_entries WHERE id = ?")
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;
    refresh_achievement(conn, &existing.order_booker_id, YearMonth::of(existing.date)).await?;

    Ok(existing)
}

async fn apply_item_return(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity_returned: i64,
) -> AppResult<(DailyEntryItem, DailyEntry)> {
    let item = sqlx::query_as::<_, ItemRow>(&format!("{} WHERE id = ?", SELECT_ITEMS))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(DailyEntryItem::from)
        .ok_or_else(|| AppError::NotFound("Daily entry item".to_string()))?;
    rule(
        "quantity_returned",
        validate_sold_and_returned(item.quantity_sold, quantity_returned),
    )?;

    let entry = fetch_entry(&mut *conn, &item.daily_entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily entry".to_string()))?;
    let line = daily_entry_item_totals(
        item.quantity_sold,
        quantity_returned,
        item.cost_price,
        item.sell_price,
    );
    let timestamp = now();

    sqlx::query(
        r#"
        UPDATE daily_entry_items
        SET quantity_returned = ?, net_quantity = ?, total_cost = ?, total_revenue = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(quantity_returned)
    .bind(line.net_quantity)
    .bind(SqlDecimal(line.total_cost))
    .bind(SqlDecimal(line.total_revenue))
    .bind(timestamp)
    .bind(item_id)
    .execute(&mut *conn)
    .await?;

    recalculate(conn, &entry.id, timestamp).await?;
    refresh_achievement(conn, &entry.order_booker_id, YearMonth::of(entry.date)).await?;

    let item = sqlx::query_as::<_, ItemRow>(&format!("{} WHERE id = ?", SELECT_ITEMS))
        .bind(item_id)
        .fetch_one(&mut *conn)
        .await?
        .into();
    let entry = fetch_entry(&mut *conn, &entry.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily entry".to_string()))?;
    Ok((item, entry))
}

impl DailyEntryService {
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    /// Newest first
    pub async fn list(&self, filters: &DailyEntryFilters) -> AppResult<Vec<DailyEntry>> {
        let range = filters.effective_range();
        let rows = self
            .db
            .execute_with_retry("list_daily_entries", |pool| async move {
                let mut filter = SqlFilter::new(SELECT_ENTRIES);
                filter
                    .in_list("order_booker_id", &filters.order_booker_ids)
                    .date_range("date", range)
                    .push(" ORDER BY date DESC, created_at DESC");
                let mut query = filter.finish();
                let rows = query.build_query_as::<EntryRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows.into_iter().map(DailyEntry::from).collect())
    }

    pub async fn by_month(&self, year: i32, month: u32) -> AppResult<Vec<DailyEntry>> {
        rule("month", validate_month(month))?;
        self.list(&DailyEntryFilters {
            year: Some(year),
            month: Some(month),
            ..Default::default()
        })
        .await
    }

    pub async fn by_order_booker(
        &self,
        order_booker_id: &str,
        date_range: Option<DateRange>,
    ) -> AppResult<Vec<DailyEntry>> {
        self.list(&DailyEntryFilters {
            order_booker_ids: vec![order_booker_id.to_string()],
            date_range,
            ..Default::default()
        })
        .await
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<DailyEntry>> {
        self.db
            .execute_with_retry("get_daily_entry", |pool| async move {
                fetch_entry(&pool, id).await
            })
            .await
    }

    pub async fn items_for_entry(&self, entry_id: &str) -> AppResult<Vec<DailyEntryItem>> {
        self.db
            .execute_with_retry("list_daily_entry_items", |pool| async move {
                fetch_items(&pool, entry_id).await
            })
            .await
    }

    pub async fn get_with_items(&self, id: &str) -> AppResult<Option<DailyEntryWithItems>> {
        let Some(entry) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.items_for_entry(id).await?;
        Ok(Some(DailyEntryWithItems { entry, items }))
    }

    /// Entries matching `filters`, each with its items
    pub async fn list_with_items(&self, filters: &DailyEntryFilters) -> AppResult<Vec<DailyEntryWithItems>> {
        let entries = self.list(filters).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        let ids = &ids;
        let rows = self
            .db
            .execute_with_retry("list_items_for_entries", |pool| async move {
                let mut filter = SqlFilter::new(SELECT_ITEMS);
                filter
                    .in_list("daily_entry_id", ids)
                    .push(" ORDER BY rowid ASC");
                let mut query = filter.finish();
                let rows = query.build_query_as::<ItemRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        let mut by_entry: HashMap<String, Vec<DailyEntryItem>> = HashMap::new();
        for row in rows {
            let item = DailyEntryItem::from(row);
            by_entry.entry(item.daily_entry_id.clone()).or_default().push(item);
        }

        Ok(entries
            .into_iter()
            .map(|entry| {
                let items = by_entry.remove(&entry.id).unwrap_or_default();
                DailyEntryWithItems { entry, items }
            })
            .collect())
    }

    pub async fn create(&self, input: CreateDailyEntryInput) -> AppResult<DailyEntryWithItems> {
        input.validate()?;
        if input.items.is_empty() {
            return Err(AppError::validation("items", "At least one item is required"));
        }
        for item in &input.items {
            item.check()?;
        }

        let entry_id = new_id();
        let tx_id = entry_id.clone();
        let entry = self
            .db
            .execute_transaction("create_daily_entry", move |conn| {
                let (id, input) = (tx_id.clone(), input.clone());
                Box::pin(async move { create_entry(conn, &id, &input).await })
            })
            .await
            .map_err(|e| e.into_creation_failed("daily entry"))?;

        debug!(
            daily_entry_id = %entry.id,
            order_booker_id = %entry.order_booker_id,
            net_amount = %entry.net_amount,
            "Daily entry created"
        );
        self.publish(ChangeKind::Created, &entry);
        self.get_with_items(&entry_id)
            .await?
            .ok_or_else(|| AppError::Internal("created daily entry vanished".to_string()))
    }

    pub async fn update(&self, id: &str, patch: UpdateDailyEntryInput) -> AppResult<DailyEntryWithItems> {
        if let Some(items) = &patch.items {
            if items.is_empty() {
                return Err(AppError::validation("items", "At least one item is required"));
            }
            for item in items {
                item.check()?;
            }
        }

        let entry_id = id.to_string();
        let entry = self
            .db
            .execute_transaction("update_daily_entry", move |conn| {
                let (id, patch) = (entry_id.clone(), patch.clone());
                Box::pin(async move { update_entry(conn, &id, &patch).await })
            })
            .await
            .map_err(|e| e.into_update_failed("daily entry"))?;

        debug!(daily_entry_id = %entry.id, "Daily entry updated");
        self.publish(ChangeKind::Updated, &entry);
        self.get_with_items(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Daily entry".to_string()))
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let entry_id = id.to_string();
        let removed = self
            .db
            .execute_transaction("delete_daily_entry", move |conn| {
                let id = entry_id.clone();
                Box::pin(async move { delete_entry(conn, &id).await })
            })
            .await?;

        debug!(daily_entry_id = %id, "Daily entry deleted");
        self.publish(ChangeKind::Deleted, &removed);
        Ok(())
    }

    /// Change one line's returned quantity and re-derive the entry totals
    pub async fn update_item_return(&self, item_id: &str, quantity_returned: i64) -> AppResult<DailyEntryItem> {
        if quantity_returned < 0 {
            return Err(AppError::validation(
                "quantity_returned",
                "Quantities cannot be negative",
            ));
        }

        let target = item_id.to_string();
        let (item, entry) = self
            .db
            .execute_transaction("update_daily_entry_item_return", move |conn| {
                let id = target.clone();
                Box::pin(async move { apply_item_return(conn, &id, quantity_returned).await })
            })
            .await
            .map_err(|e| e.into_update_failed("daily entry item"))?;

        self.publish(ChangeKind::Updated, &entry);
        Ok(item)
    }

    /// Lines sold by a booker on or after `from` with units left to return
    pub async fn returnable_items(&self, order_booker_id: &str, from: NaiveDate) -> AppResult<Vec<ReturnableItem>> {
        let rows = self
            .db
            .execute_with_retry("list_returnable_items", |pool| async move {
                let rows = sqlx::query_as::<_, ReturnableRow>(
                    r#"
                    SELECT dei.id, dei.daily_entry_id, dei.product_id, dei.quantity_sold,
                           dei.quantity_returned, dei.net_quantity, dei.cost_price_override,
                           dei.sell_price_override, dei.cost_price, dei.sell_price,
                           dei.total_cost, dei.total_revenue,
                           dei.created_at, dei.updated_at,
                           de.date AS date, p.name AS product_name
                    FROM daily_entry_items dei
                    JOIN daily_entries de ON de.id = dei.daily_entry_id
                    JOIN products p ON p.id = dei.product_id
                    WHERE de.order_booker_id = ? AND de.date >= ? AND dei.net_quantity > 0
                    ORDER BY de.date DESC, p.name ASC
                    "#,
                )
                .bind(order_booker_id)
                .bind(from)
                .fetch_all(&pool)
                .await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReturnableItem {
                item: row.item.into(),
                date: row.date,
                product_name: row.product_name,
            })
            .collect())
    }

    /// Totals, quantities and rates for one calendar month
    pub async fn monthly_analytics(&self, year: i32, month: u32) -> AppResult<MonthlyAnalytics> {
        rule("month", validate_month(month))?;
        let range = DateRange::month(year, month)
            .ok_or_else(|| AppError::validation("month", "Month must be between 1 and 12"))?;

        let entries = self.by_month(year, month).await?;
        let quantities = self
            .db
            .execute_with_retry("monthly_item_quantities", |pool| async move {
                let row = sqlx::query_as::<_, QuantityRow>(
                    r#"
                    SELECT COUNT(dei.id) AS items,
                           COALESCE(SUM(dei.quantity_sold), 0) AS sold,
                           COALESCE(SUM(dei.quantity_returned), 0) AS returned
                    FROM daily_entry_items dei
                    JOIN daily_entries de ON de.id = dei.daily_entry_id
                    WHERE de.date >= ? AND de.date <= ?
                    "#,
                )
                .bind(range.start)
                .bind(range.end)
                .fetch_one(&pool)
                .await?;
                Ok::<_, AppError>(row)
            })
            .await?;

        Ok(aggregate_monthly(
            year,
            month,
            &entries,
            QuantityTotals {
                items: quantities.items,
                sold: quantities.sold,
                returned: quantities.returned,
            },
        ))
    }

    fn publish(&self, kind: ChangeKind, entry: &DailyEntry) {
        self.notifier.publish(
            LedgerChange::new(EntityKind::DailyEntry, kind, &entry.id)
                .with_month(entry.date)
                .with_key(order_booker_key(&entry.order_booker_id)),
        );
    }
}
