//! Order service
//!
//! An order's header totals are always the sum of its items. Every item
//! mutation re-reads the items and rewrites the header in the same
//! transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    new_id, order_item_totals, validate_order_quantity, validate_price, DateRange, Order,
    OrderItem, OrderItemTotals, OrderStatus, OrderSummary, OrderTotals, OrderWithItems, SortOrder,
};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};
use tracing::debug;
use validator::Validate;

use super::product::fetch_referenced_product;
use super::{ensure_reference, now, rule, Referenced};
use crate::error::{AppError, AppResult};
use crate::notify::{order_booker_key, order_key, ChangeKind, ChangeNotifier, EntityKind, LedgerChange};
use crate::storage::{Database, SqlDecimal, SqlFilter};

const SELECT_ORDERS: &str = r#"
    SELECT id, order_booker_id, order_date, supply_date, status, notes, total_amount, total_cost,
           total_profit, total_cartons, return_cartons, return_amount, created_at, updated_at
    FROM orders
"#;

const SELECT_ORDER_ITEMS: &str = r#"
    SELECT id, order_id, product_id, quantity, cost_price, sell_price, total_cost, total_amount,
           profit, cartons, return_quantity, return_amount, return_cartons, created_at, updated_at
    FROM order_items
"#;

#[derive(Clone)]
pub struct OrderService {
    db: Database,
    notifier: ChangeNotifier,
}

/// One order line. Prices default to the product's current prices.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderItemInput {
    #[validate(length(min = 1, message = "Product is required"))]
    pub product_id: String,
    /// Units, not cartons
    pub quantity: i64,
    pub cost_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    #[serde(default)]
    pub return_quantity: i64,
}

impl OrderItemInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        rule(
            "quantity",
            validate_order_quantity(self.quantity, self.return_quantity),
        )?;
        if let Some(cost) = self.cost_price {
            rule("cost_price", validate_price(cost))?;
        }
        if let Some(sell) = self.sell_price {
            rule("sell_price", validate_price(sell))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, message = "Order booker is required"))]
    pub order_booker_id: String,
    pub order_date: NaiveDate,
    pub supply_date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderInput {
    /// Moves the order to another booker
    pub order_booker_id: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub supply_date: Option<NaiveDate>,
    /// Sets `supply_date` back to NULL; wins over `supply_date`
    #[serde(default)]
    pub clear_supply_date: bool,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    /// Replaces every item when present
    pub items: Option<Vec<OrderItemInput>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UpdateOrderItemInput {
    pub quantity: Option<i64>,
    pub sell_price: Option<Decimal>,
    pub return_quantity: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    OrderDate,
    SupplyDate,
    TotalAmount,
    TotalCost,
    TotalProfit,
    TotalCartons,
    Status,
    CreatedAt,
}

impl OrderSort {
    fn column(&self) -> &'static str {
        match self {
            OrderSort::OrderDate => "order_date",
            OrderSort::SupplyDate => "supply_date",
            OrderSort::TotalAmount => "total_amount",
            OrderSort::TotalCost => "total_cost",
            OrderSort::TotalProfit => "total_profit",
            OrderSort::TotalCartons => "total_cartons",
            OrderSort::Status => "status",
            OrderSort::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilters {
    pub order_booker_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub date_range: Option<DateRange>,
    /// Substring of the notes
    pub search: Option<String>,
    pub sort_by: Option<OrderSort>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl OrderFilters {
    fn order_by(&self) -> String {
        match self.sort_by {
            Some(sort) => format!(
                " ORDER BY {} {}, created_at DESC",
                sort.column(),
                self.sort_order.as_sql()
            ),
            None => " ORDER BY order_date DESC, created_at DESC".to_string(),
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    order_booker_id: String,
    order_date: NaiveDate,
    supply_date: Option<NaiveDate>,
    status: String,
    notes: Option<String>,
    total_amount: SqlDecimal,
    total_cost: SqlDecimal,
    total_profit: SqlDecimal,
    total_cartons: SqlDecimal,
    return_cartons: SqlDecimal,
    return_amount: SqlDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            order_booker_id: row.order_booker_id,
            order_date: row.order_date,
            supply_date: row.supply_date,
            // The column is CHECK-constrained to the known statuses
            status: OrderStatus::parse(&row.status).unwrap_or_default(),
            notes: row.notes,
            total_amount: row.total_amount.into(),
            total_cost: row.total_cost.into(),
            total_profit: row.total_profit.into(),
            total_cartons: row.total_cartons.into(),
            return_cartons: row.return_cartons.into(),
            return_amount: row.return_amount.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    quantity: i64,
    cost_price: SqlDecimal,
    sell_price: SqlDecimal,
    total_cost: SqlDecimal,
    total_amount: SqlDecimal,
    profit: SqlDecimal,
    cartons: SqlDecimal,
    return_quantity: i64,
    return_amount: SqlDecimal,
    return_cartons: SqlDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            cost_price: row.cost_price.into(),
            sell_price: row.sell_price.into(),
            total_cost: row.total_cost.into(),
            total_amount: row.total_amount.into(),
            profit: row.profit.into(),
            cartons: row.cartons.into(),
            return_quantity: row.return_quantity,
            return_amount: row.return_amount.into(),
            return_cartons: row.return_cartons.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ============================================================================
// Transactional building blocks
// ============================================================================

async fn fetch_order<'e, E>(executor: E, id: &str) -> AppResult<Option<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, OrderRow>(&format!("{} WHERE id = ?", SELECT_ORDERS))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Order::from))
}

async fn fetch_order_items<'e, E>(executor: E, order_id: &str) -> AppResult<Vec<OrderItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
        "{} WHERE order_id = ? ORDER BY rowid ASC",
        SELECT_ORDER_ITEMS
    ))
    .bind(order_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

async fn fetch_order_item<'e, E>(executor: E, id: &str) -> AppResult<Option<OrderItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, OrderItemRow>(&format!("{} WHERE id = ?", SELECT_ORDER_ITEMS))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(OrderItem::from))
}

async fn insert_item(
    conn: &mut SqliteConnection,
    item_id: &str,
    order_id: &str,
    input: &OrderItemInput,
    timestamp: DateTime<Utc>,
) -> AppResult<()> {
    let product = fetch_referenced_product(&mut *conn, &input.product_id).await?;
    let cost_price = input.cost_price.unwrap_or(product.cost_price);
    let sell_price = input.sell_price.unwrap_or(product.sell_price);
    let line = order_item_totals(
        input.quantity,
        cost_price,
        sell_price,
        product.unit_per_carton,
        input.return_quantity,
    );

    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, quantity, cost_price, sell_price, total_cost, total_amount,
            profit, cartons, return_quantity, return_amount, return_cartons, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item_id)
    .bind(order_id)
    .bind(&input.product_id)
    .bind(input.quantity)
    .bind(SqlDecimal(cost_price))
    .bind(SqlDecimal(sell_price))
    .bind(SqlDecimal(line.total_cost))
    .bind(SqlDecimal(line.total_amount))
    .bind(SqlDecimal(line.profit))
    .bind(SqlDecimal(line.cartons))
    .bind(input.return_quantity)
    .bind(SqlDecimal(line.return_amount))
    .bind(SqlDecimal(line.return_cartons))
    .bind(timestamp)
    .bind(timestamp)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Rewrite the header totals from the current items and return the header
async fn recalculate(
    conn: &mut SqliteConnection,
    order_id: &str,
    timestamp: DateTime<Utc>,
) -> AppResult<Order> {
    let items = fetch_order_items(&mut *conn, order_id).await?;
    let lines: Vec<OrderItemTotals> = items.iter().map(OrderItem::totals).collect();
    let totals = OrderTotals::from_lines(&lines);

    sqlx::query(
        r#"
        UPDATE orders
        SET total_amount = ?, total_cost = ?, total_profit = ?, total_cartons = ?,
            return_cartons = ?, return_amount = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(SqlDecimal(totals.total_amount))
    .bind(SqlDecimal(totals.total_cost))
    .bind(SqlDecimal(totals.total_profit))
    .bind(SqlDecimal(totals.total_cartons))
    .bind(SqlDecimal(totals.return_cartons))
    .bind(SqlDecimal(totals.return_amount))
    .bind(timestamp)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    fetch_order(&mut *conn, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

async fn create_order(
    conn: &mut SqliteConnection,
    order_id: &str,
    input: &CreateOrderInput,
) -> AppResult<Order> {
    ensure_reference(&mut *conn, Referenced::OrderBooker, &input.order_booker_id).await?;
    let timestamp = now();

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_booker_id, order_date, supply_date, status, notes, total_amount, total_cost,
            total_profit, total_cartons, return_cartons, return_amount, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, 0, 0, 0, ?, ?)
        "#,
    )
    .bind(order_id)
    .bind(&input.order_booker_id)
    .bind(input.order_date)
    .bind(input.supply_date)
    .bind(input.status.unwrap_or_default().as_str())
    .bind(&input.notes)
    .bind(timestamp)
    .bind(timestamp)
    .execute(&mut *conn)
    .await?;

    for item in &input.items {
        insert_item(conn, &new_id(), order_id, item, timestamp).await?;
    }

    recalculate(conn, order_id, timestamp).await
}

fn order_change(kind: ChangeKind, order: &Order) -> LedgerChange {
    LedgerChange::new(EntityKind::Order, kind, &order.id)
        .with_month(order.order_date)
        .with_key(order_key(&order.id))
        .with_key(order_booker_key(&order.order_booker_id))
}

async fn update_order(
    conn: &mut SqliteConnection,
    order_id: &str,
    patch: &UpdateOrderInput,
) -> AppResult<(Order, String)> {
    let existing = fetch_order(&mut *conn, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    if let Some(booker_id) = &patch.order_booker_id {
        ensure_reference(&mut *conn, Referenced::OrderBooker, booker_id).await?;
    }
    let timestamp = now();

    let supply_date = if patch.clear_supply_date {
        None
    } else {
        patch.supply_date.or(existing.supply_date)
    };
    let status = patch.status.unwrap_or(existing.status);

    sqlx::query(
        r#"
        UPDATE orders
        SET order_booker_id = ?, order_date = ?, supply_date = ?, status = ?, notes = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(patch.order_booker_id.as_ref().unwrap_or(&existing.order_booker_id))
    .bind(patch.order_date.unwrap_or(existing.order_date))
    .bind(supply_date)
    .bind(status.as_str())
    .bind(patch.notes.as_ref().or(existing.notes.as_ref()))
    .bind(timestamp)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    if let Some(items) = &patch.items {
        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
        for item in items {
            insert_item(conn, &new_id(), order_id, item, timestamp).await?;
        }
        let order = recalculate(conn, order_id, timestamp).await?;
        return Ok((order, existing.order_booker_id));
    }

    let order = fetch_order(&mut *conn, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    Ok((order, existing.order_booker_id))
}

async fn delete_order(conn: &mut SqliteConnection, order_id: &str) -> AppResult<Order> {
    let existing = fetch_order(&mut *conn, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    sqlx::query("DELETE FROM order_items WHERE order_id = ?")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(existing)
}

async fn add_item(
    conn: &mut SqliteConnection,
    item_id: &str,
    order_id: &str,
    input: &OrderItemInput,
) -> AppResult<(OrderItem, Order)> {
    if fetch_order(&mut *conn, order_id).await?.is_none() {
        return Err(AppError::NotFound("Order".to_string()));
    }
    let timestamp = now();
    insert_item(conn, item_id, order_id, input, timestamp).await?;
    let order = recalculate(conn, order_id, timestamp).await?;
    let item = fetch_order_item(&mut *conn, item_id)
        .await?
        .ok_or_else(|| AppError::Internal("order item missing after insert".to_string()))?;
    Ok((item, order))
}

async fn update_item(
    conn: &mut SqliteConnection,
    item_id: &str,
    patch: UpdateOrderItemInput,
) -> AppResult<(OrderItem, Order)> {
    let existing = fetch_order_item(&mut *conn, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order item".to_string()))?;

    let quantity = patch.quantity.unwrap_or(existing.quantity);
    let return_quantity = patch.return_quantity.unwrap_or(existing.return_quantity);
    let sell_price = patch.sell_price.unwrap_or(existing.sell_price);
    rule("quantity", validate_order_quantity(quantity, return_quantity))?;
    rule("sell_price", validate_price(sell_price))?;

    let product = fetch_referenced_product(&mut *conn, &existing.product_id).await?;
    let line = order_item_totals(
        quantity,
        existing.cost_price,
        sell_price,
        product.unit_per_carton,
        return_quantity,
    );
    let timestamp = now();

    sqlx::query(
        r#"
        UPDATE order_items
        SET quantity = ?, sell_price = ?, total_cost = ?, total_amount = ?, profit = ?,
            cartons = ?, return_quantity = ?, return_amount = ?, return_cartons = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(quantity)
    .bind(SqlDecimal(sell_price))
    .bind(SqlDecimal(line.total_cost))
    .bind(SqlDecimal(line.total_amount))
    .bind(SqlDecimal(line.profit))
    .bind(SqlDecimal(line.cartons))
    .bind(return_quantity)
    .bind(SqlDecimal(line.return_amount))
    .bind(SqlDecimal(line.return_cartons))
    .bind(timestamp)
    .bind(item_id)
    .execute(&mut *conn)
    .await?;

    let order = recalculate(conn, &existing.order_id, timestamp).await?;
    let item = fetch_order_item(&mut *conn, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order item".to_string()))?;
    Ok((item, order))
}

async fn remove_item(conn: &mut SqliteConnection, item_id: &str) -> AppResult<Order> {
    let existing = fetch_order_item(&mut *conn, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order item".to_string()))?;

    sqlx::query("DELETE FROM order_items WHERE id = ?")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    recalculate(conn, &existing.order_id, now()).await
}

impl OrderService {
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    pub async fn list(&self, filters: &OrderFilters) -> AppResult<Vec<Order>> {
        let order_by = filters.order_by();
        let order_by = order_by.as_str();
        let rows = self
            .db
            .execute_with_retry("list_orders", |pool| async move {
                let mut filter = SqlFilter::new(SELECT_ORDERS);
                filter
                    .eq_opt("order_booker_id", filters.order_booker_id.as_deref())
                    .eq_opt("status", filters.status.map(|s| s.as_str()))
                    .date_range("order_date", filters.date_range)
                    .search(&["notes"], filters.search.as_deref())
                    .push(order_by);
                let mut query = filter.finish();
                let rows = query.build_query_as::<OrderRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Order>> {
        self.db
            .execute_with_retry("get_order", |pool| async move { fetch_order(&pool, id).await })
            .await
    }

    pub async fn items(&self, order_id: &str) -> AppResult<Vec<OrderItem>> {
        self.db
            .execute_with_retry("list_order_items", |pool| async move {
                fetch_order_items(&pool, order_id).await
            })
            .await
    }

    pub async fn get_with_items(&self, id: &str) -> AppResult<Option<OrderWithItems>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// Insert the header and every item atomically
    pub async fn create(&self, input: CreateOrderInput) -> AppResult<OrderWithItems> {
        input.validate()?;
        if input.items.is_empty() {
            return Err(AppError::validation("items", "At least one item is required"));
        }
        for item in &input.items {
            item.check()?;
        }

        let order_id = new_id();
        let tx_id = order_id.clone();
        let order = self
            .db
            .execute_transaction("create_order", move |conn| {
                let (id, input) = (tx_id.clone(), input.clone());
                Box::pin(async move { create_order(conn, &id, &input).await })
            })
            .await
            .map_err(|e| e.into_creation_failed("order"))?;

        debug!(
            order_id = %order.id,
            order_booker_id = %order.order_booker_id,
            total_amount = %order.total_amount,
            "Order created"
        );
        self.publish(ChangeKind::Created, &order);
        self.get_with_items(&order_id)
            .await?
            .ok_or_else(|| AppError::Internal("created order vanished".to_string()))
    }

    pub async fn update(&self, id: &str, patch: UpdateOrderInput) -> AppResult<OrderWithItems> {
        if let Some(items) = &patch.items {
            if items.is_empty() {
                return Err(AppError::validation("items", "At least one item is required"));
            }
            for item in items {
                item.check()?;
            }
        }

        let order_id = id.to_string();
        let (order, previous_booker_id) = self
            .db
            .execute_transaction("update_order", move |conn| {
                let (id, patch) = (order_id.clone(), patch.clone());
                Box::pin(async move { update_order(conn, &id, &patch).await })
            })
            .await
            .map_err(|e| e.into_update_failed("order"))?;

        debug!(order_id = %order.id, status = %order.status, "Order updated");
        // A reassigned order leaves the previous booker's figures stale too
        self.notifier.publish(
            order_change(ChangeKind::Updated, &order).with_key(order_booker_key(&previous_booker_id)),
        );
        self.get_with_items(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let order_id = id.to_string();
        let removed = self
            .db
            .execute_transaction("delete_order", move |conn| {
                let id = order_id.clone();
                Box::pin(async move { delete_order(conn, &id).await })
            })
            .await?;

        debug!(order_id = %id, "Order deleted");
        self.publish(ChangeKind::Deleted, &removed);
        Ok(())
    }

    pub async fn add_item(&self, order_id: &str, input: OrderItemInput) -> AppResult<OrderItem> {
        input.check()?;

        let item_id = new_id();
        let (tx_item, tx_order) = (item_id.clone(), order_id.to_string());
        let (item, order) = self
            .db
            .execute_transaction("add_order_item", move |conn| {
                let (item_id, order_id, input) = (tx_item.clone(), tx_order.clone(), input.clone());
                Box::pin(async move { add_item(conn, &item_id, &order_id, &input).await })
            })
            .await
            .map_err(|e| e.into_update_failed("order"))?;

        debug!(order_id = %order.id, order_item_id = %item.id, "Order item added");
        self.publish(ChangeKind::Updated, &order);
        Ok(item)
    }

    pub async fn update_item(&self, item_id: &str, patch: UpdateOrderItemInput) -> AppResult<OrderItem> {
        let target = item_id.to_string();
        let (item, order) = self
            .db
            .execute_transaction("update_order_item", move |conn| {
                let id = target.clone();
                Box::pin(async move { update_item(conn, &id, patch).await })
            })
            .await
            .map_err(|e| e.into_update_failed("order item"))?;

        debug!(order_id = %order.id, order_item_id = %item.id, "Order item updated");
        self.publish(ChangeKind::Updated, &order);
        Ok(item)
    }

    /// Set how many units of a line came back
    pub async fn record_return(&self, item_id: &str, return_quantity: i64) -> AppResult<OrderItem> {
        self.update_item(
            item_id,
            UpdateOrderItemInput {
                return_quantity: Some(return_quantity),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn remove_item(&self, item_id: &str) -> AppResult<Order> {
        let target = item_id.to_string();
        let order = self
            .db
            .execute_transaction("remove_order_item", move |conn| {
                let id = target.clone();
                Box::pin(async move { remove_item(conn, &id).await })
            })
            .await
            .map_err(|e| e.into_update_failed("order"))?;

        debug!(order_id = %order.id, order_item_id = %item_id, "Order item removed");
        self.publish(ChangeKind::Updated, &order);
        Ok(order)
    }

    pub async fn summary(&self, filters: &OrderFilters) -> AppResult<OrderSummary> {
        let orders = self.list(filters).await?;
        let mut summary = OrderSummary::default();
        for order in &orders {
            summary.add(order);
        }
        Ok(summary)
    }

    fn publish(&self, kind: ChangeKind, order: &Order) {
        self.notifier.publish(order_change(kind, order));
    }
}
