//! Order booker service

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{new_id, validate_month, validate_phone, DateRange, OrderBooker, OrderBookerWithTarget};
use sqlx::FromRow;
use tracing::debug;
use validator::Validate;

use super::{non_blank, now, rule};
use crate::error::{AppError, AppResult};
use crate::notify::{order_booker_key, ChangeKind, ChangeNotifier, EntityKind, LedgerChange};
use crate::storage::{Database, SqlDecimal, SqlFilter};

const SELECT_ORDER_BOOKERS: &str = r#"
    SELECT id, name, name_urdu, phone, email, is_active, join_date, created_at, updated_at
    FROM order_bookers
"#;

#[derive(Clone)]
pub struct OrderBookerService {
    db: Database,
    notifier: ChangeNotifier,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderBookerInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "Urdu name is required"))]
    pub name_urdu: String,
    pub phone: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    /// Defaults to today
    pub join_date: Option<NaiveDate>,
    /// Defaults to active
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOrderBookerInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Urdu name is required"))]
    pub name_urdu: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBookerFilters {
    /// Matches name, Urdu name or phone
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub join_date: Option<DateRange>,
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderBookerRow {
    id: String,
    name: String,
    name_urdu: String,
    phone: String,
    email: Option<String>,
    is_active: bool,
    join_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderBookerRow> for OrderBooker {
    fn from(row: OrderBookerRow) -> Self {
        OrderBooker {
            id: row.id,
            name: row.name,
            name_urdu: row.name_urdu,
            phone: row.phone,
            email: row.email,
            is_active: row.is_active,
            join_date: row.join_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BookerTargetRow {
    #[sqlx(flatten)]
    booker: OrderBookerRow,
    target_amount: SqlDecimal,
    achieved_amount: SqlDecimal,
    remaining_amount: SqlDecimal,
    achievement_percentage: SqlDecimal,
}

impl OrderBookerService {
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    /// List bookers ordered by name
    pub async fn list(&self, filters: &OrderBookerFilters) -> AppResult<Vec<OrderBooker>> {
        let rows = self
            .db
            .execute_with_retry("list_order_bookers", |pool| async move {
                let mut filter = SqlFilter::new(SELECT_ORDER_BOOKERS);
                filter
                    .search(&["name", "name_urdu", "phone"], filters.search.as_deref())
                    .eq_opt("is_active", filters.is_active)
                    .date_range("join_date", filters.join_date)
                    .push(" ORDER BY name ASC");
                let mut query = filter.finish();
                let rows = query.build_query_as::<OrderBookerRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows.into_iter().map(OrderBooker::from).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<OrderBooker>> {
        let row = self
            .db
            .execute_with_retry("get_order_booker", |pool| async move {
                let row = sqlx::query_as::<_, OrderBookerRow>(&format!(
                    "{} WHERE id = ?",
                    SELECT_ORDER_BOOKERS
                ))
                .bind(id)
                .fetch_optional(&pool)
                .await?;
                Ok::<_, AppError>(row)
            })
            .await?;

        Ok(row.map(OrderBooker::from))
    }

    pub async fn create(&self, input: CreateOrderBookerInput) -> AppResult<OrderBooker> {
        input.validate()?;
        non_blank("name", &input.name)?;
        non_blank("name_urdu", &input.name_urdu)?;
        rule("phone", validate_phone(&input.phone))?;

        let id = new_id();
        let timestamp = now();
        let join_date = input.join_date.unwrap_or_else(|| timestamp.date_naive());
        let is_active = input.is_active.unwrap_or(true);
        let input = &input;
        let id_ref = id.as_str();

        self.db
            .execute_with_retry("create_order_booker", |pool| async move {
                sqlx::query(
                    r#"
                    INSERT INTO order_bookers (
                        id, name, name_urdu, phone, email, is_active, join_date,
                        created_at, updated_at
                    )
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id_ref)
                .bind(input.name.trim())
                .bind(input.name_urdu.trim())
                .bind(input.phone.trim())
                .bind(&input.email)
                .bind(is_active)
                .bind(join_date)
                .bind(timestamp)
                .bind(timestamp)
                .execute(&pool)
                .await?;
                Ok::<_, AppError>(())
            })
            .await?;

        debug!(order_booker_id = %id, "Order booker created");
        self.notifier.publish(
            LedgerChange::new(EntityKind::OrderBooker, ChangeKind::Created, &id)
                .with_key(order_booker_key(&id)),
        );

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("created order booker vanished".to_string()))
    }

    pub async fn update(&self, id: &str, input: UpdateOrderBookerInput) -> AppResult<OrderBooker> {
        input.validate()?;
        if let Some(phone) = &input.phone {
            rule("phone", validate_phone(phone))?;
        }

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order booker".to_string()))?;

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let name_urdu = input
            .name_urdu
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name_urdu);
        non_blank("name", &name)?;
        non_blank("name_urdu", &name_urdu)?;
        let phone = input.phone.map(|p| p.trim().to_string()).unwrap_or(existing.phone);
        let email = input.email.or(existing.email);
        let join_date = input.join_date.unwrap_or(existing.join_date);
        let is_active = input.is_active.unwrap_or(existing.is_active);
        let timestamp = now();
        let (name, name_urdu, phone, email) = (&name, &name_urdu, &phone, &email);

        self.db
            .execute_with_retry("update_order_booker", |pool| async move {
                sqlx::query(
                    r#"
                    UPDATE order_bookers
                    SET name = ?, name_urdu = ?, phone = ?, email = ?, join_date = ?,
                        is_active = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(name)
                .bind(name_urdu)
                .bind(phone)
                .bind(email)
                .bind(join_date)
                .bind(is_active)
                .bind(timestamp)
                .bind(id)
                .execute(&pool)
                .await?;
                Ok::<_, AppError>(())
            })
            .await?;

        self.notifier.publish(
            LedgerChange::new(EntityKind::OrderBooker, ChangeKind::Updated, id)
                .with_key(order_booker_key(id)),
        );

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order booker".to_string()))
    }

    pub async fn activate(&self, id: &str) -> AppResult<OrderBooker> {
        self.set_active(id, true).await
    }

    /// Soft removal; history stays attached to the booker
    pub async fn deactivate(&self, id: &str) -> AppResult<OrderBooker> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: &str, is_active: bool) -> AppResult<OrderBooker> {
        self.update(
            id,
            UpdateOrderBookerInput {
                is_active: Some(is_active),
                ..Default::default()
            },
        )
        .await
    }

    /// Hard delete, cascading to the booker's entries, orders and targets
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self
            .db
            .execute_with_retry("delete_order_booker", |pool| async move {
                let result = sqlx::query("DELETE FROM order_bookers WHERE id = ?")
                    .bind(id)
                    .execute(&pool)
                    .await?;
                Ok::<_, AppError>(result)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Order booker".to_string()));
        }

        debug!(order_booker_id = %id, "Order booker deleted");
        self.notifier.publish(
            LedgerChange::new(EntityKind::OrderBooker, ChangeKind::Deleted, id)
                .with_key(order_booker_key(id)),
        );
        Ok(())
    }

    /// Every booker with the given month's target progress, zeros when unset
    pub async fn list_with_current_target(
        &self,
        year: i32,
        month: u32,
    ) -> AppResult<Vec<OrderBookerWithTarget>> {
        rule("month", validate_month(month))?;

        let rows = self
            .db
            .execute_with_retry("list_order_bookers_with_target", |pool| async move {
                let rows = sqlx::query_as::<_, BookerTargetRow>(
                    r#"
                    SELECT ob.id, ob.name, ob.name_urdu, ob.phone, ob.email, ob.is_active,
                           ob.join_date, ob.created_at, ob.updated_at,
                           COALESCE(mt.target_amount, 0) AS target_amount,
                           COALESCE(mt.achieved_amount, 0) AS achieved_amount,
                           COALESCE(mt.remaining_amount, 0) AS remaining_amount,
                           COALESCE(mt.achievement_percentage, 0) AS achievement_percentage
                    FROM order_bookers ob
                    LEFT JOIN monthly_targets mt
                        ON mt.order_booker_id = ob.id AND mt.year = ? AND mt.month = ?
                    ORDER BY ob.name ASC
                    "#,
                )
                .bind(year)
                .bind(month as i64)
                .fetch_all(&pool)
                .await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderBookerWithTarget {
                order_booker: row.booker.into(),
                target_amount: row.target_amount.into(),
                achieved_amount: row.achieved_amount.into(),
                remaining_amount: row.remaining_amount.into(),
                achievement_percentage: row.achievement_percentage.into(),
            })
            .collect())
    }
}
