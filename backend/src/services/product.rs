//! Product service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{new_id, validate_price, validate_unit_per_carton, Product, SortOrder};
use sqlx::{Executor, FromRow, Sqlite};
use tracing::debug;
use validator::Validate;

use super::{ensure_reference, non_blank, now, rule, Referenced};
use crate::error::{AppError, AppResult};
use crate::notify::{company_key, ChangeKind, ChangeNotifier, EntityKind, LedgerChange};
use crate::storage::{Database, SqlDecimal, SqlFilter};

const SELECT_PRODUCTS: &str = r#"
    SELECT id, company_id, name, cost_price, sell_price, unit_per_carton, created_at, updated_at
    FROM products
"#;

#[derive(Clone)]
pub struct ProductService {
    db: Database,
    notifier: ChangeNotifier,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    pub company_id: String,
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    pub cost_price: Decimal,
    pub sell_price: Decimal,
    pub unit_per_carton: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    pub company_id: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: Option<String>,
    pub cost_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub unit_per_carton: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Name,
    CostPrice,
    SellPrice,
    UnitPerCarton,
    CreatedAt,
}

impl ProductSort {
    fn column(&self) -> &'static str {
        match self {
            ProductSort::Name => "name",
            ProductSort::CostPrice => "cost_price",
            ProductSort::SellPrice => "sell_price",
            ProductSort::UnitPerCarton => "unit_per_carton",
            ProductSort::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilters {
    pub company_id: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: ProductSort,
    /// Defaults to ascending
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    company_id: String,
    name: String,
    cost_price: SqlDecimal,
    sell_price: SqlDecimal,
    unit_per_carton: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            cost_price: row.cost_price.into(),
            sell_price: row.sell_price.into(),
            unit_per_carton: row.unit_per_carton,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Look up a product referenced by a line item; a missing id is `ReferenceNotFound`
pub(crate) async fn fetch_referenced_product<'e, E>(executor: E, id: &str) -> AppResult<Product>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ProductRow>(&format!("{} WHERE id = ?", SELECT_PRODUCTS))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::ReferenceNotFound {
            entity: "product",
            id: id.to_string(),
        })
}

fn validate_product_numbers(
    cost_price: Decimal,
    sell_price: Decimal,
    unit_per_carton: i64,
) -> AppResult<()> {
    rule("cost_price", validate_price(cost_price))?;
    rule("sell_price", validate_price(sell_price))?;
    rule("unit_per_carton", validate_unit_per_carton(unit_per_carton))
}

impl ProductService {
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    pub async fn list(&self, filters: &ProductFilters) -> AppResult<Vec<Product>> {
        let rows = self
            .db
            .execute_with_retry("list_products", |pool| async move {
                let order = filters.sort_order.unwrap_or(SortOrder::Asc);
                let mut filter = SqlFilter::new(SELECT_PRODUCTS);
                filter
                    .eq_opt("company_id", filters.company_id.as_deref())
                    .search(&["name"], filters.search.as_deref())
                    .push(&format!(
                        " ORDER BY {} {}, name ASC",
                        filters.sort_by.column(),
                        order.as_sql()
                    ));
                let mut query = filter.finish();
                let rows = query.build_query_as::<ProductRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn list_by_company(&self, company_id: &str) -> AppResult<Vec<Product>> {
        self.list(&ProductFilters {
            company_id: Some(company_id.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Product>> {
        let row = self
            .db
            .execute_with_retry("get_product", |pool| async move {
                let row = sqlx::query_as::<_, ProductRow>(&format!("{} WHERE id = ?", SELECT_PRODUCTS))
                    .bind(id)
                    .fetch_optional(&pool)
                    .await?;
                Ok::<_, AppError>(row)
            })
            .await?;

        Ok(row.map(Product::from))
    }

    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        non_blank("name", &input.name)?;
        validate_product_numbers(input.cost_price, input.sell_price, input.unit_per_carton)?;

        let id = new_id();
        let timestamp = now();
        let input = &input;
        let id_ref = id.as_str();

        self.db
            .execute_with_retry("create_product", |pool| async move {
                ensure_reference(&pool, Referenced::Company, &input.company_id).await?;
                sqlx::query(
                    r#"
                    INSERT INTO products (
                        id, company_id, name, cost_price, sell_price, unit_per_carton,
                        created_at, updated_at
                    )
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id_ref)
                .bind(&input.company_id)
                .bind(input.name.trim())
                .bind(SqlDecimal(input.cost_price))
                .bind(SqlDecimal(input.sell_price))
                .bind(input.unit_per_carton)
                .bind(timestamp)
                .bind(timestamp)
                .execute(&pool)
                .await?;
                Ok::<_, AppError>(())
            })
            .await?;

        debug!(product_id = %id, company_id = %input.company_id, "Product created");
        self.notifier.publish(
            LedgerChange::new(EntityKind::Product, ChangeKind::Created, &id)
                .with_key(company_key(&input.company_id)),
        );

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("created product vanished".to_string()))
    }

    pub async fn update(&self, id: &str, input: UpdateProductInput) -> AppResult<Product> {
        input.validate()?;
        if let Some(name) = &input.name {
            non_blank("name", name)?;
        }

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let company_id = input.company_id.unwrap_or(existing.company_id);
        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let cost_price = input.cost_price.unwrap_or(existing.cost_price);
        let sell_price = input.sell_price.unwrap_or(existing.sell_price);
        let unit_per_carton = input.unit_per_carton.unwrap_or(existing.unit_per_carton);
        validate_product_numbers(cost_price, sell_price, unit_per_carton)?;

        let timestamp = now();
        let (company_ref, name_ref) = (company_id.as_str(), name.as_str());

        self.db
            .execute_with_retry("update_product", |pool| async move {
                ensure_reference(&pool, Referenced::Company, company_ref).await?;
                sqlx::query(
                    r#"
                    UPDATE products
                    SET company_id = ?, name = ?, cost_price = ?, sell_price = ?,
                        unit_per_carton = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(company_ref)
                .bind(name_ref)
                .bind(SqlDecimal(cost_price))
                .bind(SqlDecimal(sell_price))
                .bind(unit_per_carton)
                .bind(timestamp)
                .bind(id)
                .execute(&pool)
                .await?;
                Ok::<_, AppError>(())
            })
            .await?;

        self.notifier.publish(
            LedgerChange::new(EntityKind::Product, ChangeKind::Updated, id)
                .with_key(company_key(&company_id)),
        );

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Delete a product no daily entry or order line refers to
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let usages = self
            .db
            .execute_with_retry("count_product_usages", |pool| async move {
                let count = sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT (SELECT COUNT(*) FROM daily_entry_items WHERE product_id = ?)
                         + (SELECT COUNT(*) FROM order_items WHERE product_id = ?)
                    "#,
                )
                .bind(id)
                .bind(id)
                .fetch_one(&pool)
                .await?;
                Ok::<_, AppError>(count)
            })
            .await?;

        if usages > 0 {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: format!("Product is used by {} line item(s)", usages),
            });
        }

        let result = self
            .db
            .execute_with_retry("delete_product", |pool| async move {
                let result = sqlx::query("DELETE FROM products WHERE id = ?")
                    .bind(id)
                    .execute(&pool)
                    .await?;
                Ok::<_, AppError>(result)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        debug!(product_id = %id, "Product deleted");
        self.notifier.publish(
            LedgerChange::new(EntityKind::Product, ChangeKind::Deleted, id)
                .with_key(company_key(&existing.company_id)),
        );
        Ok(())
    }
}
