//! Company service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{new_id, Company};
use sqlx::FromRow;
use tracing::debug;
use validator::Validate;

use super::{non_blank, now};
use crate::error::{AppError, AppResult};
use crate::notify::{company_key, ChangeKind, ChangeNotifier, EntityKind, LedgerChange};
use crate::storage::{Database, SqlFilter};

const SELECT_COMPANIES: &str =
    "SELECT id, name, address, email, phone, created_at, updated_at FROM companies";

#[derive(Clone)]
pub struct CompanyService {
    db: Database,
    notifier: ChangeNotifier,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCompanyInput {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub name: String,
    pub address: Option<String>,
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCompanyInput {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyFilters {
    /// Matches name, address or email
    pub search: Option<String>,
}

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    address: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
            address: row.address,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CompanyService {
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    /// List companies ordered by name
    pub async fn list(&self, filters: &CompanyFilters) -> AppResult<Vec<Company>> {
        let rows = self
            .db
            .execute_with_retry("list_companies", |pool| async move {
                let mut filter = SqlFilter::new(SELECT_COMPANIES);
                filter
                    .search(&["name", "address", "email"], filters.search.as_deref())
                    .push(" ORDER BY name ASC");
                let mut query = filter.finish();
                let rows = query.build_query_as::<CompanyRow>().fetch_all(&pool).await?;
                Ok::<_, AppError>(rows)
            })
            .await?;

        Ok(rows.into_iter().map(Company::from).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Company>> {
        let row = self
            .db
            .execute_with_retry("get_company", |pool| async move {
                let row = sqlx::query_as::<_, CompanyRow>(&format!("{} WHERE id = ?", SELECT_COMPANIES))
                    .bind(id)
                    .fetch_optional(&pool)
                    .await?;
                Ok::<_, AppError>(row)
            })
            .await?;

        Ok(row.map(Company::from))
    }

    pub async fn create(&self, input: CreateCompanyInput) -> AppResult<Company> {
        input.validate()?;
        non_blank("name", &input.name)?;

        let id = new_id();
        let timestamp = now();
        let input = &input;
        let id_ref = id.as_str();

        self.db
            .execute_with_retry("create_company", |pool| async move {
                sqlx::query(
                    r#"
                    INSERT INTO companies (id, name, address, email, phone, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id_ref)
                .bind(input.name.trim())
                .bind(&input.address)
                .bind(&input.email)
                .bind(&input.phone)
                .bind(timestamp)
                .bind(timestamp)
                .execute(&pool)
                .await?;
                Ok::<_, AppError>(())
            })
            .await?;

        debug!(company_id = %id, "Company created");
        self.notifier.publish(
            LedgerChange::new(EntityKind::Company, ChangeKind::Created, &id).with_key(company_key(&id)),
        );

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("created company vanished".to_string()))
    }

    /// Update supplied fields only
    pub async fn update(&self, id: &str, input: UpdateCompanyInput) -> AppResult<Company> {
        input.validate()?;
        if let Some(name) = &input.name {
            non_blank("name", name)?;
        }

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Company".to_string()))?;

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let address = input.address.or(existing.address);
        let email = input.email.or(existing.email);
        let phone = input.phone.or(existing.phone);
        let timestamp = now();
        let (name, address, email, phone) = (&name, &address, &email, &phone);

        self.db
            .execute_with_retry("update_company", |pool| async move {
                sqlx::query(
                    r#"
                    UPDATE companies
                    SET name = ?, address = ?, email = ?, phone = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(name)
                .bind(address)
                .bind(email)
                .bind(phone)
                .bind(timestamp)
                .bind(id)
                .execute(&pool)
                .await?;
                Ok::<_, AppError>(())
            })
            .await?;

        self.notifier.publish(
            LedgerChange::new(EntityKind::Company, ChangeKind::Updated, id).with_key(company_key(id)),
        );

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Company".to_string()))
    }

    /// Delete a company that no longer owns products
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let product_count = self
            .db
            .execute_with_retry("count_company_products", |pool| async move {
                let count = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM products WHERE company_id = ?",
                )
                .bind(id)
                .fetch_one(&pool)
                .await?;
                Ok::<_, AppError>(count)
            })
            .await?;

        if product_count > 0 {
            return Err(AppError::Conflict {
                resource: "company".to_string(),
                message: format!("Company still has {} product(s)", product_count),
            });
        }

        let result = self
            .db
            .execute_with_retry("delete_company", |pool| async move {
                let result = sqlx::query("DELETE FROM companies WHERE id = ?")
                    .bind(id)
                    .execute(&pool)
                    .await?;
                Ok::<_, AppError>(result)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Company".to_string()));
        }

        debug!(company_id = %id, "Company deleted");
        self.notifier.publish(
            LedgerChange::new(EntityKind::Company, ChangeKind::Deleted, id).with_key(company_key(id)),
        );
        Ok(())
    }
}
