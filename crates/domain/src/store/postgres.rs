//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use common::{AccountId, CustomerId, ProductId, UserId, WalletId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::account::Account;
use crate::product::Product;

use super::{AccountStore, ProductPage, ProductStore, StoreError};

/// PostgreSQL-backed account and product store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
        Ok(Account {
            id: AccountId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            wallet_id: WalletId::new(row.try_get::<String, _>("wallet_id")?),
            customer_id: CustomerId::new(row.try_get::<String, _>("customer_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product, StoreError> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            packages: row.try_get("packages")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn find_account_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, wallet_id, customer_id, created_at \
             FROM accounts WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn create_account(&self, account: Account) -> Result<Account, StoreError> {
        let result = sqlx::query(
            "INSERT INTO accounts (id, user_id, wallet_id, customer_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(account.id.as_uuid())
        .bind(account.user_id.as_str())
        .bind(account.wallet_id.as_str())
        .bind(account.customer_id.as_str())
        .bind(account.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(account),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateAccount(account.user_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, description, packages, created_at FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, description, packages, created_at \
             FROM products WHERE name ILIKE '%' || $1 || '%' \
             ORDER BY created_at LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(
        &self,
        page: u32,
        limit: u32,
        name_filter: Option<&str>,
    ) -> Result<ProductPage, StoreError> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = ((page - 1) * limit) as i64;
        let filter = name_filter.unwrap_or("");

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE ($1 = '' OR name ILIKE '%' || $1 || '%')",
        )
        .bind(filter)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT id, name, description, packages, created_at \
             FROM products WHERE ($1 = '' OR name ILIKE '%' || $1 || '%') \
             ORDER BY created_at OFFSET $2 LIMIT $3",
        )
        .bind(filter)
        .bind(offset)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>, _>>()?;

        let total = total as u64;
        Ok(ProductPage {
            items,
            total,
            page,
            limit,
            pages: (total.div_ceil(limit as u64) as u32).max(1),
        })
    }

    async fn list_all_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows =
            sqlx::query("SELECT id, name, description, packages, created_at FROM products")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(Self::row_to_product).collect()
    }
}
