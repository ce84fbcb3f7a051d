//! Relational store contracts for accounts and products.
//!
//! The orchestration core reads these through traits so that sagas can be
//! exercised against the in-memory implementation; production wiring uses
//! the Postgres one.

use async_trait::async_trait;
use common::{ProductId, UserId};
use thiserror::Error;

use crate::account::Account;
use crate::product::Product;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Errors from the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An account already exists for this user id.
    #[error("account already exists for user {0}")]
    DuplicateAccount(UserId),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend failure outside sqlx (used by fakes and row decoding).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// One page of a product listing.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
}

/// Account persistence operations.
///
/// Each call is atomic on its own; there is no cross-call transaction.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Looks up the account for a user id, if any.
    async fn find_account_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Account>, StoreError>;

    /// Persists a new account row.
    ///
    /// Fails with [`StoreError::DuplicateAccount`] when the user already
    /// has one.
    async fn create_account(&self, account: Account) -> Result<Account, StoreError>;
}

/// Product read operations.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Looks up a product by row id.
    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Finds the first product whose name contains `name`,
    /// case-insensitively.
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError>;

    /// Lists products with pagination and an optional name filter.
    async fn list_products(
        &self,
        page: u32,
        limit: u32,
        name_filter: Option<&str>,
    ) -> Result<ProductPage, StoreError>;

    /// Returns every product row; used by the cache refresh job.
    async fn list_all_products(&self) -> Result<Vec<Product>, StoreError>;
}
