//! In-memory store for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{ProductId, UserId};

use crate::account::Account;
use crate::product::Product;

use super::{AccountStore, ProductPage, ProductStore, StoreError};

#[derive(Debug, Default)]
struct InMemoryState {
    accounts: HashMap<UserId, Account>,
    products: Vec<Product>,
    fail_on_read: bool,
}

/// In-memory account and product store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a product row directly.
    pub fn insert_product(&self, product: Product) {
        self.state.write().unwrap().products.push(product);
    }

    /// Inserts an account row directly, bypassing the duplicate check.
    pub fn insert_account(&self, account: Account) {
        self.state
            .write()
            .unwrap()
            .accounts
            .insert(account.user_id.clone(), account);
    }

    /// Configures every read to fail, simulating a database outage.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.state.write().unwrap().fail_on_read = fail;
    }

    /// Returns the number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.state.read().unwrap().accounts.len()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.state.read().unwrap().fail_on_read {
            return Err(StoreError::Backend("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_account_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Account>, StoreError> {
        self.check_read()?;
        Ok(self.state.read().unwrap().accounts.get(user_id).cloned())
    }

    async fn create_account(&self, account: Account) -> Result<Account, StoreError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_read {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        if state.accounts.contains_key(&account.user_id) {
            return Err(StoreError::DuplicateAccount(account.user_id));
        }
        state
            .accounts
            .insert(account.user_id.clone(), account.clone());
        Ok(account)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.check_read()?;
        Ok(self
            .state
            .read()
            .unwrap()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        self.check_read()?;
        let needle = name.to_lowercase();
        Ok(self
            .state
            .read()
            .unwrap()
            .products
            .iter()
            .find(|p| p.name.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn list_products(
        &self,
        page: u32,
        limit: u32,
        name_filter: Option<&str>,
    ) -> Result<ProductPage, StoreError> {
        self.check_read()?;
        let state = self.state.read().unwrap();
        let needle = name_filter.map(str::to_lowercase);
        let matching: Vec<Product> = state
            .products
            .iter()
            .filter(|p| match &needle {
                Some(n) => p.name.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let page = page.max(1);
        let limit = limit.max(1);
        let skip = ((page - 1) * limit) as usize;
        let items: Vec<Product> = matching.into_iter().skip(skip).take(limit as usize).collect();

        Ok(ProductPage {
            items,
            total,
            page,
            limit,
            pages: (total.div_ceil(limit as u64) as u32).max(1),
        })
    }

    async fn list_all_products(&self) -> Result<Vec<Product>, StoreError> {
        self.check_read()?;
        Ok(self.state.read().unwrap().products.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Package;
    use common::{AccountId, CustomerId, WalletId};

    fn barcode_product() -> Product {
        Product::new(
            "Barcode credits",
            None,
            vec![Package {
                credits: 10,
                price: 5.0,
            }],
        )
    }

    #[tokio::test]
    async fn create_account_rejects_duplicates() {
        let store = InMemoryStore::new();
        let account = Account::new(
            AccountId::new(),
            UserId::new("u1"),
            WalletId::new("wal_1"),
            CustomerId::new("cus_1"),
        );

        store.create_account(account.clone()).await.unwrap();
        let dup = Account::new(
            AccountId::new(),
            UserId::new("u1"),
            WalletId::new("wal_2"),
            CustomerId::new("cus_2"),
        );
        assert!(matches!(
            store.create_account(dup).await,
            Err(StoreError::DuplicateAccount(_))
        ));
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn find_product_by_name_is_case_insensitive_contains() {
        let store = InMemoryStore::new();
        store.insert_product(barcode_product());

        let found = store.find_product_by_name("BARCODE").await.unwrap();
        assert!(found.is_some());

        let missing = store.find_product_by_name("widget").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn list_products_paginates() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            let mut p = barcode_product();
            p.name = format!("product-{i}");
            store.insert_product(p);
        }

        let page = store.list_products(2, 2, None).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pages, 3);
        assert_eq!(page.items[0].name, "product-2");
    }

    #[tokio::test]
    async fn fail_on_read_surfaces_backend_error() {
        let store = InMemoryStore::new();
        store.set_fail_on_read(true);

        assert!(
            store
                .find_account_by_user_id(&UserId::new("u1"))
                .await
                .is_err()
        );
    }
}
