//! Billing provider integration.
//!
//! The provider is the system of record for wallets, customers,
//! subscriptions, coupons and plans. This crate defines the contract the
//! orchestration core consumes ([`BillingProvider`]), an HTTP
//! implementation against a Lago-compatible API ([`LagoClient`]), and an
//! in-memory fake with failure switches for saga tests.
//!
//! Provider mutations are at-least-once: no client-side idempotency keys
//! are attached, so a retried call can duplicate its effect unless the
//! provider itself deduplicates.

pub mod error;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, WalletId};
use domain::{Coupon, Plan, Subscription, SubscriptionStatus};

pub use error::ProviderError;
pub use http::LagoClient;
pub use memory::InMemoryBillingProvider;

/// Operations the orchestration core needs from the billing provider.
///
/// Every call carries a bounded timeout in real implementations; a
/// timeout surfaces as a plain transport error, not a separate case.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    // -- Wallets --

    /// Creates a prepaid wallet for an account and returns its id.
    async fn create_wallet(&self, account_id: AccountId) -> Result<WalletId, ProviderError>;

    /// Terminates a wallet; used by provisioning compensation.
    async fn terminate_wallet(&self, wallet_id: &WalletId) -> Result<(), ProviderError>;

    /// Returns the wallet's current credit balance.
    async fn wallet_balance(&self, wallet_id: &WalletId) -> Result<f64, ProviderError>;

    /// Tops up a wallet with granted (free) credits.
    async fn grant_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<(), ProviderError>;

    /// Voids (spends) credits from a wallet.
    async fn void_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<(), ProviderError>;

    /// Records paid credits against a wallet.
    async fn pay_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<(), ProviderError>;

    // -- Customers --

    /// Creates a provider-side customer for an account.
    async fn create_customer(&self, account_id: AccountId) -> Result<CustomerId, ProviderError>;

    /// Deletes a customer; used by provisioning compensation.
    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<(), ProviderError>;

    // -- Subscriptions --

    /// Creates a subscription on `plan_code` ending at `ending_at`.
    async fn create_subscription(
        &self,
        account_id: AccountId,
        plan_code: &str,
        ending_at: DateTime<Utc>,
    ) -> Result<Subscription, ProviderError>;

    /// Finds the subscription registered under the account's id.
    async fn find_subscription(&self, account_id: AccountId) -> Result<Subscription, ProviderError>;

    /// Lists subscriptions page by page, filtered by status.
    async fn list_subscriptions(
        &self,
        page: u32,
        per_page: u32,
        statuses: &[SubscriptionStatus],
    ) -> Result<Vec<Subscription>, ProviderError>;

    /// Terminates a subscription, generating its final invoice.
    async fn terminate_subscription(&self, external_id: &str) -> Result<(), ProviderError>;

    /// Returns true when the account has any active subscription.
    async fn has_active_subscription(&self, account_id: AccountId) -> Result<bool, ProviderError>;

    // -- Coupons --

    /// Fetches a coupon by code.
    async fn find_coupon(&self, code: &str) -> Result<Coupon, ProviderError>;

    /// Lists coupons page by page.
    async fn list_coupons(&self, page: u32, per_page: u32) -> Result<Vec<Coupon>, ProviderError>;

    /// Terminates a coupon by code.
    async fn terminate_coupon(&self, code: &str) -> Result<(), ProviderError>;

    // -- Plans --

    /// Fetches a plan by code.
    async fn find_plan(&self, code: &str) -> Result<Plan, ProviderError>;

    /// Lists plans page by page.
    async fn list_plans(&self, page: u32, per_page: u32) -> Result<Vec<Plan>, ProviderError>;

    // -- Invoices --

    /// Creates a one-off add-on invoice and returns its provider id.
    async fn create_add_on_invoice(
        &self,
        account_id: AccountId,
        add_on_code: &str,
        display_name: &str,
    ) -> Result<String, ProviderError>;
}
