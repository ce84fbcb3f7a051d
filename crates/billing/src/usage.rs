//! Handlers for consumed barcode usage events.
//!
//! A generated barcode costs credits unless the account holds an active
//! subscription. Wallets with a positive balance have the cost voided
//! (spent); empty wallets get it recorded as paid credits instead.

use common::UserId;
use domain::{AccountStore, ProductStore};
use provider::BillingProvider;
use serde::Deserialize;

use crate::error::{BillingError, Result};

/// Payload of the consumed `barcode.new` / `barcode.edit` events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeEvent {
    /// Upstream barcode id.
    pub id: String,
    /// Owner of the barcode.
    pub user_id: String,
    /// Set on edit events.
    #[serde(default)]
    pub edit_flag: bool,
}

/// Charges credit usage for barcode activity.
pub struct UsageHandler<St, P> {
    store: St,
    provider: P,
    product_name: String,
}

impl<St, P> UsageHandler<St, P>
where
    St: AccountStore + ProductStore,
    P: BillingProvider,
{
    /// Creates a handler pricing usage from `product_name`'s first
    /// package.
    pub fn new(store: St, provider: P, product_name: impl Into<String>) -> Self {
        Self {
            store,
            provider,
            product_name: product_name.into(),
        }
    }

    /// Handles a `barcode.new` event.
    #[tracing::instrument(skip(self, event), fields(barcode_id = %event.id, user_id = %event.user_id))]
    pub async fn on_barcode_created(&self, event: &BarcodeEvent) -> Result<()> {
        let user_id = UserId::new(&event.user_id);
        let account = self
            .store
            .find_account_by_user_id(&user_id)
            .await?
            .ok_or_else(|| BillingError::NotFound("Account not found".to_string()))?;

        let product = self
            .store
            .find_product_by_name(&self.product_name)
            .await?
            .ok_or_else(|| {
                BillingError::Internal(format!(
                    "sellable product '{}' is missing",
                    self.product_name
                ))
            })?;
        let packages = product.packages().map_err(|_| {
            BillingError::Internal(format!(
                "Error parsing packages for product: {}",
                product.name
            ))
        })?;
        let package = packages.first().ok_or_else(|| {
            BillingError::Internal(format!("product '{}' has no packages", product.name))
        })?;

        // Subscribers generate barcodes without spending credits.
        if self.provider.has_active_subscription(account.id).await? {
            tracing::debug!("active subscription, no credits charged");
            return Ok(());
        }

        let balance = self.provider.wallet_balance(&account.wallet_id).await?;
        if balance > 0.0 {
            self.provider
                .void_credits(&account.wallet_id, package.credits)
                .await?;
        } else {
            self.provider
                .pay_credits(&account.wallet_id, package.credits)
                .await?;
        }

        tracing::info!(credits = package.credits, "charged barcode usage");
        Ok(())
    }

    /// Handles a `barcode.edit` event; subscription gate only, no charge.
    #[tracing::instrument(skip(self, event), fields(barcode_id = %event.id, user_id = %event.user_id))]
    pub async fn on_barcode_edited(&self, event: &BarcodeEvent) -> Result<()> {
        let user_id = UserId::new(&event.user_id);
        let Some(account) = self.store.find_account_by_user_id(&user_id).await? else {
            tracing::warn!("no account for edited barcode");
            return Ok(());
        };

        if !self.provider.has_active_subscription(account.id).await? {
            tracing::warn!("barcode edited without an active subscription");
        }
        Ok(())
    }
}
