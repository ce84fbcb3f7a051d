//! Read-side billing queries.

use chrono::Utc;
use common::UserId;
use domain::{AccountStore, Coupon, Subscription};
use provider::BillingProvider;
use serde::Serialize;

use crate::error::{BillingError, Result};

/// Wallet balance view.
#[derive(Debug, Clone, Serialize)]
pub struct CreditsView {
    pub credits: f64,
}

/// Subscription lookup view.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub subscription: Subscription,
}

/// Coupon lookup view.
#[derive(Debug, Clone, Serialize)]
pub struct CouponView {
    pub coupon: Coupon,
}

/// Account-scoped reads against the billing provider.
pub struct BillingQueries<St, P> {
    accounts: St,
    provider: P,
}

impl<St, P> BillingQueries<St, P>
where
    St: AccountStore,
    P: BillingProvider,
{
    /// Creates the query service.
    pub fn new(accounts: St, provider: P) -> Self {
        Self { accounts, provider }
    }

    async fn account(&self, user_id: &UserId) -> Result<domain::Account> {
        self.accounts
            .find_account_by_user_id(user_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!(%user_id, "account not found");
                BillingError::NotFound("Account not found".to_string())
            })
    }

    /// Returns the user's current wallet balance.
    pub async fn check_credits(&self, user_id: &UserId) -> Result<CreditsView> {
        let account = self.account(user_id).await?;
        let credits = self.provider.wallet_balance(&account.wallet_id).await?;
        Ok(CreditsView { credits })
    }

    /// Returns the user's provider-side subscription.
    pub async fn check_subscription(&self, user_id: &UserId) -> Result<SubscriptionView> {
        let account = self.account(user_id).await?;
        let subscription = self.provider.find_subscription(account.id).await?;
        Ok(SubscriptionView { subscription })
    }

    /// Looks up a coupon, rejecting expired ones.
    pub async fn check_coupon(&self, code: &str) -> Result<CouponView> {
        let coupon = self.provider.find_coupon(code).await?;
        if coupon.is_expired(Utc::now()) {
            return Err(BillingError::Expired("This coupon is expired".to_string()));
        }
        Ok(CouponView { coupon })
    }
}
