//! The account provisioning saga.
//!
//! Reacts to a `user.new` event: two independent provider-side creations
//! (wallet, then customer) must both succeed before the local account row
//! is written. No cross-system transaction exists, so the saga tracks
//! what it has created so far and tears it down best-effort, in reverse
//! creation order, when a later step fails.

use common::{AccountId, CustomerId, UserId, WalletId};
use domain::{Account, AccountStore};
use provider::BillingProvider;
use serde::Deserialize;

use crate::error::{BillingError, Result};

/// Payload of the consumed `user.new` event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Upstream user id.
    pub id: String,
    /// Upstream email, informational only.
    #[serde(default)]
    pub email: Option<String>,
}

/// Provider-side resources created so far in one provisioning attempt.
///
/// The orchestrator is the only record of these until the account row is
/// written; compensation reads them back in reverse order.
#[derive(Debug, Default)]
struct CreatedResources {
    wallet: Option<WalletId>,
    customer: Option<CustomerId>,
}

/// Creates accounts for new users, compensating on partial failure.
pub struct AccountProvisioningSaga<St, P> {
    accounts: St,
    provider: P,
}

impl<St, P> AccountProvisioningSaga<St, P>
where
    St: AccountStore,
    P: BillingProvider,
{
    /// Creates the saga over an account store and the billing provider.
    pub fn new(accounts: St, provider: P) -> Self {
        Self { accounts, provider }
    }

    /// Handles one `user.new` event.
    ///
    /// There is no caller to answer on the consumer side: the returned
    /// error exists for tests and logging, and compensation has already
    /// run by the time it is returned.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn on_user_created(&self, user: &NewUser) -> Result<Account> {
        let account_id = AccountId::new();
        let mut created = CreatedResources::default();

        match self.provision(account_id, user, &mut created).await {
            Ok(account) => {
                metrics::counter!("accounts_provisioned_total").increment(1);
                tracing::info!(
                    %account_id,
                    wallet_id = %account.wallet_id,
                    customer_id = %account.customer_id,
                    "account created for new user"
                );
                Ok(account)
            }
            Err(err) => {
                tracing::error!(error = %err, user_id = %user.id,
                    "error creating account for new user");
                self.compensate(&created).await;
                metrics::counter!("account_provisioning_failures_total").increment(1);
                Err(err)
            }
        }
    }

    /// Forward path: wallet, then customer, then the account row.
    async fn provision(
        &self,
        account_id: AccountId,
        user: &NewUser,
        created: &mut CreatedResources,
    ) -> Result<Account> {
        let wallet_id = self.provider.create_wallet(account_id).await?;
        created.wallet = Some(wallet_id.clone());

        let customer_id = self.provider.create_customer(account_id).await?;
        created.customer = Some(customer_id.clone());

        let account = Account::new(account_id, UserId::new(&user.id), wallet_id, customer_id);
        Ok(self.accounts.create_account(account).await?)
    }

    /// Deletes whatever was created, newest first. Each compensating
    /// call's failure is logged on its own and does not block the next
    /// one; a failed compensation leaves an orphaned provider resource
    /// behind (no retry), which the log line is the only trace of.
    async fn compensate(&self, created: &CreatedResources) {
        if let Some(customer_id) = &created.customer {
            match self.provider.delete_customer(customer_id).await {
                Ok(()) => tracing::warn!(%customer_id, "rolled back provider customer"),
                Err(e) => {
                    tracing::error!(error = %e, %customer_id, "customer rollback failed");
                }
            }
        }
        if let Some(wallet_id) = &created.wallet {
            match self.provider.terminate_wallet(wallet_id).await {
                Ok(()) => tracing::warn!(%wallet_id, "rolled back provider wallet"),
                Err(e) => {
                    tracing::error!(error = %e, %wallet_id, "wallet rollback failed");
                }
            }
        }
    }
}
