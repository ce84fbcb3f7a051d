//! Account entity linking an internal user to provider-side resources.

use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, UserId, WalletId};
use serde::{Deserialize, Serialize};

/// Identity record linking a user id to the billing provider's wallet and
/// customer ids.
///
/// At most one account exists per user id. The wallet and customer ids are
/// assigned by the provider during account provisioning and never change
/// for the lifetime of the account; the only writer is the provisioning
/// saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal account row id.
    pub id: AccountId,
    /// The user this account belongs to.
    pub user_id: UserId,
    /// Provider-assigned wallet id.
    pub wallet_id: WalletId,
    /// Provider-assigned customer id.
    pub customer_id: CustomerId,
    /// When the account row was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new account record with the given provider-side ids.
    pub fn new(
        id: AccountId,
        user_id: UserId,
        wallet_id: WalletId,
        customer_id: CustomerId,
    ) -> Self {
        Self {
            id,
            user_id,
            wallet_id,
            customer_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_carries_provider_ids() {
        let id = AccountId::new();
        let account = Account::new(
            id,
            UserId::new("u1"),
            WalletId::new("wal_1"),
            CustomerId::new("cus_1"),
        );

        assert_eq!(account.id, id);
        assert_eq!(account.wallet_id.as_str(), "wal_1");
        assert_eq!(account.customer_id.as_str(), "cus_1");
    }
}
