//! Per-account purchase serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::UserId;
use tokio::sync::OwnedMutexGuard;

/// Keyed async mutexes giving each account a single writer.
///
/// Without this, two concurrent purchases for one user both read the same
/// account snapshot and both proceed to mutate the billing provider. The
/// lock is held for the full saga run, so the second request observes the
/// provider state the first one left behind.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    locks: Arc<Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AccountLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one account, waiting if another purchase for
    /// the same account is in flight. Different accounts never contend.
    pub async fn acquire(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(user_id.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_account_is_serialized() {
        let locks = AccountLocks::new();
        let user = UserId::new("u1");

        let guard = locks.acquire(&user).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&user)).await;
        assert!(second.is_err(), "second acquire should block while held");

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&user)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_accounts_do_not_contend() {
        let locks = AccountLocks::new();
        let _guard = locks.acquire(&UserId::new("u1")).await;

        let other =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(&UserId::new("u2")))
                .await;
        assert!(other.is_ok());
    }
}
