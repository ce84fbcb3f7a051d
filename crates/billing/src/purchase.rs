//! The purchase saga.
//!
//! Linear flow with one branch point:
//!
//! ```text
//! Start ──► Validate ──► Mutate(Single | Package | Subscription) ──► EmitSuccess ──► Done
//!              │                          │
//!              └────────── failure ───────┴──► EmitFailure ──► Fail
//! ```
//!
//! Validation reads the account and product in one snapshot and finishes
//! before any provider mutation is attempted. The mutation step records
//! the outcome fields it already knows before calling the provider, so a
//! later failure still reports partial state. There is no compensation
//! for a provider mutation that succeeded before a later step failed:
//! that gap is accepted as eventual consistency and always logged.

use chrono::{Duration, Utc};
use domain::{
    AccountStore, ProductStore, PurchaseKind, PurchaseOutcome, PurchaseRequest,
};
use events::{EventEmitter, EventSink};
use provider::BillingProvider;
use serde::Serialize;

use crate::error::{BillingError, Result};
use crate::locks::AccountLocks;

/// Result message returned to the caller on success.
pub const PURCHASE_SUCCESS_MESSAGE: &str = "Successfully initialized barcodes buy";

/// Subscriptions created by the purchase flow end 30 days after creation.
const SUBSCRIPTION_DURATION_DAYS: i64 = 30;

/// Success response of the purchase saga.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub message: String,
}

/// Orchestrates a purchase across the relational store, the billing
/// provider and the event broker.
pub struct PurchaseSaga<St, P, K> {
    store: St,
    provider: P,
    emitter: EventEmitter<K>,
    locks: AccountLocks,
    product_name: String,
}

impl<St, P, K> PurchaseSaga<St, P, K>
where
    St: AccountStore + ProductStore,
    P: BillingProvider,
    K: EventSink,
{
    /// Creates a saga selling the product found by `product_name`.
    pub fn new(
        store: St,
        provider: P,
        emitter: EventEmitter<K>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            emitter,
            locks: AccountLocks::new(),
            product_name: product_name.into(),
        }
    }

    /// Executes one purchase attempt.
    ///
    /// Exactly one outcome event is published per attempt. The publish is
    /// awaited, but its failure never overrides the result already
    /// computed for the caller: a successful purchase stays successful
    /// and a failed one keeps its original error.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, kind = ?request.kind))]
    pub async fn buy(&self, request: PurchaseRequest) -> Result<PurchaseReceipt> {
        // One writer per account for the whole run: concurrent purchases
        // for the same user would otherwise share a snapshot and both
        // mutate the provider.
        let _guard = self.locks.acquire(&request.user_id).await;

        metrics::counter!("purchase_attempts_total").increment(1);
        let start = std::time::Instant::now();

        let mut outcome = PurchaseOutcome::empty(request.user_id.clone());
        match self.run(&request, &mut outcome).await {
            Ok(()) => {
                if let Err(e) = self.emitter.purchase_success(&outcome).await {
                    tracing::error!(error = %e, user_id = %request.user_id,
                        "purchase succeeded but success event emission failed");
                }
                metrics::histogram!("purchase_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                Ok(PurchaseReceipt {
                    message: PURCHASE_SUCCESS_MESSAGE.to_string(),
                })
            }
            Err(err) => {
                if let Err(e) = self.emitter.purchase_failed(&outcome).await {
                    tracing::error!(error = %e, user_id = %request.user_id,
                        "failure event emission failed");
                }
                metrics::counter!("purchase_failures_total").increment(1);
                tracing::warn!(error = %err, user_id = %request.user_id, "purchase failed");
                Err(err)
            }
        }
    }

    async fn run(&self, request: &PurchaseRequest, outcome: &mut PurchaseOutcome) -> Result<()> {
        // Validate: account and product in one consistent read, all
        // checks before any provider mutation.
        let account = self.store.find_account_by_user_id(&request.user_id).await?;
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

        if let Some(index) = request.package_index {
            if index >= packages.len() {
                return Err(BillingError::Validation(
                    "Invalid package index is out of scope".to_string(),
                ));
            }
        }

        let account = account.ok_or_else(|| {
            tracing::debug!(user_id = %request.user_id, "account not found");
            BillingError::NotFound("Account not found".to_string())
        })?;

        // Mutate: one provider call per branch; partial outcome fields
        // are recorded first so a failure can still report them.
        match request.kind {
            PurchaseKind::Single => {
                let package = packages.first().ok_or_else(|| {
                    BillingError::Internal(format!("product '{}' has no packages", product.name))
                })?;
                outcome.credits = Some(package.credits);
                outcome.price = Some(package.price);
                self.provider
                    .grant_credits(&account.wallet_id, package.credits)
                    .await?;
            }
            PurchaseKind::Package => {
                let index = request.package_index.ok_or_else(|| {
                    BillingError::Validation(
                        "packageIndex is required for package purchases".to_string(),
                    )
                })?;
                let package = packages[index];
                outcome.credits = Some(package.credits);
                outcome.price = Some(package.price);
                self.provider
                    .grant_credits(&account.wallet_id, package.credits)
                    .await?;
            }
            PurchaseKind::Subscription => {
                let plan_code = request.plan_code.as_deref().ok_or_else(|| {
                    BillingError::Validation(
                        "planCode is required for subscription purchases".to_string(),
                    )
                })?;
                let ending_at = Utc::now() + Duration::days(SUBSCRIPTION_DURATION_DAYS);
                let subscription = self
                    .provider
                    .create_subscription(account.id, plan_code, ending_at)
                    .await?;
                outcome.subscription = Some(subscription);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AccountId, CustomerId, UserId, WalletId};
    use domain::{Account, InMemoryStore, Package, Product};
    use events::{ConnectionHealth, InMemorySink, topics};
    use provider::InMemoryBillingProvider;

    struct Fixture {
        saga: PurchaseSaga<InMemoryStore, InMemoryBillingProvider, InMemorySink>,
        store: InMemoryStore,
        provider: InMemoryBillingProvider,
        sink: InMemorySink,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let provider = InMemoryBillingProvider::new();
        let sink = InMemorySink::new();
        let health = ConnectionHealth::new();
        health.mark_ready();
        let emitter = EventEmitter::new(sink.clone(), health);

        let saga = PurchaseSaga::new(store.clone(), provider.clone(), emitter, "barcode");
        Fixture {
            saga,
            store,
            provider,
            sink,
        }
    }

    fn seed_product(f: &Fixture) {
        f.store.insert_product(Product::new(
            "Barcode credits",
            None,
            vec![
                Package {
                    credits: 10,
                    price: 5.0,
                },
                Package {
                    credits: 50,
                    price: 20.0,
                },
            ],
        ));
    }

    fn seed_account(f: &Fixture, user: &str) -> Account {
        let account = Account::new(
            AccountId::new(),
            UserId::new(user),
            WalletId::new("wal-main"),
            CustomerId::new("cus-main"),
        );
        f.store.insert_account(account.clone());
        account
    }

    #[tokio::test]
    async fn single_purchase_tops_up_first_package() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u1");

        let receipt = f
            .saga
            .buy(PurchaseRequest::single(UserId::new("u1")))
            .await
            .unwrap();

        assert_eq!(receipt.message, PURCHASE_SUCCESS_MESSAGE);
        assert_eq!(f.provider.top_ups(), vec![("wal-main".to_string(), 10)]);

        let events = f.sink.events_for(topics::PURCHASE_SUCCESS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["userId"], "u1");
        assert_eq!(events[0].payload["credits"], 10);
        assert_eq!(events[0].payload["price"], 5.0);
        assert!(events[0].payload["subscription"].is_null());
        assert!(events[0].payload["transactionId"].is_string());
    }

    #[tokio::test]
    async fn package_purchase_tops_up_indexed_package() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u2");

        f.saga
            .buy(PurchaseRequest::package(UserId::new("u2"), 1))
            .await
            .unwrap();

        assert_eq!(f.provider.top_ups(), vec![("wal-main".to_string(), 50)]);

        let events = f.sink.events_for(topics::PURCHASE_SUCCESS);
        assert_eq!(events[0].payload["credits"], 50);
        assert_eq!(events[0].payload["price"], 20.0);
    }

    #[tokio::test]
    async fn subscription_purchase_creates_provider_subscription() {
        let f = fixture();
        seed_product(&f);
        let account = seed_account(&f, "u3");

        f.saga
            .buy(PurchaseRequest::subscription(
                UserId::new("u3"),
                "plan_basic",
            ))
            .await
            .unwrap();

        // No wallet mutation on the subscription branch.
        assert!(f.provider.top_ups().is_empty());
        assert!(
            f.provider
                .has_active_subscription(account.id)
                .await
                .unwrap()
        );

        let events = f.sink.events_for(topics::PURCHASE_SUCCESS);
        assert_eq!(events.len(), 1);
        assert!(events[0].payload["credits"].is_null());
        assert!(events[0].payload["price"].is_null());
        assert_eq!(
            events[0].payload["subscription"]["plan_code"],
            "plan_basic"
        );
    }

    #[tokio::test]
    async fn subscription_ends_thirty_days_out() {
        let f = fixture();
        seed_product(&f);
        let account = seed_account(&f, "u3");

        f.saga
            .buy(PurchaseRequest::subscription(
                UserId::new("u3"),
                "plan_basic",
            ))
            .await
            .unwrap();

        let subscription = f.provider.find_subscription(account.id).await.unwrap();
        let ending_at = subscription.ending_at.unwrap();
        let days = (ending_at - Utc::now()).num_days();
        assert!((29..=30).contains(&days), "expected ~30 days, got {days}");
    }

    #[tokio::test]
    async fn out_of_range_index_fails_validation_before_any_mutation() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u1");

        let err = f
            .saga
            .buy(PurchaseRequest::package(UserId::new("u1"), 10))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Validation(_)));
        assert_eq!(err.http_status(), 400);
        assert!(f.provider.top_ups().is_empty());

        // A failed outcome is still published, with nothing resolved.
        let events = f.sink.events_for(topics::PURCHASE_FAILED);
        assert_eq!(events.len(), 1);
        assert!(events[0].payload["credits"].is_null());
        assert!(events[0].payload["price"].is_null());
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let f = fixture();
        seed_product(&f);

        let err = f
            .saga
            .buy(PurchaseRequest::single(UserId::new("u404")))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::NotFound(_)));
        assert_eq!(err.http_status(), 404);
        assert!(f.provider.top_ups().is_empty());
    }

    #[tokio::test]
    async fn missing_product_is_internal() {
        let f = fixture();
        seed_account(&f, "u1");

        let err = f
            .saga
            .buy(PurchaseRequest::single(UserId::new("u1")))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Internal(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn malformed_stored_packages_are_internal() {
        let f = fixture();
        seed_account(&f, "u1");
        let mut product = Product::new("Barcode credits", None, vec![]);
        product.packages = serde_json::json!("{broken");
        f.store.insert_product(product);

        let err = f
            .saga
            .buy(PurchaseRequest::single(UserId::new("u1")))
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn provider_failure_after_validation_reports_partial_outcome() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u1");
        f.provider.set_fail_on_grant(true);

        let err = f
            .saga
            .buy(PurchaseRequest::package(UserId::new("u1"), 1))
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), 500);

        // The failed event carries the credits/price determined before
        // the provider call.
        let events = f.sink.events_for(topics::PURCHASE_FAILED);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["credits"], 50);
        assert_eq!(events[0].payload["price"], 20.0);
        assert!(events[0].payload["subscription"].is_null());
    }

    #[tokio::test]
    async fn emission_failure_does_not_mask_success() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u1");
        f.sink.set_fail_on_publish(true);

        let receipt = f
            .saga
            .buy(PurchaseRequest::single(UserId::new("u1")))
            .await
            .unwrap();

        assert_eq!(receipt.message, PURCHASE_SUCCESS_MESSAGE);
        // The wallet mutation still happened; only the event was lost.
        assert_eq!(f.provider.top_ups().len(), 1);
    }

    #[tokio::test]
    async fn emission_failure_does_not_mask_the_original_error() {
        let f = fixture();
        seed_product(&f);
        f.sink.set_fail_on_publish(true);

        let err = f
            .saga
            .buy(PurchaseRequest::single(UserId::new("u404")))
            .await
            .unwrap_err();

        // Still the account lookup failure, not an emission error.
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn package_kind_requires_an_index() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u1");

        let request = PurchaseRequest {
            user_id: UserId::new("u1"),
            kind: PurchaseKind::Package,
            package_index: None,
            plan_code: None,
        };
        let err = f.saga.buy(request).await.unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn subscription_kind_requires_a_plan_code() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u1");

        let request = PurchaseRequest {
            user_id: UserId::new("u1"),
            kind: PurchaseKind::Subscription,
            package_index: None,
            plan_code: None,
        };
        let err = f.saga.buy(request).await.unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn concurrent_purchases_for_one_user_both_complete() {
        let f = fixture();
        seed_product(&f);
        seed_account(&f, "u1");

        let saga = std::sync::Arc::new(f.saga);
        let a = {
            let saga = saga.clone();
            tokio::spawn(
                async move { saga.buy(PurchaseRequest::single(UserId::new("u1"))).await },
            )
        };
        let b = {
            let saga = saga.clone();
            tokio::spawn(
                async move { saga.buy(PurchaseRequest::single(UserId::new("u1"))).await },
            )
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Serialized, not interleaved: both top-ups landed.
        assert_eq!(f.provider.top_ups().len(), 2);
    }
}
