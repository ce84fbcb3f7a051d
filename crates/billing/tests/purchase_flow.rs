//! End-to-end orchestration tests over the in-memory implementations:
//! provisioning feeds the purchase saga, which feeds the read queries.

use billing::{
    AccountProvisioningSaga, BillingQueries, MaintenanceJobs, NewUser, PricingEngine,
    PriceRequest, PurchaseSaga, SnapshotResolver,
};
use cache::InMemoryCache;
use chrono::{Duration, Utc};
use common::UserId;
use domain::{InMemoryStore, Package, Product, ProductStore, PurchaseRequest};
use events::{ConnectionHealth, EventEmitter, InMemorySink, topics};
use provider::{BillingProvider, InMemoryBillingProvider};

struct World {
    store: InMemoryStore,
    provider: InMemoryBillingProvider,
    cache: InMemoryCache,
    sink: InMemorySink,
    emitter: EventEmitter<InMemorySink>,
}

fn world() -> World {
    let store = InMemoryStore::new();
    let provider = InMemoryBillingProvider::new();
    let cache = InMemoryCache::new();
    let sink = InMemorySink::new();
    let health = ConnectionHealth::new();
    health.mark_ready();
    let emitter = EventEmitter::new(sink.clone(), health);

    store.insert_product(Product::new(
        "Barcode credits",
        Some("Prepaid barcode generation".to_string()),
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

    World {
        store,
        provider,
        cache,
        sink,
        emitter,
    }
}

#[tokio::test]
async fn provisioned_account_can_purchase_and_check_credits() {
    let w = world();
    let provisioning =
        AccountProvisioningSaga::new(w.store.clone(), w.provider.clone());
    let purchase = PurchaseSaga::new(
        w.store.clone(),
        w.provider.clone(),
        w.emitter.clone(),
        "barcode",
    );
    let queries = BillingQueries::new(w.store.clone(), w.provider.clone());

    // A new-user event provisions wallet + customer + account.
    let account = provisioning
        .on_user_created(&NewUser {
            id: "user-7".to_string(),
            email: None,
        })
        .await
        .unwrap();

    // The provisioned user buys package 1.
    purchase
        .buy(PurchaseRequest::package(UserId::new("user-7"), 1))
        .await
        .unwrap();

    assert_eq!(
        w.provider.top_ups(),
        vec![(account.wallet_id.as_str().to_string(), 50)]
    );

    // The read side sees the topped-up balance.
    let view = queries.check_credits(&UserId::new("user-7")).await.unwrap();
    assert_eq!(view.credits, 50.0);

    let events = w.sink.events_for(topics::PURCHASE_SUCCESS);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["credits"], 50);
}

#[tokio::test]
async fn quoted_price_matches_the_purchased_package() {
    let w = world();
    let provisioning =
        AccountProvisioningSaga::new(w.store.clone(), w.provider.clone());
    let purchase = PurchaseSaga::new(
        w.store.clone(),
        w.provider.clone(),
        w.emitter.clone(),
        "barcode",
    );
    let pricing = PricingEngine::new(SnapshotResolver::new(
        w.cache.clone(),
        w.provider.clone(),
        w.store.clone(),
    ));

    provisioning
        .on_user_created(&NewUser {
            id: "user-8".to_string(),
            email: None,
        })
        .await
        .unwrap();

    let product_id = w.store.list_all_products().await.unwrap()[0].id;
    let quote = pricing
        .calculate_price(&PriceRequest {
            product_id,
            package_index: Some(1),
            plan_code: None,
            coupon_code: None,
        })
        .await
        .unwrap();

    purchase
        .buy(PurchaseRequest::package(UserId::new("user-8"), 1))
        .await
        .unwrap();

    let events = w.sink.events_for(topics::PURCHASE_SUCCESS);
    assert_eq!(events[0].payload["price"], quote.total_price);
}

#[tokio::test]
async fn subscription_purchase_then_expiry_job_announces_termination() {
    let w = world();
    let provisioning =
        AccountProvisioningSaga::new(w.store.clone(), w.provider.clone());
    let purchase = PurchaseSaga::new(
        w.store.clone(),
        w.provider.clone(),
        w.emitter.clone(),
        "barcode",
    );
    let jobs = MaintenanceJobs::new(
        w.provider.clone(),
        w.cache.clone(),
        w.store.clone(),
        w.emitter.clone(),
        None,
    );

    let account = provisioning
        .on_user_created(&NewUser {
            id: "user-9".to_string(),
            email: None,
        })
        .await
        .unwrap();

    purchase
        .buy(PurchaseRequest::subscription(
            UserId::new("user-9"),
            "plan_basic",
        ))
        .await
        .unwrap();

    // Not yet expired: the job leaves it alone.
    let report = jobs.terminate_expired_subscriptions().await.unwrap();
    assert_eq!(report.count, 0);

    // Age the subscription past its end date and run the job again.
    let mut subscription = w.provider.find_subscription(account.id).await.unwrap();
    subscription.ending_at = Some(Utc::now() - Duration::hours(1));
    w.provider.insert_subscription(subscription.clone());

    let report = jobs.terminate_expired_subscriptions().await.unwrap();
    assert_eq!(report.count, 1);

    let events = w.sink.events_for(topics::SUBSCRIPTION_TERMINATED);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].key.as_deref(),
        Some(subscription.external_id.as_str())
    );
}
