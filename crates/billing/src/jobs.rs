//! Periodic maintenance logic.
//!
//! The scheduling mechanics live with the caller; these methods hold the
//! triggered logic: expiring provider-side subscriptions and coupons, and
//! repopulating the snapshot cache. Batch runs page through the
//! provider's listings with an explicit page cursor and keep going past
//! per-item failures, returning one aggregated report per run.

use std::time::Duration;

use cache::SnapshotCache;
use chrono::Utc;
use domain::{Coupon, ProductStore, Subscription, SubscriptionStatus};
use events::{EventEmitter, EventSink};
use provider::BillingProvider;

use crate::error::Result;

/// Provider listing page size for batch runs.
const PAGE_SIZE: u32 = 100;

/// Aggregated result of one termination run.
#[derive(Debug, Clone)]
pub struct TerminationReport<T> {
    pub count: usize,
    pub list: Vec<T>,
}

/// Maintenance jobs over the provider, the store and the cache.
pub struct MaintenanceJobs<P, C, St, K> {
    provider: P,
    cache: C,
    products: St,
    emitter: EventEmitter<K>,
    cache_ttl: Option<Duration>,
}

impl<P, C, St, K> MaintenanceJobs<P, C, St, K>
where
    P: BillingProvider,
    C: SnapshotCache,
    St: ProductStore,
    K: EventSink,
{
    /// Creates the job set. `cache_ttl` bounds refresh-job entries;
    /// `None` stores them without expiry.
    pub fn new(
        provider: P,
        cache: C,
        products: St,
        emitter: EventEmitter<K>,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            cache,
            products,
            emitter,
            cache_ttl,
        }
    }

    /// Terminates every active or pending subscription whose end date has
    /// passed, then emits one terminated event per affected subscription.
    ///
    /// A single termination failure is logged and skipped; the run keeps
    /// going. There is no transaction between a termination call and its
    /// event.
    #[tracing::instrument(skip(self))]
    pub async fn terminate_expired_subscriptions(
        &self,
    ) -> Result<TerminationReport<Subscription>> {
        let now = Utc::now();
        let mut page = 1;
        let mut list = Vec::new();

        loop {
            let subscriptions = self
                .provider
                .list_subscriptions(
                    page,
                    PAGE_SIZE,
                    &[SubscriptionStatus::Active, SubscriptionStatus::Pending],
                )
                .await?;
            if subscriptions.is_empty() {
                break;
            }
            let fetched = subscriptions.len();

            for subscription in subscriptions {
                let Some(ending_at) = subscription.ending_at else {
                    continue;
                };
                if ending_at > now {
                    continue;
                }

                match self
                    .provider
                    .terminate_subscription(&subscription.external_id)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(
                            external_id = %subscription.external_id,
                            status = ?subscription.status,
                            %ending_at,
                            "terminated expired subscription"
                        );
                        list.push(subscription);
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            external_id = %subscription.external_id,
                            "failed terminating subscription"
                        );
                    }
                }
            }

            if fetched < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        for subscription in &list {
            self.emitter.subscription_terminated(subscription).await;
        }

        metrics::counter!("subscriptions_terminated_total").increment(list.len() as u64);
        tracing::info!(count = list.len(), "terminated expired subscriptions");
        Ok(TerminationReport {
            count: list.len(),
            list,
        })
    }

    /// Terminates every expired, not-yet-terminated coupon, then emits
    /// one terminated event per affected coupon.
    #[tracing::instrument(skip(self))]
    pub async fn terminate_expired_coupons(&self) -> Result<TerminationReport<Coupon>> {
        let now = Utc::now();
        let mut page = 1;
        let mut list = Vec::new();

        loop {
            let coupons = self.provider.list_coupons(page, PAGE_SIZE).await?;
            if coupons.is_empty() {
                break;
            }
            let fetched = coupons.len();

            for coupon in coupons {
                if coupon.terminated_at.is_some() {
                    continue;
                }
                if !coupon.is_expired(now) {
                    continue;
                }

                match self.provider.terminate_coupon(&coupon.code).await {
                    Ok(()) => {
                        tracing::info!(
                            code = %coupon.code,
                            expiration_at = ?coupon.expiration_at,
                            "terminated expired coupon"
                        );
                        list.push(coupon);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, code = %coupon.code,
                            "failed terminating coupon");
                    }
                }
            }

            if fetched < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        for coupon in &list {
            self.emitter.coupon_terminated(coupon).await;
        }

        metrics::counter!("coupons_terminated_total").increment(list.len() as u64);
        tracing::info!(count = list.len(), "terminated expired coupons");
        Ok(TerminationReport {
            count: list.len(),
            list,
        })
    }

    /// Rewrites every product snapshot into the cache.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_product_cache(&self) -> Result<usize> {
        let products = self.products.list_all_products().await?;
        let mut count = 0;
        for product in products {
            let json = serde_json::to_string(&product)
                .map_err(|e| crate::BillingError::Internal(e.to_string()))?;
            self.cache
                .set(&cache::product_key(product.id), &json, self.cache_ttl)
                .await?;
            count += 1;
        }
        tracing::debug!(count, "refreshed product cache");
        Ok(count)
    }

    /// Rewrites every plan snapshot into the cache.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_plan_cache(&self) -> Result<usize> {
        let mut page = 1;
        let mut count = 0;
        loop {
            let plans = self.provider.list_plans(page, PAGE_SIZE).await?;
            if plans.is_empty() {
                break;
            }
            let fetched = plans.len();
            for plan in plans {
                let json = serde_json::to_string(&plan)
                    .map_err(|e| crate::BillingError::Internal(e.to_string()))?;
                self.cache
                    .set(&cache::plan_key(&plan.code), &json, self.cache_ttl)
                    .await?;
                count += 1;
            }
            if fetched < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
        tracing::debug!(count, "refreshed plan cache");
        Ok(count)
    }

    /// Rewrites every coupon snapshot into the cache.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_coupon_cache(&self) -> Result<usize> {
        let mut page = 1;
        let mut count = 0;
        loop {
            let coupons = self.provider.list_coupons(page, PAGE_SIZE).await?;
            if coupons.is_empty() {
                break;
            }
            let fetched = coupons.len();
            for coupon in coupons {
                let json = serde_json::to_string(&coupon)
                    .map_err(|e| crate::BillingError::Internal(e.to_string()))?;
                self.cache
                    .set(&cache::coupon_key(&coupon.code), &json, self.cache_ttl)
                    .await?;
                count += 1;
            }
            if fetched < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
        tracing::debug!(count, "refreshed coupon cache");
        Ok(count)
    }
}
