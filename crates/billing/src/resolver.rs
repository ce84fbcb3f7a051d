//! Cache-aside reads of product, plan and coupon snapshots.

use cache::SnapshotCache;
use common::ProductId;
use domain::{Coupon, Plan, Product, ProductStore};
use provider::BillingProvider;

use crate::error::{BillingError, Result};

/// Cache-first reader for pricing data.
///
/// Lookups try the snapshot cache and fall back to the source of truth
/// (the relational store for products, the billing provider for plans and
/// coupons) on a miss *or* a cache error. The read path never writes back:
/// cache population belongs to the periodic refresh jobs, so entries may
/// lag the source by up to one refresh interval and callers must tolerate
/// that staleness.
pub struct SnapshotResolver<C, P, S> {
    cache: C,
    provider: P,
    products: S,
}

impl<C, P, S> SnapshotResolver<C, P, S>
where
    C: SnapshotCache,
    P: BillingProvider,
    S: ProductStore,
{
    /// Creates a resolver over a cache and the two sources of truth.
    pub fn new(cache: C, provider: P, products: S) -> Self {
        Self {
            cache,
            provider,
            products,
        }
    }

    /// Attempts a cache read, treating every failure mode as a miss.
    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, error = %e, "corrupt cache entry, falling back");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, falling back");
                None
            }
        }
    }

    /// Resolves a product snapshot by id.
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        if let Some(product) = self.cached(&cache::product_key(id)).await {
            return Ok(product);
        }
        self.products
            .find_product_by_id(id)
            .await?
            .ok_or_else(|| BillingError::NotFound("Product not found".to_string()))
    }

    /// Resolves a plan snapshot by code.
    pub async fn plan(&self, code: &str) -> Result<Plan> {
        if let Some(plan) = self.cached(&cache::plan_key(code)).await {
            return Ok(plan);
        }
        Ok(self.provider.find_plan(code).await?)
    }

    /// Resolves a coupon snapshot by code.
    pub async fn coupon(&self, code: &str) -> Result<Coupon> {
        if let Some(coupon) = self.cached(&cache::coupon_key(code)).await {
            return Ok(coupon);
        }
        Ok(self.provider.find_coupon(code).await?)
    }
}
