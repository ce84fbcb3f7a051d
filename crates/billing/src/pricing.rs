//! Pure price computation for packages, plans and coupons.

use cache::SnapshotCache;
use chrono::Utc;
use common::{Money, ProductId};
use domain::{Coupon, CouponType, ProductStore};
use provider::BillingProvider;
use serde::Serialize;

use crate::error::{BillingError, Result};
use crate::resolver::SnapshotResolver;

/// What to price.
#[derive(Debug, Clone)]
pub struct PriceRequest {
    pub product_id: ProductId,
    pub package_index: Option<usize>,
    pub plan_code: Option<String>,
    pub coupon_code: Option<String>,
}

/// The computed price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub total_price: f64,
    pub base_price: f64,
    pub coupon: Option<Coupon>,
}

/// Computes quotes from cached snapshots.
///
/// Read-only: safe to call repeatedly and concurrently. The base price is
/// the sum of the optional package contribution and the optional plan
/// contribution; at most one coupon applies, with no stacking.
pub struct PricingEngine<C, P, S> {
    resolver: SnapshotResolver<C, P, S>,
}

impl<C, P, S> PricingEngine<C, P, S>
where
    C: SnapshotCache,
    P: BillingProvider,
    S: ProductStore,
{
    /// Creates an engine over a snapshot resolver.
    pub fn new(resolver: SnapshotResolver<C, P, S>) -> Self {
        Self { resolver }
    }

    /// Computes the price for a product purchase.
    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn calculate_price(&self, request: &PriceRequest) -> Result<PriceQuote> {
        let product = self.resolver.product(request.product_id).await?;

        let mut base = Money::zero();

        if let Some(index) = request.package_index {
            let packages = product.packages().map_err(|_| {
                BillingError::Internal(format!(
                    "Error parsing packages for product: {}",
                    product.name
                ))
            })?;
            let package = packages.get(index).ok_or_else(|| {
                BillingError::Validation("Invalid package index is out of scope".to_string())
            })?;
            base += Money::from_major(package.price);
        }

        if let Some(code) = &request.plan_code {
            let plan = self.resolver.plan(code).await?;
            base += Money::from_cents(plan.amount_cents);
        }

        let (total, coupon) = match &request.coupon_code {
            Some(code) => {
                let coupon = self.resolver.coupon(code).await?;
                if coupon.is_expired(Utc::now()) {
                    return Err(BillingError::Expired("This coupon is expired".to_string()));
                }
                (apply_discount(base, &coupon), Some(coupon))
            }
            None => (base, None),
        };

        Ok(PriceQuote {
            total_price: total.to_major(),
            base_price: base.to_major(),
            coupon,
        })
    }
}

/// Applies exactly one coupon rule to the base price.
///
/// Fixed-amount coupons subtract their value and clamp at zero;
/// percentage coupons remove `rate` percent of the price, rate in 0–100.
fn apply_discount(base: Money, coupon: &Coupon) -> Money {
    match coupon.coupon_type {
        CouponType::FixedAmount => {
            base.saturating_sub(Money::from_cents(coupon.amount_cents.unwrap_or(0)))
        }
        CouponType::Percentage => base.percent_discounted(coupon.percentage_rate.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache::InMemoryCache;
    use chrono::Duration;
    use domain::{ExpirationPolicy, InMemoryStore, Package, Plan, Product};
    use provider::InMemoryBillingProvider;

    struct Fixture {
        engine: PricingEngine<InMemoryCache, InMemoryBillingProvider, InMemoryStore>,
        provider: InMemoryBillingProvider,
        product_id: ProductId,
    }

    fn fixture(packages: Vec<Package>) -> Fixture {
        let cache = InMemoryCache::new();
        let provider = InMemoryBillingProvider::new();
        let store = InMemoryStore::new();

        let product = Product::new("barcode", None, packages);
        let product_id = product.id;
        store.insert_product(product);

        let engine =
            PricingEngine::new(SnapshotResolver::new(cache, provider.clone(), store));
        Fixture {
            engine,
            provider,
            product_id,
        }
    }

    fn default_packages() -> Vec<Package> {
        vec![
            Package {
                credits: 10,
                price: 5.0,
            },
            Package {
                credits: 50,
                price: 20.0,
            },
        ]
    }

    fn request(f: &Fixture) -> PriceRequest {
        PriceRequest {
            product_id: f.product_id,
            package_index: None,
            plan_code: None,
            coupon_code: None,
        }
    }

    fn percentage_coupon(code: &str, rate: f64) -> Coupon {
        Coupon {
            code: code.to_string(),
            name: None,
            coupon_type: CouponType::Percentage,
            amount_cents: None,
            percentage_rate: Some(rate),
            expiration: ExpirationPolicy::NoExpiration,
            expiration_at: None,
            terminated_at: None,
        }
    }

    fn fixed_coupon(code: &str, amount_cents: i64) -> Coupon {
        Coupon {
            code: code.to_string(),
            name: None,
            coupon_type: CouponType::FixedAmount,
            amount_cents: Some(amount_cents),
            percentage_rate: None,
            expiration: ExpirationPolicy::NoExpiration,
            expiration_at: None,
            terminated_at: None,
        }
    }

    #[tokio::test]
    async fn package_index_alone_prices_the_package() {
        let f = fixture(default_packages());
        let quote = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(1),
                ..request(&f)
            })
            .await
            .unwrap();

        assert_eq!(quote.base_price, 20.0);
        assert_eq!(quote.total_price, 20.0);
        assert!(quote.coupon.is_none());
    }

    #[tokio::test]
    async fn plan_code_adds_its_amount_in_major_units() {
        let f = fixture(default_packages());
        f.provider.insert_plan(Plan {
            code: "pro".to_string(),
            name: None,
            amount_cents: 999,
            amount_currency: None,
            interval: None,
        });

        let quote = f
            .engine
            .calculate_price(&PriceRequest {
                plan_code: Some("pro".to_string()),
                ..request(&f)
            })
            .await
            .unwrap();

        assert_eq!(quote.base_price, 9.99);
        assert_eq!(quote.total_price, 9.99);
    }

    #[tokio::test]
    async fn package_and_plan_contributions_are_additive() {
        let f = fixture(default_packages());
        f.provider.insert_plan(Plan {
            code: "pro".to_string(),
            name: None,
            amount_cents: 999,
            amount_currency: None,
            interval: None,
        });

        let quote = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(0),
                plan_code: Some("pro".to_string()),
                ..request(&f)
            })
            .await
            .unwrap();

        assert_eq!(quote.base_price, 14.99);
    }

    #[tokio::test]
    async fn fixed_coupon_clamps_at_zero() {
        let f = fixture(vec![Package {
            credits: 10,
            price: 10.0,
        }]);
        f.provider.insert_coupon(fixed_coupon("FREE", 1500));

        let quote = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(0),
                coupon_code: Some("FREE".to_string()),
                ..request(&f)
            })
            .await
            .unwrap();

        assert_eq!(quote.total_price, 0.0);
        assert_eq!(quote.base_price, 10.0);
        assert_eq!(quote.coupon.unwrap().amount_cents, Some(1500));
    }

    #[tokio::test]
    async fn fixed_coupon_subtracts_its_amount() {
        let f = fixture(vec![Package {
            credits: 10,
            price: 10.0,
        }]);
        f.provider.insert_coupon(fixed_coupon("SAVE4", 400));

        let quote = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(0),
                coupon_code: Some("SAVE4".to_string()),
                ..request(&f)
            })
            .await
            .unwrap();

        assert_eq!(quote.total_price, 6.0);
    }

    #[tokio::test]
    async fn percentage_coupon_removes_rate_percent() {
        let f = fixture(vec![Package {
            credits: 10,
            price: 100.0,
        }]);
        f.provider.insert_coupon(percentage_coupon("OFF25", 25.0));

        let quote = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(0),
                coupon_code: Some("OFF25".to_string()),
                ..request(&f)
            })
            .await
            .unwrap();

        // Canonical formula: base * (1 - rate/100). The historical
        // base * (100 - rate) variant would yield 7500 here.
        assert_eq!(quote.total_price, 75.0);
        assert_eq!(quote.base_price, 100.0);
    }

    #[tokio::test]
    async fn out_of_range_index_is_a_validation_error() {
        let f = fixture(vec![Package {
            credits: 10,
            price: 10.0,
        }]);

        let err = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(2),
                ..request(&f)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Validation(_)));
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let f = fixture(default_packages());
        let err = f
            .engine
            .calculate_price(&PriceRequest {
                product_id: ProductId::new(),
                package_index: None,
                plan_code: None,
                coupon_code: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn expired_coupon_is_rejected() {
        let f = fixture(vec![Package {
            credits: 10,
            price: 10.0,
        }]);
        let mut coupon = percentage_coupon("OLD", 25.0);
        coupon.expiration = ExpirationPolicy::TimeLimit;
        coupon.expiration_at = Some(Utc::now() - Duration::hours(1));
        f.provider.insert_coupon(coupon);

        let err = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(0),
                coupon_code: Some("OLD".to_string()),
                ..request(&f)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Expired(_)));
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn missing_coupon_is_not_found() {
        let f = fixture(default_packages());
        let err = f
            .engine
            .calculate_price(&PriceRequest {
                package_index: Some(0),
                coupon_code: Some("NOPE".to_string()),
                ..request(&f)
            })
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), 404);
    }
}
