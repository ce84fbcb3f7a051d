//! Coupon snapshot as owned by the billing provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discount rule a coupon applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    /// Removes a fixed amount (in cents) from the base price.
    FixedAmount,
    /// Removes a percentage (0–100) of the base price.
    Percentage,
}

/// How a coupon expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationPolicy {
    /// The coupon never expires on its own.
    NoExpiration,
    /// The coupon expires at `expiration_at`.
    TimeLimit,
}

/// A coupon snapshot.
///
/// Coupons are owned by the billing provider and only cached locally;
/// this type mirrors the provider's shape closely enough that snapshots
/// round-trip through the cache unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    /// Coupon code, unique at the provider.
    pub code: String,
    /// Display name.
    pub name: Option<String>,
    /// Which discount rule applies.
    pub coupon_type: CouponType,
    /// Fixed discount in cents; set for `FixedAmount` coupons.
    pub amount_cents: Option<i64>,
    /// Percentage removed, 0–100; set for `Percentage` coupons.
    pub percentage_rate: Option<f64>,
    /// Expiration policy.
    pub expiration: ExpirationPolicy,
    /// Expiry instant for `TimeLimit` coupons.
    pub expiration_at: Option<DateTime<Utc>>,
    /// Set once the provider has terminated the coupon.
    pub terminated_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Returns true if the coupon can no longer be applied.
    ///
    /// A coupon is unusable once terminated, or once a time-limited
    /// expiration instant has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.terminated_at.is_some() {
            return true;
        }
        if self.expiration == ExpirationPolicy::TimeLimit {
            if let Some(expires) = self.expiration_at {
                return expires <= now;
            }
        }
        false
    }
}
