//! Subscription snapshot as owned by the billing provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a provider-side subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Terminated,
    Canceled,
}

impl SubscriptionStatus {
    /// Returns the status in the provider's wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Terminated => "terminated",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

/// A subscription created on the billing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Caller-chosen id, unique at the provider.
    pub external_id: String,
    /// The plan this subscription is on.
    pub plan_code: String,
    /// Current lifecycle status.
    pub status: SubscriptionStatus,
    /// Provider-side customer the subscription belongs to.
    pub external_customer_id: Option<String>,
    /// When the subscription ends; subscriptions created by the purchase
    /// flow default this to 30 days from creation.
    pub ending_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_in_provider_format() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(SubscriptionStatus::Pending.as_str(), "pending");
    }
}
