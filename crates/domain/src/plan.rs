//! Subscription plan snapshot as owned by the billing provider.

use serde::{Deserialize, Serialize};

/// A recurring subscription plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan code, unique at the provider.
    pub code: String,
    /// Display name.
    pub name: Option<String>,
    /// Recurring price in cents.
    pub amount_cents: i64,
    /// ISO currency code.
    pub amount_currency: Option<String>,
    /// Billing interval (e.g. "monthly").
    pub interval: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_roundtrips_through_json() {
        let plan = Plan {
            code: "plan_basic".to_string(),
            name: Some("Basic".to_string()),
            amount_cents: 999,
            amount_currency: Some("USD".to_string()),
            interval: Some("monthly".to_string()),
        };

        let json = serde_json::to_string(&plan).unwrap();
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }
}
