//! Purchase request and outcome types.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::subscription::Subscription;

/// What a purchase request is buying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseKind {
    /// The smallest package (index 0).
    Single,
    /// A specific package by index.
    Package,
    /// A recurring subscription on a plan.
    Subscription,
}

/// A validated-shape purchase request.
///
/// `package_index` must be within the product's package list when the
/// kind requires it; `plan_code` is required for subscription purchases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub user_id: UserId,
    pub kind: PurchaseKind,
    pub package_index: Option<usize>,
    pub plan_code: Option<String>,
}

impl PurchaseRequest {
    /// A single-package purchase (always package 0).
    pub fn single(user_id: UserId) -> Self {
        Self {
            user_id,
            kind: PurchaseKind::Single,
            package_index: None,
            plan_code: None,
        }
    }

    /// A purchase of the package at `index`.
    pub fn package(user_id: UserId, index: usize) -> Self {
        Self {
            user_id,
            kind: PurchaseKind::Package,
            package_index: Some(index),
            plan_code: None,
        }
    }

    /// A subscription purchase on `plan_code`.
    pub fn subscription(user_id: UserId, plan_code: impl Into<String>) -> Self {
        Self {
            user_id,
            kind: PurchaseKind::Subscription,
            package_index: None,
            plan_code: Some(plan_code.into()),
        }
    }
}

/// The emitted fact describing one purchase attempt.
///
/// Exactly one success or failure outcome is published per attempt. A
/// failure outcome carries whatever fields were already known at the
/// point of failure — possibly none of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub user_id: UserId,
    pub credits: Option<u32>,
    pub price: Option<f64>,
    pub subscription: Option<Subscription>,
}

impl PurchaseOutcome {
    /// An outcome with no fields resolved yet.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            credits: None,
            price: None,
            subscription: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_deserializes_from_screaming_case() {
        let kind: PurchaseKind = serde_json::from_str("\"PACKAGE\"").unwrap();
        assert_eq!(kind, PurchaseKind::Package);
    }

    #[test]
    fn outcome_serializes_camel_case_with_nulls() {
        let outcome = PurchaseOutcome {
            user_id: UserId::new("u1"),
            credits: Some(50),
            price: Some(20.0),
            subscription: None,
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["credits"], 50);
        assert_eq!(value["price"], 20.0);
        assert!(value["subscription"].is_null());
    }
}
