//! Domain-event emission for the billing service.
//!
//! The emitter publishes JSON events to the message broker with a stable
//! `transactionId` so that retried publishes of the same logical event can
//! be deduplicated by consumers. Entities with a natural key (a
//! subscription external id, a coupon code, a product id) get that key as
//! both a transport header and the embedded `transactionId`; purchase
//! outcomes have no natural key and are published keyless, leaving
//! deduplication to the consumer.
//!
//! Readiness is an explicit [`ConnectionHealth`] handle set once at
//! startup: every publish checks it and fails fast with a typed error
//! instead of pinging the broker per call.

pub mod error;
pub mod kafka;
pub mod memory;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Coupon, Product, PurchaseOutcome, Subscription};
use uuid::Uuid;

pub use error::EmitError;
pub use kafka::KafkaSink;
pub use memory::{InMemorySink, RecordedEvent};

/// The `source` header value attached to every emitted event.
pub const SOURCE: &str = "billing-service";

/// Topic names produced and consumed by this service.
pub mod topics {
    /// A purchase attempt succeeded.
    pub const PURCHASE_SUCCESS: &str = "billing.purchase.success";
    /// A purchase attempt failed.
    pub const PURCHASE_FAILED: &str = "billing.purchase.failed";
    /// A subscription was terminated by the maintenance job.
    pub const SUBSCRIPTION_TERMINATED: &str = "billing.subscription.terminated";
    /// A coupon was terminated by the maintenance job.
    pub const COUPON_TERMINATED: &str = "billing.coupon.terminated";
    /// A product row changed.
    pub const PRODUCT_UPDATED: &str = "billing.product.updated";

    /// Consumed: a new user was registered upstream.
    pub const USER_NEW: &str = "user.new";
    /// Consumed: a barcode was generated upstream.
    pub const BARCODE_NEW: &str = "barcode.new";
    /// Consumed: a barcode was edited upstream.
    pub const BARCODE_EDIT: &str = "barcode.edit";
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum HealthState {
    /// Startup has not confirmed connectivity yet.
    #[default]
    Unverified,
    /// Connectivity confirmed; publishes are allowed.
    Ready,
    /// Startup verification failed; terminal until restart.
    Failed(String),
}

/// Shared broker-connectivity flag, set during service startup and
/// queried on every publish.
#[derive(Debug, Clone, Default)]
pub struct ConnectionHealth {
    state: Arc<RwLock<HealthState>>,
}

impl ConnectionHealth {
    /// Creates an unverified handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the broker connection as confirmed.
    pub fn mark_ready(&self) {
        *self.state.write().unwrap() = HealthState::Ready;
    }

    /// Marks the broker connection as failed.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        *self.state.write().unwrap() = HealthState::Failed(reason.into());
    }

    /// Returns true when publishes are allowed.
    pub fn is_ready(&self) -> bool {
        *self.state.read().unwrap() == HealthState::Ready
    }

    /// Returns why the connection is unavailable, if it is.
    pub fn unavailable_reason(&self) -> Option<String> {
        match &*self.state.read().unwrap() {
            HealthState::Ready => None,
            HealthState::Unverified => {
                Some("broker connectivity not confirmed at startup".to_string())
            }
            HealthState::Failed(reason) => Some(reason.clone()),
        }
    }
}

/// Transport a publish goes through; Kafka in production, in-memory in
/// tests.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes one serialized event.
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &str,
        headers: &[(String, String)],
    ) -> Result<(), EmitError>;
}

/// Publishes domain events with deduplication metadata.
#[derive(Debug, Clone)]
pub struct EventEmitter<S> {
    sink: S,
    health: ConnectionHealth,
}

impl<S: EventSink> EventEmitter<S> {
    /// Creates an emitter over a sink and a shared health handle.
    pub fn new(sink: S, health: ConnectionHealth) -> Self {
        Self { sink, health }
    }

    /// Returns the health handle this emitter checks per publish.
    pub fn health(&self) -> &ConnectionHealth {
        &self.health
    }

    /// Publishes `payload` to `topic`, returning the transaction id.
    ///
    /// With a key, the key doubles as both the `idempotency-key` header
    /// and the embedded `transactionId`; without one a random id is
    /// generated per publish.
    pub async fn emit(
        &self,
        topic: &str,
        key: Option<&str>,
        mut payload: serde_json::Value,
    ) -> Result<String, EmitError> {
        if let Some(reason) = self.health.unavailable_reason() {
            return Err(EmitError::NotReady(reason));
        }

        let transaction_id = match key {
            Some(key) => key.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        match payload.as_object_mut() {
            Some(map) => {
                map.insert(
                    "transactionId".to_string(),
                    serde_json::Value::String(transaction_id.clone()),
                );
            }
            None => {
                return Err(EmitError::Payload(
                    "event payload must be a JSON object".to_string(),
                ));
            }
        }

        let mut headers = vec![
            ("eventType".to_string(), topic.to_string()),
            ("source".to_string(), SOURCE.to_string()),
            (
                "timestamp".to_string(),
                chrono::Utc::now().timestamp_millis().to_string(),
            ),
        ];
        if let Some(key) = key {
            headers.push(("idempotency-key".to_string(), key.to_string()));
        }

        self.sink
            .publish(topic, key, &payload.to_string(), &headers)
            .await?;
        tracing::debug!(topic, %transaction_id, "emitted event");
        Ok(transaction_id)
    }

    /// Publishes a purchase success outcome.
    ///
    /// Errors propagate: the purchase saga awaits this call and decides
    /// what a failure means for its own result.
    pub async fn purchase_success(&self, outcome: &PurchaseOutcome) -> Result<String, EmitError> {
        self.emit(topics::PURCHASE_SUCCESS, None, serde_json::to_value(outcome)?)
            .await
    }

    /// Publishes a purchase failure outcome. Errors propagate.
    pub async fn purchase_failed(&self, outcome: &PurchaseOutcome) -> Result<String, EmitError> {
        self.emit(topics::PURCHASE_FAILED, None, serde_json::to_value(outcome)?)
            .await
    }

    /// Publishes a subscription-terminated lifecycle event, keyed by the
    /// subscription's external id. Failures are logged and swallowed;
    /// termination already happened and is not undone by a lost event.
    pub async fn subscription_terminated(&self, subscription: &Subscription) {
        let payload = match serde_json::to_value(subscription) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize subscription terminated event");
                return;
            }
        };
        if let Err(e) = self
            .emit(
                topics::SUBSCRIPTION_TERMINATED,
                Some(subscription.external_id.as_str()),
                payload,
            )
            .await
        {
            tracing::error!(error = %e, external_id = %subscription.external_id,
                "emit failed for subscription terminated event");
        }
    }

    /// Publishes a coupon-terminated lifecycle event, keyed by the coupon
    /// code. Failures are logged and swallowed.
    pub async fn coupon_terminated(&self, coupon: &Coupon) {
        let payload = match serde_json::to_value(coupon) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize coupon terminated event");
                return;
            }
        };
        if let Err(e) = self
            .emit(topics::COUPON_TERMINATED, Some(coupon.code.as_str()), payload)
            .await
        {
            tracing::error!(error = %e, code = %coupon.code,
                "emit failed for coupon terminated event");
        }
    }

    /// Publishes a product-updated lifecycle event, keyed by the product
    /// id. Failures are logged and swallowed.
    pub async fn product_updated(&self, product: &Product) {
        let payload = match serde_json::to_value(product) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize product updated event");
                return;
            }
        };
        let product_id = product.id.to_string();
        if let Err(e) = self
            .emit(topics::PRODUCT_UPDATED, Some(product_id.as_str()), payload)
            .await
        {
            tracing::error!(error = %e, product_id = %product.id,
                "emit failed for product updated event");
        }
    }
}
