//! Kafka consumer loop dispatching consumed events to their handlers.

use billing::{AccountProvisioningSaga, BarcodeEvent, NewUser, UsageHandler};
use domain::{AccountStore, ProductStore};
use events::topics;
use provider::BillingProvider;
use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;

/// Runs the consumer loop until the task is aborted.
///
/// Each received event is handled inline; handler failures are logged
/// and the loop moves on — there is no caller to answer and redelivery
/// is the broker's concern.
pub async fn run_consumer<St, P>(
    brokers: &str,
    group_id: &str,
    provisioning: AccountProvisioningSaga<St, P>,
    usage: UsageHandler<St, P>,
) -> Result<(), rdkafka::error::KafkaError>
where
    St: AccountStore + ProductStore,
    P: BillingProvider,
{
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "latest")
        .create()?;

    consumer.subscribe(&[topics::USER_NEW, topics::BARCODE_NEW, topics::BARCODE_EDIT])?;
    tracing::info!(brokers, group_id, "event consumer started");

    loop {
        let message = match consumer.recv().await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "consumer receive failed");
                continue;
            }
        };

        let topic = message.topic().to_string();
        let payload = match message.payload_view::<str>() {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                tracing::warn!(topic, error = %e, "non-utf8 event payload, skipping");
                continue;
            }
            None => {
                tracing::warn!(topic, "empty event payload, skipping");
                continue;
            }
        };

        dispatch(&provisioning, &usage, &topic, payload).await;
    }
}

async fn dispatch<St, P>(
    provisioning: &AccountProvisioningSaga<St, P>,
    usage: &UsageHandler<St, P>,
    topic: &str,
    payload: &str,
) where
    St: AccountStore + ProductStore,
    P: BillingProvider,
{
    match topic {
        topics::USER_NEW => match serde_json::from_str::<NewUser>(payload) {
            Ok(user) => {
                // Failures already compensated and logged inside the saga.
                let _ = provisioning.on_user_created(&user).await;
            }
            Err(e) => tracing::warn!(topic, error = %e, "malformed user.new payload"),
        },
        topics::BARCODE_NEW => match serde_json::from_str::<BarcodeEvent>(payload) {
            Ok(event) => {
                if let Err(e) = usage.on_barcode_created(&event).await {
                    tracing::error!(error = %e, barcode_id = %event.id,
                        "barcode.new handling failed");
                }
            }
            Err(e) => tracing::warn!(topic, error = %e, "malformed barcode.new payload"),
        },
        topics::BARCODE_EDIT => match serde_json::from_str::<BarcodeEvent>(payload) {
            Ok(event) => {
                if let Err(e) = usage.on_barcode_edited(&event).await {
                    tracing::error!(error = %e, barcode_id = %event.id,
                        "barcode.edit handling failed");
                }
            }
            Err(e) => tracing::warn!(topic, error = %e, "malformed barcode.edit payload"),
        },
        other => tracing::warn!(topic = other, "unexpected topic"),
    }
}
