//! Kafka event sink over an rdkafka producer.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use crate::{EmitError, EventSink};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka-backed event sink.
#[derive(Clone)]
pub struct KafkaSink {
    producer: FutureProducer,
}

impl KafkaSink {
    /// Creates a producer for the given brokers.
    ///
    /// Creation does not verify connectivity; call
    /// [`KafkaSink::verify_connectivity`] at startup and record the result
    /// on the emitter's health handle.
    pub fn connect(brokers: &str, client_id: &str) -> Result<Self, EmitError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("message.timeout.ms", "5000")
            .set("allow.auto.create.topics", "true")
            .create()
            .map_err(|e| EmitError::Transport(e.to_string()))?;
        Ok(Self { producer })
    }

    /// Confirms the brokers are reachable by fetching cluster metadata.
    pub fn verify_connectivity(&self, timeout: Duration) -> Result<(), EmitError> {
        self.producer
            .client()
            .fetch_metadata(None, timeout)
            .map(|_| ())
            .map_err(|e| EmitError::Transport(e.to_string()))
    }
}

#[async_trait]
impl EventSink for KafkaSink {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &str,
        headers: &[(String, String)],
    ) -> Result<(), EmitError> {
        let mut kafka_headers = OwnedHeaders::new();
        for (name, value) in headers {
            kafka_headers = kafka_headers.insert(Header {
                key: name.as_str(),
                value: Some(value.as_str()),
            });
        }

        let mut record: FutureRecord<'_, str, str> =
            FutureRecord::to(topic).payload(payload).headers(kafka_headers);
        if let Some(key) = key {
            record = record.key(key);
        }

        self.producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map_err(|(e, _)| EmitError::Transport(e.to_string()))?;
        Ok(())
    }
}
