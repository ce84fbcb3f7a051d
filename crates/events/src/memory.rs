//! In-memory event sink for tests.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::{EmitError, EventSink};

/// One event captured by the in-memory sink.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub topic: String,
    pub key: Option<String>,
    pub payload: serde_json::Value,
    pub headers: Vec<(String, String)>,
}

impl RecordedEvent {
    /// Returns the value of a header, if present.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    events: Vec<RecordedEvent>,
    fail_on_publish: bool,
}

/// In-memory sink recording every published event.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    state: Arc<RwLock<InMemorySinkState>>,
}

impl InMemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures publishes to fail.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }

    /// Returns every recorded event in publish order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.read().unwrap().events.clone()
    }

    /// Returns recorded events for one topic.
    pub fn events_for(&self, topic: &str) -> Vec<RecordedEvent> {
        self.state
            .read()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for InMemorySink {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &str,
        headers: &[(String, String)],
    ) -> Result<(), EmitError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_publish {
            return Err(EmitError::Transport("injected publish failure".to_string()));
        }
        let payload = serde_json::from_str(payload)?;
        state.events.push(RecordedEvent {
            topic: topic.to_string(),
            key: key.map(str::to_string),
            payload,
            headers: headers.to_vec(),
        });
        Ok(())
    }
}
