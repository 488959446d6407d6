//! Shared test helpers for `queuebridge-core` integration tests.
//!
//! In-memory fakes for every port. The fake source models visibility leases
//! closely enough to test redelivery across runs: received messages are
//! hidden until `expire_leases` is called, and each receive hands out a fresh
//! receipt handle that invalidates the previous one.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use queuebridge_core::{QueueClients, QueueConnector, RunReporter, SinkQueue, SourceQueue};
use queuebridge_domain::{
    Batch, BridgeError, ConnectionConfig, ConnectionSettings, FailureStage, Message, Result,
    RunConfig, RunSummary,
};

/// Observable side effects, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EnsureExists,
    Receive { max_messages: usize, visibility_timeout: Duration },
    Send { body: Vec<u8> },
    Delete { message_id: String },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
struct StoredMessage {
    id: String,
    body: Vec<u8>,
    receive_count: u32,
    lease: Option<String>,
}

/// Source queue with visibility-lease semantics.
pub struct FakeSource {
    messages: Mutex<Vec<StoredMessage>>,
    events: EventLog,
    receive_error: Mutex<Option<BridgeError>>,
    delete_errors: Mutex<HashMap<String, BridgeError>>,
    lease_counter: AtomicUsize,
}

impl FakeSource {
    pub fn new(events: EventLog) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            events,
            receive_error: Mutex::new(None),
            delete_errors: Mutex::new(HashMap::new()),
            lease_counter: AtomicUsize::new(0),
        }
    }

    pub fn with_messages(self, messages: &[(&str, &[u8])]) -> Self {
        {
            let mut stored = self.messages.lock().unwrap();
            for (id, body) in messages {
                stored.push(StoredMessage {
                    id: (*id).to_string(),
                    body: body.to_vec(),
                    receive_count: 0,
                    lease: None,
                });
            }
        }
        self
    }

    pub fn with_receive_count(self, id: &str, count: u32) -> Self {
        {
            let mut stored = self.messages.lock().unwrap();
            if let Some(message) = stored.iter_mut().find(|m| m.id == id) {
                message.receive_count = count;
            }
        }
        self
    }

    pub fn fail_receive(&self, error: BridgeError) {
        *self.receive_error.lock().unwrap() = Some(error);
    }

    /// Make deleting the message with `id` fail with `error`.
    pub fn fail_delete(&self, id: &str, error: BridgeError) {
        self.delete_errors.lock().unwrap().insert(id.to_string(), error);
    }

    pub fn clear_failures(&self) {
        *self.receive_error.lock().unwrap() = None;
        self.delete_errors.lock().unwrap().clear();
    }

    /// Simulate every visibility timeout elapsing.
    pub fn expire_leases(&self) {
        for message in self.messages.lock().unwrap().iter_mut() {
            message.lease = None;
        }
    }

    pub fn remaining_ids(&self) -> Vec<String> {
        self.messages.lock().unwrap().iter().map(|m| m.id.clone()).collect()
    }
}

#[async_trait]
impl SourceQueue for FakeSource {
    async fn receive(&self, max_messages: usize, visibility_timeout: Duration) -> Result<Batch> {
        self.events.lock().unwrap().push(Event::Receive { max_messages, visibility_timeout });
        if let Some(error) = self.receive_error.lock().unwrap().clone() {
            return Err(error);
        }

        let mut stored = self.messages.lock().unwrap();
        let mut batch = Vec::new();
        for message in stored.iter_mut().filter(|m| m.lease.is_none()).take(max_messages) {
            let lease = format!(
                "{}#{}",
                message.id,
                self.lease_counter.fetch_add(1, Ordering::SeqCst)
            );
            message.lease = Some(lease.clone());
            message.receive_count += 1;
            batch.push(
                Message::new(message.id.clone(), message.body.clone(), lease)
                    .with_receive_count(message.receive_count),
            );
        }
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let message_id = receipt_handle.split('#').next().unwrap_or_default().to_string();
        if let Some(error) = self.delete_errors.lock().unwrap().get(&message_id).cloned() {
            return Err(error);
        }

        let mut stored = self.messages.lock().unwrap();
        let position = stored.iter().position(|m| m.lease.as_deref() == Some(receipt_handle));
        match position {
            Some(index) => {
                stored.remove(index);
                self.events.lock().unwrap().push(Event::Delete { message_id });
                Ok(())
            }
            None => Err(BridgeError::InvalidReceiptHandle(receipt_handle.to_string())),
        }
    }
}

/// Sink that records every accepted body.
pub struct FakeSink {
    events: EventLog,
    received: Mutex<Vec<Vec<u8>>>,
    failing_bodies: Mutex<HashSet<Vec<u8>>>,
    hanging_bodies: Mutex<HashSet<Vec<u8>>>,
    ensure_error: Mutex<Option<BridgeError>>,
    send_delay: Mutex<Option<Duration>>,
}

impl FakeSink {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            received: Mutex::new(Vec::new()),
            failing_bodies: Mutex::new(HashSet::new()),
            hanging_bodies: Mutex::new(HashSet::new()),
            ensure_error: Mutex::new(None),
            send_delay: Mutex::new(None),
        }
    }

    pub fn fail_body(&self, body: &[u8]) {
        self.failing_bodies.lock().unwrap().insert(body.to_vec());
    }

    /// Never answer a send of `body`.
    pub fn hang_body(&self, body: &[u8]) {
        self.hanging_bodies.lock().unwrap().insert(body.to_vec());
    }

    pub fn fail_ensure(&self, error: BridgeError) {
        *self.ensure_error.lock().unwrap() = Some(error);
    }

    pub fn delay_sends(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }

    pub fn heal(&self) {
        self.failing_bodies.lock().unwrap().clear();
        *self.ensure_error.lock().unwrap() = None;
        *self.send_delay.lock().unwrap() = None;
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl SinkQueue for FakeSink {
    async fn ensure_exists(&self) -> Result<()> {
        self.events.lock().unwrap().push(Event::EnsureExists);
        match self.ensure_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn send(&self, body: &[u8]) -> Result<()> {
        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let hangs = self.hanging_bodies.lock().unwrap().contains(body);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing_bodies.lock().unwrap().contains(body) {
            return Err(BridgeError::SinkUnavailable("injected send failure".into()));
        }
        self.events.lock().unwrap().push(Event::Send { body: body.to_vec() });
        self.received.lock().unwrap().push(body.to_vec());
        Ok(())
    }
}

/// Connector handing out fixed fakes and counting how often it was asked.
pub struct FakeConnector {
    pub source: Arc<FakeSource>,
    pub sink: Arc<FakeSink>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(source: Arc<FakeSource>, sink: Arc<FakeSink>) -> Self {
        Self { source, sink, connects: AtomicUsize::new(0) }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueConnector for FakeConnector {
    async fn connect(&self, _settings: &ConnectionSettings) -> Result<QueueClients> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let source: Arc<dyn SourceQueue> = self.source.clone();
        let sink: Arc<dyn SinkQueue> = self.sink.clone();
        Ok(QueueClients { source, sink })
    }
}

/// Reporter capturing everything it is told.
#[derive(Default)]
pub struct RecordingReporter {
    summaries: Mutex<Vec<RunSummary>>,
    failures: Mutex<Vec<(String, FailureStage, BridgeError)>>,
}

impl RecordingReporter {
    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<(String, FailureStage, BridgeError)> {
        self.failures.lock().unwrap().clone()
    }
}

impl RunReporter for RecordingReporter {
    fn report_summary(&self, summary: &RunSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }

    fn report_failure(&self, message: &Message, stage: FailureStage, error: &BridgeError) {
        self.failures.lock().unwrap().push((message.id.clone(), stage, error.clone()));
    }
}

/// Fully populated run configuration with the gate open.
pub fn enabled_config() -> RunConfig {
    RunConfig {
        enabled: true,
        connection: ConnectionConfig {
            source_access_key_id: Some("AKIDEXAMPLE".into()),
            source_secret_access_key: Some("secret".into()),
            source_region: Some("us-east-1".into()),
            source_queue_url: Some("https://sqs.us-east-1.amazonaws.com/123456789012/orders".into()),
            source_endpoint_url: None,
            sink_connection_string: Some("UseDevelopmentStorage=true".into()),
            sink_queue_name: Some("orders".into()),
        },
    }
}

/// Source, sink and shared event log wired together.
pub struct Harness {
    pub events: EventLog,
    pub source: Arc<FakeSource>,
    pub sink: Arc<FakeSink>,
}

impl Harness {
    pub fn with_messages(messages: &[(&str, &[u8])]) -> Self {
        let events = event_log();
        let source = Arc::new(FakeSource::new(events.clone()).with_messages(messages));
        let sink = Arc::new(FakeSink::new(events.clone()));
        Self { events, source, sink }
    }

    pub fn clients(&self) -> QueueClients {
        let source: Arc<dyn SourceQueue> = self.source.clone();
        let sink: Arc<dyn SinkQueue> = self.sink.clone();
        QueueClients { source, sink }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}
