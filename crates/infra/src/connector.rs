//! Builds the SQS/Azure client pair for a run.
//!
//! The connector owns the last pair it built. Runs with unchanged connection
//! settings reuse it, so SDK clients, HTTP connection pools and the sink's
//! "queue exists" memo survive between runs. Changed settings (for example a
//! rotated key) produce a fresh pair on the next run.

use std::sync::Arc;

use async_trait::async_trait;
use queuebridge_core::{QueueClients, QueueConnector, SinkQueue, SourceQueue};
use queuebridge_domain::{ConnectionSettings, Result};
use tokio::sync::Mutex;
use tracing::info;

use crate::http::HttpClient;
use crate::sink::StorageQueueSink;
use crate::source::SqsSource;

pub struct CloudQueueConnector {
    http: HttpClient,
    cached: Mutex<Option<(ConnectionSettings, QueueClients)>>,
}

impl CloudQueueConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http, cached: Mutex::new(None) }
    }

    async fn build(&self, settings: &ConnectionSettings) -> Result<QueueClients> {
        let sink: Arc<dyn SinkQueue> =
            Arc::new(StorageQueueSink::new(self.http.clone(), &settings.sink)?);
        let source: Arc<dyn SourceQueue> = Arc::new(SqsSource::connect(&settings.source).await);
        Ok(QueueClients { source, sink })
    }
}

#[async_trait]
impl QueueConnector for CloudQueueConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<QueueClients> {
        let mut cached = self.cached.lock().await;
        if let Some((known, clients)) = cached.as_ref() {
            if known == settings {
                return Ok(clients.clone());
            }
        }

        let clients = self.build(settings).await?;
        info!(
            queue_url = %settings.source.queue_url,
            sink_queue = %settings.sink.queue_name,
            "connector.clients.built"
        );
        *cached = Some((settings.clone(), clients.clone()));
        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use queuebridge_domain::{SinkSettings, SourceSettings, StaticCredentials};

    use super::*;

    fn settings(queue_name: &str) -> ConnectionSettings {
        ConnectionSettings {
            source: SourceSettings {
                queue_url: "http://127.0.0.1:9324/000000000000/orders".into(),
                region: "us-east-1".into(),
                endpoint_url: Some("http://127.0.0.1:9324".into()),
                credentials: Some(StaticCredentials {
                    access_key_id: "AKIDEXAMPLE".into(),
                    secret_access_key: "secret".into(),
                }),
            },
            sink: SinkSettings {
                connection_string: "UseDevelopmentStorage=true".into(),
                queue_name: queue_name.into(),
            },
        }
    }

    #[tokio::test]
    async fn unchanged_settings_reuse_clients() {
        let connector = CloudQueueConnector::new(HttpClient::new().unwrap());

        let first = connector.connect(&settings("orders")).await.unwrap();
        let second = connector.connect(&settings("orders")).await.unwrap();

        assert!(Arc::ptr_eq(&first.sink, &second.sink));
        assert!(Arc::ptr_eq(&first.source, &second.source));
    }

    #[tokio::test]
    async fn changed_settings_rebuild_clients() {
        let connector = CloudQueueConnector::new(HttpClient::new().unwrap());

        let first = connector.connect(&settings("orders")).await.unwrap();
        let second = connector.connect(&settings("invoices")).await.unwrap();

        assert!(!Arc::ptr_eq(&first.sink, &second.sink));
    }

    #[tokio::test]
    async fn malformed_sink_connection_string_is_configuration_error() {
        let connector = CloudQueueConnector::new(HttpClient::new().unwrap());
        let mut bad = settings("orders");
        bad.sink.connection_string = "AccountName=orders".into();

        let result = connector.connect(&bad).await;

        assert!(matches!(result, Err(queuebridge_domain::BridgeError::Configuration(_))));
    }
}
