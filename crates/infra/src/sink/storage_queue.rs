//! Azure Storage Queue sink over the Queue service REST API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use queuebridge_core::SinkQueue;
use queuebridge_domain::constants::MAX_SINK_MESSAGE_BYTES;
use queuebridge_domain::{BridgeError, Result, SinkSettings};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};
use url::Url;

use super::connection_string::{StorageAccount, StorageCredential};
use super::shared_key::{self, SignableRequest};
use crate::http::HttpClient;

const SERVICE_VERSION: &str = "2021-12-02";
const XML_CONTENT_TYPE: &str = "application/xml";

/// Destination queue in an Azure Storage account.
pub struct StorageQueueSink {
    http: HttpClient,
    account: StorageAccount,
    queue_name: String,
    ensured: OnceCell<()>,
}

impl StorageQueueSink {
    /// Build a sink from validated settings.
    ///
    /// # Errors
    /// Returns [`BridgeError::Configuration`] if the connection string cannot
    /// be parsed.
    pub fn new(http: HttpClient, settings: &SinkSettings) -> Result<Self> {
        let account = StorageAccount::parse(&settings.connection_string)?;
        Ok(Self { http, account, queue_name: settings.queue_name.clone(), ensured: OnceCell::new() })
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn queue_url(&self, messages: bool) -> Result<Url> {
        let mut url = self.account.queue_endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                BridgeError::Configuration("sink: queue endpoint cannot carry a path".into())
            })?;
            segments.pop_if_empty().push(&self.queue_name);
            if messages {
                segments.push("messages");
            }
        }
        if let StorageCredential::Sas(token) = &self.account.credential {
            url.set_query(Some(token));
        }
        Ok(url)
    }

    async fn execute(&self, method: Method, url: Url, body: Option<String>) -> Result<Response> {
        let content_length = body.as_ref().map_or(0, String::len);
        let content_type = body.as_ref().map(|_| XML_CONTENT_TYPE);

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-version", HeaderValue::from_static(SERVICE_VERSION));
        headers.insert("x-ms-date", header_value(&rfc1123_now())?);
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        if let StorageCredential::SharedKey { account, key } = &self.account.credential {
            let signable = SignableRequest {
                method: &method,
                url: &url,
                headers: &headers,
                content_length,
                content_type,
            };
            let authorization = shared_key::authorization(account, key, &signable)?;
            headers.insert(AUTHORIZATION, header_value(&authorization)?);
        }

        let request =
            self.http.request(method, url).headers(headers).body(body.unwrap_or_default());
        self.http.send(request).await
    }

    async fn create_queue(&self) -> Result<()> {
        let response = self.execute(Method::PUT, self.queue_url(false)?, None).await?;

        match response.status() {
            StatusCode::CREATED => {
                info!(queue = %self.queue_name, "sink.queue.created");
                Ok(())
            }
            StatusCode::NO_CONTENT => {
                debug!(queue = %self.queue_name, "sink.queue.exists");
                Ok(())
            }
            StatusCode::CONFLICT => {
                // Exists with different metadata; still usable as a destination.
                debug!(queue = %self.queue_name, "sink.queue.exists_with_metadata");
                Ok(())
            }
            _ => Err(unexpected_status("create queue", response)),
        }
    }
}

#[async_trait]
impl SinkQueue for StorageQueueSink {
    #[instrument(skip(self), fields(queue = %self.queue_name))]
    async fn ensure_exists(&self) -> Result<()> {
        self.ensured.get_or_try_init(|| self.create_queue()).await.map(|_| ())
    }

    async fn send(&self, body: &[u8]) -> Result<()> {
        let encoded = STANDARD.encode(body);
        if encoded.len() > MAX_SINK_MESSAGE_BYTES {
            return Err(BridgeError::PayloadTooLarge {
                limit: MAX_SINK_MESSAGE_BYTES,
                actual: encoded.len(),
            });
        }

        let envelope = format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><QueueMessage><MessageText>{encoded}</MessageText></QueueMessage>"
        );
        let response = self.execute(Method::POST, self.queue_url(true)?, Some(envelope)).await?;

        if response.status() == StatusCode::CREATED {
            Ok(())
        } else {
            Err(unexpected_status("put message", response))
        }
    }
}

fn unexpected_status(operation: &str, response: Response) -> BridgeError {
    let code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    BridgeError::SinkUnavailable(format!(
        "{operation} returned HTTP {} ({code})",
        response.status().as_u16()
    ))
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| BridgeError::Internal(format!("invalid header value: {e}")))
}
