//! Amazon SQS source.
//!
//! Receives are short polls (`WaitTimeSeconds=0`) so an empty queue ends a
//! run immediately. The SDK retry strategy is disabled; a failed call surfaces
//! straight away and the message comes back after its visibility timeout.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::config::retry::RetryConfig;
use aws_sdk_sqs::config::{BehaviorVersion, Builder as SqsConfigBuilder, Credentials, Region};
use aws_sdk_sqs::error::ProvideErrorMetadata;
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::types::{Message as SqsMessage, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use futures::FutureExt;
use queuebridge_core::SourceQueue;
use queuebridge_domain::constants::MAX_RECEIVE_BATCH;
use queuebridge_domain::{Batch, BridgeError, Message, Result, SourceSettings};
use tracing::{debug, warn};

use crate::errors::InfraError;

const CREDENTIALS_PROVIDER_NAME: &str = "queuebridge-static";

/// Source queue backed by an SQS queue URL.
pub struct SqsSource {
    client: Client,
    queue_url: String,
}

impl SqsSource {
    /// Build the SDK client for `settings`.
    ///
    /// Static credentials are used when configured, otherwise the default AWS
    /// provider chain (environment, profile, instance role).
    pub async fn connect(settings: &SourceSettings) -> Self {
        let mut builder = match &settings.credentials {
            Some(credentials) => SqsConfigBuilder::new()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(Credentials::new(
                    credentials.access_key_id.clone(),
                    credentials.secret_access_key.clone(),
                    None,
                    None,
                    CREDENTIALS_PROVIDER_NAME,
                )),
            None => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(Region::new(settings.region.clone()))
                    .load()
                    .await;
                SqsConfigBuilder::from(&shared)
            }
        };

        builder = builder
            .region(Region::new(settings.region.clone()))
            .retry_config(RetryConfig::disabled());

        // LocalStack, ElasticMQ and friends
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(Client::from_conf(builder.build()), settings.queue_url.clone())
    }

    pub fn from_client(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl SourceQueue for SqsSource {
    async fn receive(&self, max_messages: usize, visibility_timeout: Duration) -> Result<Batch> {
        let max_messages = i32::try_from(max_messages.clamp(1, MAX_RECEIVE_BATCH))
            .map_err(|e| BridgeError::Internal(format!("batch size out of range: {e}")))?;
        let visibility_timeout = i32::try_from(visibility_timeout.as_secs()).map_err(|_| {
            BridgeError::Configuration(format!(
                "visibility timeout {visibility_timeout:?} is too large"
            ))
        })?;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .visibility_timeout(visibility_timeout)
            .wait_time_seconds(0)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            // Segment the async state machine; the send future is large.
            .boxed()
            .await
            .map_err(|e| BridgeError::from(InfraError::from(e)))?;

        let batch: Batch = output.messages().iter().filter_map(to_message).collect();
        debug!(count = batch.len(), "source.receive.completed");
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let result = self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .boxed()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => match err.as_service_error() {
                Some(DeleteMessageError::ReceiptHandleIsInvalid(invalid)) => {
                    Err(BridgeError::InvalidReceiptHandle(
                        invalid.message().unwrap_or("receipt handle is invalid").to_string(),
                    ))
                }
                Some(service) if is_expired_receipt_handle(service.code(), service.message()) => {
                    Err(BridgeError::InvalidReceiptHandle(
                        service.message().unwrap_or("receipt handle has expired").to_string(),
                    ))
                }
                _ => Err(InfraError::from(err).into()),
            },
        }
    }
}

/// SQS reports a lapsed lease as `InvalidParameterValue` rather than
/// `ReceiptHandleIsInvalid`.
fn is_expired_receipt_handle(code: Option<&str>, message: Option<&str>) -> bool {
    code == Some("InvalidParameterValue")
        && message.is_some_and(|m| m.to_ascii_lowercase().contains("receipt handle"))
}

fn to_message(message: &SqsMessage) -> Option<Message> {
    let Some(receipt_handle) = message.receipt_handle() else {
        warn!(message_id = ?message.message_id(), "source.message.missing_receipt_handle");
        return None;
    };

    let id = message.message_id().unwrap_or_default().to_string();
    let body = message.body().unwrap_or_default().as_bytes().to_vec();
    let mut converted = Message::new(id, body, receipt_handle.to_string());

    if let Some(count) = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|raw| raw.parse::<u32>().ok())
    {
        converted = converted.with_receive_count(count);
    }

    Some(converted)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn converts_sdk_message_with_receive_count() {
        let message = SqsMessage::builder()
            .message_id("m-1")
            .receipt_handle("rh-1")
            .body("{\"order\":7}")
            .set_attributes(Some(HashMap::from([(
                MessageSystemAttributeName::ApproximateReceiveCount,
                "3".to_string(),
            )])))
            .build();

        let converted = to_message(&message).unwrap();

        assert_eq!(converted.id, "m-1");
        assert_eq!(converted.receipt_handle, "rh-1");
        assert_eq!(converted.body, b"{\"order\":7}".to_vec());
        assert_eq!(converted.receive_count, Some(3));
    }

    #[test]
    fn message_without_receipt_handle_is_skipped() {
        let message = SqsMessage::builder().message_id("m-2").body("x").build();
        assert!(to_message(&message).is_none());
    }

    #[test]
    fn empty_body_is_preserved_as_empty_bytes() {
        let message = SqsMessage::builder().message_id("m-3").receipt_handle("rh-3").build();
        let converted = to_message(&message).unwrap();
        assert!(converted.body.is_empty());
        assert_eq!(converted.receive_count, None);
    }

    #[test]
    fn expired_lease_is_recognised_by_code_and_message() {
        assert!(is_expired_receipt_handle(
            Some("InvalidParameterValue"),
            Some("Value rh-1 for parameter ReceiptHandle is invalid. Reason: The receipt handle has expired."),
        ));
        assert!(!is_expired_receipt_handle(
            Some("InvalidParameterValue"),
            Some("Value 0 for parameter MaxNumberOfMessages is invalid."),
        ));
        assert!(!is_expired_receipt_handle(Some("AccessDenied"), Some("receipt handle")));
        assert!(!is_expired_receipt_handle(None, None));
    }
}
