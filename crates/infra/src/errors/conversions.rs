//! Conversions from external infrastructure errors into bridge errors.
//!
//! HTTP failures only ever come from the sink, AWS SDK failures only ever
//! from the source, so each conversion picks the matching availability
//! variant.

use std::error::Error as StdError;
use std::fmt::Debug;

use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use queuebridge_domain::BridgeError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BridgeError);

impl From<InfraError> for BridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BridgeError> for InfraError {
    fn from(value: BridgeError) -> Self {
        InfraError(value)
    }
}

trait IntoBridgeError {
    fn into_bridge(self) -> BridgeError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BridgeError */
/* -------------------------------------------------------------------------- */

impl IntoBridgeError for HttpError {
    fn into_bridge(self) -> BridgeError {
        if self.is_timeout() {
            return BridgeError::SinkUnavailable("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BridgeError::SinkUnavailable("HTTP connection failure".into());
        }

        if self.is_builder() {
            return BridgeError::Internal(format!("failed to build HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            return BridgeError::SinkUnavailable(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }

        BridgeError::SinkUnavailable(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bridge())
    }
}

/* -------------------------------------------------------------------------- */
/* aws_sdk_sqs SdkError → BridgeError */
/* -------------------------------------------------------------------------- */

impl<E, R> IntoBridgeError for SdkError<E, R>
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    fn into_bridge(self) -> BridgeError {
        let detail = match &self {
            SdkError::ServiceError(context) => {
                let err = context.err();
                format!(
                    "{}: {}",
                    err.code().unwrap_or("UnknownServiceError"),
                    err.message().unwrap_or("no message")
                )
            }
            SdkError::TimeoutError(_) => "request timed out".to_string(),
            SdkError::DispatchFailure(_) => {
                format!("dispatch failure: {}", DisplayErrorContext(&self))
            }
            _ => DisplayErrorContext(&self).to_string(),
        };
        BridgeError::SourceUnavailable(detail)
    }
}

impl<E, R> From<SdkError<E, R>> for InfraError
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    fn from(value: SdkError<E, R>) -> Self {
        InfraError(value.into_bridge())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_403_maps_to_sink_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::FORBIDDEN))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: BridgeError = InfraError::from(error).into();
        match mapped {
            BridgeError::SinkUnavailable(msg) => assert!(msg.contains("403")),
            other => panic!("expected sink unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_maps_to_sink_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: BridgeError = InfraError::from(error).into();
        assert!(matches!(mapped, BridgeError::SinkUnavailable(_)));
    }

    #[test]
    fn newtype_round_trips_domain_error() {
        let original = BridgeError::Configuration("missing".into());
        let back: BridgeError = InfraError::from(original.clone()).into();
        assert_eq!(back, original);
    }
}
