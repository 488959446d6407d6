//! Azure Storage connection string parsing.
//!
//! Recognised keys (case-insensitive): `DefaultEndpointsProtocol`,
//! `AccountName`, `AccountKey`, `EndpointSuffix`, `QueueEndpoint`,
//! `SharedAccessSignature` and `UseDevelopmentStorage`.

use std::collections::HashMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use queuebridge_domain::{BridgeError, Result};
use url::Url;

/// Well-known account used by the Azurite storage emulator.
const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_QUEUE_ENDPOINT: &str = "http://127.0.0.1:10001/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// How requests to the storage account are authorised.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredential {
    /// Account key, decoded from base64
    SharedKey { account: String, key: Vec<u8> },
    /// Shared access signature query string, without the leading `?`
    Sas(String),
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey { account, .. } => {
                f.debug_struct("SharedKey").field("account", account).finish_non_exhaustive()
            }
            Self::Sas(_) => f.write_str("Sas(<redacted>)"),
        }
    }
}

/// Queue service endpoint plus the credential to use against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub queue_endpoint: Url,
    pub credential: StorageCredential,
}

impl StorageAccount {
    /// Parse a connection string.
    ///
    /// # Errors
    /// Returns [`BridgeError::Configuration`] when the string is malformed,
    /// names no endpoint, carries no credential or holds an account key that
    /// is not valid base64. Secret values never appear in the message.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let pairs = parse_pairs(connection_string)?;

        if pairs.get("usedevelopmentstorage").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            return Self::development();
        }

        let account_name = pairs.get("accountname").cloned();
        let queue_endpoint = match pairs.get("queueendpoint") {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => {
                let account = account_name.as_deref().ok_or_else(|| {
                    config_error("connection string needs AccountName or QueueEndpoint")
                })?;
                let protocol =
                    pairs.get("defaultendpointsprotocol").map_or(DEFAULT_PROTOCOL, String::as_str);
                let suffix =
                    pairs.get("endpointsuffix").map_or(DEFAULT_ENDPOINT_SUFFIX, String::as_str);
                parse_endpoint(&format!("{protocol}://{account}.queue.{suffix}"))?
            }
        };

        let credential = if let Some(key) = pairs.get("accountkey") {
            let account = account_name
                .ok_or_else(|| config_error("AccountKey requires AccountName in the connection string"))?;
            StorageCredential::SharedKey { account, key: decode_key(key)? }
        } else if let Some(sas) = pairs.get("sharedaccesssignature") {
            StorageCredential::Sas(sas.trim_start_matches('?').to_string())
        } else {
            return Err(config_error(
                "connection string carries neither AccountKey nor SharedAccessSignature",
            ));
        };

        Ok(Self { queue_endpoint, credential })
    }

    fn development() -> Result<Self> {
        Ok(Self {
            queue_endpoint: parse_endpoint(DEV_QUEUE_ENDPOINT)?,
            credential: StorageCredential::SharedKey {
                account: DEV_ACCOUNT_NAME.to_string(),
                key: decode_key(DEV_ACCOUNT_KEY)?,
            },
        })
    }
}

fn parse_pairs(connection_string: &str) -> Result<HashMap<String, String>> {
    let mut pairs = HashMap::new();
    for segment in connection_string.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| config_error("connection string segment is not key=value"))?;
        pairs.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }
    Ok(pairs)
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| config_error(&format!("invalid queue endpoint {raw:?}: {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(config_error(&format!("queue endpoint {raw:?} is not an http(s) URL")));
    }
    Ok(url)
}

fn decode_key(key: &str) -> Result<Vec<u8>> {
    STANDARD.decode(key).map_err(|_| config_error("AccountKey is not valid base64"))
}

fn config_error(message: &str) -> BridgeError {
    BridgeError::Configuration(format!("sink: {message}"))
}
