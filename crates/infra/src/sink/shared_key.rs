//! SharedKey request signing for the Azure Queue service.
//!
//! String-to-sign layout (service version 2015-02-21 and later):
//!
//! ```text
//! VERB\nContent-Encoding\nContent-Language\nContent-Length\nContent-MD5\n
//! Content-Type\nDate\nIf-Modified-Since\nIf-Match\nIf-None-Match\n
//! If-Unmodified-Since\nRange\nCanonicalizedHeaders CanonicalizedResource
//! ```
//!
//! `Date` stays empty because every request carries `x-ms-date`, and a zero
//! content length is written as the empty string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use queuebridge_domain::{BridgeError, Result};
use reqwest::header::HeaderMap;
use reqwest::Method;
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// The request parts that take part in the signature.
pub struct SignableRequest<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub headers: &'a HeaderMap,
    pub content_length: usize,
    pub content_type: Option<&'a str>,
}

/// Build the `Authorization` header value for `request`.
///
/// # Errors
/// Returns [`BridgeError::Internal`] if the HMAC cannot be keyed.
pub fn authorization(account: &str, key: &[u8], request: &SignableRequest<'_>) -> Result<String> {
    let string_to_sign = string_to_sign(account, request);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| BridgeError::Internal(format!("failed to key HMAC: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!("SharedKey {account}:{signature}"))
}

fn string_to_sign(account: &str, request: &SignableRequest<'_>) -> String {
    let content_length = if request.content_length == 0 {
        String::new()
    } else {
        request.content_length.to_string()
    };

    let mut out = String::new();
    out.push_str(request.method.as_str());
    out.push('\n');
    // Content-Encoding, Content-Language
    out.push_str("\n\n");
    out.push_str(&content_length);
    out.push('\n');
    // Content-MD5
    out.push('\n');
    out.push_str(request.content_type.unwrap_or_default());
    out.push('\n');
    // Date, If-Modified-Since, If-Match, If-None-Match, If-Unmodified-Since, Range
    out.push_str("\n\n\n\n\n\n");
    out.push_str(&canonicalized_headers(request.headers));
    out.push_str(&canonicalized_resource(account, request.url));
    out
}

fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_string(), v.trim().to_string()))
        })
        .collect();
    ms_headers.sort();

    ms_headers.into_iter().map(|(name, value)| format!("{name}:{value}\n")).collect()
}

fn canonicalized_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{account}{}", url.path());

    let mut params: Vec<(String, String)> =
        url.query_pairs().map(|(k, v)| (k.to_ascii_lowercase(), v.into_owned())).collect();
    params.sort();
    for (name, value) in params {
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(&value);
    }
    resource
}
