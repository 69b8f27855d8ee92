//! Storage account credentials and Shared Key request signing.
//!
//! The signing implementation uses HMAC-SHA256 (`hmac` + `sha2`) over the
//! Shared Key string-to-sign, base64-encoded.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::PlatformError;

type HmacSha256 = Hmac<Sha256>;

pub const STORAGE_API_VERSION: &str = "2021-08-06";

#[derive(Clone)]
pub enum Credential {
    /// Account name plus the decoded account key.
    SharedKey { account_name: String, key: Vec<u8> },
    /// Pre-signed query string, without the leading `?`.
    Sas(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey { account_name, .. } => f
                .debug_struct("SharedKey")
                .field("account_name", account_name)
                .finish_non_exhaustive(),
            Credential::Sas(_) => f.write_str("Sas(..)"),
        }
    }
}

/// Blob endpoint and credential parsed from a storage connection string.
#[derive(Debug, Clone)]
pub struct StorageAccount {
    pub blob_endpoint: String,
    pub credential: Credential,
}

impl StorageAccount {
    /// Parses `Key=Value;Key=Value` pairs.
    ///
    /// An explicit `BlobEndpoint` wins over the one derived from
    /// `AccountName`, `DefaultEndpointsProtocol` and `EndpointSuffix`. A
    /// `SharedAccessSignature` is used instead of the account key when present.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, PlatformError> {
        let mut account_name = None;
        let mut account_key = None;
        let mut sas = None;
        let mut blob_endpoint = None;
        let mut protocol = "https".to_string();
        let mut suffix = "core.windows.net".to_string();

        for part in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            // Account keys end in '=' padding, so split on the first '=' only.
            let Some((key, value)) = part.split_once('=') else {
                return Err(PlatformError::Configuration(format!(
                    "malformed connection string segment '{part}'"
                )));
            };
            let value = value.trim().to_string();
            match key.trim() {
                "AccountName" => account_name = Some(value),
                "AccountKey" => account_key = Some(value),
                "SharedAccessSignature" => sas = Some(value),
                "BlobEndpoint" => blob_endpoint = Some(value),
                "DefaultEndpointsProtocol" => protocol = value,
                "EndpointSuffix" => suffix = value,
                _ => {}
            }
        }

        let blob_endpoint = match (blob_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(name)) => format!("{protocol}://{name}.blob.{suffix}"),
            (None, None) => {
                return Err(PlatformError::Configuration(
                    "connection string has neither AccountName nor BlobEndpoint".to_string(),
                ))
            }
        };

        let credential = match (sas, account_name, account_key) {
            (Some(token), _, _) => Credential::Sas(token.trim_start_matches('?').to_string()),
            (None, Some(account_name), Some(encoded)) => {
                let key = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                    PlatformError::Configuration(format!("AccountKey is not valid base64: {e}"))
                })?;
                Credential::SharedKey { account_name, key }
            }
            _ => {
                return Err(PlatformError::Configuration(
                    "connection string needs AccountName and AccountKey, or SharedAccessSignature"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            blob_endpoint: blob_endpoint.trim_end_matches('/').to_string(),
            credential,
        })
    }
}

/// `x-ms-date` value for the current instant.
pub fn request_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Builds the `Authorization` header value for a body-less request.
///
/// `path` is the URL path as sent (already encoded). `query` holds the
/// decoded query parameters. `ms_headers` are the `x-ms-*` headers.
pub fn shared_key_authorization(
    account_name: &str,
    key: &[u8],
    verb: &str,
    path: &str,
    query: &[(&str, &str)],
    ms_headers: &[(&str, &str)],
) -> Result<String, PlatformError> {
    let mut headers: Vec<(String, &str)> = ms_headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim()))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();

    let mut params: Vec<(String, &str)> = query
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), *v))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));
    let mut canonical_resource = format!("/{account_name}{path}");
    for (name, value) in &params {
        canonical_resource.push_str(&format!("\n{name}:{value}"));
    }

    // Content-Encoding through Range: eleven standard headers, all empty here.
    let string_to_sign = format!(
        "{verb}\n{}{canonical_headers}{canonical_resource}",
        "\n".repeat(11)
    );

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| PlatformError::Configuration(format!("unusable account key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!("SharedKey {account_name}:{signature}"))
}

/// Percent-encodes a string, leaving RFC 3986 unreserved characters as-is.
pub fn uri_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => result.push_str(&format!("%{byte:02X}")),
        }
    }
    result
}
