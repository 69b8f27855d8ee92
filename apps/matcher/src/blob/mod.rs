/// Blob storage access for the CV container: list names, download bytes.
///
/// Talks to the Blob REST API directly, signing each request with the
/// account key (Shared Key) or appending the connection string's SAS token.
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use crate::config::StorageConfig;
use crate::errors::{azure_error_message, PlatformError};

pub mod auth;

use auth::{
    request_date, shared_key_authorization, uri_encode, Credential, StorageAccount,
    STORAGE_API_VERSION,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Every blob name in the container, across all listing pages.
    async fn list_blobs(&self, container: &str) -> Result<Vec<String>, PlatformError>;

    async fn download_blob(&self, container: &str, name: &str) -> Result<Bytes, PlatformError>;
}

#[derive(Clone)]
pub struct AzureBlobStore {
    client: Client,
    account: StorageAccount,
}

impl AzureBlobStore {
    pub fn new(config: &StorageConfig) -> Result<Self, PlatformError> {
        let account = StorageAccount::from_connection_string(&config.connection_string)?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, account })
    }

    /// Signed GET. `path` is the encoded URL path starting with `/`.
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<RequestBuilder, PlatformError> {
        let mut query_string: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
            .collect();

        let date = request_date();
        let mut authorization = None;
        match &self.account.credential {
            Credential::Sas(token) => query_string.push(token.clone()),
            Credential::SharedKey { account_name, key } => {
                // Shared Key signs the path as seen by the account, without
                // any path prefix a custom endpoint may carry.
                let signed_path = match endpoint_path(&self.account.blob_endpoint) {
                    "" => path.to_string(),
                    prefix => format!("{prefix}{path}"),
                };
                authorization = Some(shared_key_authorization(
                    account_name,
                    key,
                    "GET",
                    &signed_path,
                    query,
                    &[("x-ms-date", date.as_str()), ("x-ms-version", STORAGE_API_VERSION)],
                )?);
            }
        }

        let mut url = format!("{}{}", self.account.blob_endpoint, path);
        if !query_string.is_empty() {
            url.push('?');
            url.push_str(&query_string.join("&"));
        }

        let mut request = self
            .client
            .get(url)
            .header("x-ms-date", date)
            .header("x-ms-version", STORAGE_API_VERSION);
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        Ok(request)
    }

    async fn fetch(&self, request: RequestBuilder) -> Result<Bytes, PlatformError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: storage_error_message(&body),
            });
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn list_blobs(&self, container: &str) -> Result<Vec<String>, PlatformError> {
        let path = format!("/{}", uri_encode(container));
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![("restype", "container"), ("comp", "list")];
            if let Some(ref m) = marker {
                query.push(("marker", m.as_str()));
            }

            let body = self.fetch(self.get(&path, &query)?).await?;
            let xml = String::from_utf8_lossy(&body);
            let (batch, next_marker) = parse_blob_listing(&xml);
            debug!("Listed {} blobs from '{container}'", batch.len());
            names.extend(batch);

            match next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }

    async fn download_blob(&self, container: &str, name: &str) -> Result<Bytes, PlatformError> {
        let encoded_name = name.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let path = format!("/{}/{encoded_name}", uri_encode(container));

        match self.fetch(self.get(&path, &[])?).await {
            Err(PlatformError::Api { status: 404, .. }) => Err(PlatformError::NotFound(format!(
                "blob '{name}' in container '{container}'"
            ))),
            other => other,
        }
    }
}

/// Downloads a blob and writes it to `out`. Returns the number of bytes written.
pub async fn download_to_file(
    store: &dyn BlobStore,
    container: &str,
    name: &str,
    out: &Path,
) -> anyhow::Result<usize> {
    let bytes = store.download_blob(container, name).await?;
    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(bytes.len())
}

fn endpoint_path(endpoint: &str) -> &str {
    let without_scheme = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    without_scheme
        .find('/')
        .map_or("", |idx| &without_scheme[idx..])
}

// ============ XML Parsing (minimal, no extra deps) ============

/// Blob names from one `List Blobs` page, plus the marker for the next page.
fn parse_blob_listing(xml: &str) -> (Vec<String>, Option<String>) {
    let mut names = Vec::new();
    let mut remaining = xml;

    while let Some(start) = remaining.find("<Blob>") {
        let block_start = start + "<Blob>".len();
        let Some(end) = remaining[block_start..].find("</Blob>") else {
            break;
        };
        let block = &remaining[block_start..block_start + end];
        if let Some(name) = extract_xml_value(block, "Name") {
            names.push(unescape_xml(&name));
        }
        remaining = &remaining[block_start + end + "</Blob>".len()..];
    }

    let next_marker = extract_xml_value(xml, "NextMarker").filter(|m| !m.is_empty());
    (names, next_marker)
}

/// Text content of the first `<tag>...</tag>` (simple, non-nested).
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let value_start = xml.find(&open)? + open.len();
    let end = xml[value_start..].find(&close)?;
    Some(xml[value_start..value_start + end].to_string())
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Storage errors come back as XML, not the JSON envelope the other services use.
fn storage_error_message(body: &str) -> String {
    extract_xml_value(body, "Message")
        .map(|m| unescape_xml(m.lines().next().unwrap_or_default()))
        .unwrap_or_else(|| azure_error_message(body))
}
