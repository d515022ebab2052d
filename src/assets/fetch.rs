//! Retrieval of image bytes.
//!
//! [`ImageManager`](crate::ImageManager) never touches the network or the
//! filesystem directly; it asks a [`Fetch`] implementation for the bytes
//! behind a `src`. [`LocalFetcher`] covers paths, `file://` URLs and data
//! URIs. With the `http` feature, [`HttpFetcher`] adds `http(s)://` sources.

use std::future::Future;

use base64::prelude::*;

use crate::error::{AssetError, Result};

/// Status code that marks a successful fetch.
pub const STATUS_OK: u16 = 200;

/// Status reported for missing local files.
pub const STATUS_NOT_FOUND: u16 = 404;

/// The outcome of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// A successful response carrying `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: STATUS_OK,
            body: body.into(),
        }
    }

    /// Returns the body if the status is 200, otherwise a status error.
    pub fn into_body(self, src: &str) -> Result<Vec<u8>> {
        if self.status == STATUS_OK {
            Ok(self.body)
        } else {
            Err(AssetError::Status {
                src: src.to_owned(),
                status: self.status,
            })
        }
    }
}

/// A source of image bytes.
///
/// Implementations return `Err` only when no response was obtained at all;
/// non-success statuses are reported through [`FetchResponse::status`].
pub trait Fetch: Send + Sync {
    fn fetch(&self, src: &str) -> impl Future<Output = Result<FetchResponse>> + Send;
}

// ============================================================================
// LocalFetcher
// ============================================================================

/// Fetches from the local filesystem and from data URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl Fetch for LocalFetcher {
    async fn fetch(&self, src: &str) -> Result<FetchResponse> {
        if let Some(uri) = src.strip_prefix("data:") {
            return decode_data_uri(src, uri).map(FetchResponse::ok);
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return Err(AssetError::Fetch {
                src: src.to_owned(),
                reason: "remote sources need the `http` feature".into(),
            });
        }

        let path = src.strip_prefix("file://").unwrap_or(src);
        match tokio::fs::read(path).await {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FetchResponse {
                status: STATUS_NOT_FOUND,
                body: Vec::new(),
            }),
            Err(e) => Err(AssetError::Fetch {
                src: src.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Decodes the part of a data URI after `data:`.
fn decode_data_uri(src: &str, uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri.split_once(',').ok_or_else(|| AssetError::Decode {
        src: src.to_owned(),
        reason: "data uri has no payload".into(),
    })?;

    if header.ends_with(";base64") {
        BASE64_STANDARD
            .decode(payload.trim())
            .map_err(|e| AssetError::Decode {
                src: src.to_owned(),
                reason: e.to_string(),
            })
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

// ============================================================================
// HttpFetcher
// ============================================================================

/// The fetcher [`ImageManager::default`](crate::ImageManager) uses: network
/// capable with the `http` feature, local-only without it.
#[cfg(feature = "http")]
pub type DefaultFetcher = HttpFetcher;

/// The fetcher [`ImageManager::default`](crate::ImageManager) uses: network
/// capable with the `http` feature, local-only without it.
#[cfg(not(feature = "http"))]
pub type DefaultFetcher = LocalFetcher;

/// Fetches `http(s)://` sources over the network and defers everything else
/// to [`LocalFetcher`].
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
impl Fetch for HttpFetcher {
    async fn fetch(&self, src: &str) -> Result<FetchResponse> {
        if !(src.starts_with("http://") || src.starts_with("https://")) {
            return LocalFetcher.fetch(src).await;
        }

        let network_error = |e: reqwest::Error| AssetError::Fetch {
            src: src.to_owned(),
            reason: e.to_string(),
        };
        let response = self.client.get(src).send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(network_error)?;
        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
