//! HTTP retrieval of upstream documents.

mod basic;
mod client;
mod retry;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use retry::Retrying;

use crate::config::HttpConfig;
use crate::error::{PipelineError, Result};
use std::time::Duration;
use tracing::debug;

/// Base client carrying the configured timeouts.
pub fn build_client(config: &HttpConfig) -> Result<BasicClient> {
    BasicClient::new(config)
        .map_err(|e| PipelineError::retrieval("<client>", format!("building HTTP client: {e}")))
}

/// Wraps `inner` (usually an authenticated client) in the configured retry policy.
pub fn with_retries<C: HttpClient>(inner: C, config: &HttpConfig) -> Retrying<C> {
    Retrying {
        inner,
        max_retries: config.max_retries,
        backoff: Duration::from_millis(config.backoff_ms),
    }
}

/// GETs `url` and returns the body.
///
/// # Errors
///
/// [`PipelineError::Retrieval`] on an unparsable URL, a transport failure or
/// any non-2xx status.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let parsed = reqwest::Url::parse(url).map_err(|e| PipelineError::retrieval(url, e))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| PipelineError::retrieval(url, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PipelineError::retrieval(url, format!("status {status}")));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| PipelineError::retrieval(url, e))?;
    debug!(url, bytes = bytes.len(), "Fetched upstream document");
    Ok(bytes.to_vec())
}
