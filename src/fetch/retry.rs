use super::client::HttpClient;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

/// An [`HttpClient`] wrapper that retries transient failures with
/// exponential backoff.
///
/// Timeouts, connection errors, `429` and `5xx` responses are retried up to
/// `max_retries` times. Anything else (including `4xx`) is returned as-is.
/// Requests whose body cannot be cloned are sent exactly once.
#[derive(Clone)]
pub struct Retrying<C> {
    pub inner: C,
    pub max_retries: u32,
    pub backoff: Duration,
}

fn is_transient(result: &reqwest::Result<reqwest::Response>) -> bool {
    match result {
        Ok(resp) => {
            resp.status().is_server_error() || resp.status() == StatusCode::TOO_MANY_REQUESTS
        }
        Err(e) => e.is_timeout() || e.is_connect(),
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for Retrying<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let mut attempt = 0;
        let mut delay = self.backoff;

        loop {
            let Some(attempt_req) = req.try_clone() else {
                return self.inner.execute(req).await;
            };

            let result = self.inner.execute(attempt_req).await;
            if attempt >= self.max_retries || !is_transient(&result) {
                return result;
            }

            attempt += 1;
            warn!(
                url = %req.url(),
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Transient upstream failure, retrying"
            );
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }
}
