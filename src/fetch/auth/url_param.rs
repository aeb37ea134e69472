use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// The regional open-data service expects `key=<value>`, the SIRI discovery
/// endpoints `AccountKey=<value>`. Keeping the key out of the URLs the
/// generators build, and wrapping this inside [`crate::fetch::Retrying`],
/// keeps it out of retry log lines.
#[derive(Clone)]
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: &str, key: &str) -> Self {
        Self {
            inner,
            param_name: param_name.to_string(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}
