use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// The single seam every upstream request goes through.
///
/// Wrappers ([`super::Retrying`], [`super::auth::UrlParam`]) decorate an
/// inner client, so tests can substitute a canned implementation.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
