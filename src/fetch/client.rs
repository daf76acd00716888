use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport used to pull feed bytes. Swapped for a fake in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
