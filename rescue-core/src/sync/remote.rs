//! The remote authority seam and its HTTP implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::RemoteError;
use crate::models::SyncQueueItem;

/// Timeout for the reachability probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Positive acknowledgement of a submitted item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// The authority had already accepted this item id before.
    #[serde(default)]
    pub duplicate: bool,
}

/// Accepts sync items. `Ok(Ack)` is the only outcome that permits dequeue.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    async fn submit(&self, item: &SyncQueueItem) -> Result<Ack, RemoteError>;
}

/// Talks to an authority over HTTP/JSON.
///
/// `POST {base}/sync/items` with the item as the body.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthority {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn items_url(&self) -> String {
        format!("{}/sync/items", self.base_url)
    }
}

#[async_trait]
impl RemoteAuthority for HttpAuthority {
    async fn submit(&self, item: &SyncQueueItem) -> Result<Ack, RemoteError> {
        let response = self
            .client
            .post(self.items_url())
            .json(item)
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Ack>()
                .await
                .map_err(|e| RemoteError::Unavailable(format!("unreadable ack: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, body))
    }
}

/// 4xx means the authority looked at the item and said no; everything else
/// is worth retrying. 408 and 429 are the retryable 4xx codes.
fn classify_failure(status: StatusCode, body: String) -> RemoteError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    if status.is_client_error()
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
    {
        RemoteError::Rejected(detail)
    } else {
        RemoteError::Unavailable(detail)
    }
}

/// Trims trailing slashes and defaults the scheme to http.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Returns true if the authority answers its health endpoint.
pub async fn check_server(base_url: &str) -> bool {
    let url = format!("{}/health", normalize_base_url(base_url));
    let client = match reqwest::Client::builder().timeout(HEALTH_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!("Health check against {} failed: {}", url, e);
            false
        }
    }
}
