use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Feed not found: {0}")]
    NotFound(String),
    #[error("Access to feed forbidden: {0}")]
    Forbidden(String),
    #[error("Feed requires authentication: {0}")]
    Unauthorized(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Feed body is empty")]
    EmptyBody,
    #[error("Response is not an iCalendar feed")]
    NotACalendar,
}

/// Fetches raw feed text over HTTP and rejects anything that is not
/// recognizably an iCalendar body before it ever reaches the parser.
pub struct FeedClient {
    client: reqwest::Client,
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_ics(&self, url: &str) -> Result<String, FetchError> {
        tracing::info!("Fetching calendar feed from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        tracing::info!("Feed response status: {}", status);

        match status.as_u16() {
            401 => {
                tracing::error!("Feed requires authentication: {}", url);
                return Err(FetchError::Unauthorized(url.to_string()));
            }
            403 => {
                tracing::error!("Access to feed forbidden: {}", url);
                return Err(FetchError::Forbidden(url.to_string()));
            }
            404 => {
                tracing::error!("Feed not found: {}", url);
                return Err(FetchError::NotFound(url.to_string()));
            }
            _ if !status.is_success() => {
                let reason = status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string();
                tracing::error!("Failed to fetch feed. Status: {}, {}", status, reason);
                return Err(FetchError::RequestFailed(format!("{}: {}", status, reason)));
            }
            _ => {}
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        if !body.contains("BEGIN:VCALENDAR") {
            tracing::warn!("Response from {} has no calendar markers", url);
            return Err(FetchError::NotACalendar);
        }

        tracing::info!("Fetched {} bytes of feed text", body.len());
        Ok(body)
    }
}
