//! Personio API HTTP client.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use crate::auth::{RefreshCadence, TokenProvider};
use crate::paginator::Page;
use crate::streams::StreamDefinition;
use crate::{TapConfig, TapError, TapResult};

/// HTTP client bound to one Personio account.
#[derive(Debug)]
pub struct PersonioClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: TokenProvider,
}

impl PersonioClient {
    /// Creates a client from the tap configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &TapConfig) -> TapResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TapError::Config(format!("Failed to create HTTP client: {e}")))?;

        let tokens = TokenProvider::new(
            http_client.clone(),
            config.url("auth"),
            config.client_id.clone(),
            SecretString::new(config.client_secret.expose_secret().clone()),
            config.token_refresh,
        );

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Listing URL of a stream: `{base}/company/{stream id or sub path}`.
    #[must_use]
    pub fn stream_url(&self, stream: &StreamDefinition) -> String {
        format!("{}/company/{}", self.base_url, stream.path())
    }

    /// Fetches and decodes one page.
    ///
    /// Non-2xx responses whose body still decodes as a page are returned as
    /// pages; the caller inspects `success`. Token failures surface as
    /// [`TapError::Auth`], everything else as [`TapError::PageFetch`].
    ///
    /// With a reused token a `401` drops the token and the request is sent
    /// once more with a fresh one.
    #[instrument(skip(self, query))]
    pub async fn fetch_page(
        &self,
        stream: &str,
        url: &str,
        query: &[(&'static str, String)],
    ) -> TapResult<Page> {
        let page_error = |message: String| TapError::PageFetch {
            stream: stream.to_string(),
            url: url.to_string(),
            message,
        };
        let fetch_error = |e: FetchError| match e {
            FetchError::Token(e) => e,
            FetchError::Transport(message) => page_error(message),
        };

        let (mut status, mut body) = self.get(url, query).await.map_err(fetch_error)?;
        if status == StatusCode::UNAUTHORIZED && self.tokens.cadence() == RefreshCadence::Once {
            warn!(url = %url, "Token rejected, requesting a new one");
            self.tokens.invalidate().await;
            (status, body) = self.get(url, query).await.map_err(fetch_error)?;
        }

        let page: Page = serde_json::from_str(&body).map_err(|e| {
            page_error(format!("undecodable body (status {status}): {e}; body: {body}"))
        })?;

        if !status.is_success() {
            warn!(url = %url, status = %status, "Non-success HTTP status");
        }
        Ok(page)
    }

    /// One authenticated GET. Token errors propagate as is.
    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<(StatusCode, String), FetchError> {
        let token = self.tokens.token().await.map_err(FetchError::Token)?;

        debug!(url = %url, ?query, "API request");
        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(token.expose())
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            FetchError::Transport(format!("failed to read body (status {status}): {e}"))
        })?;
        Ok((status, body))
    }
}

/// Failure of a single GET, before the body is decoded.
enum FetchError {
    Token(TapError),
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::StreamRegistry;
    use chrono::NaiveDate;

    fn config() -> TapConfig {
        TapConfig::new("id", "secret", NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
            .with_base_url("https://api.example.com/v1/")
    }

    #[test]
    fn test_stream_urls() {
        let client = PersonioClient::new(&config()).unwrap();
        let registry = StreamRegistry::personio().unwrap();

        assert_eq!(
            client.stream_url(registry.get("employees").unwrap()),
            "https://api.example.com/v1/company/employees"
        );
        assert_eq!(
            client.stream_url(registry.get("projects").unwrap()),
            "https://api.example.com/v1/company/attendances/projects"
        );
        assert_eq!(
            client.stream_url(registry.get("time-offs").unwrap()),
            "https://api.example.com/v1/company/time-offs"
        );
    }

    #[test]
    fn test_client_inherits_cadence() {
        let client = PersonioClient::new(
            &config().with_token_refresh(crate::auth::RefreshCadence::Once),
        )
        .unwrap();
        assert_eq!(client.tokens().cadence(), crate::auth::RefreshCadence::Once);
        assert_eq!(client.tokens().requests_issued(), 0);
    }
}
