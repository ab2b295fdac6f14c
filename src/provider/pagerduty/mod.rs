//! PagerDuty REST Client
//!
//! Native REST implementation for the PagerDuty REST API v2.
//! Uses reqwest with rustls (no OpenSSL dependencies) and token authentication.
//!
//! The base URL is configurable so the same client runs against Pact mock
//! servers in contract tests.
//!
//! References:
//! - [PagerDuty REST API v2](https://developer.pagerduty.com/api-reference/)

mod operations;
mod requests;
mod responses;

pub use requests::*;
pub use responses::*;

use crate::constants::{DEFAULT_API_URL, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::provider::{PagerdutyError, PagerdutyResult};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

/// Media type selecting version 2 of the REST API
pub const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";

/// PagerDuty REST client
pub struct PagerdutyREST {
    http_client: Client,
    base_url: String,
    api_key: Zeroizing<String>,
}

impl std::fmt::Debug for PagerdutyREST {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagerdutyREST")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PagerdutyREST {
    /// Client for the public PagerDuty endpoint
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(api_key: Zeroizing<String>) -> PagerdutyResult<Self> {
        Self::with_base_url(DEFAULT_API_URL, api_key)
    }

    /// Client for an explicit base URL (regional endpoints, mock servers)
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Zeroizing<String>,
    ) -> PagerdutyResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .user_agent(concat!("pagerduty-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!("Initialized PagerDuty REST client for {}", base_url);

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    /// Build HTTP request with authentication headers
    pub(crate) fn make_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);

        self.http_client
            .request(method, url)
            .header(
                "Authorization",
                format!("Token token={}", self.api_key.as_str()),
            )
            .header("Accept", ACCEPT_V2)
    }

    /// Send a request and decode its JSON body
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &'static str,
        id: &str,
    ) -> PagerdutyResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::handle_error_response(status, &body, resource, id));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request whose success response carries no body (deletes)
    pub(crate) async fn execute_empty(
        &self,
        request: RequestBuilder,
        resource: &'static str,
        id: &str,
    ) -> PagerdutyResult<()> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status, &body, resource, id));
        }

        Ok(())
    }

    /// Map a non-2xx response onto `PagerdutyError`
    pub(crate) fn handle_error_response(
        status: StatusCode,
        body: &str,
        resource: &'static str,
        id: &str,
    ) -> PagerdutyError {
        if status == StatusCode::NOT_FOUND {
            return PagerdutyError::not_found(resource, id);
        }

        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|response| response.error.describe())
            .unwrap_or_else(|_| body.to_string());

        PagerdutyError::Api {
            status: status.as_u16(),
            message,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
