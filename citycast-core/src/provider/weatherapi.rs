use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::error::FetchError;

use super::{ApiRequest, Fetcher};

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";

/// HTTP client for WeatherAPI.com.
///
/// Requests are plain GETs with no retry. A timeout is only applied when one
/// is configured.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> anyhow::Result<Self> {
        self.http = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, request.endpoint());
        self.http.get(url).query(&request.query(&self.api_key))
    }
}

#[async_trait]
impl Fetcher for WeatherApiClient {
    async fn fetch(&self, request: &ApiRequest) -> Result<String, FetchError> {
        debug!("requesting {request}");

        let res = self
            .build(request)
            .send()
            .await
            .map_err(|source| FetchError::Transport { request: request.to_string(), source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| FetchError::Body { request: request.to_string(), source })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                request: request.to_string(),
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
