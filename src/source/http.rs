//! HTTP metrics source: GET a flat JSON object from the configured endpoint.

#![allow(missing_docs)]

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use crate::core::config::Config;
use crate::core::errors::{Result, SmxError};
use crate::source::{MetricSnapshot, MetricsSource, parse_snapshot};

/// Polls one URL with a blocking client and a per-request timeout.
pub struct HttpMetricsSource {
    client: Client,
    url: String,
    keys: Vec<String>,
}

impl HttpMetricsSource {
    /// Build a source for `url` that keeps only `keys`.
    pub fn new(url: impl Into<String>, keys: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("smx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            keys,
        })
    }

    /// Source for the endpoint and metrics of `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let keys = config.data.iter().map(|spec| spec.key.clone()).collect();
        Self::new(config.api_url.trim(), keys, config.request_timeout())
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl MetricsSource for HttpMetricsSource {
    fn fetch(&mut self) -> Result<MetricSnapshot> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SmxError::fetch(format!("{} returned HTTP {status}", self.url)));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| SmxError::fetch(format!("malformed JSON from {}: {e}", self.url)))?;
        parse_snapshot(&payload, &self.keys)
    }
}
