//! Unsplash adapter (random photo by keyword).

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use chanpost_core::{config::Config, errors::Error, ports::ImageLookup, Result};

const RANDOM_PHOTO_URL: &str = "https://api.unsplash.com/photos/random";

#[derive(Clone, Debug)]
pub struct UnsplashClient {
    access_key: String,
    http: reqwest::Client,
}

impl UnsplashClient {
    pub fn new(access_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("unsplash http client: {e}")))?;
        Ok(Self {
            access_key: access_key.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.unsplash_access_key.clone(), cfg.external_timeout)
    }
}

#[async_trait]
impl ImageLookup for UnsplashClient {
    async fn search(&self, keyword: &str) -> Result<Option<String>> {
        debug!(keyword, "requesting random photo");
        let resp = self
            .http
            .get(RANDOM_PHOTO_URL)
            .query(&[("query", keyword), ("client_id", self.access_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::External(format!("unsplash request error: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "unsplash lookup failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("unsplash json error: {e}")))?;

        Ok(extract_regular_url(&v))
    }
}

/// `urls.regular` of a random-photo response. With `count` the API returns an
/// array; the first photo is used.
pub fn extract_regular_url(v: &serde_json::Value) -> Option<String> {
    let photo = match v {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    photo
        .pointer("/urls/regular")
        .and_then(|u| u.as_str())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}
