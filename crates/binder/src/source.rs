use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Absolute URL of a JSON endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let url = Url::parse(raw).map_err(|source| FetchError::InvalidEndpoint {
            url: raw.to_string(),
            source,
        })?;
        Ok(Self { url })
    }

    /// `{base}/api/{name}`, keeping any path prefix already on `base`.
    pub fn api(base: &str, name: &str) -> Result<Self, FetchError> {
        let invalid = |source| FetchError::InvalidEndpoint {
            url: format!("{base}/api/{name}"),
            source,
        };
        let mut base_url = Url::parse(base).map_err(invalid)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let url = base_url
            .join(&format!("api/{}", name.trim_matches('/')))
            .map_err(invalid)?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.url, f)
    }
}

/// Status and raw body of one completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl SourceResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait TemperatureSource: Send + Sync {
    /// Issues one request. Only transport failures are errors here; status
    /// handling is up to the caller.
    async fn get(&self) -> Result<SourceResponse, FetchError>;

    fn describe(&self) -> String;
}

/// Plain `GET` against an [`Endpoint`], no headers, body or query.
pub struct HttpTemperatureSource {
    http: Client,
    endpoint: Endpoint,
}

impl HttpTemperatureSource {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            http: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl TemperatureSource for HttpTemperatureSource {
    async fn get(&self) -> Result<SourceResponse, FetchError> {
        let response = self.http.get(self.endpoint.url().clone()).send().await?;
        let status = response.status().as_u16();
        debug!(endpoint = %self.endpoint, status, "temperature response received");
        let body = response.bytes().await?;
        Ok(SourceResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}
