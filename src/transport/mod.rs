use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::record::RecordType;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no endpoint configured for {record_type} lookups")]
    MissingEndpoint { record_type: RecordType },

    #[error("invalid endpoint URL for {record_type}: {url}")]
    InvalidUrl { record_type: RecordType, url: String },

    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed: {source}")]
    Send {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read response body: {source}")]
    Body {
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    Other { message: String },
}

/// Fetches the raw response text for one identifier.
#[async_trait]
pub trait LookupTransport: Send + Sync {
    async fn fetch(&self, record_type: RecordType, identifier: &str)
        -> Result<String, TransportError>;
}

/// A lookup service: the identifier is sent as query parameter `param`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default)]
    pub param: Option<String>,
}

impl Endpoint {
    pub fn param_for(&self, record_type: RecordType) -> &str {
        self.param.as_deref().unwrap_or(record_type.key())
    }
}

pub type EndpointMap = BTreeMap<RecordType, Endpoint>;

#[derive(Clone, Debug, Default)]
pub struct HttpOptions {
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
}

/// [`LookupTransport`] over plain HTTP GET. Any status code is accepted;
/// lookup services report misses in the body.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: EndpointMap,
}

impl HttpTransport {
    pub fn new(endpoints: EndpointMap, options: &HttpOptions) -> Result<Self, TransportError> {
        for (record_type, endpoint) in endpoints.iter() {
            if reqwest::Url::parse(&endpoint.url).is_err() {
                return Err(TransportError::InvalidUrl {
                    record_type: *record_type,
                    url: endpoint.url.clone(),
                });
            }
        }
        Ok(Self {
            client: build_client(options)?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }
}

fn build_client(options: &HttpOptions) -> Result<reqwest::Client, TransportError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json, text/plain, */*"),
    );

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| TransportError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| TransportError::ClientBuild { source: e })
}

#[async_trait]
impl LookupTransport for HttpTransport {
    async fn fetch(
        &self,
        record_type: RecordType,
        identifier: &str,
    ) -> Result<String, TransportError> {
        let endpoint = self
            .endpoints
            .get(&record_type)
            .ok_or(TransportError::MissingEndpoint { record_type })?;
        let param = endpoint.param_for(record_type);
        debug!(%record_type, url = %endpoint.url, param, "sending lookup");

        let response = self
            .client
            .get(&endpoint.url)
            .query(&[(param, identifier)])
            .send()
            .await
            .map_err(|e| TransportError::Send { source: e })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body { source: e })?;
        debug!(%record_type, status = status.as_u16(), bytes = body.len(), "lookup response");
        Ok(body)
    }
}
