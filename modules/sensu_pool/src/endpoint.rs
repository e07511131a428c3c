//! A single Sensu API replica.
//!
//! Each call issues exactly one request (or one series of page requests for
//! paginated lists) and never retries; failover belongs to the pool.

use bytes::Bytes;
use panorama_common::{configuration::EndpointConfig, Attributes};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Response header describing the current page of a paginated list
const PAGINATION_HEADER: &str = "x-pagination";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Failed to initialize HTTP client: {0}")]
    ClientInit(#[from] reqwest::Error),

    #[error("Invalid URL {0}: {1}")]
    InvalidUrl(String, String),

    #[error("Request to {0} failed: {1}")]
    Transport(String, reqwest::Error),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Request to {0} returned HTTP status {1}")]
    Status(String, StatusCode),

    #[error("Could not decode response from {0}: {1}")]
    Decode(String, String),
}

impl RequestError {
    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RequestError::Timeout(url.to_string())
        } else {
            RequestError::Transport(url.to_string(), error)
        }
    }

    /// HTTP status returned by the API, if the request got that far
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Status(_, status) => Some(*status),
            _ => None,
        }
    }
}

/// Path of an API resource, kept as raw segments and escaped when joined to a base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath {
    segments: Vec<String>,
}

impl ApiPath {
    pub fn new(resource: &str) -> Self {
        Self {
            segments: vec![resource.to_string()],
        }
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Pagination {
    limit: usize,
    offset: usize,
    total: usize,
}

/// One reachable instance of a Sensu API
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Url,
    client: Client,
    user: Option<String>,
    pass: Option<String>,
}

impl Endpoint {
    pub fn new(config: &EndpointConfig) -> Result<Self, RequestError> {
        let base = Url::parse(&config.url)
            .map_err(|e| RequestError::InvalidUrl(config.url.clone(), e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RequestError::InvalidUrl(
                config.url.clone(),
                "not a base URL".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            base,
            client,
            user: config.user.clone(),
            pass: config.pass.clone(),
        })
    }

    /// Identity of this endpoint
    pub fn url(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, path: &ApiPath) -> Result<Url, RequestError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RequestError::InvalidUrl(self.base.to_string(), "not a base URL".to_string())
            })?
            .pop_if_empty()
            .extend(path.segments());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.user {
            Some(user) => builder.basic_auth(user, self.pass.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &Url) -> Result<Response, RequestError> {
        let response = builder.send().await.map_err(|e| RequestError::from_reqwest(url, e))?;
        if !response.status().is_success() {
            return Err(RequestError::Status(url.to_string(), response.status()));
        }
        Ok(response)
    }

    async fn body(response: Response, url: &Url) -> Result<Bytes, RequestError> {
        response.bytes().await.map_err(|e| RequestError::from_reqwest(url, e))
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8], url: &Url) -> Result<T, RequestError> {
        serde_json::from_slice(bytes).map_err(|e| RequestError::Decode(url.to_string(), e.to_string()))
    }

    pub async fn delete(&self, path: &ApiPath) -> Result<(), RequestError> {
        let url = self.resolve(path)?;
        self.send(self.request(Method::DELETE, url.clone()), &url).await?;
        Ok(())
    }

    pub async fn get_bytes(&self, path: &ApiPath) -> Result<Bytes, RequestError> {
        let url = self.resolve(path)?;
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        Self::body(response, &url).await
    }

    /// Fetch a JSON list. With a non-zero `limit` the list is retrieved page
    /// by page, following the pagination header until `total` is reached.
    pub async fn get_list(&self, path: &ApiPath, limit: usize) -> Result<Vec<Value>, RequestError> {
        let url = self.resolve(path)?;
        if limit == 0 {
            let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
            return Self::decode(&Self::body(response, &url).await?, &url);
        }

        let mut items = Vec::new();
        let mut offset = 0;
        loop {
            let builder =
                self.request(Method::GET, url.clone()).query(&[("limit", limit), ("offset", offset)]);
            let response = self.send(builder, &url).await?;
            let pagination = response
                .headers()
                .get(PAGINATION_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| serde_json::from_str::<Pagination>(value).ok());

            let page: Vec<Value> = Self::decode(&Self::body(response, &url).await?, &url)?;
            let received = page.len();
            items.extend(page);

            // Only follow a header pointing at a further page below the total
            let next = pagination
                .filter(|_| received > 0)
                .and_then(|p| p.offset.checked_add(p.limit).filter(|next| *next < p.total));
            match next {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }

        Ok(items)
    }

    pub async fn get_map(&self, path: &ApiPath) -> Result<Attributes, RequestError> {
        let url = self.resolve(path)?;
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        Self::decode(&Self::body(response, &url).await?, &url)
    }

    /// POST a JSON payload. An empty response body decodes to an empty map.
    pub async fn post_payload<B: Serialize + ?Sized>(
        &self,
        path: &ApiPath,
        body: &B,
    ) -> Result<Attributes, RequestError> {
        let url = self.resolve(path)?;
        let response = self.send(self.request(Method::POST, url.clone()).json(body), &url).await?;
        let bytes = Self::body(response, &url).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Attributes::new());
        }
        Self::decode(&bytes, &url)
    }
}
