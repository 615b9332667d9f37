//! Transport for the query API.

use crate::config::Config;
use crate::error::TransportError;
use crate::transit::{self, Value};

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, ORIGIN};

/// Session cookie for the query API. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// `None` for a missing or blank value.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One request/response exchange with the query endpoint.
pub trait QueryTransport: Send + Sync {
    /// Send an encoded Transit body and return the raw response body.
    fn send(
        &self,
        body: String,
    ) -> impl std::future::Future<Output = Result<String, TransportError>> + Send;
}

/// Encode a query, send it and decode the reply.
pub async fn exchange<T: QueryTransport>(transport: &T, query: &Value) -> crate::Result<Value> {
    let body = transit::encode(query);
    tracing::debug!(bytes = body.len(), "sending query");
    let response = transport.send(body).await?;
    Ok(transit::decode(&response)?)
}

/// `reqwest`-backed transport with the headers the query API expects.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    pub fn new(config: &Config, credential: &Credential) -> Result<Self, TransportError> {
        let endpoint = reqwest::Url::parse(&config.query_endpoint)
            .map_err(|error| TransportError::Endpoint(format!("{}: {error}", config.query_endpoint)))?;
        let origin = endpoint.origin().ascii_serialization();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(transit::MEDIA_TYPE));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/transit+json; charset=UTF-8"),
        );
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&origin)
                .map_err(|error| TransportError::Endpoint(format!("invalid origin {origin}: {error}")))?,
        );
        let mut cookie = HeaderValue::from_str(credential.expose())
            .map_err(|_| TransportError::Endpoint("credential is not a valid header value".into()))?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, endpoint })
    }
}

impl QueryTransport for HttpTransport {
    async fn send(&self, body: String) -> Result<String, TransportError> {
        // The query API reads the payload from a GET body.
        let response = self
            .client
            .get(self.endpoint.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
