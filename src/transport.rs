//! HTTP transport for the content server.
//!
//! Both server calls are plain `GET`s against one URL that differ only in
//! their query string, so the capability is a single method. The client is
//! generic over [`Transport`] so tests can script responses without a
//! network.

use crate::error::TransportError;
use std::time::Duration;
use tracing::debug;

/// Query string as ordered `(name, value)` pairs.
pub type Query = [(&'static str, String)];

/// Status, headers and body of a completed request.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names as received, in iteration order
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Anything but 200 counts as a transport failure.
    pub fn ok(self) -> Result<Self, TransportError> {
        if self.status == 200 {
            Ok(self)
        } else {
            Err(TransportError::Status(self.status))
        }
    }
}

/// Issues `GET` requests against the content server.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&self, query: &Query, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport bound to one URL.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("zivyobraz-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    async fn get(&self, query: &Query, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_200_is_an_error() {
        let ok = HttpResponse {
            status: 200,
            ..Default::default()
        };
        assert!(ok.ok().is_ok());

        let missing = HttpResponse {
            status: 404,
            ..Default::default()
        };
        assert!(matches!(missing.ok(), Err(TransportError::Status(404))));
    }

    #[test]
    fn transport_keeps_its_url() {
        let transport = HttpTransport::new("http://localhost/index.php").unwrap();
        assert_eq!(transport.url(), "http://localhost/index.php");
    }
}
