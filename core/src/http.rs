//! Transport seam between the fetch pipeline and the network.
//!
//! # Design
//! The core never talks to a socket directly. It hands a [`Url`] to a
//! [`Transport`] and gets back an [`HttpResponse`] described as plain data.
//! Production code uses [`ReqwestTransport`]; tests inject their own
//! implementation of the same trait, configured per test.
//!
//! A transport only reports *transport* failures. Status-code policy and
//! body decoding belong to [`FetchService`](crate::FetchService), so a 404
//! with a body is a successful `get` as far as this module is concerned.

use std::future::Future;

use bytes::Bytes;
use thiserror::Error;
use url::Url;

use crate::error::BoxError;

/// An HTTP response described as plain data.
///
/// `body` is empty when the server sent no body; the fetch pipeline treats
/// that as a decoding failure rather than a special case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status code is in `200..300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Failures reported by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer answered with something that is not a usable HTTP response.
    #[error("bad server response")]
    BadServerResponse,

    #[error("could not connect to the server: {0}")]
    Connect(#[source] BoxError),

    #[error("{0}")]
    Other(#[source] BoxError),
}

/// Minimal HTTP client contract: issue a GET, return status, headers and body.
///
/// Dropping the returned future should abort the request when the
/// underlying client supports it.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;

    /// Production transport backed by a shared `reqwest::Client`.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reuse a pre-configured client session (proxies, TLS roots, user agent).
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }

        pub fn client(&self) -> &reqwest::Client {
            &self.client
        }
    }

    impl Transport for ReqwestTransport {
        async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response.bytes().await.map_err(map_reqwest_error)?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    fn map_reqwest_error(err: reqwest::Error) -> TransportError {
        if err.is_connect() {
            TransportError::Connect(Box::new(err))
        } else {
            TransportError::Other(Box::new(err))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range_is_half_open() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(299, "").is_success());
        assert!(!HttpResponse::new(300, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut response = HttpResponse::new(200, "{}");
        response
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn connect_error_description_embeds_cause() {
        let cause: BoxError = "connection refused".into();
        let err = TransportError::Connect(cause);
        assert_eq!(err.to_string(), "could not connect to the server: connection refused");
    }
}
