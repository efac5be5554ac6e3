//! Validated JSON fetching over HTTPS.
//!
//! # Overview
//! Builds a request URL from its components, checks that it is an `https`
//! URL with a host, issues a single GET through a pluggable transport,
//! rejects non-2xx responses and decodes the JSON body into the caller's
//! type. Every outcome is one value or one [`FetchError`].
//!
//! # Design
//! - [`UrlBuilder`] and [`Transport`] are the two seams; production code uses
//!   [`UrlComponents`] and [`ReqwestTransport`], tests inject their own.
//! - [`FetchService`] holds only the shared transport and no per-call state.
//! - Error descriptions are stable and nest causes instead of flattening them.
//! - The movie lookup records in [`types`] are defined independently from the
//!   mock-server crate; integration tests catch schema drift.

pub mod error;
pub mod http;
pub mod service;
pub mod types;
pub mod url_builder;

pub use error::{BoxError, FetchError};
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
pub use http::{HttpResponse, Transport, TransportError};
pub use service::{FetchService, PendingFetch};
pub use types::{Movie, Rating};
pub use url_builder::{build_url, is_valid_url, QueryItem, UrlBuilder, UrlComponents};
pub use url::Url;
