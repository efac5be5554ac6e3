//! Validate, fetch and decode one request.
//!
//! # Design
//! `FetchService` owns nothing but a shared transport. Each call runs the
//! same pipeline exactly once, with no retries and no caching:
//!
//! 1. ask the builder whether its URL is valid, then build it;
//! 2. GET it through the transport;
//! 3. reject malformed responses and status codes outside `200..300`;
//! 4. decode the body as JSON into the caller's type.
//!
//! Every failure becomes the single [`FetchError`] the call resolves to.
//! Status-code rejections are wrapped in `RequestFailed`, so callers see
//! `RequestFailed(BadHttpResponseCode(code))`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{BoxError, FetchError};
use crate::http::{HttpResponse, Transport, TransportError};
use crate::url_builder::UrlBuilder;

/// Fetches JSON resources through a shared transport.
#[derive(Debug)]
pub struct FetchService<C> {
    transport: Arc<C>,
}

impl<C> Clone for FetchService<C> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<C: Transport> FetchService<C> {
    pub fn new(transport: C) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Share a transport session that the caller also holds.
    pub fn from_arc(transport: Arc<C>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &C {
        &self.transport
    }

    /// Fetch the builder's URL and decode the body as `T`.
    ///
    /// Resolves to exactly one value or one error. An invalid builder fails
    /// with [`FetchError::BadUrlString`] before any network call.
    pub async fn fetch<T: DeserializeOwned>(&self, builder: &dyn UrlBuilder) -> Result<T, FetchError> {
        let url = resolve_url(builder)?;
        execute(self.transport.as_ref(), url).await
    }

    /// Run the fetch as a task on `handle` and return a future for its result.
    ///
    /// The URL is validated on the calling thread; a rejected builder yields
    /// an already resolved [`PendingFetch`]. Dropping the `PendingFetch`
    /// aborts the task together with its in-flight request.
    pub fn spawn_fetch<T>(&self, handle: &Handle, builder: &dyn UrlBuilder) -> PendingFetch<T>
    where
        C: 'static,
        T: DeserializeOwned + Send + 'static,
    {
        let url = match resolve_url(builder) {
            Ok(url) => url,
            Err(err) => return PendingFetch::ready(Err(err)),
        };
        let transport = Arc::clone(&self.transport);
        let task = handle.spawn(async move { execute::<C, T>(&transport, url).await });
        PendingFetch::running(task)
    }
}

fn resolve_url(builder: &dyn UrlBuilder) -> Result<Url, FetchError> {
    match builder.is_valid() {
        Ok(true) => {}
        Ok(false) => {
            warn!("rejecting request: URL is not https or has no host");
            return Err(FetchError::BadUrlString);
        }
        Err(err) => {
            warn!("rejecting request: {err}");
            return Err(FetchError::BadUrlString);
        }
    }
    builder.build().ok_or(FetchError::BadUrlString)
}

async fn execute<C, T>(transport: &C, url: Url) -> Result<T, FetchError>
where
    C: Transport,
    T: DeserializeOwned,
{
    let target = log_target(&url);
    debug!("GET {target}");
    let response = transport.get(&url).await.map_err(|err| {
        warn!("GET {target} failed: {err}");
        FetchError::request_failed(err)
    })?;

    let response = check_response(response).map_err(|err| {
        warn!("GET {target} rejected: {err}");
        FetchError::RequestFailed(err)
    })?;

    decode(&response)
}

/// Host and path only; query values may carry credentials such as API keys.
fn log_target(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

/// Accept only well-formed responses with a 2xx status.
fn check_response(response: HttpResponse) -> Result<HttpResponse, BoxError> {
    if !(100..=999).contains(&response.status) {
        return Err(Box::new(TransportError::BadServerResponse));
    }
    if !response.is_success() {
        return Err(Box::new(FetchError::BadHttpResponseCode(response.status)));
    }
    Ok(response)
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, FetchError> {
    let body = &response.body;
    match serde_json::from_slice(body) {
        Ok(value) => {
            debug!("decoded {} byte body into {}", body.len(), std::any::type_name::<T>());
            Ok(value)
        }
        Err(err) => {
            warn!(
                "decoding {} body into {} failed: {err}",
                response.header("content-type").unwrap_or("untyped"),
                std::any::type_name::<T>()
            );
            Err(FetchError::DecodingFailed(err))
        }
    }
}

/// The result of [`FetchService::spawn_fetch`], available once the task ends.
#[derive(Debug)]
pub struct PendingFetch<T> {
    state: PendingState<T>,
}

#[derive(Debug)]
enum PendingState<T> {
    Ready(Option<Result<T, FetchError>>),
    Running(JoinHandle<Result<T, FetchError>>),
}

impl<T> PendingFetch<T> {
    fn ready(result: Result<T, FetchError>) -> Self {
        Self {
            state: PendingState::Ready(Some(result)),
        }
    }

    fn running(task: JoinHandle<Result<T, FetchError>>) -> Self {
        Self {
            state: PendingState::Running(task),
        }
    }
}

// `T` is only ever moved out, never pinned.
impl<T> Unpin for PendingFetch<T> {}

impl<T> Future for PendingFetch<T> {
    type Output = Result<T, FetchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            PendingState::Ready(result) => Poll::Ready(result.take().unwrap_or(Err(FetchError::Unknown))),
            PendingState::Running(task) => Pin::new(task).poll(cx).map(|joined| {
                joined.unwrap_or_else(|err| {
                    warn!("fetch task did not complete: {err}");
                    Err(FetchError::Unknown)
                })
            }),
        }
    }
}

impl<T> Drop for PendingFetch<T> {
    fn drop(&mut self) {
        if let PendingState::Running(task) = &self.state {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::Movie;
    use crate::url_builder::UrlComponents;

    struct CannedTransport {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl CannedTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for CannedTransport {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(self.status, self.body))
        }
    }

    struct PanickingTransport;

    impl Transport for PanickingTransport {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, TransportError> {
            panic!("transport blew up");
        }
    }

    fn builder() -> UrlComponents {
        UrlComponents::new("https", "example.com", "/value")
    }

    #[test]
    fn check_response_accepts_2xx() {
        let response = check_response(HttpResponse::new(204, "x")).unwrap();
        assert_eq!(&response.body[..], b"x");
    }

    #[test]
    fn check_response_rejects_3xx_with_status_error() {
        let err = check_response(HttpResponse::new(304, "")).unwrap_err();
        let inner = err.downcast_ref::<FetchError>().unwrap();
        assert!(matches!(inner, FetchError::BadHttpResponseCode(304)));
    }

    #[test]
    fn check_response_rejects_impossible_status() {
        let err = check_response(HttpResponse::new(42, "{}")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::BadServerResponse)
        ));
    }

    #[test]
    fn log_target_omits_query() {
        let url = Url::parse("https://www.omdbapi.com/movies?i=tt3896198&apikey=secret").unwrap();
        let target = log_target(&url);
        assert_eq!(target, "www.omdbapi.com/movies");
        assert!(!target.contains("secret"));
    }

    #[test]
    fn decode_reports_type_mismatch() {
        let mut response = HttpResponse::new(200, r#"{"a":1}"#);
        response
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        let err = decode::<u32>(&response).unwrap_err();
        match err {
            FetchError::DecodingFailed(cause) => {
                assert_eq!(cause.classify(), serde_json::error::Category::Data)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_response_is_request_failed() {
        let service = FetchService::new(CannedTransport::new(1000, "{}"));
        let err = service.fetch::<serde_json::Value>(&builder()).await.unwrap_err();
        assert_eq!(err.to_string(), "The request has failed. Error: bad server response");
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn spawned_fetch_delivers_value() {
        let service = FetchService::new(CannedTransport::new(200, "17"));
        let value: u32 = service.spawn_fetch(&Handle::current(), &builder()).await.unwrap();
        assert_eq!(value, 17);
        assert_eq!(service.transport().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn spawned_fetch_rejects_invalid_builder_without_spawning() {
        let service = FetchService::new(CannedTransport::new(200, "17"));
        let insecure = UrlComponents::new("http", "example.com", "/");
        let err = service
            .spawn_fetch::<u32>(&Handle::current(), &insecure)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::BadUrlString));
        assert_eq!(service.transport().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicked_task_resolves_to_unknown() {
        let service = FetchService::new(PanickingTransport);
        let err = service
            .spawn_fetch::<Movie>(&Handle::current(), &builder())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unknown));
    }

    #[tokio::test]
    async fn clones_share_the_transport() {
        let service = FetchService::new(CannedTransport::new(200, "1"));
        let clone = service.clone();
        let _: u8 = service.fetch(&builder()).await.unwrap();
        let _: u8 = clone.fetch(&builder()).await.unwrap();
        assert_eq!(service.transport().calls.load(Ordering::SeqCst), 2);
    }
}
