//! Error taxonomy for the fetch pipeline.
//!
//! # Design
//! The `Display` output of every variant is part of the observable contract:
//! callers and tests compare descriptions verbatim, so the message templates
//! below must not drift.
//!
//! `RequestFailed` keeps its cause as a boxed error instead of flattening it.
//! An unacceptable status code therefore surfaces as
//! `RequestFailed(BadHttpResponseCode(code))`, and the outer description
//! embeds the inner one. The nested cause stays reachable through
//! [`std::error::Error::source`] and can be downcast to [`FetchError`] or
//! [`TransportError`](crate::http::TransportError).

use thiserror::Error;

/// Boxed cause carried by [`FetchError::RequestFailed`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single terminal failure of a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL builder reported an invalid URL, or could not build one.
    #[error("The URL construct is wrong")]
    BadUrlString,

    /// The URL components could not be assembled into a URL at all.
    #[error("The URL is badly formatted")]
    BadFormattedUrl,

    /// The transport failed, the server response was malformed, or the
    /// status code was rejected.
    #[error("The request has failed. Error: {0}")]
    RequestFailed(#[source] BoxError),

    /// The body could not be decoded into the expected type.
    ///
    /// The `Errorr` spelling is part of the description contract.
    #[error("The decoding has failed. Errorr: {0}")]
    DecodingFailed(#[source] serde_json::Error),

    /// The status code was outside `200..300`.
    #[error("The response code is not acceptable , response: {0}")]
    BadHttpResponseCode(u16),

    #[error("An unknown error has occured")]
    Unknown,
}

impl FetchError {
    /// Wrap any error as the cause of a failed request.
    pub fn request_failed(cause: impl Into<BoxError>) -> Self {
        FetchError::RequestFailed(cause.into())
    }

    /// The rejected status code, looking through `RequestFailed` wrapping.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::BadHttpResponseCode(code) => Some(*code),
            FetchError::RequestFailed(cause) => cause
                .downcast_ref::<FetchError>()
                .and_then(FetchError::status_code),
            _ => None,
        }
    }

    pub fn is_request_failed(&self) -> bool {
        matches!(self, FetchError::RequestFailed(_))
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self, FetchError::DecodingFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::http::TransportError;

    #[test]
    fn bad_url_string_description() {
        assert_eq!(FetchError::BadUrlString.to_string(), "The URL construct is wrong");
    }

    #[test]
    fn bad_formatted_url_description() {
        assert_eq!(FetchError::BadFormattedUrl.to_string(), "The URL is badly formatted");
    }

    #[test]
    fn unknown_description() {
        assert_eq!(FetchError::Unknown.to_string(), "An unknown error has occured");
    }

    #[test]
    fn status_code_nested_in_request_failed() {
        let err = FetchError::request_failed(FetchError::BadHttpResponseCode(400));
        assert_eq!(
            err.to_string(),
            "The request has failed. Error: The response code is not acceptable , response: 400"
        );
        assert_eq!(err.status_code(), Some(400));
        assert!(err.is_request_failed());
    }

    #[test]
    fn nested_cause_is_reachable_through_source() {
        let err = FetchError::request_failed(FetchError::BadHttpResponseCode(503));
        let source = err.source().expect("request failure keeps its cause");
        let inner = source.downcast_ref::<FetchError>().unwrap();
        assert!(matches!(inner, FetchError::BadHttpResponseCode(503)));
    }

    #[test]
    fn transport_cause_has_no_status_code() {
        let err = FetchError::request_failed(TransportError::BadServerResponse);
        assert_eq!(err.status_code(), None);
        assert!(err
            .source()
            .and_then(|s| s.downcast_ref::<TransportError>())
            .is_some());
    }

    #[test]
    fn decoding_failed_embeds_parser_message() {
        let parse_err = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let message = parse_err.to_string();
        let err = FetchError::DecodingFailed(parse_err);
        assert!(err.is_decoding());
        assert_eq!(err.to_string(), format!("The decoding has failed. Errorr: {message}"));
    }
}
