//! Assemble and validate request URLs from their components.
//!
//! # Design
//! [`UrlBuilder`] is the seam the fetch service depends on, so tests can
//! hand it a builder that reports whatever validity they need. The
//! production implementation is [`UrlComponents`], a plain value holding
//! scheme, host, path and ordered query items.
//!
//! Validation policy: a URL is acceptable only if it builds, its scheme is
//! exactly `https` (case-sensitive) and its host is non-empty.

use url::Url;

use crate::error::FetchError;

/// Something that can produce the URL of a request.
pub trait UrlBuilder: Send + Sync {
    /// The assembled URL, or `None` if the parts do not form one.
    fn build(&self) -> Option<Url>;

    /// Whether the URL is acceptable for fetching.
    ///
    /// Fails with [`FetchError::BadFormattedUrl`] when [`build`](Self::build)
    /// returns `None`.
    fn is_valid(&self) -> Result<bool, FetchError> {
        let url = self.build().ok_or(FetchError::BadFormattedUrl)?;
        Ok(url.scheme() == "https" && url.host_str().is_some_and(|host| !host.is_empty()))
    }
}

/// One `name[=value]` pair of a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    pub name: String,
    pub value: Option<String>,
}

impl QueryItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// A query item rendered as a bare name, e.g. `?verbose`.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// URL described by its components.
///
/// Stateless and reusable: building twice yields the same URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlComponents {
    scheme: String,
    host: String,
    path: String,
    query_items: Option<Vec<QueryItem>>,
}

impl UrlComponents {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query_items: None,
        }
    }

    pub fn with_query_item(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_query_items([QueryItem::new(name, value)])
    }

    /// Append query items after any already present, keeping their order.
    pub fn with_query_items(mut self, items: impl IntoIterator<Item = QueryItem>) -> Self {
        self.query_items.get_or_insert_with(Vec::new).extend(items);
        self
    }
}

impl UrlBuilder for UrlComponents {
    /// Assemble `scheme://host` + path + query.
    ///
    /// The URL parser normalises the host to lowercase, so `Example.COM`
    /// builds as `example.com`. Query items are form-urlencoded: spaces
    /// become `+` rather than `%20`.
    fn build(&self) -> Option<Url> {
        // A relative path cannot follow an authority.
        if !self.path.is_empty() && !self.path.starts_with('/') {
            return None;
        }
        // Any of these would end or rewrite the authority while parsing.
        if self.host.contains(['/', '\\', '?', '#', '@'])
            || self.host.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return None;
        }

        let mut url = Url::parse(&format!("{}://{}", self.scheme, self.host)).ok()?;
        if !authority_only(&url) {
            return None;
        }
        url.set_path(&self.path);

        if let Some(items) = &self.query_items {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for item in items {
                match &item.value {
                    Some(value) => pairs.append_pair(&item.name, value),
                    None => pairs.append_key_only(&item.name),
                };
            }
        }
        Some(url)
    }

    fn is_valid(&self) -> Result<bool, FetchError> {
        if self.scheme != "https" || self.host.is_empty() {
            return Ok(false);
        }
        match self.build() {
            Some(_) => Ok(true),
            None => Err(FetchError::BadFormattedUrl),
        }
    }
}

/// Whether the host parsed into nothing but an authority.
fn authority_only(url: &Url) -> bool {
    matches!(url.path(), "" | "/")
        && url.query().is_none()
        && url.fragment().is_none()
        && url.username().is_empty()
        && url.password().is_none()
}

/// An already parsed URL builds to itself.
impl UrlBuilder for Url {
    fn build(&self) -> Option<Url> {
        Some(self.clone())
    }
}

pub fn build_url(components: &UrlComponents) -> Option<Url> {
    components.build()
}

pub fn is_valid_url(components: &UrlComponents) -> Result<bool, FetchError> {
    components.is_valid()
}
