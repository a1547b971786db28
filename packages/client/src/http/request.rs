//! Outgoing request value

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use super::into_url::IntoUrl;

/// A request as seen by the client core: method, absolute URL, headers and
/// a fully buffered body.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl ClientRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Parses `url` and creates a request.
    ///
    /// # Errors
    ///
    /// Returns a builder error if `url` is not an absolute URL with a host.
    pub fn try_new<U: IntoUrl>(method: Method, url: U) -> crate::Result<Self> {
        Ok(Self::new(method, url.into_url()?))
    }

    /// # Errors
    ///
    /// See [`try_new`](Self::try_new).
    pub fn get<U: IntoUrl>(url: U) -> crate::Result<Self> {
        Self::try_new(Method::GET, url)
    }

    /// # Errors
    ///
    /// See [`try_new`](Self::try_new).
    pub fn post<U: IntoUrl>(url: U, body: impl Into<Bytes>) -> crate::Result<Self> {
        Ok(Self::try_new(Method::POST, url)?.with_body(body))
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Path plus query, the form sent on the request line.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_owned(),
        }
    }
}
