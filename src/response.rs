use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};
use once_cell::sync::OnceCell;

use crate::body::Body;
use crate::cache_control::{CacheControl, parse_cache_control};
use crate::request::Request;

/// Record of the TLS handshake an exchange ran over, persisted alongside a
/// cached response so an entry written over TLS can be told apart from one
/// that was not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub tls_version: String,
    pub cipher_suite: String,
}

/// An immutable response, from the network or from the cache.
///
/// `sent_request_at`/`received_response_at` are the client's own unix-milli
/// clock readings for the exchange; synthetic responses use `-1` for the
/// former. `cache_response`/`network_response` carry body-stripped
/// descriptors of the sources that produced this response.
#[derive(Debug)]
pub struct Response {
    request: Request,
    status: StatusCode,
    message: String,
    version: Version,
    headers: HeaderMap,
    body: Body,
    handshake: Option<Handshake>,
    sent_request_at: i64,
    received_response_at: i64,
    cache_response: Option<Box<Response>>,
    network_response: Option<Box<Response>>,
    cache_control: OnceCell<CacheControl>,
}

impl Response {
    pub fn builder(request: Request) -> ResponseBuilder {
        ResponseBuilder::new(request)
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the named header, when it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    pub fn sent_request_at(&self) -> i64 {
        self.sent_request_at
    }

    pub fn received_response_at(&self) -> i64 {
        self.received_response_at
    }

    pub fn cache_response(&self) -> Option<&Response> {
        self.cache_response.as_deref()
    }

    pub fn network_response(&self) -> Option<&Response> {
        self.network_response.as_deref()
    }

    /// Parsed `Cache-Control` directives, computed once per response.
    pub fn cache_control(&self) -> &CacheControl {
        self.cache_control
            .get_or_init(|| parse_cache_control(&self.headers))
    }

    /// A body-stripped descriptor of this response, suitable for attaching
    /// as `cache_response`/`network_response` metadata. Nested descriptors
    /// are not carried into the copy.
    pub fn strip(&self) -> Response {
        Response {
            request: self.request.clone(),
            status: self.status,
            message: self.message.clone(),
            version: self.version,
            headers: self.headers.clone(),
            body: Body::empty(),
            handshake: self.handshake.clone(),
            sent_request_at: self.sent_request_at,
            received_response_at: self.received_response_at,
            cache_response: None,
            network_response: None,
            cache_control: OnceCell::new(),
        }
    }

    pub fn into_builder(self) -> ResponseBuilder {
        ResponseBuilder {
            request: self.request,
            status: self.status,
            message: Some(self.message),
            version: self.version,
            headers: self.headers,
            body: self.body,
            handshake: self.handshake,
            sent_request_at: self.sent_request_at,
            received_response_at: self.received_response_at,
            cache_response: self.cache_response,
            network_response: self.network_response,
        }
    }
}

#[derive(Debug)]
pub struct ResponseBuilder {
    request: Request,
    status: StatusCode,
    message: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Body,
    handshake: Option<Handshake>,
    sent_request_at: i64,
    received_response_at: i64,
    cache_response: Option<Box<Response>>,
    network_response: Option<Box<Response>>,
}

impl ResponseBuilder {
    fn new(request: Request) -> Self {
        Self {
            request,
            status: StatusCode::OK,
            message: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::empty(),
            handshake: None,
            sent_request_at: 0,
            received_response_at: 0,
            cache_response: None,
            network_response: None,
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Appends a header, silently skipping invalid names or values.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Swaps the pending body out, leaving an empty one behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::empty())
    }

    pub fn handshake(mut self, handshake: Option<Handshake>) -> Self {
        self.handshake = handshake;
        self
    }

    pub fn sent_request_at(mut self, millis: i64) -> Self {
        self.sent_request_at = millis;
        self
    }

    pub fn received_response_at(mut self, millis: i64) -> Self {
        self.received_response_at = millis;
        self
    }

    pub fn cache_response(mut self, response: Option<Response>) -> Self {
        self.cache_response = response.map(Box::new);
        self
    }

    pub fn network_response(mut self, response: Option<Response>) -> Self {
        self.network_response = response.map(Box::new);
        self
    }

    pub fn build(self) -> Response {
        let message = self.message.unwrap_or_else(|| {
            self.status
                .canonical_reason()
                .unwrap_or_default()
                .to_string()
        });
        Response {
            request: self.request,
            status: self.status,
            message,
            version: self.version,
            headers: self.headers,
            body: self.body,
            handshake: self.handshake,
            sent_request_at: self.sent_request_at,
            received_response_at: self.received_response_at,
            cache_response: self.cache_response,
            network_response: self.network_response,
            cache_control: OnceCell::new(),
        }
    }
}
