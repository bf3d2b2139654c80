use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use once_cell::sync::OnceCell;

use crate::cache_control::{CacheControl, parse_cache_control};

/// An immutable outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Uri,
    headers: HeaderMap,
    cache_control: OnceCell<CacheControl>,
}

impl Request {
    pub fn builder(url: Uri) -> RequestBuilder {
        RequestBuilder::new(url)
    }

    pub fn get(url: Uri) -> Request {
        RequestBuilder::new(url).build()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the named header, when it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn is_https(&self) -> bool {
        self.url.scheme_str() == Some("https")
    }

    /// Parsed `Cache-Control` directives, computed once per request.
    pub fn cache_control(&self) -> &CacheControl {
        self.cache_control
            .get_or_init(|| parse_cache_control(&self.headers))
    }

    pub fn into_builder(self) -> RequestBuilder {
        RequestBuilder {
            method: self.method,
            url: self.url,
            headers: self.headers,
        }
    }
}

#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Uri,
    headers: HeaderMap,
}

impl RequestBuilder {
    fn new(url: Uri) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
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

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            cache_control: OnceCell::new(),
        }
    }
}
