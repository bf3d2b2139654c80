use tracing::trace;

use crate::date::{parse_http_date_millis, parse_seconds, saturating_millis, seconds_to_millis};
use crate::request::Request;
use crate::response::Response;

const ONE_DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

const WARNING_STALE: &str = "110 HttpURLConnection \"Response is stale\"";
const WARNING_HEURISTIC: &str = "113 HttpURLConnection \"Heuristic expiration\"";

/// The outcome of strategy selection: which of the network and the stored
/// response serve this call.
#[derive(Debug)]
pub enum CacheStrategy {
    /// Fetch from the network; the cache has nothing usable.
    Network(Request),
    /// Serve the stored response without touching the network.
    Cache(Response),
    /// Revalidate the stored response with a conditional request; a 304
    /// answer means the stored body is still good.
    Conditional { request: Request, cached: Response },
    /// The cache is insufficient and the caller forbade network use.
    Unsatisfiable,
}

impl CacheStrategy {
    pub fn network_request(&self) -> Option<&Request> {
        match self {
            CacheStrategy::Network(request)
            | CacheStrategy::Conditional { request, .. } => Some(request),
            CacheStrategy::Cache(_) | CacheStrategy::Unsatisfiable => None,
        }
    }

    pub fn cache_response(&self) -> Option<&Response> {
        match self {
            CacheStrategy::Cache(cached)
            | CacheStrategy::Conditional { cached, .. } => Some(cached),
            CacheStrategy::Network(_) | CacheStrategy::Unsatisfiable => None,
        }
    }
}

/// Returns true if the response may be stored to serve a later request.
///
/// Partial content is never cached, and `s-maxage` is never consulted: this
/// is a private cache.
pub fn is_cacheable(response: &Response, request: &Request) -> bool {
    match response.status().as_u16() {
        200 | 203 | 204 | 300 | 301 | 404 | 405 | 410 | 414 | 501 | 308 => {}
        302 | 307 => {
            // Temporary redirects need explicit caching headers.
            let caching = response.cache_control();
            let explicit = response.headers().contains_key(http::header::EXPIRES)
                || caching.max_age.is_some()
                || caching.public
                || caching.private;
            if !explicit {
                return false;
            }
        }
        _ => return false,
    }

    // A no-store directive on either side keeps the response out of the
    // store.
    !response.cache_control().no_store && !request.cache_control().no_store
}

/// Computes a [`CacheStrategy`] from a request and an optionally stored
/// response.
///
/// The stored response's validator and date headers are parsed once at
/// construction; unparseable values are treated as absent. `compute`
/// consumes the factory, so a stored response the strategy does not select
/// is dropped here, releasing its body.
pub struct StrategyFactory {
    now_millis: i64,
    request: Request,
    cached: Option<Response>,
    served_date: Option<i64>,
    served_date_value: Option<String>,
    last_modified: Option<i64>,
    last_modified_value: Option<String>,
    expires: Option<i64>,
    etag: Option<String>,
    age_seconds: Option<u64>,
    sent_request_millis: i64,
    received_response_millis: i64,
}

impl StrategyFactory {
    pub fn new(now_millis: i64, request: Request, cached: Option<Response>) -> Self {
        let mut factory = Self {
            now_millis,
            request,
            cached: None,
            served_date: None,
            served_date_value: None,
            last_modified: None,
            last_modified_value: None,
            expires: None,
            etag: None,
            age_seconds: None,
            sent_request_millis: 0,
            received_response_millis: 0,
        };

        if let Some(cached) = cached {
            factory.sent_request_millis = cached.sent_request_at();
            factory.received_response_millis = cached.received_response_at();
            for (name, value) in cached.headers() {
                let Ok(value) = value.to_str() else { continue };
                match name.as_str() {
                    "date" => {
                        factory.served_date = parse_http_date_millis(value);
                        factory.served_date_value = Some(value.to_string());
                    }
                    "expires" => factory.expires = parse_http_date_millis(value),
                    "last-modified" => {
                        factory.last_modified = parse_http_date_millis(value);
                        factory.last_modified_value = Some(value.to_string());
                    }
                    "etag" => factory.etag = Some(value.to_string()),
                    "age" => factory.age_seconds = parse_seconds(value),
                    _ => {}
                }
            }
            factory.cached = Some(cached);
        }
        factory
    }

    /// Decides how to satisfy the request.
    pub fn compute(self) -> CacheStrategy {
        let only_if_cached = self.request.cache_control().only_if_cached;
        let candidate = self.candidate();

        if only_if_cached && candidate.network_request().is_some() {
            // Forbidden from using the network, and the cache is
            // insufficient.
            return CacheStrategy::Unsatisfiable;
        }
        candidate
    }

    /// The strategy to use assuming the request may touch the network.
    fn candidate(mut self) -> CacheStrategy {
        let cached = match self.cached.take() {
            Some(cached) => cached,
            None => return CacheStrategy::Network(self.request),
        };

        // An entry recorded without a handshake must not satisfy an HTTPS
        // request.
        if self.request.is_https() && cached.handshake().is_none() {
            trace!("stored response lacks a handshake; fetching");
            return CacheStrategy::Network(self.request);
        }

        // If the response shouldn't have been stored, it is never served.
        // Redundant while the store applies the same rules on write.
        if !is_cacheable(&cached, &self.request) {
            return CacheStrategy::Network(self.request);
        }

        let request_caching = self.request.cache_control().clone();
        if request_caching.no_cache || has_conditions(&self.request) {
            return CacheStrategy::Network(self.request);
        }

        let cached_caching = cached.cache_control().clone();
        if cached_caching.immutable {
            return CacheStrategy::Cache(cached);
        }

        let age_millis = self.cache_response_age();
        let mut fresh_millis = self.freshness_lifetime(&cached);

        if let Some(max_age) = request_caching.max_age {
            fresh_millis = fresh_millis.min(saturating_millis(max_age));
        }

        let min_fresh_millis = request_caching
            .min_fresh
            .map(saturating_millis)
            .unwrap_or(0);

        let mut max_stale_millis = 0;
        if !cached_caching.must_revalidate
            && let Some(max_stale) = request_caching.max_stale
        {
            max_stale_millis = saturating_millis(max_stale);
        }

        if !cached_caching.no_cache
            && age_millis.saturating_add(min_fresh_millis)
                < fresh_millis.saturating_add(max_stale_millis)
        {
            trace!(age_millis, fresh_millis, "serving stored response");
            let stale = age_millis.saturating_add(min_fresh_millis) >= fresh_millis;
            let heuristic = age_millis > ONE_DAY_MILLIS
                && cached_caching.max_age.is_none()
                && self.expires.is_none();

            let mut builder = cached.into_builder();
            if stale {
                builder = builder.header("Warning", WARNING_STALE);
            }
            if heuristic {
                builder = builder.header("Warning", WARNING_HEURISTIC);
            }
            return CacheStrategy::Cache(builder.build());
        }

        // Find a condition to attach; a validated match saves the server
        // from retransmitting the body.
        let (condition_name, condition_value) = if let Some(etag) = self.etag {
            ("If-None-Match", etag)
        } else if self.last_modified.is_some() {
            (
                "If-Modified-Since",
                self.last_modified_value.unwrap_or_default(),
            )
        } else if self.served_date.is_some() {
            (
                "If-Modified-Since",
                self.served_date_value.unwrap_or_default(),
            )
        } else {
            // No validator. Make a regular request; the stored entry is
            // unusable.
            return CacheStrategy::Network(self.request);
        };

        let conditional_request = self
            .request
            .into_builder()
            .header(condition_name, &condition_value)
            .build();
        CacheStrategy::Conditional {
            request: conditional_request,
            cached,
        }
    }

    /// Current age of the stored response in milliseconds, per
    /// RFC 7234 §4.2.3.
    fn cache_response_age(&self) -> i64 {
        let apparent_received_age = match self.served_date {
            Some(served) => self
                .received_response_millis
                .saturating_sub(served)
                .max(0),
            None => 0,
        };
        let received_age = match self.age_seconds {
            Some(seconds) => apparent_received_age.max(seconds_to_millis(seconds)),
            None => apparent_received_age,
        };
        let response_duration = self
            .received_response_millis
            .saturating_sub(self.sent_request_millis);
        let resident_duration = self.now_millis.saturating_sub(self.received_response_millis);
        received_age
            .saturating_add(response_duration)
            .saturating_add(resident_duration)
    }

    /// Freshness lifetime in milliseconds, counted from the served date.
    ///
    /// Without explicit directives the lifetime defaults to 10% of the
    /// document's age when served, and never applies to URLs carrying a
    /// query string.
    fn freshness_lifetime(&self, cached: &Response) -> i64 {
        if let Some(max_age) = cached.cache_control().max_age {
            return saturating_millis(max_age);
        }
        if let Some(expires) = self.expires {
            let served_millis = self.served_date.unwrap_or(self.received_response_millis);
            return expires.saturating_sub(served_millis).max(0);
        }
        if let Some(last_modified) = self.last_modified
            && cached.request().url().query().is_none()
        {
            let served_millis = self.served_date.unwrap_or(self.sent_request_millis);
            let delta = served_millis.saturating_sub(last_modified);
            return if delta > 0 { delta / 10 } else { 0 };
        }
        0
    }
}

/// Requests that already carry their own validators bypass the cache; the
/// caller is running its own revalidation.
fn has_conditions(request: &Request) -> bool {
    request.headers().contains_key(http::header::IF_MODIFIED_SINCE)
        || request.headers().contains_key(http::header::IF_NONE_MATCH)
}
