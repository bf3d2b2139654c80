use std::collections::HashSet;

use http::{HeaderMap, HeaderName, Method};
use once_cell::sync::Lazy;

use crate::response::Response;

/// Hop-by-hop headers per RFC 2616 §13.5.1; everything else is end-to-end.
static HOP_BY_HOP: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailers",
        "transfer-encoding",
        "upgrade",
    ]
    .into_iter()
    .collect()
});

const INVALIDATING_METHODS: [&str; 5] = ["PUT", "PATCH", "POST", "DELETE", "MOVE"];

pub fn is_end_to_end(name: &HeaderName) -> bool {
    !HOP_BY_HOP.contains(name.as_str())
}

/// Content-specific headers always come from the stored entry: they describe
/// the body bytes on disk, which a 304 does not replace.
pub fn is_content_specific(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "content-length" | "content-encoding" | "content-type"
    )
}

/// Merges stored and revalidation headers after a 304, per RFC 7234 §4.3.4.
///
/// Surviving stored headers keep their original order and come first; fresh
/// end-to-end headers from the network follow. Stored 1xx `Warning` values
/// are dropped; network-supplied ones are kept as-is.
pub fn combine_headers(cached: &HeaderMap, network: &HeaderMap) -> HeaderMap {
    let mut result = HeaderMap::new();

    for (name, value) in cached {
        if name == &http::header::WARNING && value.as_bytes().starts_with(b"1") {
            continue;
        }
        if is_content_specific(name) || !is_end_to_end(name) || !network.contains_key(name) {
            result.append(name.clone(), value.clone());
        }
    }

    for (name, value) in network {
        if is_end_to_end(name) && !is_content_specific(name) {
            result.append(name.clone(), value.clone());
        }
    }

    result
}

/// Whether the response is expected to carry a message body, per
/// RFC 7230 §3.3.
pub fn has_body(response: &Response) -> bool {
    if response.request().method() == Method::HEAD {
        return false;
    }

    let code = response.status().as_u16();
    if (code < 100 || code >= 200) && code != 204 && code != 304 {
        return true;
    }

    // Informational and bodiless codes still frame a body when the headers
    // say so explicitly.
    if content_length(response.headers()).is_some() {
        return true;
    }
    response
        .headers()
        .get(http::header::TRANSFER_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("chunked"))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Methods whose network responses invalidate any stored entry for the key.
pub fn invalidates_cache(method: &Method) -> bool {
    INVALIDATING_METHODS
        .iter()
        .any(|name| method.as_str().eq_ignore_ascii_case(name))
}
