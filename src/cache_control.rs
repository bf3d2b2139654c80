use std::time::Duration;

use http::HeaderMap;

use crate::date::parse_seconds;

/// Parsed `Cache-Control` directives, covering the set a private response
/// cache consults. `s-maxage` is parsed for completeness but never drives a
/// decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub no_cache: bool,
    pub no_store: bool,
    pub max_age: Option<Duration>,
    pub s_maxage: Option<Duration>,
    pub private: bool,
    pub public: bool,
    pub must_revalidate: bool,
    pub max_stale: Option<Duration>,
    pub min_fresh: Option<Duration>,
    pub only_if_cached: bool,
    pub immutable: bool,
}

pub fn parse_cache_control(headers: &HeaderMap) -> CacheControl {
    let mut cc = CacheControl::default();

    for value in headers.get_all(http::header::CACHE_CONTROL) {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(',') {
            let part = part.trim();
            let (name, value) = match part.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
                None => (part, None),
            };
            if name.eq_ignore_ascii_case("no-cache") {
                cc.no_cache = true;
            } else if name.eq_ignore_ascii_case("no-store") {
                cc.no_store = true;
            } else if name.eq_ignore_ascii_case("max-age") {
                cc.max_age = value.and_then(directive_seconds);
            } else if name.eq_ignore_ascii_case("s-maxage") {
                cc.s_maxage = value.and_then(directive_seconds);
            } else if name.eq_ignore_ascii_case("private") {
                cc.private = true;
            } else if name.eq_ignore_ascii_case("public") {
                cc.public = true;
            } else if name.eq_ignore_ascii_case("must-revalidate") {
                cc.must_revalidate = true;
            } else if name.eq_ignore_ascii_case("max-stale") {
                // A bare max-stale accepts any amount of staleness.
                cc.max_stale = match value {
                    Some(value) => directive_seconds(value),
                    None => Some(Duration::MAX),
                };
            } else if name.eq_ignore_ascii_case("min-fresh") {
                cc.min_fresh = value.and_then(directive_seconds);
            } else if name.eq_ignore_ascii_case("only-if-cached") {
                cc.only_if_cached = true;
            } else if name.eq_ignore_ascii_case("immutable") {
                cc.immutable = true;
            }
        }
    }
    cc
}

fn directive_seconds(value: &str) -> Option<Duration> {
    parse_seconds(value).map(Duration::from_secs)
}
