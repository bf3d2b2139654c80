//! RFC 7234 response caching for a client-side HTTP stack.
//!
//! Two pieces do the work: [`cache::StrategyFactory`], a pure decision over a
//! request and an optionally stored response, and [`cache::CacheInterceptor`],
//! which executes that decision against a network [`cache::Chain`] and a
//! backing [`cache::CacheStore`], merging revalidated responses and teeing
//! fresh bodies into the store as the caller reads them.

pub mod body;
pub mod cache;
pub mod cache_control;
pub mod date;
pub mod headers;
pub mod request;
pub mod response;
