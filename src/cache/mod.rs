//! The response-cache decision core: strategy selection and the interceptor
//! that executes it, plus the contracts the backing store and the network
//! executor implement.

use std::time::{Duration, SystemTime};

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::request::Request;
use crate::response::Response;

mod interceptor;
mod strategy;
mod writing_body;

pub use interceptor::{CacheInterceptor, Chain};
pub use strategy::{CacheStrategy, StrategyFactory, is_cacheable};

/// How long a cache-writing body may spend draining an abandoned stream
/// before the in-flight entry is aborted.
pub const DISCARD_STREAM_TIMEOUT: Duration = Duration::from_millis(100);

/// Write half of an in-flight cache entry, handed out by [`CacheStore::put`].
///
/// Shutting the sink down cleanly commits the entry; [`CacheSink::abort`]
/// discards whatever was written. Implementations should treat a sink
/// dropped without either as aborted.
pub trait CacheSink: AsyncWrite + Send + Unpin {
    fn abort(self: Box<Self>);
}

/// The backing response store.
///
/// Implementations serialize their own operations and allow at most one
/// active writer per key; the interceptor never coordinates writers itself.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up a stored response for the request key. The returned response
    /// owns a live body stream.
    async fn get(&self, request: &Request) -> Result<Option<Response>>;

    /// Begins writing an entry for the response, or declines with `None`.
    async fn put(&self, response: &Response) -> Result<Option<Box<dyn CacheSink>>>;

    /// Replaces the headers of an existing entry after a successful
    /// revalidation. `stored` is a body-stripped descriptor of the entry
    /// being replaced; stores locate entries by request key, never by body.
    async fn update(&self, stored: &Response, merged: &Response) -> Result<()>;

    /// Invalidates the entry for the request key.
    async fn remove(&self, request: &Request) -> Result<()>;

    /// Telemetry hook, invoked once per computed strategy. Must not fail.
    fn track_response(&self, strategy: &CacheStrategy);

    /// Telemetry hook for validated 304 hits. Must not fail.
    fn track_conditional_cache_hit(&self);
}

/// Injectable wall clock; all cache time arithmetic runs on its readings.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        crate::date::system_time_millis(SystemTime::now())
    }
}
