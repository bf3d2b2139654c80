use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use http::{StatusCode, Version};
use tracing::{debug, warn};

use super::writing_body::CacheWritingBody;
use super::{
    CacheSink, CacheStore, CacheStrategy, Clock, DISCARD_STREAM_TIMEOUT, StrategyFactory,
    SystemClock, is_cacheable,
};
use crate::body::Body;
use crate::headers::{combine_headers, has_body, invalidates_cache};
use crate::request::Request;
use crate::response::Response;

/// The executor a [`CacheInterceptor`] wraps; `proceed` performs the actual
/// network exchange.
#[async_trait]
pub trait Chain: Send {
    fn request(&self) -> &Request;

    async fn proceed(&mut self, request: Request) -> Result<Response>;
}

/// Serves requests from the cache and writes network responses back to it.
pub struct CacheInterceptor<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    discard_timeout: Duration,
}

impl<S: CacheStore> CacheInterceptor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            discard_timeout: DISCARD_STREAM_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_discard_timeout(mut self, timeout: Duration) -> Self {
        self.discard_timeout = timeout;
        self
    }

    pub async fn intercept(&self, chain: &mut dyn Chain) -> Result<Response> {
        let candidate = match self.store.get(chain.request()).await {
            Ok(candidate) => candidate,
            Err(err) => {
                debug!(error = %err, "cache lookup failed; treating as miss");
                None
            }
        };

        let now = self.clock.now_millis();
        let strategy = StrategyFactory::new(now, chain.request().clone(), candidate).compute();
        self.store.track_response(&strategy);
        // A candidate the strategy did not select was dropped inside the
        // factory, which released its body.

        match strategy {
            CacheStrategy::Unsatisfiable => {
                Ok(self.unsatisfiable_response(chain.request().clone()))
            }
            CacheStrategy::Cache(cached) => {
                debug!("serving response from cache");
                let descriptor = cached.strip();
                Ok(cached
                    .into_builder()
                    .cache_response(Some(descriptor))
                    .build())
            }
            CacheStrategy::Network(request) => self.exchange(chain, request, None).await,
            CacheStrategy::Conditional { request, cached } => {
                self.exchange(chain, request, Some(cached)).await
            }
        }
    }

    /// The caller forbade the network and the cache cannot satisfy the
    /// request.
    fn unsatisfiable_response(&self, request: Request) -> Response {
        Response::builder(request)
            .status(StatusCode::GATEWAY_TIMEOUT)
            .message("Unsatisfiable Request (only-if-cached)")
            .version(Version::HTTP_11)
            .body(Body::empty())
            .sent_request_at(-1)
            .received_response_at(self.clock.now_millis())
            .build()
    }

    async fn exchange(
        &self,
        chain: &mut dyn Chain,
        network_request: Request,
        cached: Option<Response>,
    ) -> Result<Response> {
        let network_response = match chain.proceed(network_request.clone()).await {
            Ok(response) => response,
            Err(err) => {
                // Don't leak the stored body on the error path.
                drop(cached);
                return Err(err);
            }
        };

        // A stored response alongside a network response means this was a
        // conditional get.
        let mut cached_descriptor = None;
        if let Some(cached) = cached {
            if network_response.status() == StatusCode::NOT_MODIFIED {
                return self.merge_not_modified(cached, network_response).await;
            }
            // Revalidation failed; the stored body is replaced wholesale.
            cached_descriptor = Some(cached.strip());
        }

        let network_descriptor = network_response.strip();
        let response = network_response
            .into_builder()
            .cache_response(cached_descriptor)
            .network_response(Some(network_descriptor))
            .build();

        if has_body(&response) && is_cacheable(&response, &network_request) {
            match self.store.put(&response).await {
                Ok(Some(sink)) => return Ok(self.cache_writing_response(sink, response)),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "cache store rejected response"),
            }
        } else if invalidates_cache(network_request.method()) {
            if let Err(err) = self.store.remove(&network_request).await {
                // The cache cannot be written; serving continues regardless.
                debug!(error = %err, "cache invalidation failed");
            }
        }

        Ok(response)
    }

    /// Builds the merged response for a validated 304: the stored body under
    /// combined headers and the network exchange's timestamps.
    async fn merge_not_modified(
        &self,
        cached: Response,
        network_response: Response,
    ) -> Result<Response> {
        debug!("conditional request validated by the origin");
        let merged_headers = combine_headers(cached.headers(), network_response.headers());
        let stored_descriptor = cached.strip();
        let network_descriptor = network_response.strip();
        let sent_at = network_response.sent_request_at();
        let received_at = network_response.received_response_at();
        // A 304 carries no usable body; dropping it closes the stream.
        drop(network_response);

        let merged = cached
            .into_builder()
            .headers(merged_headers)
            .sent_request_at(sent_at)
            .received_response_at(received_at)
            .cache_response(Some(stored_descriptor.strip()))
            .network_response(Some(network_descriptor))
            .build();

        self.store.track_conditional_cache_hit();
        if let Err(err) = self.store.update(&stored_descriptor, &merged).await {
            warn!(error = %err, "cache update after revalidation failed");
        }
        Ok(merged)
    }

    /// Replaces the response body with one that tees into the store as the
    /// caller reads.
    fn cache_writing_response(&self, sink: Box<dyn CacheSink>, response: Response) -> Response {
        let content_length = response.body().content_length();
        let mut builder = response.into_builder();
        let upstream = builder.take_body();
        let writing = CacheWritingBody::new(upstream, sink, self.discard_timeout);
        builder
            .body(Body::from_reader(writing, content_length))
            .build()
    }
}
