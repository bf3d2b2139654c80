use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWrite;

use cachegate::cache::{CacheSink, CacheStore, CacheStrategy};
use cachegate::request::Request;
use cachegate::response::Response;

/// Everything the store was asked to do, for assertions.
#[derive(Default)]
pub struct StoreCalls {
    pub gets: usize,
    pub puts: usize,
    pub updates: usize,
    pub removes: Vec<String>,
    pub tracked_strategies: usize,
    pub conditional_hits: usize,
}

/// Bytes and outcome of an entry written through a [`RecordingSink`].
#[derive(Default)]
pub struct SinkState {
    pub data: Vec<u8>,
    pub committed: bool,
    pub aborted: bool,
}

pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl AsyncWrite for RecordingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.state.lock().data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.state.lock().committed = true;
        Poll::Ready(Ok(()))
    }
}

impl CacheSink for RecordingSink {
    fn abort(self: Box<Self>) {
        self.state.lock().aborted = true;
    }
}

/// A [`CacheStore`] that serves one scripted entry and records every call.
pub struct RecordingStore {
    stored: Mutex<Option<Response>>,
    pub calls: Mutex<StoreCalls>,
    pub last_sink: Mutex<Option<Arc<Mutex<SinkState>>>>,
    pub last_update_headers: Mutex<Option<Vec<(String, String)>>>,
    decline_puts: bool,
    fail_gets: bool,
}

impl RecordingStore {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            stored: Mutex::new(None),
            calls: Mutex::new(StoreCalls::default()),
            last_sink: Mutex::new(None),
            last_update_headers: Mutex::new(None),
            decline_puts: false,
            fail_gets: false,
        })
    }

    pub fn with_stored(response: Response) -> Arc<Self> {
        let store = Self::empty();
        *store.stored.lock() = Some(response);
        store
    }

    pub fn declining_puts() -> Arc<Self> {
        Arc::new(Self {
            stored: Mutex::new(None),
            calls: Mutex::new(StoreCalls::default()),
            last_sink: Mutex::new(None),
            last_update_headers: Mutex::new(None),
            decline_puts: true,
            fail_gets: false,
        })
    }

    pub fn failing_gets() -> Arc<Self> {
        Arc::new(Self {
            stored: Mutex::new(None),
            calls: Mutex::new(StoreCalls::default()),
            last_sink: Mutex::new(None),
            last_update_headers: Mutex::new(None),
            decline_puts: false,
            fail_gets: true,
        })
    }

    pub fn written_bytes(&self) -> Option<Vec<u8>> {
        self.last_sink
            .lock()
            .as_ref()
            .map(|state| state.lock().data.clone())
    }

    pub fn entry_committed(&self) -> bool {
        self.last_sink
            .lock()
            .as_ref()
            .is_some_and(|state| state.lock().committed)
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn get(&self, _request: &Request) -> Result<Option<Response>> {
        self.calls.lock().gets += 1;
        if self.fail_gets {
            return Err(anyhow!("cache directory unreadable"));
        }
        Ok(self.stored.lock().take())
    }

    async fn put(&self, _response: &Response) -> Result<Option<Box<dyn CacheSink>>> {
        self.calls.lock().puts += 1;
        if self.decline_puts {
            return Ok(None);
        }
        let state = Arc::new(Mutex::new(SinkState::default()));
        *self.last_sink.lock() = Some(state.clone());
        Ok(Some(Box::new(RecordingSink { state })))
    }

    async fn update(&self, _stored: &Response, merged: &Response) -> Result<()> {
        self.calls.lock().updates += 1;
        let headers = merged
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        *self.last_update_headers.lock() = Some(headers);
        Ok(())
    }

    async fn remove(&self, request: &Request) -> Result<()> {
        self.calls.lock().removes.push(request.url().to_string());
        Ok(())
    }

    fn track_response(&self, _strategy: &CacheStrategy) {
        self.calls.lock().tracked_strategies += 1;
    }

    fn track_conditional_cache_hit(&self) {
        self.calls.lock().conditional_hits += 1;
    }
}
