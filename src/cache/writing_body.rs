use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tracing::warn;

use super::CacheSink;
use crate::body::Body;

const CHUNK_SIZE: usize = 8 * 1024;

/// Tees a network body into an in-flight cache entry as the caller consumes
/// it.
///
/// Each chunk is written to the store sink before it is yielded, so a
/// fully-read body implies a fully-written entry. The entry ends in exactly
/// one of two states: committed (upstream EOF reached and the sink shut down
/// cleanly) or aborted (read error, sink failure, or an abandoned stream
/// that could not be drained within the discard window).
pub(crate) struct CacheWritingBody {
    upstream: Option<Body>,
    sink: Option<Box<dyn CacheSink>>,
    state: WriteState,
    chunk: Vec<u8>,
    filled: usize,
    sink_pos: usize,
    reader_pos: usize,
    discard_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Writing,
    Committing,
    Committed,
    Aborted,
}

impl CacheWritingBody {
    pub(crate) fn new(
        upstream: Body,
        sink: Box<dyn CacheSink>,
        discard_timeout: Duration,
    ) -> Self {
        Self {
            upstream: Some(upstream),
            sink: Some(sink),
            state: WriteState::Writing,
            chunk: Vec::new(),
            filled: 0,
            sink_pos: 0,
            reader_pos: 0,
            discard_timeout,
        }
    }

    fn abort(&mut self, reason: &str, error: Option<io::Error>) {
        if let Some(sink) = self.sink.take() {
            match error {
                Some(err) => warn!(error = %err, "{reason}; aborting cache entry"),
                None => warn!("{reason}; aborting cache entry"),
            }
            sink.abort();
        }
        self.state = WriteState::Aborted;
    }

    fn poll_commit(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let Some(sink) = self.sink.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        match Pin::new(&mut **sink).poll_shutdown(cx) {
            Poll::Ready(Ok(())) => {
                self.sink = None;
                self.state = WriteState::Committed;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(err)) => {
                self.abort("cache entry commit failed", Some(err));
                Poll::Ready(Ok(()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl AsyncRead for CacheWritingBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            // Flush the buffered chunk to the sink before exposing it to the
            // caller.
            while this.sink_pos < this.filled {
                let Some(sink) = this.sink.as_mut() else {
                    this.sink_pos = this.filled;
                    break;
                };
                match Pin::new(&mut **sink)
                    .poll_write(cx, &this.chunk[this.sink_pos..this.filled])
                {
                    Poll::Ready(Ok(0)) => {
                        this.abort("cache sink stopped accepting bytes", None);
                    }
                    Poll::Ready(Ok(written)) => this.sink_pos += written,
                    Poll::Ready(Err(err)) => {
                        // The store failing must not fail the caller.
                        this.abort("cache entry write failed", Some(err));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            // Hand out what the sink already holds.
            if this.reader_pos < this.filled {
                let available = &this.chunk[this.reader_pos..this.filled];
                let n = available.len().min(buf.remaining());
                buf.put_slice(&available[..n]);
                this.reader_pos += n;
                return Poll::Ready(Ok(()));
            }

            match this.state {
                WriteState::Committing => return this.poll_commit(cx),
                WriteState::Committed => return Poll::Ready(Ok(())),
                WriteState::Writing | WriteState::Aborted => {}
            }

            // Refill from upstream.
            this.filled = 0;
            this.sink_pos = 0;
            this.reader_pos = 0;
            let Some(upstream) = this.upstream.as_mut() else {
                return Poll::Ready(Ok(()));
            };
            if this.chunk.len() < CHUNK_SIZE {
                this.chunk.resize(CHUNK_SIZE, 0);
            }
            let mut read_buf = ReadBuf::new(&mut this.chunk);
            match Pin::new(upstream).poll_read(cx, &mut read_buf) {
                Poll::Ready(Ok(())) => {
                    let read = read_buf.filled().len();
                    if read == 0 {
                        // Upstream is exhausted; the entry is complete once
                        // the sink shuts down cleanly.
                        if this.state == WriteState::Writing {
                            this.state = WriteState::Committing;
                            return this.poll_commit(cx);
                        }
                        return Poll::Ready(Ok(()));
                    }
                    this.filled = read;
                }
                Poll::Ready(Err(err)) => {
                    if this.state == WriteState::Writing {
                        this.abort("response body failed mid-stream", None);
                    }
                    return Poll::Ready(Err(err));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for CacheWritingBody {
    fn drop(&mut self) {
        if matches!(self.state, WriteState::Committed | WriteState::Aborted) {
            return;
        }
        let Some(mut sink) = self.sink.take() else {
            return;
        };
        let upstream = self.upstream.take();
        let pending = self.chunk[self.sink_pos..self.filled].to_vec();
        let timeout = self.discard_timeout;

        // The caller walked away mid-stream. Try to finish the entry by
        // draining the remainder through the tee within the discard window;
        // past the deadline the partial entry is thrown away.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let drained =
                        tokio::time::timeout(timeout, drain(&mut sink, upstream, pending)).await;
                    match drained {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) | Err(_) => sink.abort(),
                    }
                });
            }
            Err(_) => sink.abort(),
        }
    }
}

async fn drain(
    sink: &mut Box<dyn CacheSink>,
    upstream: Option<Body>,
    pending: Vec<u8>,
) -> io::Result<()> {
    sink.write_all(&pending).await?;
    if let Some(mut upstream) = upstream {
        tokio::io::copy(&mut upstream, sink).await?;
    }
    sink.shutdown().await
}
