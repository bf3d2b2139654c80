use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// A lazily-consumed response body.
///
/// Bodies own the underlying stream resource; dropping a body releases it.
pub struct Body {
    inner: BodyInner,
    content_length: Option<u64>,
}

enum BodyInner {
    Empty,
    Bytes { data: Bytes, pos: usize },
    Stream(Pin<Box<dyn AsyncRead + Send>>),
}

impl Body {
    pub fn empty() -> Self {
        Self {
            inner: BodyInner::Empty,
            content_length: Some(0),
        }
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let content_length = Some(data.len() as u64);
        Self {
            inner: BodyInner::Bytes { data, pos: 0 },
            content_length,
        }
    }

    pub fn from_reader(
        reader: impl AsyncRead + Send + 'static,
        content_length: Option<u64>,
    ) -> Self {
        Self {
            inner: BodyInner::Stream(Box::pin(reader)),
            content_length,
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Reads the remaining bytes into memory.
    pub async fn collect(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.inner {
            BodyInner::Empty => Poll::Ready(Ok(())),
            BodyInner::Bytes { data, pos } => {
                let remaining = &data[*pos..];
                let n = remaining.len().min(buf.remaining());
                buf.put_slice(&remaining[..n]);
                *pos += n;
                Poll::Ready(Ok(()))
            }
            BodyInner::Stream(reader) => reader.as_mut().poll_read(cx, buf),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            BodyInner::Empty => "empty",
            BodyInner::Bytes { .. } => "bytes",
            BodyInner::Stream(_) => "stream",
        };
        f.debug_struct("Body")
            .field("kind", &kind)
            .field("content_length", &self.content_length)
            .finish()
    }
}
