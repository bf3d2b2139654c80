use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use cachegate::body::Body;

/// Observes when a body's underlying stream has been released.
pub struct BodyFlag(Arc<AtomicBool>);

impl BodyFlag {
    pub fn released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct TrackedReader {
    inner: io::Cursor<Vec<u8>>,
    released: Arc<AtomicBool>,
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// A streaming body whose release the test can observe.
pub fn tracked_body(data: &[u8]) -> (Body, BodyFlag) {
    let flag = Arc::new(AtomicBool::new(false));
    let reader = TrackedReader {
        inner: io::Cursor::new(data.to_vec()),
        released: flag.clone(),
    };
    (
        Body::from_reader(reader, Some(data.len() as u64)),
        BodyFlag(flag),
    )
}
