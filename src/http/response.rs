//! Response buffering and header rewriting.
//!
//! # Responsibilities
//! - Capture the complete body written by the upstream handler in memory
//! - Rewrite headers exactly once, when the head is committed
//! - Replay an upstream Axum response into any [`ResponseSink`]
//!
//! # Design Decisions
//! - The body is never written to the real sink from here; the owner of
//!   the [`BufferingResponse`] decides what is finally written
//! - `Content-Length` is always stripped because the emitted body may be
//!   shorter than what the upstream measured
//! - `Last-Modified` is stripped unless the owner asked to keep it
//! - Flush and takeover are delegated to the real sink untouched

use std::io;

use axum::body::Body;
use axum::http::{header, HeaderMap, Response, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;

use crate::http::sink::{Flush, ResponseSink, SinkError, Takeover};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Head {
    Pending,
    Committed,
}

/// A sink wrapper that buffers the body and defers it to its owner.
///
/// Headers are read and written straight through to the wrapped sink; body
/// writes only grow the in-memory buffer. Header changes made after the
/// commit are the wrapped sink's to discard.
pub struct BufferingResponse<'a, W: ResponseSink + ?Sized> {
    inner: &'a mut W,
    keep_last_modified: bool,
    head: Head,
    buffer: Vec<u8>,
}

impl<'a, W: ResponseSink + ?Sized> BufferingResponse<'a, W> {
    pub fn new(inner: &'a mut W, keep_last_modified: bool) -> Self {
        Self {
            inner,
            keep_last_modified,
            head: Head::Pending,
            buffer: Vec::new(),
        }
    }

    /// Whether the head has been committed to the wrapped sink.
    pub fn head_committed(&self) -> bool {
        self.head == Head::Committed
    }

    /// Bytes captured so far.
    pub fn captured(&self) -> &[u8] {
        &self.buffer
    }

    /// Explicitly flush the wrapped sink, or do nothing if it cannot flush.
    ///
    /// The captured body is not part of what is flushed.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_flush() {
            Some(flusher) => flusher.flush(),
            None => Ok(()),
        }
    }

    /// Hand the connection over through the wrapped sink.
    pub fn take_over(&mut self) -> Result<hyper::upgrade::OnUpgrade, SinkError> {
        match self.inner.as_takeover() {
            Some(takeover) => takeover.take_over(),
            None => Err(SinkError::TakeoverUnsupported(std::any::type_name::<W>())),
        }
    }

    /// Stop capturing and return the body.
    pub fn into_captured(self) -> Bytes {
        Bytes::from(self.buffer)
    }

    fn commit(&mut self, status: StatusCode) {
        let headers = self.inner.headers_mut();
        if !self.keep_last_modified {
            headers.remove(header::LAST_MODIFIED);
        }
        headers.remove(header::CONTENT_LENGTH);

        self.inner.write_head(status);
        self.head = Head::Committed;
    }
}

impl<W: ResponseSink + ?Sized> ResponseSink for BufferingResponse<'_, W> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) {
        match self.head {
            Head::Pending => self.commit(status),
            Head::Committed => {
                tracing::debug!(status = %status, "Superfluous write_head ignored");
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.head == Head::Pending {
            self.commit(StatusCode::OK);
        }
        self.buffer
            .try_reserve(buf.len())
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn as_flush(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }

    fn as_takeover(&mut self) -> Option<&mut dyn Takeover> {
        self.inner.as_takeover()
    }
}

impl<W: ResponseSink + ?Sized> Flush for BufferingResponse<'_, W> {
    fn flush(&mut self) -> io::Result<()> {
        BufferingResponse::flush(self)
    }
}

/// Error while replaying an upstream response.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("upstream body failed: {0}")]
    Body(#[source] axum::Error),

    #[error(transparent)]
    Sink(#[from] io::Error),
}

/// Write an upstream response into `sink` the way a handler would: headers,
/// then the status line, then every body frame in order. Trailers are dropped.
pub async fn replay<S>(response: Response<Body>, sink: &mut S) -> Result<(), ReplayError>
where
    S: ResponseSink + ?Sized,
{
    let (parts, mut body) = response.into_parts();

    sink.headers_mut().extend(parts.headers);
    sink.write_head(parts.status);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(ReplayError::Body)?;
        if let Ok(data) = frame.into_data() {
            sink.write(&data)?;
        }
    }
    Ok(())
}
