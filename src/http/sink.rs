//! Response sinks.
//!
//! A [`ResponseSink`] is where a handler commits a status line, headers
//! and body bytes. Optional capabilities (explicit flush, protocol
//! takeover) are discovered at runtime through `as_flush` / `as_takeover`;
//! a sink that does not offer one simply returns `None`.

use std::io;

use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};
use bytes::{Bytes, BytesMut};
use hyper::upgrade::OnUpgrade;

/// Errors a sink can report.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("{0} does not support protocol takeover")]
    TakeoverUnsupported(&'static str),
}

/// Explicit flush capability.
pub trait Flush {
    fn flush(&mut self) -> io::Result<()>;
}

/// Protocol takeover capability (connection upgrade).
pub trait Takeover {
    fn take_over(&mut self) -> Result<OnUpgrade, SinkError>;
}

/// Destination for a response.
pub trait ResponseSink {
    /// Headers to be committed with the status line.
    fn headers(&self) -> &HeaderMap;

    /// Mutable access to the headers to be committed.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit the status line and headers.
    fn write_head(&mut self, status: StatusCode);

    /// Write body bytes, committing the head with `200 OK` first if needed.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn as_flush(&mut self) -> Option<&mut dyn Flush> {
        None
    }

    fn as_takeover(&mut self) -> Option<&mut dyn Takeover> {
        None
    }
}

/// A sink that assembles an Axum [`Response`].
///
/// This is the real sink of the proxy: whatever is written here is what the
/// client receives. The body length is taken from the bytes written; no
/// `Content-Length` is computed here, hyper derives it from the final body.
///
/// Headers are snapshotted when the head is committed. Later changes through
/// `headers_mut` are accepted but never reach the response.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    head: Option<(StatusCode, HeaderMap)>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, if the head has been written.
    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|(status, _)| *status)
    }

    /// The headers as committed, if the head has been written.
    pub fn committed_headers(&self) -> Option<&HeaderMap> {
        self.head.as_ref().map(|(_, headers)| headers)
    }

    /// Bytes written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Build the response. An uncommitted head defaults to `200 OK`.
    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(Bytes::from(self.body)));
        let (status, headers) = self.head.unwrap_or((StatusCode::OK, self.headers));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl ResponseSink for ResponseWriter {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if self.head.is_none() {
            self.head = Some((status, self.headers.clone()));
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_head(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
