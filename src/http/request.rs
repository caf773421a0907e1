//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) for every inbound request
//! - Snapshot the request fields the search filter gates on, before the
//!   request is handed to the next handler
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The snapshot is taken before forwarding, so later changes to the
//!   request by inner layers do not affect the gate

use axum::http::{header, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a fresh UUID v4 request ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The parts of an inbound request the search filter looks at.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
    pub content_type: Option<HeaderValue>,
    pub request_id: Option<HeaderValue>,
}

impl RequestMeta {
    /// Capture metadata from a request.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            content_type: req.headers().get(header::CONTENT_TYPE).cloned(),
            request_id: req.headers().get(X_REQUEST_ID).cloned(),
        }
    }

    /// The request ID for log fields.
    pub fn request_id(&self) -> &str {
        self.request_id
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}
