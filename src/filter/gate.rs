//! Decides whether a captured response is eligible for filtering.
//!
//! All of the following must hold:
//! - request method is `POST`
//! - request path is exactly the user directory search endpoint
//! - the *request* `Content-Type` is exactly `application/json`
//! - the response `Content-Encoding` is absent, empty or `identity`
//!
//! The content type checked is the request's, not the response's. This
//! mirrors the behavior of the deployment this proxy replaces and is kept
//! as is.

use axum::http::{header, HeaderMap, Method};

use crate::http::request::RequestMeta;

/// The only endpoint whose responses are filtered.
pub const USER_DIRECTORY_SEARCH_PATH: &str = "/_matrix/client/v3/user_directory/search";

const JSON: &str = "application/json";
const IDENTITY: &str = "identity";

/// Returns true if the response to `req` should go through the record filter.
pub fn should_filter(req: &RequestMeta, response_headers: &HeaderMap) -> bool {
    req.method == Method::POST
        && req.path == USER_DIRECTORY_SEARCH_PATH
        && req.content_type.as_ref().is_some_and(|ct| ct == JSON)
        && is_uncompressed(response_headers)
}

fn is_uncompressed(headers: &HeaderMap) -> bool {
    match headers.get(header::CONTENT_ENCODING) {
        None => true,
        Some(enc) => enc.is_empty() || enc == IDENTITY,
    }
}
