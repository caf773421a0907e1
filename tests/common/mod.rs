//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;

use matrix_search_filter::config::ProxyConfig;

pub const SEARCH_PATH: &str = "/_matrix/client/v3/user_directory/search";
pub const USER_ID_REGEX: &str = r"^@[a-z0-9\._=\-\/\+]+:example\.com$";
pub const LAST_MODIFIED: &str = "Thu, 02 Jun 2016 06:01:08 GMT";

pub const EXAMPLE_BODY: &str = r#"{
    "limited": false,
    "results": [
        {
            "user_id": "@abc:example.com",
            "display_name": "ABC",
            "avatar_url": null
        },
        {
            "user_id": "@efg_+:foo.example.com.bar",
            "display_name": "E FG",
            "avatar_url": "mxc://foo.example.com.bar/lNQvWxOnxiRINfNkcGA"
        },
        {
            "user_id": "@hij:bar.foo",
            "display_name": "HIJ"
        }
    ]
}"#;

pub const FILTERED_BODY: &str =
    r#"{"limited":false,"results":[{"display_name":"ABC","user_id":"@abc:example.com"}]}"#;

/// What a mock homeserver answers with.
#[derive(Clone, Debug)]
pub struct Canned {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: &'static str,
}

impl Canned {
    /// A JSON response carrying `Last-Modified` and an exact `Content-Length`.
    pub fn json(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![
                (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
                (header::LAST_MODIFIED, HeaderValue::from_static(LAST_MODIFIED)),
                (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
            ],
            body,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.push((name, HeaderValue::from_static(value)));
        self
    }

    pub fn into_router(self) -> Router {
        Router::new().fallback(move || {
            let canned = self.clone();
            async move {
                let mut response = (canned.status, canned.body).into_response();
                for (name, value) in canned.headers {
                    response.headers_mut().insert(name, value);
                }
                response
            }
        })
    }
}

/// Start a mock homeserver on an ephemeral port.
pub async fn start_mock_backend(canned: Canned) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = canned.into_router();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

/// A proxy config pointing at `upstream`.
pub fn proxy_config(upstream: SocketAddr, last_modified: bool) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.address = upstream.to_string();
    config.filter.user_id_regex = USER_ID_REGEX.into();
    config.filter.last_modified = last_modified;
    config
}
