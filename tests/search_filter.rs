//! Router-level tests of the search filter middleware.
//!
//! The mock homeserver is an in-process Axum router, so no sockets are
//! involved: requests go through `tower::ServiceExt::oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    middleware, Router,
};
use tower::ServiceExt;

use matrix_search_filter::config::FilterSettings;
use matrix_search_filter::filter::{search_filter_middleware, FilterHandle, SearchFilter};

mod common;
use common::{Canned, EXAMPLE_BODY, FILTERED_BODY, LAST_MODIFIED, SEARCH_PATH, USER_ID_REGEX};

fn app(canned: Canned, last_modified: bool) -> Router {
    let filter = SearchFilter::new(&FilterSettings {
        user_id_regex: USER_ID_REGEX.into(),
        last_modified,
    })
    .unwrap();

    canned.into_router().layer(middleware::from_fn_with_state(
        FilterHandle::new(filter),
        search_filter_middleware,
    ))
}

fn request(method: Method, path: &str, content_type: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder.body(Body::from(r#"{"search_term":"a"}"#)).unwrap()
}

fn search(content_type: &str) -> Request<Body> {
    request(Method::POST, SEARCH_PATH, Some(content_type))
}

struct Case {
    desc: &'static str,
    request: Request<Body>,
    canned: Canned,
    last_modified: bool,
    exp_body: &'static str,
    exp_last_modified: bool,
}

#[tokio::test]
async fn test_serve_http() {
    let cases = vec![
        Case {
            desc: "should remove foo.example.com.bar and bar.foo",
            request: search("application/json"),
            canned: Canned::json(EXAMPLE_BODY),
            last_modified: false,
            exp_body: FILTERED_BODY,
            exp_last_modified: false,
        },
        Case {
            desc: "should not replace anything if content type is not JSON",
            request: search("text"),
            canned: Canned::json("foo is the new bar"),
            last_modified: false,
            exp_body: "foo is the new bar",
            exp_last_modified: false,
        },
        Case {
            desc: "should not replace anything if content encoding is not identity or empty",
            request: search("application/json"),
            canned: Canned::json("foo is the new bar").with_header(header::CONTENT_ENCODING, "gzip"),
            last_modified: false,
            exp_body: "foo is the new bar",
            exp_last_modified: false,
        },
        Case {
            desc: "should filter if content encoding is identity",
            request: search("application/json"),
            canned: Canned::json(EXAMPLE_BODY).with_header(header::CONTENT_ENCODING, "identity"),
            last_modified: false,
            exp_body: FILTERED_BODY,
            exp_last_modified: false,
        },
        Case {
            desc: "should filter if content encoding is empty",
            request: search("application/json"),
            canned: Canned::json(EXAMPLE_BODY).with_header(header::CONTENT_ENCODING, ""),
            last_modified: false,
            exp_body: FILTERED_BODY,
            exp_last_modified: false,
        },
        Case {
            desc: "should not remove the last modified header",
            request: search("application/json"),
            canned: Canned::json(EXAMPLE_BODY).with_header(header::CONTENT_ENCODING, "identity"),
            last_modified: true,
            exp_body: FILTERED_BODY,
            exp_last_modified: true,
        },
        Case {
            desc: "should suppress a body that is not JSON",
            request: search("application/json"),
            canned: Canned::json("not json"),
            last_modified: false,
            exp_body: "",
            exp_last_modified: false,
        },
        Case {
            desc: "should pass through a body that is not JSON when the request is not JSON",
            request: search("text/plain"),
            canned: Canned::json("not json"),
            last_modified: false,
            exp_body: "not json",
            exp_last_modified: false,
        },
        Case {
            desc: "should not filter other methods",
            request: request(Method::GET, SEARCH_PATH, Some("application/json")),
            canned: Canned::json(EXAMPLE_BODY),
            last_modified: false,
            exp_body: EXAMPLE_BODY,
            exp_last_modified: false,
        },
        Case {
            desc: "should not filter other paths",
            request: request(
                Method::POST,
                "/_matrix/client/v3/user_directory/search/",
                Some("application/json"),
            ),
            canned: Canned::json(EXAMPLE_BODY),
            last_modified: true,
            exp_body: EXAMPLE_BODY,
            exp_last_modified: true,
        },
        Case {
            desc: "should not filter without a request content type",
            request: request(Method::POST, SEARCH_PATH, None),
            canned: Canned::json(EXAMPLE_BODY),
            last_modified: false,
            exp_body: EXAMPLE_BODY,
            exp_last_modified: false,
        },
    ];

    for case in cases {
        let response = app(case.canned, case.last_modified)
            .oneshot(case.request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", case.desc);
        assert_eq!(
            response.headers().contains_key(header::LAST_MODIFIED),
            case.exp_last_modified,
            "{}: last-modified header",
            case.desc
        );
        let content_length = response.headers().get(header::CONTENT_LENGTH).cloned();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        if let Some(len) = content_length {
            assert_eq!(
                len.to_str().unwrap(),
                body.len().to_string(),
                "{}: Content-Length must describe the emitted body",
                case.desc
            );
        }
        assert_eq!(body, case.exp_body, "{}", case.desc);
    }
}

#[tokio::test]
async fn test_status_passed_through() {
    let mut canned = Canned::json(r#"{"errcode":"M_FORBIDDEN"}"#);
    canned.status = StatusCode::FORBIDDEN;

    let response = app(canned, false).oneshot(search("application/json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // Still gated in, and the error body has no results: re-encoded as empty.
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, r#"{"limited":false,"results":[]}"#);
}

#[tokio::test]
async fn test_filtered_body_keeps_content_type() {
    let response = app(Canned::json(EXAMPLE_BODY), false)
        .oneshot(search("application/json"))
        .await
        .unwrap();

    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
}

#[tokio::test]
async fn test_upgrade_response_is_not_intercepted() {
    let mut canned = Canned::json("");
    canned.status = StatusCode::SWITCHING_PROTOCOLS;

    let response = app(canned, false).oneshot(search("application/json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert!(response.headers().contains_key(header::LAST_MODIFIED));
}

#[tokio::test]
async fn test_reload_applies_to_later_requests() {
    let handle = FilterHandle::new(
        SearchFilter::new(&FilterSettings {
            user_id_regex: USER_ID_REGEX.into(),
            last_modified: false,
        })
        .unwrap(),
    );
    let app = Canned::json(EXAMPLE_BODY)
        .into_router()
        .layer(middleware::from_fn_with_state(handle.clone(), search_filter_middleware));

    handle
        .reload(&FilterSettings {
            user_id_regex: r"@hij:bar\.foo".into(),
            last_modified: true,
        })
        .unwrap();

    let response = app.oneshot(search("application/json")).await.unwrap();
    assert_eq!(response.headers()[header::LAST_MODIFIED], LAST_MODIFIED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        body,
        r#"{"limited":false,"results":[{"display_name":"HIJ","user_id":"@hij:bar.foo"}]}"#
    );
}
