//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (request ID, tracing, timeout, search filter)
//! - Bind server to listener, shut down gracefully
//! - Forward every request to the upstream homeserver

use std::str::FromStr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Response, StatusCode, Uri, Version,
    },
    middleware,
    response::IntoResponse,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, ProxyConfig, ValidationError};
use crate::filter::{search_filter_middleware, FilterHandle, SearchFilter};
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Application state injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// HTTP server for the filtering proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    filter: FilterHandle,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the allow-list pattern or the upstream address is invalid;
    /// no request is ever served by a misconfigured filter.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let filter = FilterHandle::new(SearchFilter::new(&config.filter)?);

        let upstream = Authority::from_str(&config.upstream.address).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::UpstreamAddress(
                config.upstream.address.clone(),
            )])
        })?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState { client, upstream };
        let router = Self::build_router(&config, state, filter.clone());

        Ok(Self {
            router,
            config,
            filter,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: set request ID → trace → propagate request ID →
    /// timeout → search filter → forward.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, filter: FilterHandle) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(filter, search_filter_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Handle for swapping the search filter at runtime.
    pub fn filter(&self) -> FilterHandle {
        self.filter.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Forwarding handler: sends the request to the upstream and streams the
/// response back.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response<Body> {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Cannot rewrite request URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };
    parts.version = Version::HTTP_11;

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start_time);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_request(&method, StatusCode::BAD_GATEWAY.as_u16(), start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
