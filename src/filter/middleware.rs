//! Per-request orchestration of the search filter.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};

use crate::config::{ConfigError, FilterSettings};
use crate::filter::gate::should_filter;
use crate::filter::pattern::AllowList;
use crate::filter::records::filter_body;
use crate::http::request::RequestMeta;
use crate::http::response::{replay, BufferingResponse, ReplayError};
use crate::http::sink::{ResponseSink, ResponseWriter};
use crate::observability::metrics;

/// What happened to one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The gate did not apply; the body was written unchanged.
    Passthrough,
    /// The body was filtered and re-encoded.
    Filtered { retained: usize, dropped: usize },
    /// The body could not be decoded or encoded; nothing was written.
    Suppressed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passthrough => "passthrough",
            Outcome::Filtered { .. } => "filtered",
            Outcome::Suppressed => "suppressed",
        }
    }
}

/// An immutable filter instance: compiled allow-list plus header policy.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    allow: AllowList,
    keep_last_modified: bool,
}

impl SearchFilter {
    /// Build a filter. Fails if the pattern does not compile.
    pub fn new(settings: &FilterSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            allow: AllowList::compile(&settings.user_id_regex)?,
            keep_last_modified: settings.last_modified,
        })
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    pub fn keeps_last_modified(&self) -> bool {
        self.keep_last_modified
    }

    /// Capture `upstream` through a buffering wrapper around `sink`, then
    /// write either the original or the filtered body to `sink`.
    ///
    /// On a decode or encode failure the head has already been committed and
    /// no body is written at all.
    pub async fn intercept<W>(
        &self,
        meta: &RequestMeta,
        upstream: Response<Body>,
        sink: &mut W,
    ) -> Result<Outcome, ReplayError>
    where
        W: ResponseSink + ?Sized,
    {
        let mut wrapped = BufferingResponse::new(&mut *sink, self.keep_last_modified);
        replay(upstream, &mut wrapped).await?;
        let captured = wrapped.into_captured();

        if !should_filter(meta, sink.headers()) {
            sink.write(&captured)?;
            return Ok(Outcome::Passthrough);
        }

        match filter_body(&captured, &self.allow) {
            Ok(filtered) => {
                sink.write(&filtered.body)?;
                Ok(Outcome::Filtered {
                    retained: filtered.retained,
                    dropped: filtered.dropped,
                })
            }
            Err(e) => {
                tracing::error!(
                    request_id = %meta.request_id(),
                    error = %e,
                    "Search response suppressed"
                );
                Ok(Outcome::Suppressed)
            }
        }
    }

    /// Run the rest of the stack for `req` and return the rewritten response.
    pub async fn serve(&self, req: Request, next: Next) -> Response<Body> {
        let meta = RequestMeta::from_request(&req);
        let upstream = next.run(req).await;

        // Upgraded connections are never buffered.
        if upstream.status() == StatusCode::SWITCHING_PROTOCOLS {
            return upstream;
        }

        let mut writer = ResponseWriter::new();
        match self.intercept(&meta, upstream, &mut writer).await {
            Ok(outcome) => {
                metrics::record_filter_outcome(outcome.label());
                if let Outcome::Filtered { retained, dropped } = outcome {
                    metrics::record_records_dropped(dropped);
                    tracing::debug!(
                        request_id = %meta.request_id(),
                        retained,
                        dropped,
                        "Search results filtered"
                    );
                }
                writer.into_response()
            }
            Err(e) => {
                tracing::error!(
                    request_id = %meta.request_id(),
                    path = %meta.path,
                    error = %e,
                    "Failed to capture upstream response"
                );
                metrics::record_filter_outcome("upstream_error");
                (StatusCode::BAD_GATEWAY, "Upstream response failed").into_response()
            }
        }
    }
}

/// Shared handle to the current filter instance.
///
/// Each request loads the instance current at its start and keeps it for
/// its whole lifetime; a reload only affects requests that start later.
#[derive(Debug, Clone)]
pub struct FilterHandle {
    current: Arc<ArcSwap<SearchFilter>>,
}

impl FilterHandle {
    pub fn new(filter: SearchFilter) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(filter)),
        }
    }

    /// The filter instance in effect now.
    pub fn load(&self) -> Arc<SearchFilter> {
        self.current.load_full()
    }

    /// Replace the filter. On error the current instance stays in place.
    pub fn reload(&self, settings: &FilterSettings) -> Result<(), ConfigError> {
        let filter = SearchFilter::new(settings)?;
        self.current.store(Arc::new(filter));
        tracing::info!(
            pattern = %settings.user_id_regex,
            last_modified = settings.last_modified,
            "Search filter reloaded"
        );
        Ok(())
    }
}

/// Axum middleware applying the current search filter.
pub async fn search_filter_middleware(
    State(handle): State<FilterHandle>,
    req: Request,
    next: Next,
) -> Response<Body> {
    handle.load().serve(req, next).await
}
