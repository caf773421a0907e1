//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, request snapshot)
//!     → [search filter] wraps the real sink (sink.rs) in response.rs
//!     → server.rs forwards to the upstream homeserver
//!     → response.rs captures the upstream body
//!     → final body written to the client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod sink;

pub use request::{MakeRequestUuidV4, RequestMeta, X_REQUEST_ID};
pub use response::{replay, BufferingResponse, ReplayError};
pub use server::HttpServer;
pub use sink::{Flush, ResponseSink, ResponseWriter, SinkError, Takeover};
