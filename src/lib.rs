//! Matrix user directory search filter.
//!
//! A reverse proxy that sits in front of a Matrix homeserver and removes
//! entries from `POST /_matrix/client/v3/user_directory/search` responses
//! whose `user_id` does not match a configured allow-list pattern.

pub mod config;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use filter::{FilterHandle, SearchFilter};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
