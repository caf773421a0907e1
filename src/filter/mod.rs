//! User directory search filtering.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → middleware.rs (snapshot request, run the rest of the stack)
//!     → http::response (buffer upstream body, rewrite headers once)
//!     → gate.rs (POST + search path + JSON request + uncompressed response?)
//!         no  → captured body written unchanged
//!         yes → records.rs (decode, drop disallowed user_ids, encode)
//!                 error → nothing written (fail closed)
//! ```
//!
//! # Design Decisions
//! - A filter instance is immutable; reloads build and swap a new one
//! - Allow-list patterns always match the whole identifier
//! - `limited` is passed through untouched even when records are dropped

pub mod gate;
pub mod middleware;
pub mod pattern;
pub mod records;

pub use middleware::{search_filter_middleware, FilterHandle, Outcome, SearchFilter};
pub use pattern::AllowList;
pub use records::{filter_body, FilterError, SearchResult, UserRecord};
