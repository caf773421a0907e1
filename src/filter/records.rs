//! User directory search payload and the record filter.
//!
//! Wire shape of `POST /_matrix/client/v3/user_directory/search` responses:
//!
//! ```text
//! { "limited": bool,
//!   "results": [ { "user_id": string, "display_name"?: string, "avatar_url"?: string } ] }
//! ```

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

use crate::filter::pattern::AllowList;

/// One user directory entry.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub avatar_url: Option<String>,

    #[serde(default, skip_serializing_if = "is_blank")]
    pub display_name: Option<String>,

    pub user_id: String,
}

/// A parsed search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Whether the homeserver capped the result set. Never recomputed here.
    #[serde(default)]
    pub limited: bool,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<UserRecord>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<UserRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<UserRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why a body could not be filtered.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("unable to decode JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unable to encode JSON body: {0}")]
    Encode(#[source] serde_json::Error),
}

/// The re-encoded body and what happened to its records.
#[derive(Debug, Clone)]
pub struct FilteredBody {
    pub body: Bytes,
    pub retained: usize,
    pub dropped: usize,
}

impl SearchResult {
    /// Drop every record whose `user_id` is not allowed, keeping the
    /// relative order of the rest. Returns how many records were dropped.
    pub fn retain_allowed(&mut self, allow: &AllowList) -> usize {
        let before = self.results.len();
        self.results.retain(|record| allow.allows(&record.user_id));
        before - self.results.len()
    }
}

/// Decode a captured search response, filter it and encode it again.
pub fn filter_body(body: &[u8], allow: &AllowList) -> Result<FilteredBody, FilterError> {
    let mut result: SearchResult = serde_json::from_slice(body).map_err(FilterError::Decode)?;

    let dropped = result.retain_allowed(allow);
    let retained = result.results.len();

    let body = serde_json::to_vec(&result).map_err(FilterError::Encode)?;

    Ok(FilteredBody {
        body: Bytes::from(body),
        retained,
        dropped,
    })
}
