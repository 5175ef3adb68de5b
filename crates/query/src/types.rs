//! Shared value types: timestamps, response metadata and shaped results.
//!
//! Response schemas for individual resource kinds are deliberately not
//! modelled here; items travel as [`serde_json::Value`] until the caller
//! decodes them into its own type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// The Unix epoch; the "never active" timestamp.
    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Milliseconds elapsed from `self` to `later` (negative if `later` is
    /// earlier).
    pub fn millis_until(self, later: Timestamp) -> i64 {
        (later.0 - self.0).num_milliseconds()
    }

    /// Returns this timestamp shifted `millis` milliseconds into the past.
    #[must_use]
    pub fn minus_millis(self, millis: i64) -> Self {
        Self(self.0 - chrono::Duration::milliseconds(millis))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Response metadata
// ---------------------------------------------------------------------------

/// The `meta` block of a listing response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Total number of matching records.
    #[serde(default)]
    pub count: u64,

    /// Cursor for the next page in cursor-mode traversal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_response_time_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_count: Option<u64>,
}

/// One aggregated `{key, count, …}` record of a `group_by` response.
///
/// Fields other than `key`, `key_display_name` and `count` are preserved in
/// `extra` so tuples are returned unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByTuple {
    pub key: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_display_name: Option<String>,

    pub count: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The raw body of a listing response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPayload {
    #[serde(default)]
    pub results: Vec<Value>,

    #[serde(default)]
    pub meta: Meta,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub group_by: Vec<GroupByTuple>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<GroupByTuple>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<GroupByTuple>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Shaped results
// ---------------------------------------------------------------------------

/// The result of a listing request: shaped items, or group tuples when the
/// query aggregated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Items(Vec<T>),
    Groups(Vec<GroupByTuple>),
}

impl<T> Listing<T> {
    /// Returns the items, or `None` for a grouped listing.
    pub fn into_items(self) -> Option<Vec<T>> {
        match self {
            Self::Items(items) => Some(items),
            Self::Groups(_) => None,
        }
    }

    /// Returns the group tuples, or `None` for an item listing.
    pub fn into_groups(self) -> Option<Vec<GroupByTuple>> {
        match self {
            Self::Items(_) => None,
            Self::Groups(groups) => Some(groups),
        }
    }

    /// Number of items or tuples.
    pub fn len(&self) -> usize {
        match self {
            Self::Items(items) => items.len(),
            Self::Groups(groups) => groups.len(),
        }
    }

    /// Returns `true` if the listing holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A listing together with its response metadata.
///
/// Serialises as `{"results": […], "meta": {…}}` or
/// `{"group_by": […], "meta": {…}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithMeta<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<T>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<GroupByTuple>>,

    pub meta: Meta,
}

impl<T> WithMeta<T> {
    /// Builds the envelope from a shaped listing.
    pub fn new(listing: Listing<T>, meta: Meta) -> Self {
        match listing {
            Listing::Items(items) => Self {
                results: Some(items),
                group_by: None,
                meta,
            },
            Listing::Groups(groups) => Self {
                results: None,
                group_by: Some(groups),
                meta,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Autocomplete
// ---------------------------------------------------------------------------

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteHit {
    pub id: String,
    pub display_name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `GET /autocomplete/<resource>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    #[serde(default)]
    pub results: Vec<AutocompleteHit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_payload_tolerates_missing_and_null_fields() {
        let payload: ListPayload =
            serde_json::from_value(json!({ "meta": { "count": 3 }, "group_by": null })).unwrap();
        assert!(payload.results.is_empty());
        assert!(payload.group_by.is_empty());
        assert_eq!(payload.meta.count, 3);
        assert_eq!(payload.meta.next_cursor, None);
    }

    #[test]
    fn group_tuple_keeps_unknown_fields() {
        let raw = json!({ "key": "US", "key_display_name": "United States", "count": 7, "share": 0.4 });
        let tuple: GroupByTuple = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(tuple.count, 7);
        assert_eq!(serde_json::to_value(&tuple).unwrap(), raw);
    }

    #[test]
    fn with_meta_serialises_results_or_group_by() {
        let meta = Meta {
            count: 1,
            ..Meta::default()
        };
        let items = WithMeta::new(Listing::Items(vec![json!({ "id": "W1" })]), meta.clone());
        let value = serde_json::to_value(&items).unwrap();
        assert!(value.get("results").is_some());
        assert!(value.get("group_by").is_none());

        let groups: WithMeta<Value> = WithMeta::new(Listing::Groups(vec![]), meta);
        let value = serde_json::to_value(&groups).unwrap();
        assert!(value.get("results").is_none());
        assert!(value.get("group_by").is_some());
    }

    #[test]
    fn millis_until_measures_age() {
        let now = Timestamp::now();
        assert_eq!(now.minus_millis(1500).millis_until(now), 1500);
        assert!(Timestamp::epoch().millis_until(now) > 0);
    }
}
