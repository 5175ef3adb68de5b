//! Newtype identifiers and the closed set of resource kinds.
//!
//! Entity identifiers arrive either bare (`"W2741809807"`) or as full
//! identifier URLs (`"https://openalex.org/W2741809807"`); [`EntityId`]
//! accepts both and exposes the trailing segment used in request paths.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// String-backed identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a single entity (work, author, …) by bare id or full URL.
    EntityId
}

impl EntityId {
    /// Returns the last `/`-separated segment of the identifier.
    ///
    /// `"https://openalex.org/W123"` and `"W123"` both yield `"W123"`.
    pub fn trailing_segment(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.0)
    }
}

string_id! {
    /// The name of the query parameter that carries a field-scoped search
    /// term (e.g. `"title.search"`).
    SearchField
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers
// ---------------------------------------------------------------------------

/// Identifies one pagination run.
///
/// Generated fresh for every `paginate()` call and recorded on every log
/// event of that run so the requests of one traversal can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationRunId(Uuid);

impl PaginationRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for PaginationRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// The resource collections exposed by the API.
///
/// Every kind shares the same engine; only [`ResourceKind::Works`] carries
/// per-item augmentation and a sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Works,
    Authors,
    Sources,
    Institutions,
    Topics,
    Keywords,
    Publishers,
    Funders,
}

impl ResourceKind {
    /// All kinds, in registry order.
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Works,
        ResourceKind::Authors,
        ResourceKind::Sources,
        ResourceKind::Institutions,
        ResourceKind::Topics,
        ResourceKind::Keywords,
        ResourceKind::Publishers,
        ResourceKind::Funders,
    ];

    /// The endpoint path segment for this kind (e.g. `"works"`).
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Works => "works",
            Self::Authors => "authors",
            Self::Sources => "sources",
            Self::Institutions => "institutions",
            Self::Topics => "topics",
            Self::Keywords => "keywords",
            Self::Publishers => "publishers",
            Self::Funders => "funders",
        }
    }

    /// Position of this kind in [`ResourceKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_segment_of_url_and_bare_id() {
        let url = EntityId::new("https://openalex.org/W2741809807").unwrap();
        let bare = EntityId::new("W2741809807").unwrap();
        assert_eq!(url.trailing_segment(), "W2741809807");
        assert_eq!(bare.trailing_segment(), "W2741809807");
    }

    #[test]
    fn empty_identifier_is_rejected() {
        assert!(EntityId::new("").is_none());
    }

    #[test]
    fn kinds_index_matches_registry_order() {
        for (position, kind) in ResourceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }
}
