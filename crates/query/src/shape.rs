//! Response shaping: listing extraction and per-resource augmentation.
//!
//! Raw items are augmented as JSON and only then decoded into the caller's
//! item type, so augmentation works the same for typed and untyped clients.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::QueryError;
use crate::identifiers::{EntityId, ResourceKind};
use crate::types::{ListPayload, Listing, Meta};

/// Field holding the inverted word-position index of a work's abstract.
pub const INVERTED_INDEX_FIELD: &str = "abstract_inverted_index";

/// Derived field holding the reconstructed abstract text.
pub const ABSTRACT_FIELD: &str = "abstract";

/// Name of the n-gram sub-resource of a work.
pub const NGRAMS_SUB_RESOURCE: &str = "ngrams";

/// Shapes payloads for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseShaper {
    kind: ResourceKind,
}

impl ResponseShaper {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Applies the resource's augmentation hook to one raw item.
    ///
    /// Works gain an `abstract` field rebuilt from the inverted index (or
    /// `null` when there is none). Every other kind is returned unchanged.
    pub fn augment(&self, mut item: Value) -> Value {
        if self.kind != ResourceKind::Works {
            return item;
        }
        if let Value::Object(fields) = &mut item {
            let text = fields
                .get(INVERTED_INDEX_FIELD)
                .and_then(reconstruct_abstract)
                .map_or(Value::Null, Value::String);
            fields.insert(ABSTRACT_FIELD.to_owned(), text);
        }
        item
    }

    /// Augments and decodes one item.
    pub fn shape_item<T: DeserializeOwned>(&self, raw: Value) -> Result<T, QueryError> {
        Ok(serde_json::from_value(self.augment(raw))?)
    }

    /// Augments and decodes a batch, preserving order.
    pub fn shape_items<T: DeserializeOwned>(&self, raw: Vec<Value>) -> Result<Vec<T>, QueryError> {
        raw.into_iter().map(|item| self.shape_item(item)).collect()
    }

    /// Splits a listing payload into shaped results and metadata.
    ///
    /// Group tuples are returned unmodified when the query requested
    /// aggregation or the payload carries a non-empty `group_by`.
    pub fn shape_listing<T: DeserializeOwned>(
        &self,
        payload: Value,
        group_requested: bool,
    ) -> Result<(Listing<T>, Meta), QueryError> {
        let payload: ListPayload = serde_json::from_value(payload)?;
        if group_requested || !payload.group_by.is_empty() {
            return Ok((Listing::Groups(payload.group_by), payload.meta));
        }
        let items = self.shape_items(payload.results)?;
        Ok((Listing::Items(items), payload.meta))
    }

    /// Path of a sub-resource of `id`, keyed by the id's trailing segment.
    pub fn sub_resource_path(&self, id: &EntityId, sub_resource: &str) -> Result<String, QueryError> {
        if self.kind == ResourceKind::Works && sub_resource == NGRAMS_SUB_RESOURCE {
            Ok(format!("/{}/{}/{}", self.kind.endpoint(), id.trailing_segment(), sub_resource))
        } else {
            Err(QueryError::NoSubResource {
                resource: self.kind.to_string(),
                sub_resource: sub_resource.to_owned(),
            })
        }
    }
}

/// Rebuilds plain text from a `{word: [positions]}` index.
///
/// Returns `None` when the value is not an object (e.g. `null`).
pub fn reconstruct_abstract(index: &Value) -> Option<String> {
    let index = index.as_object()?;
    let mut placed: Vec<(u64, &str)> = index
        .iter()
        .flat_map(|(word, positions)| {
            positions
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_u64)
                .map(move |position| (position, word.as_str()))
        })
        .collect();
    placed.sort_by_key(|(position, _)| *position);
    Some(
        placed
            .into_iter()
            .map(|(_, word)| word)
            .collect::<Vec<_>>()
            .join(" "),
    )
}
