//! Lossless text encoding of items and item arrays.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::QueryError;

/// Encodes an item (or a slice/`Vec` of items) as JSON text.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<String, QueryError> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes JSON text produced by [`serialize`].
pub fn deserialize<T: DeserializeOwned>(text: &str) -> Result<T, QueryError> {
    Ok(serde_json::from_str(text)?)
}
