//! Record <-> document conversion.

use std::fmt::Display;

use doc_store::{Document, Fields};
use news_model::schema::fields;
use news_model::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Decodes a record, taking its `id` from the document id.
pub(crate) fn decode<T: DeserializeOwned>(document: &Document) -> Result<T, serde_json::Error> {
    let mut record = document.fields.clone();
    record.insert(fields::ID.to_string(), Value::String(document.id.clone()));
    serde_json::from_value(Value::Object(record))
}

/// Decodes every document, skipping the ones that do not fit `T`.
pub(crate) fn decode_all<T: DeserializeOwned>(documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|document| match decode(document) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(id = %document.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// `Error` carrying the failure's text, or `fallback` when it has none.
pub(crate) fn failure<T>(error: impl Display, fallback: &str) -> Resource<T> {
    let message = error.to_string();
    if message.trim().is_empty() {
        Resource::Error(fallback.to_string())
    } else {
        Resource::Error(message)
    }
}
