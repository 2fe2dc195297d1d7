//! Documents, snapshots and write payloads.

use serde_json::{Map, Value};

/// Field map of one document.
pub type Fields = Map<String, Value>;

/// A stored document: its id within the collection plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Result set delivered to a query listener.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySnapshot {
    pub documents: Vec<Document>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// State of a single document delivered to a document listener.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    /// `None` when the document does not exist.
    pub fields: Option<Fields>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.fields.is_some()
    }

    pub fn into_document(self) -> Option<Document> {
        let id = self.id;
        self.fields.map(|fields| Document { id, fields })
    }
}

/// Whole-document write. Fields listed in `server_timestamps` are filled
/// with the store's clock (milliseconds since the Unix epoch) when applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentWrite {
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
        }
    }

    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.fields.remove(&field);
        self.server_timestamps.push(field);
        self
    }
}

impl From<Fields> for DocumentWrite {
    fn from(fields: Fields) -> Self {
        Self::new(fields)
    }
}

/// Field-level mutation applied by `update`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(Value),
    /// Adds `delta` to a numeric field; a missing or non-numeric field counts as 0.
    Increment(i64),
    /// Appends the value unless an equal element is already present.
    ArrayUnion(Value),
    /// Removes every element equal to the value.
    ArrayRemove(Value),
    ServerTimestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub op: FieldOp,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, op: FieldOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldOp::Set(value.into()))
    }

    pub fn increment(field: impl Into<String>, delta: i64) -> Self {
        Self::new(field, FieldOp::Increment(delta))
    }

    pub fn array_union(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldOp::ArrayUnion(value.into()))
    }

    pub fn array_remove(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldOp::ArrayRemove(value.into()))
    }

    /// Applies the change to `fields`. `now_millis` resolves server timestamps.
    pub(crate) fn apply(&self, fields: &mut Fields, now_millis: i64) {
        let current = fields.remove(&self.field);
        let next = match &self.op {
            FieldOp::Set(value) => value.clone(),
            FieldOp::ServerTimestamp => Value::from(now_millis),
            FieldOp::Increment(delta) => {
                let base = current.as_ref().and_then(Value::as_i64).unwrap_or(0);
                Value::from(base + delta)
            }
            FieldOp::ArrayUnion(value) => {
                let mut items = into_array(current);
                if !items.contains(value) {
                    items.push(value.clone());
                }
                Value::Array(items)
            }
            FieldOp::ArrayRemove(value) => {
                let mut items = into_array(current);
                items.retain(|item| item != value);
                Value::Array(items)
            }
        };
        fields.insert(self.field.clone(), next);
    }
}

fn into_array(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
