//! Query description and evaluation.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{Document, Fields};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field == value`
    Eq(String, Value),
    /// `field` equals one of the values.
    In(String, Vec<Value>),
}

impl Filter {
    fn field(&self) -> &str {
        match self {
            Filter::Eq(field, _) | Filter::In(field, _) => field,
        }
    }

    fn matches(&self, id: &str, fields: &Fields) -> bool {
        let id_value;
        let actual = match fields.get(self.field()) {
            Some(value) => value,
            // `id` falls back to the document id when the field is not stored.
            None if self.field() == "id" => {
                id_value = Value::String(id.to_string());
                &id_value
            }
            None => return false,
        };
        match self {
            Filter::Eq(_, expected) => actual == expected,
            Filter::In(_, candidates) => candidates.contains(actual),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filters are ANDed. Without an order, results come back in document id
/// order. With an order, documents lacking the order field are excluded and
/// ties are broken by document id in the same direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn where_in<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(field.into(), values));
        self
    }

    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.order_by(field, Direction::Descending)
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Largest value list carried by any `in` filter.
    pub fn max_in_values(&self) -> usize {
        self.filters
            .iter()
            .map(|filter| match filter {
                Filter::In(_, values) => values.len(),
                Filter::Eq(..) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn matches(&self, id: &str, fields: &Fields) -> bool {
        let ordered = match &self.order {
            Some(order) => fields.contains_key(&order.field),
            None => true,
        };
        ordered && self.filters.iter().all(|filter| filter.matches(id, fields))
    }

    /// Evaluates the query over `(id, fields)` pairs.
    pub(crate) fn evaluate<'a>(
        &self,
        documents: impl Iterator<Item = (&'a String, &'a Fields)>,
    ) -> Vec<Document> {
        let mut matched: Vec<Document> = documents
            .filter(|(id, fields)| self.matches(id, fields))
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect();

        if let Some(order) = &self.order {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.field), b.get(&order.field))
                    .then_with(|| a.id.cmp(&b.id));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        matched
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                match (x.as_i64(), y.as_i64()) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => {
                        let x = x.as_f64().unwrap_or(f64::NAN);
                        let y = y.as_f64().unwrap_or(f64::NAN);
                        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                    }
                }
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (a, b) => rank(a).cmp(&rank(b)),
        },
    }
}
