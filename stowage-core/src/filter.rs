//! Exact-match filters for record enumeration.
//!
//! A [`Filter`] is a conjunction of `field == value` conditions on the
//! top-level fields of a stored payload. There is no query language beyond
//! that.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Payload;

/// Single equality condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    /// Top-level payload field
    pub field: String,
    /// Value the field must equal
    pub value: Value,
}

/// Conjunction of equality conditions.
///
/// The empty filter matches every record and counts as an unfiltered
/// enumeration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    conditions: Vec<FieldMatch>,
}

impl Filter {
    /// Filter matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(FieldMatch {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Build a filter from every field of a JSON object.
    pub fn from_object(object: Payload) -> Self {
        let conditions = object
            .into_iter()
            .map(|(field, value)| FieldMatch { field, value })
            .collect();
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[FieldMatch] {
        &self.conditions
    }

    /// Check a stored payload against every condition.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.conditions
            .iter()
            .all(|c| payload.get(&c.field) == Some(&c.value))
    }

    /// Render the conditions as a JSON object, for containment queries.
    pub fn to_object(&self) -> Payload {
        self.conditions
            .iter()
            .map(|c| (c.field.clone(), c.value.clone()))
            .collect()
    }
}
