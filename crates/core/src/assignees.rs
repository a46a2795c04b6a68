//! Team member assignment sets.
//!
//! `assigned_to` and `members` arrive in several shapes: a comma-joined
//! string, a JSON array (or a string containing one), or a JSON object whose
//! keys are member ids. [`AssigneeSet`] is the single typed representation;
//! every shape is parsed here and nowhere else.

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Separator used when an assignee set crosses the storage boundary.
pub const STORAGE_SEPARATOR: char = ',';

/// Ordered, deduplicated set of team-member identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeSet(IndexSet<String>);

impl AssigneeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse any of the accepted textual shapes.
    ///
    /// A string that looks like JSON (`[...]` or `{...}`) is decoded as JSON;
    /// if decoding fails it falls back to comma splitting.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                return Self::from_value(&value);
            }
        }
        trimmed.split(STORAGE_SEPARATOR).collect()
    }

    /// Build a set from an already-decoded JSON value.
    ///
    /// Numbers are stringified; nulls, booleans, and empty strings are
    /// dropped.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => std::iter::once(n.to_string()).collect(),
            Value::Array(items) => items.iter().filter_map(member_id).collect(),
            Value::Object(map) => map.keys().map(String::as_str).collect(),
            Value::Null | Value::Bool(_) => Self::default(),
        }
    }

    /// Join members with [`STORAGE_SEPARATOR`] for persistence.
    pub fn to_storage(&self) -> String {
        self.0
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&STORAGE_SEPARATOR.to_string())
    }

    pub fn insert(&mut self, member: impl Into<String>) -> bool {
        let member = member.into();
        let member = member.trim();
        if member.is_empty() {
            return false;
        }
        self.0.insert(member.to_string())
    }

    pub fn contains(&self, member: &str) -> bool {
        self.0.contains(member)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn member_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl<S: Into<String>> FromIterator<S> for AssigneeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for member in iter {
            set.insert(member);
        }
        set
    }
}

impl Serialize for AssigneeSet {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AssigneeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}
