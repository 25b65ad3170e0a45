//! Directory operation types
//!
//! Attribute sets, modification deltas, search scopes, and the filter AST.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attributes of one directory entry, as added or as returned by a search.
///
/// Attribute names are matched case-insensitively, the way directory
/// servers treat them; the spelling of the first insert is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    #[serde(flatten)]
    attributes: HashMap<String, AttributeValue>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self {
            attributes: HashMap::new(),
        }
    }

    fn key_for(&self, name: &str) -> Option<String> {
        self.attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Set an attribute value, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let key = self.key_for(&name).unwrap_or(name);
        self.attributes.insert(key, value.into());
    }

    /// Set an attribute using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Get a single-valued string attribute (first value when multi-valued).
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::first_string)
    }

    /// Get an attribute parsed as a signed integer.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            AttributeValue::Integer(i) => Some(*i),
            other => other.first_string().and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Get a multi-valued string attribute.
    pub fn get_strings(&self, name: &str) -> Vec<&str> {
        self.get(name).map(|v| v.as_strings()).unwrap_or_default()
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let key = self.key_for(name)?;
        self.attributes.remove(&key)
    }

    /// Get all attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|s| s.as_str())
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        let mut set = AttributeSet::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}

/// A value for an attribute, which may be single or multi-valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// No value.
    Null,
    /// A single string value.
    String(String),
    /// A single integer value.
    Integer(i64),
    /// A single boolean value.
    Boolean(bool),
    /// Binary data, e.g. `unicodePwd`.
    Binary(Vec<u8>),
    /// Multiple values.
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Get as a string if this is a single string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The single string value, or the first string of a multi-valued attribute.
    pub fn first_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Array(arr) => arr.iter().find_map(|v| v.as_string()),
            _ => None,
        }
    }

    /// Get as strings (works for both single and multi-valued).
    pub fn as_strings(&self) -> Vec<&str> {
        match self {
            AttributeValue::String(s) => vec![s.as_str()],
            AttributeValue::Array(arr) => arr.iter().filter_map(|v| v.as_string()).collect(),
            _ => vec![],
        }
    }

    /// Render every value the way it travels on the LDAP wire.
    pub fn to_wire_values(&self) -> Vec<Vec<u8>> {
        match self {
            AttributeValue::Null => vec![],
            AttributeValue::String(s) => vec![s.as_bytes().to_vec()],
            AttributeValue::Integer(i) => vec![i.to_string().into_bytes()],
            AttributeValue::Boolean(b) => {
                vec![if *b { b"TRUE".to_vec() } else { b"FALSE".to_vec() }]
            }
            AttributeValue::Binary(bytes) => vec![bytes.clone()],
            AttributeValue::Array(arr) => arr.iter().flat_map(|v| v.to_wire_values()).collect(),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<u32> for AttributeValue {
    fn from(i: u32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttributeValue::Binary(bytes)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(vec: Vec<&str>) -> Self {
        AttributeValue::Array(vec.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(vec: Vec<String>) -> Self {
        AttributeValue::Array(vec.into_iter().map(Into::into).collect())
    }
}

/// Changes to apply to an entry in one modify request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeDelta {
    /// Attributes to replace entirely.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub replace: HashMap<String, AttributeValue>,
}

impl AttributeDelta {
    /// Create a new empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an attribute value entirely.
    pub fn replace(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> &mut Self {
        self.replace.insert(name.into(), value.into());
        self
    }

    /// Builder form of [`AttributeDelta::replace`].
    #[must_use]
    pub fn with_replace(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.replace(name, value);
        self
    }

    /// The replacement staged for `name`, if any.
    pub fn replaced(&self, name: &str) -> Option<&AttributeValue> {
        self.replace
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Check if this delta has any changes.
    pub fn is_empty(&self) -> bool {
        self.replace.is_empty()
    }

    /// Get all affected attribute names, sorted.
    pub fn affected_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.replace.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Search scope relative to the base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry itself.
    Base,
    /// Immediate children of the base entry.
    OneLevel,
    /// The base entry and its whole subtree.
    Subtree,
}

/// Filter for search operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Match entries where attribute equals value.
    Equals { attribute: String, value: String },

    /// Match entries where attribute exists.
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },

    /// Logical NOT of a filter.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a present (attribute exists) filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }
}
