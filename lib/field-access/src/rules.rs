use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Marker granting every field and, transitively, every sub-field.
pub const WILDCARD: &str = "*";

/// Delimiter used to build composite path keys (`User:posts:title`).
pub const PATH_DELIMITER: char = ':';

/// Allow-list of fields, keyed by the name of the restricted type.
///
/// Types that are not listed here are not restricted at all.
///
/// ```yaml
/// User:
///   - id
///   - posts:
///       - title
/// Post: "*"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AllowedFields(IndexMap<String, FieldRule>);

impl AllowedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, type_name: impl Into<String>, rule: FieldRule) -> Self {
        self.0.insert(type_name.into(), rule);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&FieldRule> {
        self.0.get(type_name)
    }

    pub fn contains_type(&self, type_name: &str) -> bool {
        self.0.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.0.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldRule)> for AllowedFields {
    fn from_iter<I: IntoIterator<Item = (K, FieldRule)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// What a caller may request on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FieldRule {
    /// A single field name, or [`WILDCARD`].
    Name(String),
    /// Bare field names and nested rules, in declaration order.
    List(Vec<RuleEntry>),
}

impl FieldRule {
    pub fn wildcard() -> Self {
        FieldRule::Name(WILDCARD.to_string())
    }

    pub fn fields<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<RuleEntry>,
    {
        FieldRule::List(entries.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// Grants the field without looking at its sub-selections.
    Field(String),
    /// Grants every key of the map, and restricts each one's sub-selections
    /// to the nested rule.
    Nested(AllowedFields),
}

impl RuleEntry {
    pub fn nested(field_name: impl Into<String>, rule: FieldRule) -> Self {
        RuleEntry::Nested(AllowedFields::new().with_rule(field_name, rule))
    }
}

impl From<&str> for RuleEntry {
    fn from(value: &str) -> Self {
        RuleEntry::Field(value.to_string())
    }
}

impl From<String> for RuleEntry {
    fn from(value: String) -> Self {
        RuleEntry::Field(value)
    }
}

impl From<AllowedFields> for RuleEntry {
    fn from(value: AllowedFields) -> Self {
        RuleEntry::Nested(value)
    }
}

/// Flattened rule value stored under a composite path key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRule {
    Name(String),
    List(Vec<String>),
}

impl ParsedRule {
    /// True when the rule is, or contains, the wildcard marker.
    pub fn grants_all(&self) -> bool {
        match self {
            ParsedRule::Name(name) => name == WILDCARD,
            ParsedRule::List(names) => names.iter().any(|name| name == WILDCARD),
        }
    }

    pub fn permits(&self, field_name: &str) -> bool {
        match self {
            ParsedRule::Name(name) => name == field_name,
            ParsedRule::List(names) => names.iter().any(|name| name == field_name),
        }
    }
}

impl fmt::Display for ParsedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedRule::Name(name) => write!(f, "{}", name),
            ParsedRule::List(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

/// One depth of the flattened rule tree.
pub type ParsedFields = IndexMap<String, ParsedRule>;

/// One depth of the flattened request, path key to requested field names.
pub type QueryFields = IndexMap<String, Vec<String>>;

pub(crate) fn join_path(parent_key: &str, field_name: &str) -> String {
    let mut key = String::with_capacity(parent_key.len() + field_name.len() + 1);
    key.push_str(parent_key);
    key.push(PATH_DELIMITER);
    key.push_str(field_name);
    key
}
