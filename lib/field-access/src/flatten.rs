//! Breadth-first unrolling of nested trees into depth-aligned levels.
//!
//! Both the allow-list and the request are flattened with the same walk, so
//! level `n` of one can be compared with level `n` of the other. Keys are
//! composite paths rooted at the restricted type, e.g. `User:posts:author`.

use indexmap::IndexMap;

use crate::filter::Occurrence;
use crate::introspection::Selection;
use crate::rules::{
    join_path, AllowedFields, FieldRule, ParsedFields, ParsedRule, QueryFields, RuleEntry,
};

/// A node waiting to be flattened at the current depth.
trait Frontier: Sized {
    type Value;

    /// Produces the value stored under `key` and stages the nodes of the next depth.
    fn unfold(self, key: &str, next: &mut IndexMap<String, Self>) -> Self::Value;
}

fn flatten<F: Frontier>(root: IndexMap<String, F>) -> Vec<IndexMap<String, F::Value>> {
    let mut levels = Vec::new();
    let mut frontier = root;

    loop {
        let mut next = IndexMap::new();
        let mut level = IndexMap::with_capacity(frontier.len());

        for (key, node) in frontier {
            let value = node.unfold(&key, &mut next);
            level.insert(key, value);
        }

        levels.push(level);

        if next.is_empty() {
            return levels;
        }
        frontier = next;
    }
}

impl<'a> Frontier for &'a FieldRule {
    type Value = ParsedRule;

    fn unfold(self, key: &str, next: &mut IndexMap<String, Self>) -> ParsedRule {
        let entries = match self {
            FieldRule::Name(name) => return ParsedRule::Name(name.clone()),
            FieldRule::List(entries) => entries,
        };

        let mut names = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                RuleEntry::Field(name) => names.push(name.clone()),
                RuleEntry::Nested(nested) => {
                    // A nested rule grants the field itself as well.
                    for (field_name, rule) in nested.iter() {
                        names.push(field_name.to_string());
                        next.insert(join_path(key, field_name), rule);
                    }
                }
            }
        }

        ParsedRule::List(names)
    }
}

/// Selections found under one path key. Sibling fields with the same name
/// share a key, so their sub-selections are concatenated.
#[derive(Default)]
struct SelectionFrontier<'a>(Vec<&'a Selection>);

impl<'a> Frontier for SelectionFrontier<'a> {
    type Value = Vec<String>;

    fn unfold(self, key: &str, next: &mut IndexMap<String, Self>) -> Vec<String> {
        let mut names = Vec::with_capacity(self.0.len());

        for selection in self.0 {
            names.push(selection.name.clone());
            if selection.has_selections() {
                next.entry(join_path(key, &selection.name))
                    .or_default()
                    .0
                    .extend(selection.selections.iter());
            }
        }

        names
    }
}

/// Flattens the allow-list, one [`ParsedFields`] per depth.
pub fn flatten_allowed_fields(fields: &AllowedFields) -> Vec<ParsedFields> {
    let root = fields
        .iter()
        .map(|(type_name, rule)| (type_name.to_string(), rule))
        .collect::<IndexMap<_, _>>();

    flatten(root)
}

/// Flattens the selections of an occurrence, one [`QueryFields`] per depth.
pub fn flatten_selections(occurrence: &Occurrence<'_>) -> Vec<QueryFields> {
    let mut root = IndexMap::with_capacity(1);
    root.insert(
        occurrence.type_name.clone(),
        SelectionFrontier(occurrence.selections.iter().collect()),
    );

    flatten(root)
}
