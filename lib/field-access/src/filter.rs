use crate::introspection::{ResolveInfo, Selection};
use crate::rules::AllowedFields;

/// One appearance of the resolving field in the operation.
///
/// A field can be selected several times under different aliases, each one
/// is authorized on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'a> {
    /// Bare name of the restricted type returned by the field.
    pub type_name: String,
    /// Immediate sub-selections of this appearance.
    pub selections: &'a [Selection],
    /// Invocation key of the resolving field, used in diagnostics only.
    pub parent: String,
}

/// Strips list and non-null decorations (`[`, `]`, `!`) from the return type.
pub fn parse_return_type<I: ResolveInfo + ?Sized>(info: &I) -> String {
    info.return_type()
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '!'))
        .collect()
}

/// Names of the types restricted by the allow-list.
pub fn restricted_types(fields: &AllowedFields) -> Vec<&str> {
    fields.type_names().collect()
}

/// Finds the selections of the operation that resolve restricted data for the
/// current field. Returns nothing when the returned type is not restricted.
pub fn relevant_occurrences<'a, I: ResolveInfo + ?Sized>(
    info: &'a I,
    fields: &AllowedFields,
) -> Vec<Occurrence<'a>> {
    let return_type = parse_return_type(info);
    if !restricted_types(fields).contains(&return_type.as_str()) {
        return Vec::new();
    }

    let query_name = info.path_key();

    info.operation_selections()
        .iter()
        .filter(|selection| {
            selection.alias.as_deref() == Some(query_name) || selection.name == query_name
        })
        .map(|selection| Occurrence {
            type_name: return_type.clone(),
            selections: &selection.selections,
            parent: query_name.to_string(),
        })
        .collect()
}

/// Narrows the allow-list to the entry of the returned type, so flattening
/// never walks unrelated rules.
pub fn filter_allowed_fields<I: ResolveInfo + ?Sized>(
    info: &I,
    fields: &AllowedFields,
) -> AllowedFields {
    let return_type = parse_return_type(info);
    fields
        .iter()
        .filter(|(type_name, _)| *type_name == return_type)
        .map(|(type_name, rule)| (type_name, rule.clone()))
        .collect()
}
