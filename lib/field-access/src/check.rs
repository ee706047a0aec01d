use tracing::trace;

use crate::rules::{join_path, ParsedFields, QueryFields, PATH_DELIMITER, WILDCARD};

/// Diagnostics of a single depth.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldsCheck {
    /// Requested names rejected by a rule that exists for their path.
    pub invalid_fields: Vec<String>,
    /// Fields whose sub-selections were never granted by any rule.
    pub unauthorized_parents: Vec<String>,
}

impl FieldsCheck {
    pub fn is_valid(&self) -> bool {
        self.invalid_fields.is_empty() && self.unauthorized_parents.is_empty()
    }
}

/// Outcome of walking every depth of an occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthCheck {
    pub is_valid: bool,
    pub invalid_fields: Vec<String>,
    /// 1-based depth of the failing level, or the number of levels walked.
    pub depth: usize,
    pub unauthorized_parents: Vec<String>,
}

/// Replaces every segment below the root with the wildcard marker,
/// `User:posts:title` becomes `User:*:*`.
pub fn wildcard_key(key: &str) -> String {
    let mut segments = key.split(PATH_DELIMITER);
    let mut collapsed = String::with_capacity(key.len());
    collapsed.push_str(segments.next().unwrap_or_default());

    for _ in segments {
        collapsed.push(PATH_DELIMITER);
        collapsed.push_str(WILDCARD);
    }

    collapsed
}

fn trailing_segment(key: &str) -> &str {
    key.rsplit_once(PATH_DELIMITER)
        .map_or(key, |(_, field_name)| field_name)
}

/// Checks the requested fields of one depth against the rules of that depth.
///
/// `accepted_fields` is `None` when the request goes deeper than the rules.
pub fn check_fields(
    accepted_fields: Option<&ParsedFields>,
    query_fields: &QueryFields,
) -> FieldsCheck {
    check_level(accepted_fields, query_fields, None, &mut Vec::new())
}

/// Whether `key` lies below a path that a wildcard already granted.
fn is_granted(granted: &[String], key: &str) -> bool {
    granted.iter().any(|prefix| {
        key.strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with(PATH_DELIMITER))
    })
}

fn check_level(
    accepted_fields: Option<&ParsedFields>,
    query_fields: &QueryFields,
    next_query_fields: Option<&QueryFields>,
    granted: &mut Vec<String>,
) -> FieldsCheck {
    let mut check = FieldsCheck::default();

    for (query_key, requested) in query_fields {
        if is_granted(granted, query_key) {
            continue;
        }

        let collapsed_key = wildcard_key(query_key);
        let exact_rule = accepted_fields.and_then(|fields| fields.get(query_key));
        let wildcard_rule = accepted_fields.and_then(|fields| fields.get(&collapsed_key));

        // A collapsed key only restricts on its own in hand-built levels: the
        // flattened allow-list always lists `*` next to it in the parent rule,
        // which grants the whole prefix one level up.
        let Some(rule) = exact_rule.or(wildcard_rule) else {
            check
                .unauthorized_parents
                .push(trailing_segment(query_key).to_string());
            continue;
        };

        if wildcard_rule.is_some_and(|rule| rule.grants_all())
            || exact_rule.is_some_and(|rule| rule.grants_all())
        {
            granted.push(query_key.clone());
            continue;
        }

        for field_name in requested {
            if rule.permits(field_name) {
                continue;
            }

            let descends = next_query_fields
                .is_some_and(|next| next.contains_key(&join_path(query_key, field_name)));

            if !descends {
                check.invalid_fields.push(field_name.clone());
            } else if !check.unauthorized_parents.contains(field_name) {
                check.unauthorized_parents.push(field_name.clone());
            }
        }
    }

    check
}

/// Walks the levels pairwise and stops at the first depth that fails.
///
/// A wildcard grants every depth below the path it applies to. A rejected
/// field that carries its own sub-selection is reported as an unauthorized
/// parent at the depth it was requested.
pub fn check_all_fields(
    start_depth: usize,
    accepted_fields: &[ParsedFields],
    query_fields: &[QueryFields],
) -> DepthCheck {
    let mut depth = start_depth;
    let mut granted = Vec::new();

    for (index, level) in query_fields.iter().enumerate() {
        depth += 1;

        let check = check_level(
            accepted_fields.get(index),
            level,
            query_fields.get(index + 1),
            &mut granted,
        );
        trace!(depth, valid = check.is_valid(), "checked fields");

        if !check.is_valid() {
            return DepthCheck {
                is_valid: false,
                invalid_fields: check.invalid_fields,
                depth,
                unauthorized_parents: check.unauthorized_parents,
            };
        }
    }

    DepthCheck {
        is_valid: true,
        invalid_fields: Vec::new(),
        depth,
        unauthorized_parents: Vec::new(),
    }
}
