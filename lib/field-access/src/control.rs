use tracing::{debug, debug_span, warn};

use crate::check::check_all_fields;
use crate::error::AccessViolation;
use crate::filter::{filter_allowed_fields, relevant_occurrences};
use crate::flatten::{flatten_allowed_fields, flatten_selections};
use crate::introspection::ResolveInfo;
use crate::rules::AllowedFields;

/// Verifies that the field being resolved only selects what the allow-list grants.
///
/// Types missing from the allow-list are not restricted. Every occurrence of
/// the field in the operation is checked, and the first violation found is
/// returned. Unauthorized parents are reported before invalid fields.
pub fn access_control<I: ResolveInfo + ?Sized>(
    info: &I,
    fields: &AllowedFields,
) -> Result<(), AccessViolation> {
    let span = debug_span!("field_access_control", field = info.path_key());
    let _guard = span.enter();

    let relevant_queries = relevant_occurrences(info, fields);
    if relevant_queries.is_empty() {
        debug!("no restricted selections, skipping");
        return Ok(());
    }

    let filtered_fields = filter_allowed_fields(info, fields);
    let parsed_fields = flatten_allowed_fields(&filtered_fields);

    for occurrence in &relevant_queries {
        let parsed_queries = flatten_selections(occurrence);
        let result = check_all_fields(0, &parsed_fields, &parsed_queries);

        if result.is_valid {
            continue;
        }

        let violation = if !result.unauthorized_parents.is_empty() {
            AccessViolation::UnauthorizedParent {
                fields: result.unauthorized_parents,
                depth: result.depth,
                parent: occurrence.parent.clone(),
            }
        } else {
            AccessViolation::InvalidFields {
                fields: result.invalid_fields,
                depth: result.depth,
                parent: occurrence.parent.clone(),
            }
        };

        warn!(
            type_name = occurrence.type_name.as_str(),
            depth = violation.depth(),
            "{}",
            violation
        );
        return Err(violation);
    }

    debug!(
        occurrences = relevant_queries.len(),
        "all restricted selections are allowed"
    );
    Ok(())
}
