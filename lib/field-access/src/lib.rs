//! Field-level access control for GraphQL operations.
//!
//! The allow-list describes, per returned object type, which fields and
//! nested sub-fields callers may request. For every resolved field the engine:
//! 1. **Filters** - keeps only the selections returning a restricted type
//! 2. **Flattens** - unrolls rules and selections into depth-aligned levels
//! 3. **Checks** - compares the levels depth by depth, first violation wins
//!
//! Types that are not part of the allow-list are never restricted.

#[cfg(test)]
mod testkit;
#[cfg(test)]
mod tests;

pub mod check;
pub mod control;
pub mod document;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod introspection;
pub mod middleware;
pub mod rules;

pub use control::access_control;
pub use document::{resolve_operation, DocumentError, ResolvedOperation, SchemaRootFields};
pub use error::{AccessViolation, GraphQLError};
pub use introspection::{FieldResolveInfo, ResolveInfo, Selection};
pub use middleware::{secure, FieldAccessMiddleware};
pub use rules::{AllowedFields, FieldRule, RuleEntry};
