//! Request introspection for parsed GraphQL documents.
//!
//! Hosts that do not expose resolver info of their own can parse the schema
//! and the incoming operation here, and get one [`ResolveInfo`] per root
//! field, the same way a resolver chain would invoke them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use graphql_parser::query::{self as query_ast, Definition, OperationDefinition};
use graphql_parser::schema::{self as schema_ast, TypeDefinition, TypeExtension};
use tracing::debug;

use crate::introspection::{ResolveInfo, Selection};

/// Upper bound of field selections collected once every fragment is inlined.
pub const MAX_EXPANDED_SELECTIONS: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to parse GraphQL operation: {0}")]
    FailedToParseOperation(#[from] query_ast::ParseError),
    #[error("Failed to parse GraphQL schema: {0}")]
    FailedToParseSchema(#[from] schema_ast::ParseError),
    #[error("An operation was expected, but none were present.")]
    OperationNotFound,
    #[error("Specified operation '{operation_name}' not found.")]
    SpecifiedOperationNotFound { operation_name: String },
    #[error("Multiple operations found, an operation name is required.")]
    MultipleMatchingOperationsFound,
    #[error("Fragment definition for '{fragment_name}' not found.")]
    FragmentDefinitionNotFound { fragment_name: String },
    #[error("Fragment '{fragment_name}' spreads itself.")]
    FragmentCycle { fragment_name: String },
    #[error("Operation expands to more than {limit} selections.")]
    SelectionLimitExceeded { limit: usize },
    #[error("Schema has no root type for {operation_kind} operations.")]
    RootTypeNotFound { operation_kind: OperationKind },
    #[error("Field '{field_name}' not found in type '{type_name}'.")]
    FieldNotFoundInType {
        field_name: String,
        type_name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct RootType {
    name: String,
    /// Field name to its declared return type, e.g. `[User!]!`.
    fields: HashMap<String, String>,
}

/// Return types of the root fields of a schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaRootFields {
    query: Option<RootType>,
    mutation: Option<RootType>,
    subscription: Option<RootType>,
}

impl SchemaRootFields {
    pub fn from_sdl(sdl: &str) -> Result<Self, DocumentError> {
        let document = schema_ast::parse_schema::<String>(sdl)?;

        let mut query_type = None;
        let mut mutation_type = None;
        let mut subscription_type = None;
        let mut object_fields: HashMap<String, HashMap<String, String>> = HashMap::new();

        for definition in &document.definitions {
            match definition {
                schema_ast::Definition::SchemaDefinition(schema_definition) => {
                    query_type = schema_definition.query.clone();
                    mutation_type = schema_definition.mutation.clone();
                    subscription_type = schema_definition.subscription.clone();
                }
                schema_ast::Definition::TypeDefinition(TypeDefinition::Object(object_type)) => {
                    insert_field_types(
                        object_fields.entry(object_type.name.clone()).or_default(),
                        &object_type.fields,
                    );
                }
                schema_ast::Definition::TypeExtension(TypeExtension::Object(object_extension)) => {
                    insert_field_types(
                        object_fields.entry(object_extension.name.clone()).or_default(),
                        &object_extension.fields,
                    );
                }
                _ => {}
            }
        }

        // One object may serve several operation kinds.
        let root_type = |explicit: Option<String>, default_name: &str| {
            let name = explicit.unwrap_or_else(|| default_name.to_string());
            object_fields
                .get(&name)
                .cloned()
                .map(|fields| RootType { name, fields })
        };

        Ok(Self {
            query: root_type(query_type, "Query"),
            mutation: root_type(mutation_type, "Mutation"),
            subscription: root_type(subscription_type, "Subscription"),
        })
    }

    fn root_type(&self, kind: OperationKind) -> Result<&RootType, DocumentError> {
        let root_type = match kind {
            OperationKind::Query => self.query.as_ref(),
            OperationKind::Mutation => self.mutation.as_ref(),
            OperationKind::Subscription => self.subscription.as_ref(),
        };
        root_type.ok_or(DocumentError::RootTypeNotFound {
            operation_kind: kind,
        })
    }

    pub fn root_type_name(&self, kind: OperationKind) -> Result<&str, DocumentError> {
        self.root_type(kind).map(|root_type| root_type.name.as_str())
    }

    /// Declared return type of a root field, in its textual form.
    pub fn field_type(
        &self,
        kind: OperationKind,
        field_name: &str,
    ) -> Result<&str, DocumentError> {
        match field_name {
            "__typename" => return Ok("String!"),
            "__schema" => return Ok("__Schema!"),
            "__type" => return Ok("__Type"),
            _ => {}
        }

        let root_type = self.root_type(kind)?;
        root_type
            .fields
            .get(field_name)
            .map(String::as_str)
            .ok_or_else(|| DocumentError::FieldNotFoundInType {
                field_name: field_name.to_string(),
                type_name: root_type.name.clone(),
            })
    }
}

fn insert_field_types(
    target: &mut HashMap<String, String>,
    fields: &[schema_ast::Field<'_, String>],
) {
    for field in fields {
        target.insert(field.name.clone(), type_to_string(&field.field_type));
    }
}

fn type_to_string(field_type: &schema_ast::Type<'_, String>) -> String {
    match field_type {
        schema_ast::Type::NamedType(name) => name.clone(),
        schema_ast::Type::ListType(of_type) => format!("[{}]", type_to_string(of_type)),
        schema_ast::Type::NonNullType(of_type) => format!("{}!", type_to_string(of_type)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootField {
    pub path_key: String,
    pub return_type: String,
}

/// An operation reduced to what the access control looks at.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub kind: OperationKind,
    pub name: Option<String>,
    /// Top-level selections with every fragment inlined.
    pub selections: Vec<Selection>,
    /// Root fields in document order, one per response key.
    pub root_fields: Vec<RootField>,
}

impl ResolvedOperation {
    /// One [`ResolveInfo`] per root field resolver.
    pub fn resolve_infos(&self) -> impl Iterator<Item = RootFieldInfo<'_>> {
        self.root_fields.iter().map(move |field| RootFieldInfo {
            operation: self,
            field,
        })
    }
}

/// [`ResolveInfo`] of a root field of a [`ResolvedOperation`].
#[derive(Debug, Clone, Copy)]
pub struct RootFieldInfo<'o> {
    operation: &'o ResolvedOperation,
    field: &'o RootField,
}

impl ResolveInfo for RootFieldInfo<'_> {
    fn return_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.field.return_type.as_str())
    }

    fn path_key(&self) -> &str {
        &self.field.path_key
    }

    fn operation_selections(&self) -> &[Selection] {
        &self.operation.selections
    }
}

/// Parses `query` and resolves the operation to execute against `schema`.
pub fn resolve_operation(
    schema: &SchemaRootFields,
    query: &str,
    operation_name: Option<&str>,
) -> Result<ResolvedOperation, DocumentError> {
    let document = query_ast::parse_query::<String>(query)?;
    let (kind, name, selection_set) = select_operation(&document, operation_name)?;

    let fragments = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect();

    let mut collector = SelectionCollector {
        fragments,
        visiting: Vec::new(),
        collected: 0,
    };
    let mut selections = Vec::new();
    collector.collect(selection_set, &mut selections)?;

    let mut root_fields: Vec<RootField> = Vec::with_capacity(selections.len());
    for selection in &selections {
        let path_key = selection.response_key();
        if root_fields.iter().any(|field| field.path_key == path_key) {
            continue;
        }
        root_fields.push(RootField {
            path_key: path_key.to_string(),
            return_type: schema.field_type(kind, &selection.name)?.to_string(),
        });
    }

    debug!(
        operation_kind = kind.as_str(),
        operation_name = name.as_deref().unwrap_or("<anonymous>"),
        root_fields = root_fields.len(),
        "resolved operation"
    );

    Ok(ResolvedOperation {
        kind,
        name,
        selections,
        root_fields,
    })
}

type OperationParts<'d, 'a> = (
    OperationKind,
    Option<String>,
    &'d query_ast::SelectionSet<'a, String>,
);

fn operation_parts<'d, 'a>(
    operation: &'d OperationDefinition<'a, String>,
) -> OperationParts<'d, 'a> {
    match operation {
        OperationDefinition::SelectionSet(selection_set) => {
            (OperationKind::Query, None, selection_set)
        }
        OperationDefinition::Query(query) => {
            (OperationKind::Query, query.name.clone(), &query.selection_set)
        }
        OperationDefinition::Mutation(mutation) => (
            OperationKind::Mutation,
            mutation.name.clone(),
            &mutation.selection_set,
        ),
        OperationDefinition::Subscription(subscription) => (
            OperationKind::Subscription,
            subscription.name.clone(),
            &subscription.selection_set,
        ),
    }
}

fn select_operation<'d, 'a>(
    document: &'d query_ast::Document<'a, String>,
    operation_name: Option<&str>,
) -> Result<OperationParts<'d, 'a>, DocumentError> {
    let mut operations = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation_parts(operation)),
            Definition::Fragment(_) => None,
        });

    match operation_name {
        Some(operation_name) => operations
            .find(|(_, name, _)| name.as_deref() == Some(operation_name))
            .ok_or_else(|| DocumentError::SpecifiedOperationNotFound {
                operation_name: operation_name.to_string(),
            }),
        None => {
            let operation = operations.next().ok_or(DocumentError::OperationNotFound)?;
            if operations.next().is_some() {
                return Err(DocumentError::MultipleMatchingOperationsFound);
            }
            Ok(operation)
        }
    }
}

/// Turns parser selections into [`Selection`] trees, inlining fragment
/// spreads and inline fragments into their parent.
struct SelectionCollector<'d, 'a> {
    fragments: HashMap<&'d str, &'d query_ast::FragmentDefinition<'a, String>>,
    visiting: Vec<&'d str>,
    /// Field selections produced so far, fragment copies included.
    collected: usize,
}

impl<'d, 'a> SelectionCollector<'d, 'a> {
    fn collect(
        &mut self,
        selection_set: &'d query_ast::SelectionSet<'a, String>,
        out: &mut Vec<Selection>,
    ) -> Result<(), DocumentError> {
        for item in &selection_set.items {
            match item {
                query_ast::Selection::Field(field) => {
                    self.collected += 1;
                    if self.collected > MAX_EXPANDED_SELECTIONS {
                        return Err(DocumentError::SelectionLimitExceeded {
                            limit: MAX_EXPANDED_SELECTIONS,
                        });
                    }

                    let mut selections = Vec::new();
                    self.collect(&field.selection_set, &mut selections)?;
                    out.push(Selection {
                        name: field.name.clone(),
                        alias: field.alias.clone(),
                        selections,
                    });
                }
                query_ast::Selection::FragmentSpread(spread) => {
                    let fragment_name = spread.fragment_name.as_str();
                    let fragment = self.fragments.get(fragment_name).copied().ok_or_else(|| {
                        DocumentError::FragmentDefinitionNotFound {
                            fragment_name: fragment_name.to_string(),
                        }
                    })?;

                    if self.visiting.contains(&fragment_name) {
                        return Err(DocumentError::FragmentCycle {
                            fragment_name: fragment_name.to_string(),
                        });
                    }

                    self.visiting.push(fragment_name);
                    self.collect(&fragment.selection_set, out)?;
                    self.visiting.pop();
                }
                query_ast::Selection::InlineFragment(inline_fragment) => {
                    self.collect(&inline_fragment.selection_set, out)?;
                }
            }
        }

        Ok(())
    }
}
