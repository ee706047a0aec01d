mod logger;

use std::process::ExitCode;

use hive_field_access::{
    resolve_operation, secure, AccessViolation, DocumentError, FieldAccessMiddleware,
    GraphQLError, ResolveInfo, ResolvedOperation, SchemaRootFields,
};
use hive_field_access_config::{load_config, schema::SchemaLoadError, FieldAccessConfigError};
use serde::Serialize;
use tracing::{debug, info};

use crate::logger::configure_logging;

const CONFIG_PATH_ENV: &str = "FIELD_ACCESS_CONFIG_FILE_PATH";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Usage: hive_field_access <operation_path> [operation_name]")]
    MissingOperationPath,
    #[error(transparent)]
    Config(#[from] FieldAccessConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaLoadError),
    #[error("Failed to read operation file '{path}': {source}")]
    ReadOperation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Failed to serialize the errors: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of the access control for one root field.
struct RootFieldOutcome {
    path_key: String,
    result: Result<(), AccessViolation>,
}

fn check_operation(
    middleware: &FieldAccessMiddleware,
    operation: &ResolvedOperation,
) -> Vec<RootFieldOutcome> {
    operation
        .resolve_infos()
        .map(|info| RootFieldOutcome {
            path_key: info.path_key().to_string(),
            result: middleware.check(&info),
        })
        .collect()
}

#[derive(Serialize)]
struct ErrorsPayload {
    errors: Vec<GraphQLError>,
}

/// Renders `OK` lines when every root field passes, the GraphQL `errors` payload otherwise.
fn render_outcomes(outcomes: Vec<RootFieldOutcome>) -> Result<(String, bool), serde_json::Error> {
    let (allowed, denied): (Vec<_>, Vec<_>) =
        outcomes.into_iter().partition(|outcome| outcome.result.is_ok());

    if denied.is_empty() {
        let lines = allowed
            .iter()
            .map(|outcome| format!("OK {}", outcome.path_key))
            .collect::<Vec<_>>()
            .join("\n");
        return Ok((lines, true));
    }

    let errors = denied
        .into_iter()
        .filter_map(|outcome| outcome.result.err())
        .map(GraphQLError::from)
        .collect::<Vec<_>>();
    let payload = serde_json::to_string_pretty(&ErrorsPayload { errors })?;

    Ok((payload, false))
}

fn run() -> Result<bool, CliError> {
    let mut args = std::env::args().skip(1);
    let operation_path = args.next().ok_or(CliError::MissingOperationPath)?;
    let operation_name = args.next();

    let config = load_config(std::env::var(CONFIG_PATH_ENV).ok())?;
    configure_logging(&config.log);
    debug!(
        restricted_types = config.allowed_fields.len(),
        "configuration loaded"
    );

    let schema_sdl = config.load_schema()?;
    let schema = SchemaRootFields::from_sdl(&schema_sdl)?;
    let query = std::fs::read_to_string(&operation_path).map_err(|source| {
        CliError::ReadOperation {
            path: operation_path.clone(),
            source,
        }
    })?;
    let operation = resolve_operation(&schema, &query, operation_name.as_deref())?;

    let middleware = secure(config.allowed_fields);
    let (output, passed) = render_outcomes(check_operation(&middleware, &operation))?;
    println!("{}", output);

    info!(passed, operation = operation_path.as_str(), "access control finished");
    Ok(passed)
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use hive_field_access::{AllowedFields, FieldRule, RuleEntry};

    use super::*;

    static SCHEMA: &str = r#"
        type Query {
          me: User
          version: String
        }

        type User {
          id: ID!
          name: String
          email: String
          posts: [Post!]
        }

        type Post {
          title: String
          body: String
        }
    "#;

    fn run_check(query: &str) -> (String, bool) {
        let middleware = secure(AllowedFields::new().with_rule(
            "User",
            FieldRule::fields([
                RuleEntry::from("id"),
                RuleEntry::nested("posts", FieldRule::fields(["title"])),
            ]),
        ));
        let schema = SchemaRootFields::from_sdl(SCHEMA).unwrap();
        let operation = resolve_operation(&schema, query, None).unwrap();

        render_outcomes(check_operation(&middleware, &operation)).unwrap()
    }

    #[test]
    fn prints_ok_lines_when_allowed() {
        let (output, passed) = run_check("{ me { id posts { title } } version }");

        assert!(passed);
        insta::assert_snapshot!(output, @r"
        OK me
        OK version
        ");
    }

    #[test]
    fn prints_graphql_errors_when_denied() {
        let (output, passed) = run_check("{ me { id email } version }");

        assert!(!passed);
        insta::assert_snapshot!(output, @r#"
        {
          "errors": [
            {
              "message": "Access Control: cannot fetch 'email' at depth 1 in 'me'",
              "extensions": {
                "code": "QUERY_VALIDATION_FAILED",
                "statusCode": 403,
                "fields": [
                  "email"
                ]
              }
            }
          ]
        }
        "#);
    }
}
