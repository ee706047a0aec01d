use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Machine-readable code attached to every access violation.
pub const QUERY_VALIDATION_FAILED: &str = "QUERY_VALIDATION_FAILED";

/// The request selected fields outside of the granted envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessViolation {
    /// The request descended into fields that no rule grants sub-selections for.
    #[error("Access Control: cannot fetch subfields of '{}' at depth {depth} in '{parent}'", .fields.join(", "))]
    UnauthorizedParent {
        fields: Vec<String>,
        depth: usize,
        parent: String,
    },
    /// The request selected fields that a rule explicitly leaves out.
    #[error("Access Control: cannot fetch '{}' at depth {depth} in '{parent}'", .fields.join(", "))]
    InvalidFields {
        fields: Vec<String>,
        depth: usize,
        parent: String,
    },
}

impl AccessViolation {
    pub fn code(&self) -> &'static str {
        QUERY_VALIDATION_FAILED
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    pub fn fields(&self) -> &[String] {
        match self {
            Self::UnauthorizedParent { fields, .. } | Self::InvalidFields { fields, .. } => fields,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::UnauthorizedParent { depth, .. } | Self::InvalidFields { depth, .. } => *depth,
        }
    }

    /// Invocation key of the field that was being resolved.
    pub fn parent(&self) -> &str {
        match self {
            Self::UnauthorizedParent { parent, .. } | Self::InvalidFields { parent, .. } => parent,
        }
    }

    pub fn to_graphql_error(&self) -> GraphQLError {
        GraphQLError {
            message: self.to_string(),
            extensions: GraphQLErrorExtensions {
                code: self.code().to_string(),
                status_code: self.status_code().as_u16(),
                fields: self.fields().to_vec(),
            },
        }
    }
}

/// GraphQL error entry as returned in the `errors` list of a response.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GraphQLError {
    pub message: String,
    pub extensions: GraphQLErrorExtensions,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLErrorExtensions {
    pub code: String,
    pub status_code: u16,
    pub fields: Vec<String>,
}

impl From<AccessViolation> for GraphQLError {
    fn from(violation: AccessViolation) -> Self {
        violation.to_graphql_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_parent_message() {
        let violation = AccessViolation::UnauthorizedParent {
            fields: vec!["comments".into(), "friends".into()],
            depth: 2,
            parent: "me".into(),
        };

        insta::assert_snapshot!(violation, @"Access Control: cannot fetch subfields of 'comments, friends' at depth 2 in 'me'");
        assert_eq!(violation.depth(), 2);
        assert_eq!(violation.parent(), "me");
    }

    #[test]
    fn invalid_fields_message() {
        let violation = AccessViolation::InvalidFields {
            fields: vec!["email".into()],
            depth: 1,
            parent: "user".into(),
        };

        insta::assert_snapshot!(violation, @"Access Control: cannot fetch 'email' at depth 1 in 'user'");
        assert_eq!(violation.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn serializes_as_graphql_error() {
        let error: GraphQLError = AccessViolation::InvalidFields {
            fields: vec!["email".into(), "password".into()],
            depth: 1,
            parent: "user".into(),
        }
        .into();

        insta::assert_snapshot!(serde_json::to_string_pretty(&error).unwrap(), @r#"
        {
          "message": "Access Control: cannot fetch 'email, password' at depth 1 in 'user'",
          "extensions": {
            "code": "QUERY_VALIDATION_FAILED",
            "statusCode": 403,
            "fields": [
              "email",
              "password"
            ]
          }
        }
        "#);
    }
}
