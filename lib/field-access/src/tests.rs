use crate::control::access_control;
use crate::error::AccessViolation;
use crate::introspection::ResolveInfo;
use crate::rules::AllowedFields;
use crate::testkit::{init_logger, parse_operation};

fn allowed_fields(rules: &str) -> AllowedFields {
    serde_json::from_str(rules).unwrap()
}

/// Runs the access control for every root field, the way a resolver chain would.
fn authorize(rules: &str, query: &str) -> String {
    init_logger();
    let rules = allowed_fields(rules);
    let operation = parse_operation(query);

    operation
        .resolve_infos()
        .map(|info| match access_control(&info, &rules) {
            Ok(()) => format!("[Allowed] {}", info.path_key()),
            Err(violation) => format!("[Denied] {}: {}", info.path_key(), violation),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_violation(rules: &str, query: &str) -> Option<AccessViolation> {
    let rules = allowed_fields(rules);
    let operation = parse_operation(query);

    let violation = operation
        .resolve_infos()
        .find_map(|info| access_control(&info, &rules).err());
    violation
}

mod unrestricted {
    use super::*;

    #[test]
    fn types_without_rules_are_not_restricted() {
        let result = authorize(
            r#"{ "Post": "*" }"#,
            "{ me { id email posts { body comments { text } } } }",
        );
        insta::assert_snapshot!(result, @"[Allowed] me");
    }

    #[test]
    fn empty_allow_list_restricts_nothing() {
        let result = authorize("{}", "{ me { email } version }");
        insta::assert_snapshot!(result, @r"
        [Allowed] me
        [Allowed] version
        ");
    }

    #[test]
    fn restricted_types_below_the_root_field_are_not_checked() {
        let result = authorize(r#"{ "Post": ["id"] }"#, "{ me { posts { body } } }");
        insta::assert_snapshot!(result, @"[Allowed] me");
    }
}

mod allowed {
    use super::*;

    #[test]
    fn selecting_less_than_granted() {
        let result = authorize(
            r#"{ "User": ["id", "name", { "posts": ["title", "body"] }] }"#,
            "{ me { name posts { title } } }",
        );
        insta::assert_snapshot!(result, @"[Allowed] me");
    }

    #[test]
    fn wildcard_type_accepts_any_depth() {
        let result = authorize(
            r#"{ "User": "*" }"#,
            "{ me { id email posts { title author { email friends { name } } } } }",
        );
        insta::assert_snapshot!(result, @"[Allowed] me");
    }

    #[test]
    fn wildcard_field_accepts_everything_below_it() {
        let result = authorize(
            r#"{ "User": ["id", { "posts": "*" }] }"#,
            "{ me { id posts { title author { email comments { text } } } } }",
        );
        insta::assert_snapshot!(result, @"[Allowed] me");
    }

    #[test]
    fn nested_wildcard_key_grants_its_parent_type() {
        let result = authorize(
            r#"{ "User": ["id", { "*": ["name"] }] }"#,
            "{ me { email posts { title body } friends { email } } }",
        );
        insta::assert_snapshot!(result, @"[Allowed] me");
    }

    #[test]
    fn list_return_types_are_restricted() {
        let result = authorize(
            r#"{ "Post": ["id", "title"] }"#,
            "{ posts { id title } }",
        );
        insta::assert_snapshot!(result, @"[Allowed] posts");
    }

    #[test]
    fn aliases_inside_the_selection_are_ignored() {
        let result = authorize(
            r#"{ "User": ["id", "name"] }"#,
            "{ me { identifier: id displayName: name } }",
        );
        insta::assert_snapshot!(result, @"[Allowed] me");
    }
}

mod denied {
    use super::*;

    #[test]
    fn field_outside_of_the_allow_list() {
        let result = authorize(r#"{ "User": ["id", "name"] }"#, "{ me { id email } }");
        insta::assert_snapshot!(result, @"[Denied] me: Access Control: cannot fetch 'email' at depth 1 in 'me'");
    }

    #[test]
    fn nested_field_outside_of_the_nested_rule() {
        let result = authorize(
            r#"{ "User": ["id", { "posts": ["title"] }] }"#,
            "{ me { id posts { title body } } }",
        );
        insta::assert_snapshot!(result, @"[Denied] me: Access Control: cannot fetch 'body' at depth 2 in 'me'");
    }

    #[test]
    fn descending_into_a_field_without_rule() {
        let result = authorize(
            r#"{ "User": ["id", { "posts": ["title"] }] }"#,
            "{ me { comments { text } } }",
        );
        insta::assert_snapshot!(result, @"[Denied] me: Access Control: cannot fetch subfields of 'comments' at depth 1 in 'me'");
    }

    #[test]
    fn descending_into_a_granted_leaf() {
        let result = authorize(
            r#"{ "User": ["id", "friends"] }"#,
            "{ me { friends { email } } }",
        );
        insta::assert_snapshot!(result, @"[Denied] me: Access Control: cannot fetch subfields of 'friends' at depth 2 in 'me'");
    }

    #[test]
    fn violation_three_levels_down() {
        let violation = first_violation(
            r#"{ "User": [{ "posts": [{ "author": ["name"] }] }] }"#,
            "{ me { posts { author { name email } } } }",
        );

        assert_eq!(
            violation,
            Some(AccessViolation::InvalidFields {
                fields: vec!["email".into()],
                depth: 3,
                parent: "me".into(),
            })
        );
    }

    #[test]
    fn fields_from_fragments_are_checked() {
        let result = authorize(
            r#"{ "User": ["id", "name"] }"#,
            r#"
            query {
              me { ...UserFields ... on User { name } }
            }

            fragment UserFields on User {
              id
              email
            }
            "#,
        );
        insta::assert_snapshot!(result, @"[Denied] me: Access Control: cannot fetch 'email' at depth 1 in 'me'");
    }

    #[test]
    fn every_rejected_name_of_the_level_is_reported() {
        let result = authorize(
            r#"{ "Post": ["id"] }"#,
            "{ posts { id title body } }",
        );
        insta::assert_snapshot!(result, @"[Denied] posts: Access Control: cannot fetch 'title, body' at depth 1 in 'posts'");
    }
}

mod precedence {
    use super::*;

    #[test]
    fn unauthorized_parent_wins_over_invalid_field() {
        let violation = first_violation(
            r#"{ "User": ["id", "friends", { "posts": ["title"] }] }"#,
            "{ me { posts { body } friends { name } } }",
        );

        assert_eq!(
            violation,
            Some(AccessViolation::UnauthorizedParent {
                fields: vec!["friends".into()],
                depth: 2,
                parent: "me".into(),
            })
        );
    }

    #[test]
    fn shallowest_violation_is_reported() {
        let violation = first_violation(
            r#"{ "User": ["id", { "posts": ["title"] }] }"#,
            "{ me { email posts { body } } }",
        );

        assert_eq!(violation.map(|v| v.depth()), Some(1));
    }
}

mod occurrences {
    use super::*;

    #[test]
    fn aliased_occurrences_are_checked_separately() {
        let result = authorize(
            r#"{ "User": ["id", "name"] }"#,
            "{ allowed: me { id } rejected: me { email } }",
        );
        insta::assert_snapshot!(result, @r"
        [Allowed] allowed
        [Denied] rejected: Access Control: cannot fetch 'email' at depth 1 in 'rejected'
        ");
    }

    #[test]
    fn compliant_sibling_does_not_mask_a_violation() {
        let result = authorize(
            r#"{ "User": ["id", "name"] }"#,
            "{ me { id } me { email } }",
        );
        insta::assert_snapshot!(result, @"[Denied] me: Access Control: cannot fetch 'email' at depth 1 in 'me'");
    }

    #[test]
    fn merged_sub_selections_are_all_checked() {
        let result = authorize(
            r#"{ "User": [{ "posts": ["title"] }] }"#,
            "{ me { posts { title } posts { body } } }",
        );
        insta::assert_snapshot!(result, @"[Denied] me: Access Control: cannot fetch 'body' at depth 2 in 'me'");
    }
}

#[test]
fn authorization_is_idempotent() {
    let rules = r#"{ "User": ["id", { "posts": ["title"] }] }"#;
    let query = "{ me { id posts { title body } } users { comments { text } } }";

    assert_eq!(authorize(rules, query), authorize(rules, query));
    assert_eq!(first_violation(rules, query), first_violation(rules, query));
}

#[test]
fn violation_payload_for_the_transport() {
    let violation = first_violation(r#"{ "User": ["id"] }"#, "{ users { id name } }").unwrap();

    assert_eq!(violation.code(), "QUERY_VALIDATION_FAILED");
    assert_eq!(violation.status_code().as_u16(), 403);
    assert_eq!(violation.fields(), ["name".to_string()]);
    assert_eq!(violation.parent(), "users");
}
