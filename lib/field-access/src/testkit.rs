use std::sync::Once;

use lazy_static::lazy_static;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::document::{resolve_operation, ResolvedOperation, SchemaRootFields};

fn init_test_logger_internal() {
    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_bracketed_fields(true)
        .with_deferred_spans(false)
        .with_wraparound(25)
        .with_indent_lines(true)
        .with_timer(tracing_tree::time::Uptime::default())
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_targets(false);

    tracing_subscriber::registry()
        .with(tree_layer)
        .with(EnvFilter::from_default_env())
        .init();
}

lazy_static! {
    static ref TRACING_INIT: Once = Once::new();
}

pub fn init_logger() {
    TRACING_INIT.call_once(|| {
        init_test_logger_internal();
    });
}

pub static BLOG_SCHEMA: &str = r#"
    type Query {
      me: User
      user(id: ID!): User
      users: [User!]!
      posts: [Post!]
      version: String
    }

    type User {
      id: ID!
      name: String
      email: String
      posts: [Post!]
      comments: [Comment!]
      friends: [User!]
    }

    type Post {
      id: ID!
      title: String
      body: String
      author: User
      comments: [Comment!]
    }

    type Comment {
      id: ID!
      text: String
      author: User
    }
"#;

pub fn parse_operation(query: &str) -> ResolvedOperation {
    let schema = SchemaRootFields::from_sdl(BLOG_SCHEMA).unwrap();
    resolve_operation(&schema, query, None).unwrap()
}
