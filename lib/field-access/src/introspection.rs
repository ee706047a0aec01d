use std::borrow::Cow;

/// A field selection of the incoming operation, with fragments already inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub alias: Option<String>,
    /// Empty for leaf fields.
    pub selections: Vec<Selection>,
}

impl Selection {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            selections: Vec::new(),
        }
    }

    pub fn with_selections(name: impl Into<String>, selections: Vec<Selection>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            selections,
        }
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The key the field is resolved under: its alias, or its name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn has_selections(&self) -> bool {
        !self.selections.is_empty()
    }
}

/// What the access control needs to know about the field being resolved.
pub trait ResolveInfo {
    /// Declared return type in its textual form, e.g. `[User!]!`.
    fn return_type(&self) -> Cow<'_, str>;

    /// Alias of the resolving field if present, otherwise its name.
    fn path_key(&self) -> &str;

    /// Top-level selections of the enclosing operation.
    fn operation_selections(&self) -> &[Selection];
}

/// Owned [`ResolveInfo`], used by hosts that already extracted the details.
#[derive(Debug, Clone)]
pub struct FieldResolveInfo {
    pub return_type: String,
    pub path_key: String,
    pub operation_selections: Vec<Selection>,
}

impl FieldResolveInfo {
    pub fn new(
        return_type: impl Into<String>,
        path_key: impl Into<String>,
        operation_selections: Vec<Selection>,
    ) -> Self {
        Self {
            return_type: return_type.into(),
            path_key: path_key.into(),
            operation_selections,
        }
    }
}

impl ResolveInfo for FieldResolveInfo {
    fn return_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.return_type.as_str())
    }

    fn path_key(&self) -> &str {
        &self.path_key
    }

    fn operation_selections(&self) -> &[Selection] {
        &self.operation_selections
    }
}

impl<T: ResolveInfo + ?Sized> ResolveInfo for &T {
    fn return_type(&self) -> Cow<'_, str> {
        (**self).return_type()
    }

    fn path_key(&self) -> &str {
        (**self).path_key()
    }

    fn operation_selections(&self) -> &[Selection] {
        (**self).operation_selections()
    }
}
