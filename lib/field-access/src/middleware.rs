use std::future::Future;
use std::sync::Arc;

use crate::control::access_control;
use crate::error::AccessViolation;
use crate::introspection::ResolveInfo;
use crate::rules::AllowedFields;

/// Resolver-chain step that limits data fetching on restricted types to the
/// fields granted by the allow-list. Callers may fetch less, never more.
#[derive(Debug, Clone)]
pub struct FieldAccessMiddleware {
    fields: Arc<AllowedFields>,
}

/// Builds the middleware for the given allow-list.
pub fn secure(fields: impl Into<Arc<AllowedFields>>) -> FieldAccessMiddleware {
    FieldAccessMiddleware::new(fields)
}

impl FieldAccessMiddleware {
    pub fn new(fields: impl Into<Arc<AllowedFields>>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    pub fn allowed_fields(&self) -> &AllowedFields {
        &self.fields
    }

    pub fn check<I: ResolveInfo + ?Sized>(&self, info: &I) -> Result<(), AccessViolation> {
        access_control(info, &self.fields)
    }

    /// Runs `next` only when the current field passes the access control.
    pub async fn resolve<I, F, Fut, T, E>(&self, info: &I, next: F) -> Result<T, E>
    where
        I: ResolveInfo + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AccessViolation>,
    {
        self.check(info)?;
        next().await
    }
}
