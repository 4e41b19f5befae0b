//! Operator-managed reference data driving the registration form dropdowns.
//!
//! Categories are free-text strings so new dropdowns can be added at runtime
//! without a schema change; nothing prevents a typo creating an orphan category.
//! That gap is deliberate and inherited from the data model.

use std::sync::Arc;

use chrono::Utc;

use super::auth::Caller;
use super::error::PortalError;
use super::store::{ReferenceStore, ReferenceValue, StoreError, SubmissionStore};

/// The one category with a referential-integrity guard: course values cannot be
/// deleted while a submission references them.
pub const COURSE_CATEGORY: &str = "course_name";

/// Reference data management over a [`ReferenceStore`], with the in-use guard
/// checked against the submission store.
pub struct DirectoryService<R, S> {
    references: Arc<R>,
    submissions: Arc<S>,
}

impl<R, S> DirectoryService<R, S>
where
    R: ReferenceStore + 'static,
    S: SubmissionStore + 'static,
{
    pub fn new(references: Arc<R>, submissions: Arc<S>) -> Self {
        Self {
            references,
            submissions,
        }
    }

    /// Values for one category, sorted ascending. An unknown category yields an
    /// empty list, not an error.
    pub fn values(&self, _caller: &Caller, category: &str) -> Result<Vec<String>, PortalError> {
        self.references
            .list(category)
            .map_err(PortalError::storage)
    }

    /// The full reference catalog, ordered by category then value.
    pub fn catalog(&self, _caller: &Caller) -> Result<Vec<ReferenceValue>, PortalError> {
        self.references.list_all().map_err(PortalError::storage)
    }

    /// Add a value to a category.
    pub fn add(&self, caller: &Caller, category: &str, value: &str) -> Result<(), PortalError> {
        caller.require_admin()?;
        let category = category.trim();
        let value = value.trim();
        if category.is_empty() || value.is_empty() {
            return Err(PortalError::Validation(
                "field name and value are required".to_string(),
            ));
        }

        match self.references.add(category, value, Utc::now()) {
            Ok(()) => {
                tracing::info!(category, value, "reference value added");
                Ok(())
            }
            Err(StoreError::Conflict) => Err(PortalError::AlreadyExists),
            Err(err) => Err(PortalError::storage(err)),
        }
    }

    /// Remove a value from a category, refusing to orphan submissions that
    /// reference a course.
    pub fn remove(&self, caller: &Caller, category: &str, value: &str) -> Result<(), PortalError> {
        caller.require_admin()?;
        let category = category.trim();
        let value = value.trim();
        if category.is_empty() || value.is_empty() {
            return Err(PortalError::Validation(
                "field name and value are required".to_string(),
            ));
        }

        if category == COURSE_CATEGORY
            && self
                .submissions
                .course_in_use(value)
                .map_err(PortalError::storage)?
        {
            return Err(PortalError::InUse);
        }

        match self.references.remove(category, value) {
            Ok(()) => {
                tracing::info!(category, value, "reference value removed");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(PortalError::NotFound("field value")),
            Err(err) => Err(PortalError::storage(err)),
        }
    }
}
