use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Account, AccountId, Role, Submission, SubmissionForm, SubmissionId};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Row filter for submission listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFilter {
    All,
    PendingOnly,
    ExportedOnly,
}

/// One operator-managed reference row driving a form dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceValue {
    pub field_name: String,
    pub field_value: String,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction for portal accounts.
pub trait AccountStore: Send + Sync {
    /// Insert a new account; the email must be unique.
    fn insert(&self, email: &str, password_hash: &str, role: Role)
        -> Result<Account, StoreError>;
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    fn fetch(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
    /// Bulk-clear support: remove every registrant account, keeping administrators.
    fn remove_registrants(&self) -> Result<usize, StoreError>;
}

/// A scoped unit of work over the submission table.
///
/// Writes are staged until [`SubmissionTx::commit`]; dropping the transaction
/// without committing rolls everything back. Implementations must serialize
/// concurrent transactions so a selection observed inside one transaction cannot
/// be flipped underneath it by another.
pub trait SubmissionTx {
    fn insert(
        &mut self,
        account_id: AccountId,
        form: SubmissionForm,
        now: DateTime<Utc>,
    ) -> Result<Submission, StoreError>;

    fn fetch(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError>;

    fn fetch_by_account(&self, account_id: AccountId) -> Result<Option<Submission>, StoreError>;

    /// All rows matching the filter, ordered by creation time descending.
    fn list(&self, filter: ExportFilter) -> Result<Vec<Submission>, StoreError>;

    /// Resolve the given ids in order; unknown ids are skipped, so callers detect
    /// a partial resolution by comparing lengths.
    fn select(&self, ids: &[SubmissionId]) -> Result<Vec<Submission>, StoreError>;

    /// Whether any submission references `course` as its course name.
    fn course_in_use(&self, course: &str) -> Result<bool, StoreError>;

    /// Flip `exported` for every currently-unexported id in the set. Already
    /// exported ids are an idempotent no-op and unknown ids are silently skipped.
    /// Returns the number of rows actually updated.
    fn mark_exported(
        &mut self,
        ids: &[SubmissionId],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Bulk-clear support: remove every submission, returning the count removed.
    fn clear(&mut self) -> Result<usize, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Storage abstraction for submissions. All access goes through scoped
/// transactions; the provided methods wrap `begin`/`commit` for single-step
/// operations.
pub trait SubmissionStore: Send + Sync {
    fn begin(&self) -> Result<Box<dyn SubmissionTx + '_>, StoreError>;

    fn insert(
        &self,
        account_id: AccountId,
        form: SubmissionForm,
        now: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        let mut tx = self.begin()?;
        let submission = tx.insert(account_id, form, now)?;
        tx.commit()?;
        Ok(submission)
    }

    fn fetch(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        self.begin()?.fetch(id)
    }

    fn fetch_by_account(&self, account_id: AccountId) -> Result<Option<Submission>, StoreError> {
        self.begin()?.fetch_by_account(account_id)
    }

    fn list(&self, filter: ExportFilter) -> Result<Vec<Submission>, StoreError> {
        self.begin()?.list(filter)
    }

    fn course_in_use(&self, course: &str) -> Result<bool, StoreError> {
        self.begin()?.course_in_use(course)
    }
}

/// Storage abstraction for the dynamic reference data behind form dropdowns.
pub trait ReferenceStore: Send + Sync {
    /// Values for one category, sorted ascending; an unknown category yields an
    /// empty list rather than an error.
    fn list(&self, category: &str) -> Result<Vec<String>, StoreError>;

    /// Every reference row, ordered by category then value.
    fn list_all(&self) -> Result<Vec<ReferenceValue>, StoreError>;

    /// Insert a `(category, value)` pair; the exact pair must not already exist.
    fn add(&self, category: &str, value: &str, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Remove a `(category, value)` pair, failing with `NotFound` when absent.
    fn remove(&self, category: &str, value: &str) -> Result<(), StoreError>;
}
