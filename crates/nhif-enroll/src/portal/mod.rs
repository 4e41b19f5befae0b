//! Registration portal core: identity, submissions, reference data, and the
//! export workflow, exposed through an axum router.
//!
//! Storage is abstracted behind narrow traits so every service can be exercised
//! against test doubles; the shipping implementation is the in-memory store in
//! [`memory`]. All mutations funnel through the scoped transaction primitive on
//! [`store::SubmissionStore`] so an export either fully commits or rolls back.

pub mod auth;
pub mod directory;
pub mod domain;
pub mod enrollment;
pub mod error;
pub mod export;
pub mod memory;
pub mod router;
pub mod store;

pub use auth::{AuthService, Caller, LoginGrant};
pub use directory::{DirectoryService, COURSE_CATEGORY};
pub use domain::{
    Account, AccountId, Role, StudentRecord, Submission, SubmissionForm, SubmissionId,
    SubmissionStatus,
};
pub use enrollment::{
    ClearOutcome, DashboardStats, EnrollmentService, SortField, SortOrder, StatsSummary,
    StatusFilter, StudentPage, StudentQuery,
};
pub use error::PortalError;
pub use export::{ExportDocument, ExportSelection, ExportService};
pub use memory::{MemoryAccounts, MemoryReferences, MemorySubmissions};
pub use router::{portal_router, PortalServices};
pub use store::{
    AccountStore, ExportFilter, ReferenceStore, ReferenceValue, StoreError, SubmissionStore,
    SubmissionTx,
};
