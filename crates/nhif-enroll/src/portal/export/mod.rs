//! The export workflow: select pending submissions, render them into the fixed
//! spreadsheet layout, and flip their export status — all inside one store
//! transaction, so a failed render or flip leaves nothing changed.

mod sheet;

use std::sync::Arc;

use chrono::Utc;

use super::auth::Caller;
use super::domain::SubmissionId;
use super::error::PortalError;
use super::store::{ExportFilter, SubmissionStore};

pub use sheet::{CONTENT_TYPE, HEADERS};

/// Which submissions an export run covers. `AllPending` and `NewOnly` resolve
/// the same rows; they differ only in the empty-selection error and the
/// filename, matching the two operator-facing triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSelection {
    AllPending,
    NewOnly,
    Selected(Vec<SubmissionId>),
}

impl ExportSelection {
    fn filename_prefix(&self) -> &'static str {
        match self {
            ExportSelection::AllPending => "pending_students",
            ExportSelection::NewOnly => "new_students",
            ExportSelection::Selected(_) => "selected_students",
        }
    }

    fn empty_error(&self) -> PortalError {
        match self {
            ExportSelection::NewOnly => PortalError::NoNewRecords,
            _ => PortalError::NoPendingRecords,
        }
    }
}

/// Rendered export output. Delivery (attachment headers) is the router's
/// concern; the workflow only guarantees the document matches the rows whose
/// status it flipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub rows: usize,
}

/// Export workflow over a transactional [`SubmissionStore`].
pub struct ExportService<S> {
    submissions: Arc<S>,
}

impl<S> ExportService<S>
where
    S: SubmissionStore + 'static,
{
    pub fn new(submissions: Arc<S>) -> Self {
        Self { submissions }
    }

    /// Run one export. Every failure path leaves the store unchanged: the
    /// transaction commits only after the document has rendered and the status
    /// flip has been staged.
    pub fn export(
        &self,
        caller: &Caller,
        selection: ExportSelection,
    ) -> Result<ExportDocument, PortalError> {
        caller.require_admin()?;

        let mut tx = self.submissions.begin().map_err(PortalError::storage)?;

        let selected = match &selection {
            ExportSelection::AllPending | ExportSelection::NewOnly => tx
                .list(ExportFilter::PendingOnly)
                .map_err(PortalError::storage)?,
            ExportSelection::Selected(ids) => {
                if ids.is_empty() {
                    return Err(PortalError::Validation(
                        "student ids are required".to_string(),
                    ));
                }
                let resolved = tx.select(ids).map_err(PortalError::storage)?;
                if resolved.len() != ids.len() {
                    return Err(PortalError::Validation(
                        "some selected students do not exist".to_string(),
                    ));
                }
                resolved
            }
        };

        if selected.is_empty() {
            return Err(selection.empty_error());
        }

        // Render before flipping: a rendering failure must not mark anything.
        let bytes = sheet::render(&selected)?;

        let ids: Vec<SubmissionId> = selected.iter().map(|row| row.id).collect();
        let now = Utc::now();
        let updated = tx.mark_exported(&ids, now).map_err(PortalError::storage)?;
        tx.commit().map_err(PortalError::storage)?;

        tracing::info!(
            rows = selected.len(),
            updated,
            mode = selection.filename_prefix(),
            "export committed"
        );

        Ok(ExportDocument {
            filename: format!(
                "{}_{}.csv",
                selection.filename_prefix(),
                now.timestamp_millis()
            ),
            content_type: sheet::CONTENT_TYPE,
            bytes,
            rows: selected.len(),
        })
    }
}
