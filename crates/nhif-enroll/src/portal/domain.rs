use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::PortalError;

/// Identifier wrapper for portal accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

/// Identifier wrapper for registration submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(pub i64);

/// Access role attached to every account and bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Administrator,
    #[serde(rename = "student")]
    Registrant,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Administrator => "admin",
            Role::Registrant => "student",
        }
    }
}

/// A portal account. The credential hash is an argon2 PHC string and is never
/// serialized into API responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The registration form answers collected from a registrant.
///
/// `marital_status`, `gender`, and `course_name` are populated from the dynamic
/// reference data; their values are stored as plain strings, matching the
/// operator-extensible category design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionForm {
    pub form_four_index_no: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub marital_status: String,
    pub gender: String,
    pub admission_date: NaiveDate,
    pub mobile_no: String,
    pub course_name: String,
    pub year_of_study: u8,
    pub course_duration: u8,
    pub national_id: String,
    pub admission_no: String,
}

impl SubmissionForm {
    /// Field-level validation applied before anything is persisted.
    pub fn validate(&self) -> Result<(), PortalError> {
        let required = [
            ("form_four_index_no", &self.form_four_index_no),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("marital_status", &self.marital_status),
            ("gender", &self.gender),
            ("mobile_no", &self.mobile_no),
            ("course_name", &self.course_name),
            ("national_id", &self.national_id),
            ("admission_no", &self.admission_no),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(PortalError::Validation(format!("{field} is required")));
            }
        }

        if self.year_of_study == 0 {
            return Err(PortalError::Validation(
                "year_of_study must be at least 1".to_string(),
            ));
        }
        if self.course_duration == 0 {
            return Err(PortalError::Validation(
                "course_duration must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Full name joining first/middle/last, skipping an absent middle name.
    pub fn full_name(&self) -> String {
        let middle = self
            .middle_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        [Some(self.first_name.trim()), middle, Some(self.last_name.trim())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One registrant's persisted registration record, with export tracking.
///
/// Invariant: `exported_at` is `Some` exactly when `exported` is true, and the
/// `exported` flag only ever transitions from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub account_id: AccountId,
    #[serde(flatten)]
    pub form: SubmissionForm,
    pub exported: bool,
    pub exported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Administrator-facing view of a submission joined with the owning account's
/// email address.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRecord {
    pub id: SubmissionId,
    pub email: String,
    #[serde(flatten)]
    pub form: SubmissionForm,
    pub exported: bool,
    pub exported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StudentRecord {
    pub fn from_parts(submission: Submission, email: String) -> Self {
        Self {
            id: submission.id,
            email,
            form: submission.form,
            exported: submission.exported,
            exported_at: submission.exported_at,
            created_at: submission.created_at,
        }
    }
}

/// Registrant-facing summary of their own submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<DateTime<Utc>>,
}

impl SubmissionStatus {
    pub fn not_submitted() -> Self {
        Self {
            submitted: false,
            name: None,
            submission_date: None,
        }
    }
}
