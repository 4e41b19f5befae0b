//! Submission intake, review, statistics, and the bulk-clear maintenance action.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::auth::Caller;
use super::domain::{StudentRecord, Submission, SubmissionForm, SubmissionId, SubmissionStatus};
use super::error::PortalError;
use super::store::{AccountStore, ExportFilter, StoreError, SubmissionStore};

/// One bucket of the gender distribution, keyed the way the dashboard reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub gender: String,
    pub count: usize,
}

/// One bucket of the course distribution, keyed the way the dashboard reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseCount {
    pub course_name: String,
    pub count: usize,
}

/// Count of events on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Aggregate counts for the admin summary endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total: usize,
    pub exported: usize,
    pub pending: usize,
    pub by_gender: Vec<GenderCount>,
    pub by_course: Vec<CourseCount>,
}

/// Search, filter, and pagination controls for the admin listing. Every field
/// has a wire default so an empty body means "first page, newest first".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentQuery {
    pub page: usize,
    pub limit: usize,
    pub search: String,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub filter: StatusFilter,
}

impl Default for StudentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: String::new(),
            sort_field: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
            filter: StatusFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    FirstName,
    LastName,
    AdmissionNo,
    CourseName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Exported,
    Pending,
}

/// One page of the filtered admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct StudentPage {
    pub students: Vec<StudentRecord>,
    pub page: usize,
    pub limit: usize,
}

/// Recent activity window for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RecentStats {
    pub registrations: usize,
    pub exports: usize,
}

/// Dashboard aggregates: summary counts plus 7-day activity and daily trends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub summary: StatsSummary,
    pub recent_stats: RecentStats,
    pub trends: TrendStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendStats {
    pub registrations: Vec<DailyCount>,
    pub exports: Vec<DailyCount>,
}

/// Outcome of the bulk-clear maintenance action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    pub students_removed: usize,
    pub users_removed: usize,
}

/// Submission intake and review over the account and submission stores.
pub struct EnrollmentService<A, S> {
    accounts: Arc<A>,
    submissions: Arc<S>,
}

impl<A, S> EnrollmentService<A, S>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
{
    pub fn new(accounts: Arc<A>, submissions: Arc<S>) -> Self {
        Self {
            accounts,
            submissions,
        }
    }

    /// Persist a registrant's one allowed submission.
    pub fn submit(&self, caller: &Caller, form: SubmissionForm) -> Result<Submission, PortalError> {
        caller.require_registrant()?;
        form.validate()?;

        match self.submissions.insert(caller.account_id, form, Utc::now()) {
            Ok(submission) => {
                tracing::info!(
                    submission_id = submission.id.0,
                    account_id = caller.account_id.0,
                    "submission recorded"
                );
                Ok(submission)
            }
            Err(StoreError::Conflict) => Err(PortalError::AlreadySubmitted),
            Err(err) => Err(PortalError::storage(err)),
        }
    }

    /// A registrant's view of their own submission.
    pub fn submission_status(&self, caller: &Caller) -> Result<SubmissionStatus, PortalError> {
        caller.require_registrant()?;
        let submission = self
            .submissions
            .fetch_by_account(caller.account_id)
            .map_err(PortalError::storage)?;

        Ok(match submission {
            Some(submission) => SubmissionStatus {
                submitted: true,
                name: Some(submission.form.full_name()),
                submission_date: Some(submission.created_at),
            },
            None => SubmissionStatus::not_submitted(),
        })
    }

    /// Every submission joined with the owning account's email, newest first.
    pub fn list(&self, caller: &Caller) -> Result<Vec<StudentRecord>, PortalError> {
        caller.require_admin()?;
        let submissions = self
            .submissions
            .list(ExportFilter::All)
            .map_err(PortalError::storage)?;
        self.join_emails(submissions)
    }

    /// Filtered, sorted, paginated listing for the admin console. Search
    /// matches first name, last name, or admission number, case-insensitively.
    pub fn search(&self, caller: &Caller, query: StudentQuery) -> Result<StudentPage, PortalError> {
        caller.require_admin()?;
        if query.page == 0 || query.limit == 0 {
            return Err(PortalError::Validation(
                "page and limit must be at least 1".to_string(),
            ));
        }

        let filter = match query.filter {
            StatusFilter::All => ExportFilter::All,
            StatusFilter::Exported => ExportFilter::ExportedOnly,
            StatusFilter::Pending => ExportFilter::PendingOnly,
        };
        let rows = self
            .submissions
            .list(filter)
            .map_err(PortalError::storage)?;
        let mut records = self.join_emails(rows)?;

        let needle = query.search.trim().to_lowercase();
        if !needle.is_empty() {
            records.retain(|record| {
                record.form.first_name.to_lowercase().contains(&needle)
                    || record.form.last_name.to_lowercase().contains(&needle)
                    || record.form.admission_no.to_lowercase().contains(&needle)
            });
        }

        records.sort_by(|a, b| {
            let ordering = match query.sort_field {
                SortField::CreatedAt => (a.created_at, a.id).cmp(&(b.created_at, b.id)),
                SortField::FirstName => a.form.first_name.cmp(&b.form.first_name),
                SortField::LastName => a.form.last_name.cmp(&b.form.last_name),
                SortField::AdmissionNo => a.form.admission_no.cmp(&b.form.admission_no),
                SortField::CourseName => a.form.course_name.cmp(&b.form.course_name),
            };
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let students = records
            .into_iter()
            .skip((query.page - 1) * query.limit)
            .take(query.limit)
            .collect();
        Ok(StudentPage {
            students,
            page: query.page,
            limit: query.limit,
        })
    }

    /// One submission by id, joined with the owning account's email.
    pub fn get(&self, caller: &Caller, id: SubmissionId) -> Result<StudentRecord, PortalError> {
        caller.require_admin()?;
        let submission = self
            .submissions
            .fetch(id)
            .map_err(PortalError::storage)?
            .ok_or(PortalError::NotFound("student"))?;
        let email = self.email_for(&submission)?;
        Ok(StudentRecord::from_parts(submission, email))
    }

    /// Maintenance action: remove every submission, then every registrant account.
    pub fn clear_student_data(&self, caller: &Caller) -> Result<ClearOutcome, PortalError> {
        caller.require_admin()?;

        let mut tx = self.submissions.begin().map_err(PortalError::storage)?;
        let students_removed = tx.clear().map_err(PortalError::storage)?;
        tx.commit().map_err(PortalError::storage)?;

        let users_removed = self
            .accounts
            .remove_registrants()
            .map_err(PortalError::storage)?;

        tracing::warn!(students_removed, users_removed, "student data cleared");
        Ok(ClearOutcome {
            students_removed,
            users_removed,
        })
    }

    pub fn summary(&self, caller: &Caller) -> Result<StatsSummary, PortalError> {
        caller.require_admin()?;
        let rows = self
            .submissions
            .list(ExportFilter::All)
            .map_err(PortalError::storage)?;
        Ok(summarize(&rows))
    }

    pub fn dashboard(&self, caller: &Caller) -> Result<DashboardStats, PortalError> {
        caller.require_admin()?;
        let rows = self
            .submissions
            .list(ExportFilter::All)
            .map_err(PortalError::storage)?;

        let window_start = Utc::now() - Duration::days(7);
        let recent_registrations: Vec<_> = rows
            .iter()
            .filter(|row| row.created_at >= window_start)
            .collect();
        let recent_exports: Vec<_> = rows
            .iter()
            .filter(|row| {
                row.exported_at
                    .map(|at| at >= window_start)
                    .unwrap_or(false)
            })
            .collect();

        let registrations_trend = daily_counts(
            recent_registrations
                .iter()
                .map(|row| row.created_at.date_naive()),
        );
        let exports_trend = daily_counts(
            recent_exports
                .iter()
                .filter_map(|row| row.exported_at.map(|at| at.date_naive())),
        );

        Ok(DashboardStats {
            summary: summarize(&rows),
            recent_stats: RecentStats {
                registrations: recent_registrations.len(),
                exports: recent_exports.len(),
            },
            trends: TrendStats {
                registrations: registrations_trend,
                exports: exports_trend,
            },
        })
    }

    fn join_emails(&self, submissions: Vec<Submission>) -> Result<Vec<StudentRecord>, PortalError> {
        submissions
            .into_iter()
            .map(|submission| {
                let email = self.email_for(&submission)?;
                Ok(StudentRecord::from_parts(submission, email))
            })
            .collect()
    }

    fn email_for(&self, submission: &Submission) -> Result<String, PortalError> {
        Ok(self
            .accounts
            .fetch(submission.account_id)
            .map_err(PortalError::storage)?
            .map(|account| account.email)
            .unwrap_or_default())
    }
}

fn summarize(rows: &[Submission]) -> StatsSummary {
    let exported = rows.iter().filter(|row| row.exported).count();
    StatsSummary {
        total: rows.len(),
        exported,
        pending: rows.len() - exported,
        by_gender: distribution(rows.iter().map(|row| row.form.gender.clone()))
            .into_iter()
            .map(|(gender, count)| GenderCount { gender, count })
            .collect(),
        by_course: distribution(rows.iter().map(|row| row.form.course_name.clone()))
            .into_iter()
            .map(|(course_name, count)| CourseCount { course_name, count })
            .collect(),
    }
}

fn distribution(keys: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0usize) += 1;
    }
    let mut buckets: Vec<(String, usize)> = counts.into_iter().collect();
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    buckets
}

fn daily_counts(dates: impl Iterator<Item = NaiveDate>) -> Vec<DailyCount> {
    let mut counts = BTreeMap::new();
    for date in dates {
        *counts.entry(date).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}
