//! In-memory store implementations backing the shipping service and tests.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{Account, AccountId, Role, Submission, SubmissionForm, SubmissionId};
use super::store::{
    AccountStore, ExportFilter, ReferenceStore, ReferenceValue, StoreError, SubmissionStore,
    SubmissionTx,
};

fn poisoned(table: &str) -> StoreError {
    StoreError::Unavailable(format!("{table} table mutex poisoned"))
}

/// Account table guarded by a mutex.
#[derive(Default)]
pub struct MemoryAccounts {
    inner: Mutex<AccountTable>,
}

#[derive(Default)]
struct AccountTable {
    rows: Vec<Account>,
    next_id: i64,
}

impl AccountStore for MemoryAccounts {
    fn insert(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Account, StoreError> {
        let mut table = self.inner.lock().map_err(|_| poisoned("account"))?;
        if table
            .rows
            .iter()
            .any(|account| account.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::Conflict);
        }

        table.next_id += 1;
        let account = Account {
            id: AccountId(table.next_id),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: Utc::now(),
        };
        table.rows.push(account.clone());
        Ok(account)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let table = self.inner.lock().map_err(|_| poisoned("account"))?;
        Ok(table
            .rows
            .iter()
            .find(|account| account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn fetch(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let table = self.inner.lock().map_err(|_| poisoned("account"))?;
        Ok(table.rows.iter().find(|account| account.id == id).cloned())
    }

    fn remove_registrants(&self) -> Result<usize, StoreError> {
        let mut table = self.inner.lock().map_err(|_| poisoned("account"))?;
        let before = table.rows.len();
        table.rows.retain(|account| account.role != Role::Registrant);
        Ok(before - table.rows.len())
    }
}

/// Submission table guarded by a mutex; transactions hold the lock for their
/// lifetime and stage changes against a working copy, so a dropped transaction
/// rolls back and concurrent transactions serialize.
#[derive(Default)]
pub struct MemorySubmissions {
    inner: Mutex<SubmissionTable>,
}

#[derive(Default, Clone)]
struct SubmissionTable {
    rows: Vec<Submission>,
    next_id: i64,
}

impl SubmissionStore for MemorySubmissions {
    fn begin(&self) -> Result<Box<dyn SubmissionTx + '_>, StoreError> {
        let guard = self.inner.lock().map_err(|_| poisoned("submission"))?;
        let working = guard.clone();
        Ok(Box::new(MemorySubmissionTx { guard, working }))
    }
}

struct MemorySubmissionTx<'a> {
    guard: MutexGuard<'a, SubmissionTable>,
    working: SubmissionTable,
}

impl SubmissionTx for MemorySubmissionTx<'_> {
    fn insert(
        &mut self,
        account_id: AccountId,
        form: SubmissionForm,
        now: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        if self
            .working
            .rows
            .iter()
            .any(|row| row.account_id == account_id)
        {
            return Err(StoreError::Conflict);
        }

        self.working.next_id += 1;
        let submission = Submission {
            id: SubmissionId(self.working.next_id),
            account_id,
            form,
            exported: false,
            exported_at: None,
            created_at: now,
        };
        self.working.rows.push(submission.clone());
        Ok(submission)
    }

    fn fetch(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.working.rows.iter().find(|row| row.id == id).cloned())
    }

    fn fetch_by_account(&self, account_id: AccountId) -> Result<Option<Submission>, StoreError> {
        Ok(self
            .working
            .rows
            .iter()
            .find(|row| row.account_id == account_id)
            .cloned())
    }

    fn list(&self, filter: ExportFilter) -> Result<Vec<Submission>, StoreError> {
        let mut rows: Vec<Submission> = self
            .working
            .rows
            .iter()
            .filter(|row| match filter {
                ExportFilter::All => true,
                ExportFilter::PendingOnly => !row.exported,
                ExportFilter::ExportedOnly => row.exported,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    fn select(&self, ids: &[SubmissionId]) -> Result<Vec<Submission>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.rows.iter().find(|row| row.id == *id))
            .cloned()
            .collect())
    }

    fn course_in_use(&self, course: &str) -> Result<bool, StoreError> {
        Ok(self
            .working
            .rows
            .iter()
            .any(|row| row.form.course_name == course))
    }

    fn mark_exported(
        &mut self,
        ids: &[SubmissionId],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut updated = 0;
        for id in ids {
            if let Some(row) = self.working.rows.iter_mut().find(|row| row.id == *id) {
                if !row.exported {
                    row.exported = true;
                    row.exported_at = Some(now);
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.working.rows.len();
        self.working.rows.clear();
        Ok(removed)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemorySubmissionTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

/// Reference data table guarded by a mutex.
#[derive(Default)]
pub struct MemoryReferences {
    inner: Mutex<Vec<ReferenceValue>>,
}

impl ReferenceStore for MemoryReferences {
    fn list(&self, category: &str) -> Result<Vec<String>, StoreError> {
        let rows = self.inner.lock().map_err(|_| poisoned("reference"))?;
        let mut values: Vec<String> = rows
            .iter()
            .filter(|row| row.field_name == category)
            .map(|row| row.field_value.clone())
            .collect();
        values.sort();
        Ok(values)
    }

    fn list_all(&self) -> Result<Vec<ReferenceValue>, StoreError> {
        let rows = self.inner.lock().map_err(|_| poisoned("reference"))?;
        let mut all = rows.clone();
        all.sort_by(|a, b| {
            (&a.field_name, &a.field_value).cmp(&(&b.field_name, &b.field_value))
        });
        Ok(all)
    }

    fn add(&self, category: &str, value: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut rows = self.inner.lock().map_err(|_| poisoned("reference"))?;
        if rows
            .iter()
            .any(|row| row.field_name == category && row.field_value == value)
        {
            return Err(StoreError::Conflict);
        }
        rows.push(ReferenceValue {
            field_name: category.to_string(),
            field_value: value.to_string(),
            created_at: now,
        });
        Ok(())
    }

    fn remove(&self, category: &str, value: &str) -> Result<(), StoreError> {
        let mut rows = self.inner.lock().map_err(|_| poisoned("reference"))?;
        let before = rows.len();
        rows.retain(|row| !(row.field_name == category && row.field_value == value));
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn form(course: &str) -> SubmissionForm {
        SubmissionForm {
            form_four_index_no: "S0123/0042/2021".to_string(),
            first_name: "Neema".to_string(),
            middle_name: None,
            last_name: "Kileo".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2002, 1, 20).expect("valid date"),
            marital_status: "Single".to_string(),
            gender: "Female".to_string(),
            admission_date: NaiveDate::from_ymd_opt(2024, 9, 2).expect("valid date"),
            mobile_no: "+255700000002".to_string(),
            course_name: course.to_string(),
            year_of_study: 1,
            course_duration: 3,
            national_id: "20020120-00002-00002-02".to_string(),
            admission_no: "DMI/2024/002".to_string(),
        }
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let store = MemorySubmissions::default();
        {
            let mut tx = store.begin().expect("begin");
            tx.insert(AccountId(1), form("Maritime Transport"), Utc::now())
                .expect("insert staged");
            // dropped without commit
        }
        let rows = store.list(ExportFilter::All).expect("list");
        assert!(rows.is_empty());
    }

    #[test]
    fn committed_transaction_persists() {
        let store = MemorySubmissions::default();
        let mut tx = store.begin().expect("begin");
        tx.insert(AccountId(1), form("Maritime Transport"), Utc::now())
            .expect("insert staged");
        tx.commit().expect("commit");

        let rows = store.list(ExportFilter::All).expect("list");
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].exported);
        assert!(rows[0].exported_at.is_none());
    }

    #[test]
    fn second_submission_for_account_conflicts() {
        let store = MemorySubmissions::default();
        store
            .insert(AccountId(7), form("Maritime Transport"), Utc::now())
            .expect("first insert");
        let err = store
            .insert(AccountId(7), form("Logistics"), Utc::now())
            .expect_err("duplicate rejected");
        assert!(matches!(err, StoreError::Conflict));
    }

    #[test]
    fn mark_exported_is_idempotent_and_skips_unknown_ids() {
        let store = MemorySubmissions::default();
        let submission = store
            .insert(AccountId(1), form("Maritime Transport"), Utc::now())
            .expect("insert");

        let mut tx = store.begin().expect("begin");
        let updated = tx
            .mark_exported(&[submission.id, SubmissionId(999)], Utc::now())
            .expect("mark");
        assert_eq!(updated, 1);
        tx.commit().expect("commit");

        let mut tx = store.begin().expect("begin again");
        let updated = tx
            .mark_exported(&[submission.id], Utc::now())
            .expect("mark again");
        assert_eq!(updated, 0);
        tx.commit().expect("commit");

        let row = store.fetch(submission.id).expect("fetch").expect("present");
        assert!(row.exported);
        assert!(row.exported_at.is_some());
    }

    #[test]
    fn reference_values_sort_ascending_and_reject_duplicates() {
        let store = MemoryReferences::default();
        store
            .add("course_name", "Shipping Management", Utc::now())
            .expect("add");
        store
            .add("course_name", "Maritime Transport", Utc::now())
            .expect("add");
        let err = store
            .add("course_name", "Maritime Transport", Utc::now())
            .expect_err("duplicate rejected");
        assert!(matches!(err, StoreError::Conflict));

        let values = store.list("course_name").expect("list");
        assert_eq!(values, vec!["Maritime Transport", "Shipping Management"]);
        assert!(store.list("no_such_category").expect("list").is_empty());
    }

    #[test]
    fn remove_registrants_keeps_administrators() {
        let store = MemoryAccounts::default();
        store
            .insert("dean@dmi.ac.tz", "hash", Role::Administrator)
            .expect("insert admin");
        store
            .insert("student@dmi.ac.tz", "hash", Role::Registrant)
            .expect("insert student");

        let removed = store.remove_registrants().expect("remove");
        assert_eq!(removed, 1);
        assert!(store
            .find_by_email("dean@dmi.ac.tz")
            .expect("lookup")
            .is_some());
        assert!(store
            .find_by_email("student@dmi.ac.tz")
            .expect("lookup")
            .is_none());
    }
}
