//! Shared fixtures: a fully wired portal over the in-memory stores.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use nhif_enroll::portal::{
    AccountStore, AuthService, Caller, DirectoryService, EnrollmentService, ExportService,
    MemoryAccounts, MemoryReferences, MemorySubmissions, PortalServices, Role, SubmissionForm,
};

pub struct Portal {
    pub accounts: Arc<MemoryAccounts>,
    pub submissions: Arc<MemorySubmissions>,
    pub references: Arc<MemoryReferences>,
    pub auth: Arc<AuthService<MemoryAccounts>>,
    pub enrollment: Arc<EnrollmentService<MemoryAccounts, MemorySubmissions>>,
    pub directory: Arc<DirectoryService<MemoryReferences, MemorySubmissions>>,
    pub export: Arc<ExportService<MemorySubmissions>>,
}

impl Portal {
    pub fn new() -> Self {
        let accounts = Arc::new(MemoryAccounts::default());
        let submissions = Arc::new(MemorySubmissions::default());
        let references = Arc::new(MemoryReferences::default());

        Self {
            auth: Arc::new(AuthService::new(accounts.clone(), Duration::hours(24))),
            enrollment: Arc::new(EnrollmentService::new(
                accounts.clone(),
                submissions.clone(),
            )),
            directory: Arc::new(DirectoryService::new(
                references.clone(),
                submissions.clone(),
            )),
            export: Arc::new(ExportService::new(submissions.clone())),
            accounts,
            submissions,
            references,
        }
    }

    pub fn services(
        &self,
    ) -> PortalServices<MemoryAccounts, MemorySubmissions, MemoryReferences> {
        PortalServices {
            auth: self.auth.clone(),
            enrollment: self.enrollment.clone(),
            directory: self.directory.clone(),
            export: self.export.clone(),
        }
    }
}

/// Insert an administrator account directly and return its caller identity.
pub fn admin_caller(portal: &Portal) -> Caller {
    let account = portal
        .accounts
        .insert("dean@dmi.ac.tz", "not-a-real-hash", Role::Administrator)
        .expect("admin account");
    Caller {
        account_id: account.id,
        role: Role::Administrator,
    }
}

/// Insert a registrant account directly and return its caller identity.
pub fn registrant(portal: &Portal, email: &str) -> Caller {
    let account = portal
        .accounts
        .insert(email, "not-a-real-hash", Role::Registrant)
        .expect("registrant account");
    Caller {
        account_id: account.id,
        role: Role::Registrant,
    }
}

/// A complete, valid registration form for the given course.
pub fn form(course: &str) -> SubmissionForm {
    SubmissionForm {
        form_four_index_no: "S0123/0042/2021".to_string(),
        first_name: "Asha".to_string(),
        middle_name: Some("Juma".to_string()),
        last_name: "Mwinyi".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2001, 4, 12).expect("valid date"),
        marital_status: "Single".to_string(),
        gender: "Female".to_string(),
        admission_date: NaiveDate::from_ymd_opt(2024, 9, 2).expect("valid date"),
        mobile_no: "+255700000001".to_string(),
        course_name: course.to_string(),
        year_of_study: 1,
        course_duration: 3,
        national_id: "20010412-00001-00001-01".to_string(),
        admission_no: "DMI/2024/001".to_string(),
    }
}
