//! Tabular rendering of submissions into the fixed enrollment sheet layout.

use chrono::NaiveDate;

use crate::portal::domain::Submission;
use crate::portal::error::PortalError;

/// Column order is a fixed contract with the downstream enrollment system.
pub const HEADERS: [&str; 15] = [
    "FormFourIndexNo",
    "FirstName",
    "MiddleName",
    "LastName",
    "DateOfBirth",
    "MaritalStatus",
    "Gender",
    "AdmissionDate",
    "MobileNo",
    "CourseName",
    "CollegeFaculty",
    "YearOfStudy",
    "CourseDuration",
    "NationalID",
    "AdmissionNo",
];

pub const CONTENT_TYPE: &str = "text/csv";

/// Every exported row carries the institution's faculty constant.
const COLLEGE_FACULTY: &str = "DMI";

/// Render the selection in order. Dates use the display form the enrollment
/// office expects, not ISO.
pub(crate) fn render(rows: &[Submission]) -> Result<Vec<u8>, PortalError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(HEADERS)
        .map_err(render_failure)?;

    for submission in rows {
        let form = &submission.form;
        let date_of_birth = display_date(form.date_of_birth);
        let admission_date = display_date(form.admission_date);
        let year_of_study = form.year_of_study.to_string();
        let course_duration = form.course_duration.to_string();
        writer
            .write_record([
                form.form_four_index_no.as_str(),
                form.first_name.as_str(),
                form.middle_name.as_deref().unwrap_or(""),
                form.last_name.as_str(),
                date_of_birth.as_str(),
                form.marital_status.as_str(),
                form.gender.as_str(),
                admission_date.as_str(),
                form.mobile_no.as_str(),
                form.course_name.as_str(),
                COLLEGE_FACULTY,
                year_of_study.as_str(),
                course_duration.as_str(),
                form.national_id.as_str(),
                form.admission_no.as_str(),
            ])
            .map_err(render_failure)?;
    }

    writer
        .into_inner()
        .map_err(|err| PortalError::Storage(format!("export rendering failed: {err}")))
}

fn display_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

fn render_failure(err: csv::Error) -> PortalError {
    PortalError::Storage(format!("export rendering failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::domain::{AccountId, SubmissionForm, SubmissionId};
    use chrono::Utc;

    fn submission() -> Submission {
        Submission {
            id: SubmissionId(1),
            account_id: AccountId(1),
            form: SubmissionForm {
                form_four_index_no: "S0123/0042/2021".to_string(),
                first_name: "Asha".to_string(),
                middle_name: None,
                last_name: "Mwinyi".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(2001, 4, 12).expect("valid date"),
                marital_status: "Single".to_string(),
                gender: "Female".to_string(),
                admission_date: NaiveDate::from_ymd_opt(2024, 9, 2).expect("valid date"),
                mobile_no: "+255700000001".to_string(),
                course_name: "Maritime Transport".to_string(),
                year_of_study: 1,
                course_duration: 3,
                national_id: "20010412-00001-00001-01".to_string(),
                admission_no: "DMI/2024/001".to_string(),
            },
            exported: false,
            exported_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn renders_header_and_row_in_contract_order() {
        let bytes = render(&[submission()]).expect("render");
        let text = String::from_utf8(bytes).expect("utf8");
        let mut lines = text.lines();

        let header = lines.next().expect("header row");
        assert_eq!(header, HEADERS.join(","));
        let row = lines.next().expect("data row");
        assert!(row.starts_with("S0123/0042/2021,Asha,,Mwinyi,4/12/2001,"));
        assert!(row.contains(",Maritime Transport,DMI,1,3,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn dates_use_display_form() {
        assert_eq!(
            display_date(NaiveDate::from_ymd_opt(2024, 11, 3).expect("valid date")),
            "11/3/2024"
        );
        assert_eq!(
            display_date(NaiveDate::from_ymd_opt(2001, 4, 12).expect("valid date")),
            "4/12/2001"
        );
    }
}
