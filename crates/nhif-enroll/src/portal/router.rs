//! HTTP gateway: binds verbs and paths to the portal services and translates
//! domain errors into status codes. All role enforcement lives in the services;
//! the router only resolves bearer tokens to callers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::auth::AuthService;
use super::directory::DirectoryService;
use super::domain::{SubmissionForm, SubmissionId};
use super::enrollment::{EnrollmentService, StudentQuery};
use super::error::PortalError;
use super::export::{ExportDocument, ExportSelection, ExportService};
use super::store::{AccountStore, ReferenceStore, SubmissionStore};

/// Shared handler state: one Arc per service, cheap to clone per request.
pub struct PortalServices<A, S, R> {
    pub auth: Arc<AuthService<A>>,
    pub enrollment: Arc<EnrollmentService<A, S>>,
    pub directory: Arc<DirectoryService<R, S>>,
    pub export: Arc<ExportService<S>>,
}

impl<A, S, R> Clone for PortalServices<A, S, R> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
            enrollment: self.enrollment.clone(),
            directory: self.directory.clone(),
            export: self.export.clone(),
        }
    }
}

/// Router builder exposing the portal HTTP surface.
pub fn portal_router<A, S, R>(services: PortalServices<A, S, R>) -> Router
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    Router::new()
        .route("/auth/register", post(register_handler::<A, S, R>))
        .route("/auth/login", post(login_handler::<A, S, R>))
        .route("/auth/verify", get(verify_handler::<A, S, R>))
        .route(
            "/dynamic-fields",
            get(catalog_handler::<A, S, R>)
                .post(add_field_handler::<A, S, R>)
                .delete(delete_field_handler::<A, S, R>),
        )
        .route(
            "/dynamic-fields/:category",
            get(field_values_handler::<A, S, R>),
        )
        .route("/students/submit", post(submit_handler::<A, S, R>))
        .route(
            "/students/submission-status",
            get(submission_status_handler::<A, S, R>),
        )
        .route("/students", get(list_students_handler::<A, S, R>))
        .route(
            "/students/stats/summary",
            get(stats_summary_handler::<A, S, R>),
        )
        .route(
            "/students/export/batch",
            post(export_selected_handler::<A, S, R>),
        )
        .route(
            "/students/export/selected",
            post(export_selected_handler::<A, S, R>),
        )
        .route("/students/export/new", post(export_new_handler::<A, S, R>))
        .route("/students/:id", get(get_student_handler::<A, S, R>))
        .route(
            "/students/:id/export",
            post(export_single_handler::<A, S, R>),
        )
        .route("/admin/students", post(search_students_handler::<A, S, R>))
        .route(
            "/admin/students/export-all-pending",
            post(export_all_pending_handler::<A, S, R>),
        )
        .route("/dashboard/stats", get(dashboard_handler::<A, S, R>))
        .route(
            "/admin/clear-student-data",
            post(clear_student_data_handler::<A, S, R>),
        )
        .with_state(services)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CredentialsRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldValueRequest {
    pub(crate) field_name: String,
    pub(crate) field_value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportIdsRequest {
    #[serde(default)]
    pub(crate) ids: Vec<SubmissionId>,
}

async fn register_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    services.auth.register(&request.email, &request.password)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful" })),
    )
        .into_response())
}

async fn login_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let grant = services.auth.login(&request.email, &request.password)?;
    Ok(Json(grant).into_response())
}

async fn verify_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    Ok(Json(json!({
        "valid": true,
        "user": { "id": caller.account_id, "role": caller.role },
    }))
    .into_response())
}

async fn catalog_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let catalog = services.directory.catalog(&caller)?;
    Ok(Json(catalog).into_response())
}

async fn field_values_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Path(category): Path<String>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let values = services.directory.values(&caller, &category)?;
    Ok(Json(values).into_response())
}

async fn add_field_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Json(request): Json<FieldValueRequest>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    services
        .directory
        .add(&caller, &request.field_name, &request.field_value)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Field value added successfully" })),
    )
        .into_response())
}

async fn delete_field_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Json(request): Json<FieldValueRequest>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    services
        .directory
        .remove(&caller, &request.field_name, &request.field_value)?;
    Ok(Json(json!({ "message": "Field value deleted successfully" })).into_response())
}

async fn submit_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Json(form): Json<SubmissionForm>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    services.enrollment.submit(&caller, form)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Information submitted successfully" })),
    )
        .into_response())
}

async fn submission_status_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let status = services.enrollment.submission_status(&caller)?;
    Ok(Json(status).into_response())
}

async fn list_students_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let students = services.enrollment.list(&caller)?;
    Ok(Json(students).into_response())
}

async fn search_students_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Json(query): Json<StudentQuery>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let page = services.enrollment.search(&caller, query)?;
    Ok(Json(page).into_response())
}

async fn get_student_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let student = services.enrollment.get(&caller, SubmissionId(id))?;
    Ok(Json(student).into_response())
}

async fn export_single_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let document = services
        .export
        .export(&caller, ExportSelection::Selected(vec![SubmissionId(id)]))
        .map_err(|err| match err {
            // A bad singleton id reads better as a missing student.
            PortalError::Validation(_) => PortalError::NotFound("student"),
            other => other,
        })?;
    Ok(attachment(document))
}

async fn export_selected_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
    Json(request): Json<ExportIdsRequest>,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let document = services
        .export
        .export(&caller, ExportSelection::Selected(request.ids))?;
    Ok(attachment(document))
}

async fn export_new_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let document = services.export.export(&caller, ExportSelection::NewOnly)?;
    Ok(attachment(document))
}

async fn export_all_pending_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let document = services
        .export
        .export(&caller, ExportSelection::AllPending)?;
    Ok(attachment(document))
}

async fn stats_summary_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let summary = services.enrollment.summary(&caller)?;
    Ok(Json(summary).into_response())
}

async fn dashboard_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let dashboard = services.enrollment.dashboard(&caller)?;
    Ok(Json(dashboard).into_response())
}

async fn clear_student_data_handler<A, S, R>(
    State(services): State<PortalServices<A, S, R>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    A: AccountStore + 'static,
    S: SubmissionStore + 'static,
    R: ReferenceStore + 'static,
{
    let caller = services.auth.authenticate(&headers)?;
    let outcome = services.enrollment.clear_student_data(&caller)?;
    Ok(Json(json!({
        "message": "All student data cleared successfully",
        "studentsRemoved": outcome.students_removed,
        "usersRemoved": outcome.users_removed,
    }))
    .into_response())
}

fn attachment(document: ExportDocument) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", document.filename),
            ),
        ],
        document.bytes,
    )
        .into_response()
}
