//! Integration tests for the HTTP gateway: token handling, role
//! enforcement, wire formats, and the end-to-end submit/export scenario.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use common::{form, Portal};
use nhif_enroll::portal::portal_router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(portal: &Portal) -> axum::Router {
    portal_router(portal.services())
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router dispatch");
    let status = response.status();
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload = if content_type.as_deref() == Some("text/csv") {
        Value::String(String::from_utf8(bytes.to_vec()).expect("utf8 document"))
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, payload, disposition)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

async fn login(router: &axum::Router, email: &str, password: &str) -> String {
    let (status, payload, _) = send(
        router,
        post_json(
            "/auth/login",
            None,
            json!({ "email": email, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    payload
        .get("token")
        .and_then(Value::as_str)
        .expect("token issued")
        .to_string()
}

#[tokio::test]
async fn register_login_verify_roundtrip() {
    let portal = Portal::new();
    let router = router(&portal);

    let (status, payload, _) = send(
        &router,
        post_json(
            "/auth/register",
            None,
            json!({ "email": "asha@dmi.ac.tz", "password": "correct horse" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        payload.get("message").and_then(Value::as_str),
        Some("Registration successful")
    );

    // duplicate email
    let (status, _, _) = send(
        &router,
        post_json(
            "/auth/register",
            None,
            json!({ "email": "asha@dmi.ac.tz", "password": "other" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let token = login(&router, "asha@dmi.ac.tz", "correct horse").await;
    let (status, payload, _) = send(&router, get("/auth/verify", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload.get("valid"), Some(&json!(true)));
    assert_eq!(
        payload.pointer("/user/role").and_then(Value::as_str),
        Some("student")
    );
}

#[tokio::test]
async fn bad_credentials_and_missing_tokens_are_unauthorized() {
    let portal = Portal::new();
    let router = router(&portal);

    let (status, _, _) = send(
        &router,
        post_json(
            "/auth/login",
            None,
            json!({ "email": "nobody@dmi.ac.tz", "password": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&router, get("/students", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&router, get("/students", Some("forged-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registrant_tokens_cannot_reach_admin_routes() {
    let portal = Portal::new();
    let router = router(&portal);
    portal
        .auth
        .register("asha@dmi.ac.tz", "pw")
        .expect("register");
    let token = login(&router, "asha@dmi.ac.tz", "pw").await;

    let (status, _, _) = send(&router, get("/students", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &router,
        post_json(
            "/admin/students/export-all-pending",
            Some(&token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &router,
        post_json("/admin/students", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &router,
        post_json(
            "/dynamic-fields",
            Some(&token),
            json!({ "fieldName": "course_name", "fieldValue": "Logistics" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dynamic_fields_surface_sorted_values() {
    let portal = Portal::new();
    let router = router(&portal);
    portal.auth.seed_admin("dean@dmi.ac.tz", "pass123#").expect("seed");
    let admin_token = login(&router, "dean@dmi.ac.tz", "pass123#").await;

    for course in ["Shipping Management", "Maritime Transport"] {
        let (status, _, _) = send(
            &router,
            post_json(
                "/dynamic-fields",
                Some(&admin_token),
                json!({ "fieldName": "course_name", "fieldValue": course }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, payload, _) = send(
        &router,
        get("/dynamic-fields/course_name", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        payload,
        json!(["Maritime Transport", "Shipping Management"])
    );

    // duplicate add conflicts
    let (status, _, _) = send(
        &router,
        post_json(
            "/dynamic-fields",
            Some(&admin_token),
            json!({ "fieldName": "course_name", "fieldValue": "Maritime Transport" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // unknown category is an empty list, not an error
    let (status, payload, _) = send(
        &router,
        get("/dynamic-fields/no_such_category", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload, json!([]));
}

#[tokio::test]
async fn end_to_end_submit_and_export_scenario() {
    let portal = Portal::new();
    let router = router(&portal);
    portal.auth.seed_admin("dean@dmi.ac.tz", "pass123#").expect("seed");

    portal
        .auth
        .register("asha@dmi.ac.tz", "pw")
        .expect("register");
    let student_token = login(&router, "asha@dmi.ac.tz", "pw").await;

    let (status, _, _) = send(
        &router,
        post_json(
            "/students/submit",
            Some(&student_token),
            serde_json::to_value(form("Maritime Transport")).expect("form json"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // resubmission is rejected
    let (status, payload, _) = send(
        &router,
        post_json(
            "/students/submit",
            Some(&student_token),
            serde_json::to_value(form("Maritime Transport")).expect("form json"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("already submitted"));

    let (status, payload, _) = send(
        &router,
        get("/students/submission-status", Some(&student_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload.get("submitted"), Some(&json!(true)));

    let admin_token = login(&router, "dean@dmi.ac.tz", "pass123#").await;
    let (status, payload, _) = send(&router, get("/students", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    let records = payload.as_array().expect("student array");
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("email").and_then(Value::as_str),
        Some("asha@dmi.ac.tz")
    );
    assert_eq!(records[0].get("exported"), Some(&json!(false)));

    let (status, document, disposition) = send(
        &router,
        post_json(
            "/admin/students/export-all-pending",
            Some(&admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let disposition = disposition.expect("attachment disposition");
    assert!(disposition.starts_with("attachment; filename=pending_students_"));
    let text = document.as_str().expect("csv text");
    assert!(text.contains("Maritime Transport"));
    assert!(text.contains(",DMI,"));

    // the flip committed with the document: nothing pending remains
    let (status, payload, _) = send(
        &router,
        post_json(
            "/admin/students/export-all-pending",
            Some(&admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("No pending students")
        || payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .contains("no pending students"));

    let (status, payload, _) = send(&router, get("/students/stats/summary", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload.get("total"), Some(&json!(1)));
    assert_eq!(payload.get("exported"), Some(&json!(1)));
    assert_eq!(payload.get("pending"), Some(&json!(0)));
}

#[tokio::test]
async fn admin_students_search_endpoint_pages_and_filters() {
    let portal = Portal::new();
    let router = router(&portal);
    portal.auth.seed_admin("dean@dmi.ac.tz", "pass123#").expect("seed");

    for (email, first, last, admission) in [
        ("asha@dmi.ac.tz", "Asha", "Mwinyi", "DMI/2024/001"),
        ("neema@dmi.ac.tz", "Neema", "Kileo", "DMI/2024/002"),
    ] {
        portal.auth.register(email, "pw").expect("register");
        let token = login(&router, email, "pw").await;
        let mut body = serde_json::to_value(form("Maritime Transport")).expect("form json");
        body["first_name"] = json!(first);
        body["last_name"] = json!(last);
        body["admission_no"] = json!(admission);
        let (status, _, _) = send(
            &router,
            post_json("/students/submit", Some(&token), body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let admin_token = login(&router, "dean@dmi.ac.tz", "pass123#").await;
    let (status, payload, _) = send(
        &router,
        post_json(
            "/admin/students",
            Some(&admin_token),
            json!({ "search": "kileo" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let students = payload
        .pointer("/students")
        .and_then(Value::as_array)
        .expect("students array");
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].get("last_name").and_then(Value::as_str),
        Some("Kileo")
    );
    assert_eq!(payload.get("page"), Some(&json!(1)));
    assert_eq!(payload.get("limit"), Some(&json!(10)));

    let (status, payload, _) = send(
        &router,
        post_json(
            "/admin/students",
            Some(&admin_token),
            json!({
                "filter": "pending",
                "sortField": "first_name",
                "sortOrder": "asc",
                "page": 1,
                "limit": 1,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let students = payload
        .pointer("/students")
        .and_then(Value::as_array)
        .expect("students array");
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].get("first_name").and_then(Value::as_str),
        Some("Asha")
    );
}

#[tokio::test]
async fn selected_export_routes_validate_ids() {
    let portal = Portal::new();
    let router = router(&portal);
    portal.auth.seed_admin("dean@dmi.ac.tz", "pass123#").expect("seed");
    let admin_token = login(&router, "dean@dmi.ac.tz", "pass123#").await;

    let (status, _, _) = send(
        &router,
        post_json(
            "/students/export/selected",
            Some(&admin_token),
            json!({ "ids": [12345] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &router,
        post_json(
            "/students/export/batch",
            Some(&admin_token),
            json!({ "ids": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the singleton route reports a missing student
    let (status, _, _) = send(
        &router,
        post_json("/students/99/export", Some(&admin_token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
