use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use lectern_core::{CatalogStore, Class, Course, CredentialHasher, Unit};
use lectern_db::open_stores;
use lectern_server::{create_router, AppState};

struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

/// Create a test app backed by fresh redb files in a temporary directory.
fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let stores = open_stores(dir.path()).unwrap();
    let hasher = CredentialHasher::with_costs(8, 1, 1).unwrap();
    let state = AppState::with_hasher(stores, hasher);

    TestApp {
        router: create_router(state.clone()),
        state,
        _dir: dir,
    }
}

/// Insert a course with one unit of `classes` classes into the catalog.
fn seed_course(app: &TestApp, classes: usize) -> (Course, Vec<Class>) {
    let mut course = Course::new("Rust", "Ownership and borrowing");
    let mut unit = Unit::new(course.id, "Basics");
    let mut seeded = Vec::new();
    for i in 0..classes {
        let class = Class::new(unit.id, format!("Class {}", i + 1));
        unit.classes.push(class.id);
        app.state.catalog.insert(&class).unwrap();
        seeded.push(class);
    }
    course.units.push(unit.id);
    app.state.catalog.insert(&unit).unwrap();
    app.state.catalog.insert(&course).unwrap();
    (course, seeded)
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &TestApp, email: &str) {
    let (status, _) = send(
        app,
        "POST",
        "/users",
        Some(json!({"name": "Ana", "email": email, "password": "s3cret"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn enroll(app: &TestApp, email: &str, course: &Course) {
    let (status, _) = send(
        app,
        "POST",
        "/enrollments",
        Some(json!({"email": email, "password": "s3cret", "course_id": course.id.to_hex()})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

// ============================================================================
// Health endpoint tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending_repairs"], 0);
}

// ============================================================================
// User and enrollment tests
// ============================================================================

#[tokio::test]
async fn test_register_and_list_users() {
    let app = create_test_app();
    register(&app, "ana@example.com").await;

    let (status, body) = send(&app, "GET", "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["email"], "ana@example.com");
    assert!(body[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_conflicts() {
    let app = create_test_app();
    register(&app, "ana@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"name": "Ana", "email": "ana@example.com", "password": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_enroll_twice_conflicts() {
    let app = create_test_app();
    let (course, _) = seed_course(&app, 1);
    register(&app, "ana@example.com").await;
    enroll(&app, "ana@example.com", &course).await;

    let (status, _) = send(
        &app,
        "POST",
        "/enrollments",
        Some(json!({
            "email": "ana@example.com",
            "password": "s3cret",
            "course_id": course.id.to_hex()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "POST",
        "/me/courses",
        Some(json!({"email": "ana@example.com", "password": "s3cret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Rust");
}

#[tokio::test]
async fn test_wrong_password_unauthorized() {
    let app = create_test_app();
    register(&app, "ana@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/me/progress",
        Some(json!({"email": "ana@example.com", "password": "guess"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "auth");
}

#[tokio::test]
async fn test_progress_flow() {
    let app = create_test_app();
    let (course, classes) = seed_course(&app, 2);
    register(&app, "ana@example.com").await;
    enroll(&app, "ana@example.com", &course).await;

    let view = |class: &Class| {
        json!({"email": "ana@example.com", "password": "s3cret", "class_id": class.id.to_hex()})
    };

    let (status, body) = send(&app, "POST", "/me/views", Some(view(&classes[0]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "EN_CURSO");

    let (_, body) = send(&app, "POST", "/me/views", Some(view(&classes[1]))).await;
    assert_eq!(body["status"], "COMPLETADO");

    let (status, _) = send(&app, "POST", "/me/views", Some(view(&classes[1]))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Rating tests
// ============================================================================

#[tokio::test]
async fn test_rating_updates_average() {
    let app = create_test_app();
    let (course, _) = seed_course(&app, 1);
    let uri = format!("/courses/{}/ratings", course.id);

    for (email, value) in [("a@example.com", 2.0), ("b@example.com", 4.0)] {
        register(&app, email).await;
        enroll(&app, email, &course).await;
        let (status, _) = send(
            &app,
            "POST",
            &uri,
            Some(json!({"email": email, "password": "s3cret", "value": value})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", &format!("/courses/{}/rating", course.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["average"], 3.0);

    let stored: Course = app.state.catalog.find_by_id(course.id).unwrap().unwrap();
    assert_eq!(stored.rating, 3.0);
}

#[tokio::test]
async fn test_rating_validation() {
    let app = create_test_app();
    let (course, _) = seed_course(&app, 1);
    register(&app, "ana@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/courses/{}/ratings", course.id),
        Some(json!({"email": "ana@example.com", "password": "s3cret", "value": 7.5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/courses/{}/ratings", course.id),
        Some(json!({"email": "ana@example.com", "password": "s3cret", "value": 4.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", "/courses/not-an-id/rating", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Comment, review and migration tests
// ============================================================================

#[tokio::test]
async fn test_comments_after_migration() {
    let app = create_test_app();
    let (_, classes) = seed_course(&app, 2);
    register(&app, "ana@example.com").await;
    let uri = format!("/classes/{}/comments", classes[0].id);
    let comment = json!({
        "email": "ana@example.com",
        "password": "s3cret",
        "title": "Question",
        "body": "What about lifetimes?"
    });

    // Class nodes only exist once migrated
    let (status, _) = send(&app, "POST", &uri, Some(comment.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = send(&app, "POST", "/admin/migrate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["users_created"], 1);
    assert_eq!(report["classes_created"], 2);

    let (status, created) = send(&app, "POST", &uri, Some(comment)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["author"], "ana@example.com");

    let (status, listed) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Question");

    let other = format!("/classes/{}/comments", classes[1].id);
    let (_, listed) = send(&app, "GET", &other, None).await;
    assert!(listed.as_array().unwrap().is_empty());

    // Second run creates nothing new
    let (_, report) = send(&app, "POST", "/admin/migrate", None).await;
    assert_eq!(report["users_created"], 0);
    assert_eq!(report["classes_created"], 0);
}

#[tokio::test]
async fn test_course_reviews() {
    let app = create_test_app();
    let (course, _) = seed_course(&app, 1);
    register(&app, "ana@example.com").await;
    let uri = format!("/courses/{}/reviews", course.id);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(json!({"email": "ana@example.com", "password": "s3cret", "text": "meh"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(json!({
            "email": "ana@example.com",
            "password": "s3cret",
            "text": "Thorough and well structured"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/users/ana@example.com/reviews", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["course_name"], "Rust");
}
