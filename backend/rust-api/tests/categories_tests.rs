use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::json;
use serial_test::serial;
use tower::ServiceExt;

mod common;

use common::{count, create_db_test_app, create_test_app, send};

#[tokio::test]
async fn test_create_category_reports_missing_fields_in_order() {
    let app = create_test_app().await;

    let cases = [
        (json!({}), json!(["name", "description", "language"])),
        (json!({ "description": "d" }), json!(["name", "language"])),
        (json!({ "name": "Geo", "language": "eng" }), json!(["description"])),
        (
            json!({ "name": "", "description": null, "language": "fr" }),
            json!(["name", "description"]),
        ),
    ];

    for (body, missing) in cases {
        let (status, json) = send(&app, "POST", "/categories", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json["message"], "Missing parameters");
        assert_eq!(json["missing"], missing);
    }
}

#[tokio::test]
async fn test_create_category_rejects_unknown_language() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        "POST",
        "/categories",
        Some(json!({ "name": "Geo", "description": "d", "language": "de" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Language must be part of [eng,fr]");
    assert_eq!(json["invalidParams"], "de");
}

#[tokio::test]
async fn test_create_category_rejects_non_string_fields() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        "POST",
        "/categories",
        Some(json!({ "name": 42, "description": "d", "language": "eng" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Parameters must be strings");
    assert_eq!(json["invalidParams"], json!(["name"]));
}

#[tokio::test]
async fn test_malformed_json_body_is_rejected() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/categories")
                .header("content-type", "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed JSON body"));
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let app = create_test_app().await;

    for method in ["GET", "DELETE"] {
        let (status, json) = send(&app, method, "/categories/not-an-id", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Category not found");
    }

    let (status, _) = send(
        &app,
        "PATCH",
        "/categories/not-an-id",
        Some(json!({ "name": "Geo" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_requires_non_empty_array() {
    let app = create_test_app().await;

    for body in [
        json!({}),
        json!({ "categories": [] }),
        json!({ "categories": "Geo" }),
    ] {
        let (status, json) = send(&app, "POST", "/categories/bulk", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Categories must be a non-empty array");
    }
}

#[tokio::test]
async fn test_csv_import_is_not_implemented() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "POST", "/categories/csv", None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json["message"], "CSV import is not implemented");
}

#[tokio::test]
async fn test_preflight_short_circuits_with_cors_headers() {
    let app = create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/categories")
                .header("origin", "http://localhost:5173")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );

    // a bare OPTIONS without CORS headers still gets an empty 200
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/questions/bulk")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "GET", "/games", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Route not found");
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    let app = create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/categories/not-an-id")
                .header("x-trace-id", "trace-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-trace-id"], "trace-123");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/categories/not-an-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-trace-id"));
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_http_counters() {
    let app = create_test_app().await;

    send(&app, "GET", "/categories/not-an-id", None).await;
    send(&app, "GET", "/no/such/route-4821", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
    assert!(text.contains(r#"path="/categories/{id}""#));
    assert!(text.contains(r#"path="unmatched""#));
    assert!(!text.contains("not-an-id"));
    assert!(!text.contains("route-4821"));
}

// The tests below need a MongoDB replica set at the configured URI

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_category_lifecycle() {
    let (app, _db) = create_db_test_app().await;

    let (status, created) = send(
        &app,
        "POST",
        "/categories",
        Some(json!({ "name": "Geography", "description": "Maps", "language": "eng" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["language"], "eng");

    let (status, fetched) = send(&app, "GET", &format!("/categories/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Geography");

    let (status, list) = send(&app, "GET", "/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, deleted) = send(&app, "DELETE", &format!("/categories/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deletedCategory"]["id"], id.as_str());

    let (status, _) = send(&app, "GET", &format!("/categories/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_duplicate_name_is_a_validation_failure() {
    let (app, db) = create_db_test_app().await;
    let body = json!({ "name": "History", "description": "Dates", "language": "fr" });

    let (status, _) = send(&app, "POST", "/categories", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, "POST", "/categories", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("E11000"));
    assert_eq!(count(&db, "categories").await, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_update_only_moves_updated_at_on_real_change() {
    let (app, _db) = create_db_test_app().await;

    let (_, created) = send(
        &app,
        "POST",
        "/categories",
        Some(json!({ "name": "Science", "description": "Atoms", "language": "eng" })),
    )
    .await;
    let uri = format!("/categories/{}", created["id"].as_str().unwrap());
    let (_, stored) = send(&app, "GET", &uri, None).await;

    let (status, json) = send(
        &app,
        "PATCH",
        &uri,
        Some(json!({ "name": "Science", "language": "eng" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "message": "No fields were updated" }));

    let (_, unchanged) = send(&app, "GET", &uri, None).await;
    assert_eq!(unchanged["updatedAt"], stored["updatedAt"]);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let (status, updated) = send(&app, "PATCH", &uri, Some(json!({ "description": "Cells" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Cells");

    let (_, reloaded) = send(&app, "GET", &uri, None).await;
    assert_eq!(reloaded["description"], "Cells");
    assert_ne!(reloaded["updatedAt"], stored["updatedAt"]);

    let (status, json) = send(&app, "PATCH", &uri, Some(json!({ "language": "es" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["invalidParams"], "es");
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_bulk_commits_all_valid_records_in_order() {
    let (app, db) = create_db_test_app().await;

    let records: Vec<_> = (0..5)
        .map(|i| json!({ "name": format!("Bulk {}", i), "description": "d", "language": "eng" }))
        .collect();

    let (status, json) = send(
        &app,
        "POST",
        "/categories/bulk",
        Some(json!({ "categories": records })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "Categories created successfully");
    let names: Vec<&str> = json["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bulk 0", "Bulk 1", "Bulk 2", "Bulk 3", "Bulk 4"]);
    assert_eq!(count(&db, "categories").await, 5);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_bulk_with_invalid_records_persists_nothing() {
    let (app, db) = create_db_test_app().await;

    let records = json!([
        { "name": "Valid", "description": "d", "language": "eng" },
        { "description": "d", "language": "eng" },
        { "name": "Other", "description": "d", "language": "it" },
    ]);

    let (status, json) = send(
        &app,
        "POST",
        "/categories/bulk",
        Some(json!({ "categories": records })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["length"], 2);
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors[0]["errorKind"], "MissingParameters");
    assert_eq!(errors[0]["record"], records[1]);
    assert_eq!(errors[1]["errorKind"], "InvalidEnum");
    assert_eq!(count(&db, "categories").await, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_bulk_reports_every_invalid_record() {
    let (app, db) = create_db_test_app().await;

    let records: Vec<_> = (0..4).map(|i| json!({ "name": i })).collect();
    let (status, json) = send(
        &app,
        "POST",
        "/categories/bulk",
        Some(json!({ "categories": records })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"].as_array().unwrap().len(), 4);
    assert_eq!(count(&db, "categories").await, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_bulk_record_can_carry_type_and_enum_errors() {
    let (app, _db) = create_db_test_app().await;

    let (status, json) = send(
        &app,
        "POST",
        "/categories/bulk",
        Some(json!({ "categories": [{ "name": 7, "description": "d", "language": "de" }] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["length"], 2);
    assert_eq!(json["errors"][0]["errorKind"], "InvalidType");
    assert_eq!(json["errors"][1]["errorKind"], "InvalidEnum");
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_bulk_reports_duplicates_after_earlier_rejection() {
    let (app, db) = create_db_test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/categories",
        Some(json!({ "name": "Geo", "description": "d", "language": "eng" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let records = json!([
        { "description": "d", "language": "eng" },
        { "name": "Geo", "description": "d", "language": "eng" },
        { "name": "Art", "description": "d", "language": "fr" },
    ]);
    let (status, json) = send(
        &app,
        "POST",
        "/categories/bulk",
        Some(json!({ "categories": records })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["length"], 2);
    assert_eq!(json["errors"][0]["errorKind"], "MissingParameters");
    assert_eq!(json["errors"][1]["errorKind"], "ValidationFailure");
    assert_eq!(json["errors"][1]["record"], records[1]);
    assert_eq!(count(&db, "categories").await, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_bulk_duplicate_names_abort_the_batch() {
    let (app, db) = create_db_test_app().await;

    let records = json!([
        { "name": "Music", "description": "d", "language": "eng" },
        { "name": "Sport", "description": "d", "language": "eng" },
        { "name": "Music", "description": "again", "language": "fr" },
    ]);
    let (status, json) = send(
        &app,
        "POST",
        "/categories/bulk",
        Some(json!({ "categories": records })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Some categories could not be created");
    assert_eq!(json["length"], 1);
    assert_eq!(json["errors"][0]["errorKind"], "ValidationFailure");
    assert_eq!(json["errors"][0]["details"]["invalidParams"], "Music");
    assert_eq!(json["errors"][0]["record"], records[2]);
    assert_eq!(count(&db, "categories").await, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB replica set"]
async fn test_delete_all_categories() {
    let (app, db) = create_db_test_app().await;

    for name in ["A", "B"] {
        send(
            &app,
            "POST",
            "/categories",
            Some(json!({ "name": name, "description": "d", "language": "eng" })),
        )
        .await;
    }

    let (status, json) = send(&app, "DELETE", "/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deletedCount"], 2);
    assert_eq!(count(&db, "categories").await, 0);
}
