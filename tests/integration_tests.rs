use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use class_schedule::settings::Settings;
use class_schedule::{AppState, build_router};
use http::Method;
use httpmock::prelude::*;
use serde_json::{Value, json};
use tower::Service;

/// Helper function to create test app state pointing at the mocked class API
fn create_test_state(api_base_url: &str) -> AppState {
    let settings = Settings {
        api_base_url: api_base_url.to_string(),
        debug: true,
        ..Settings::default()
    };
    AppState::new(settings).unwrap()
}

/// Helper to extract response body as string
async fn response_body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn response_json(body: Body) -> Value {
    serde_json::from_str(&response_body_string(body).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_classes(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/calander");
        then.status(200).json_body(json!({
            "success": true,
            "data": [],
            "pagination": {"page": 1, "limit": 100, "total": 0, "totalPages": 0}
        }));
    })
}

fn week_calendar(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/calander/calendar")
            .query_param("startDate", "2025-11-23")
            .query_param("endDate", "2025-11-29");
        then.status(200).json_body(json!({
            "success": true,
            "data": [
                {
                    "id": "i1",
                    "classId": "c1",
                    "type": "recurring-instance",
                    "title": "Yoga Basics",
                    "instructor": "Anna",
                    "location": "Studio A",
                    "capacity": 20,
                    "bookedCount": 5,
                    "scheduledDate": "2025-11-24T00:00:00.000Z",
                    "startTime": "09:00",
                    "endTime": "10:00",
                    "status": "active",
                    "isRecurring": true,
                    "recurrence": {
                        "type": "weekly",
                        "startDate": "2025-11-01",
                        "dayWiseTimeSlots": [
                            {"day": "monday", "timeSlots": [{"startTime": "09:00", "endTime": "10:00"}]}
                        ]
                    }
                },
                {
                    "_id": "c2",
                    "title": "Pilates",
                    "instructor": "Marek",
                    "scheduledDate": "2025-11-26",
                    "startTime": "18:00",
                    "endTime": "19:00",
                    "status": "Canceled",
                    "isRecurring": false
                }
            ]
        }));
    })
}

#[tokio::test]
async fn test_root_endpoint() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app.call(get("/")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("Class Schedule API"));
    assert!(body.contains("/schedule"));
    assert!(body.contains("/schedule.ical"));
}

#[tokio::test]
async fn test_healthz_live() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app.call(get("/healthz/live")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains(r#""status":"ok"#));
}

#[tokio::test]
async fn test_healthz_ready_checks_upstream() {
    // Arrange
    let mock_server = MockServer::start();
    let health = mock_server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(200)
            .json_body(json!({"success": true, "data": {"status": "healthy"}}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app.call(get("/healthz/ready")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    health.assert();
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains(r#""upstream":"healthy"#));
}

#[tokio::test]
async fn test_healthz_ready_upstream_down() {
    // Arrange - nothing listens on port 1
    let mut app = build_router(create_test_state("http://127.0.0.1:1/api/v1"));

    // Act
    let response = app.call(get("/healthz/ready")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_schedule_reconciles_calendar_view() {
    // Arrange
    let mock_server = MockServer::start();
    let calendar = week_calendar(&mock_server);
    empty_classes(&mock_server);
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(get("/schedule?view=week&date=2025-11-26"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    calendar.assert();

    let body = response_json(response.into_body()).await;
    assert_eq!(body["range"]["startStr"], "2025-11-23");
    assert_eq!(body["range"]["endStr"], "2025-11-29");
    assert_eq!(body["range"]["label"], "Nov 23 - Nov 29, 2025");

    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["classId"], "c1");
    assert_eq!(events[0]["scheduledDate"], "2025-11-24");
    assert_eq!(events[0]["status"], "scheduled");
    assert_eq!(events[0]["isRecurring"], true);
    assert_eq!(events[1]["id"], "c2");
    assert_eq!(events[1]["classId"], "c2");
    assert_eq!(events[1]["status"], "cancelled");
    assert_eq!(events[1]["isRecurring"], false);
    assert!(events[1].get("recurrence").is_none());
}

#[tokio::test]
async fn test_schedule_falls_back_to_classes_list() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander/calendar");
        then.status(200).json_body(json!({"success": true, "data": []}));
    });
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander");
        then.status(200).json_body(json!({
            "success": true,
            "data": [
                {"_id": "c9", "title": "Spin", "isRecurring": false, "status": "active",
                 "scheduledDate": "2025-11-27"}
            ],
            "pagination": {"page": 1, "limit": 100, "total": 1, "totalPages": 1}
        }));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(get("/schedule?date=2025-11-26&layout=list"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["startTime"], "09:00");
    assert_eq!(events[0]["endTime"], "10:00");
    assert_eq!(events[0]["bookedCount"], 0);
    assert_eq!(body["rows"][0]["timeRange"], "09:00 - 10:00");
}

#[tokio::test]
async fn test_schedule_search_and_week_layout() {
    // Arrange
    let mock_server = MockServer::start();
    week_calendar(&mock_server);
    let classes = mock_server.mock(|when, then| {
        when.method(GET)
            .path("/calander")
            .query_param("search", "yoga");
        then.status(200).json_body(json!({"success": true, "data": []}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(get("/schedule?date=2025-11-26&search=yoga&layout=week"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    classes.assert();
    let body = response_json(response.into_body()).await;
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["title"], "Yoga Basics");

    let week = &body["week"];
    assert_eq!(week["days"][0]["weekday"], "Sun");
    assert_eq!(week["days"][1]["eventCount"], 1);
    assert_eq!(week["rows"][1]["label"], "9 AM");
    assert_eq!(week["rows"][1]["cells"][1][0]["id"], "i1");
}

#[tokio::test]
async fn test_schedule_invalid_date() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app.call(get("/schedule?date=26.11.2025")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schedule_both_sources_down() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander/calendar");
        then.status(500);
    });
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander");
        then.status(500);
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app.call(get("/schedule?date=2025-11-26")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_delete_refetches_both_sources() {
    // Arrange
    let mock_server = MockServer::start();
    let calendar = week_calendar(&mock_server);
    let classes = empty_classes(&mock_server);
    let delete = mock_server.mock(|when, then| {
        when.method(DELETE).path("/calander/c1");
        then.status(200)
            .json_body(json!({"success": true, "message": "Class deleted"}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    app.call(get("/schedule?date=2025-11-26")).await.unwrap();
    app.call(get("/schedule?date=2025-11-26")).await.unwrap();
    calendar.assert_hits(1);
    classes.assert_hits(1);

    // Act
    let response = app
        .call(
            Request::builder()
                .method(Method::DELETE)
                .uri("/classes/c1?title=Yoga%20Basics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    app.call(get("/schedule?date=2025-11-26")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    delete.assert();
    calendar.assert_hits(2);
    classes.assert_hits(2);
}

#[tokio::test]
async fn test_ical_export() {
    // Arrange
    let mock_server = MockServer::start();
    week_calendar(&mock_server);
    empty_classes(&mock_server);
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(get("/schedule.ical?date=2025-11-26"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/calendar"
    );
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("BEGIN:VCALENDAR"));
    assert!(body.contains("SUMMARY:Yoga Basics"));
    assert!(body.contains("STATUS:CANCELLED"));
}

#[tokio::test]
async fn test_ical_fallback_classes_exported_once() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander/calendar");
        then.status(200).json_body(json!({"success": true, "data": []}));
    });
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander");
        then.status(200).json_body(json!({
            "success": true,
            "data": [
                {"_id": "c1", "title": "Spin", "isRecurring": false, "status": "active",
                 "scheduledDate": "2025-11-27", "startTime": "18:00", "endTime": "19:00"}
            ],
            "pagination": {"page": 1, "limit": 100, "total": 1, "totalPages": 1}
        }));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act - every week falls back to the same classes list
    let response = app
        .call(get("/schedule.ical?date=2025-11-26&weeks=3"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_string(response.into_body()).await;
    assert_eq!(body.matches("BEGIN:VEVENT").count(), 1);
    assert_eq!(body.matches("SUMMARY:Spin").count(), 1);
}

#[tokio::test]
async fn test_ical_weeks_too_high() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act - weeks = 7 is invalid (max is 6)
    let response = app.call(get("/schedule.ical?weeks=7")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ical_no_classes() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander/calendar");
        then.status(200).json_body(json!({"success": true, "data": []}));
    });
    empty_classes(&mock_server);
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(get("/schedule.ical?date=2025-11-26&weeks=2"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_weekly_class() {
    // Arrange
    let mock_server = MockServer::start();
    let create = mock_server.mock(|when, then| {
        when.method(POST)
            .path("/calander")
            .json_body_includes(
                json!({
                    "title": "Yoga Basics",
                    "isRecurring": true,
                    "recurrence": {
                        "type": "weekly",
                        "startDate": "2025-11-24",
                        "endDate": "2025-12-31",
                        "dayWiseTimeSlots": [
                            {"day": "monday", "timeSlots": [{"startTime": "09:00", "endTime": "10:00"}]}
                        ]
                    }
                })
                .to_string(),
            );
        then.status(201).json_body(json!({
            "success": true,
            "data": {"class": {"_id": "c1", "title": "Yoga Basics"}, "instanceCount": 6}
        }));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act - Wednesday only has an incomplete slot and is dropped
    let response = app
        .call(with_json(
            Method::POST,
            "/classes",
            json!({
                "title": "Yoga Basics",
                "capacity": 20,
                "isRecurring": true,
                "recurrenceType": "weekly",
                "recurrenceStartDate": "2025-11-24",
                "recurrenceEndDate": "2025-12-31",
                "dayTimeSlots": {
                    "monday": [{"startTime": "09:00", "endTime": "10:00"}],
                    "wednesday": [{"startTime": "09:00", "endTime": ""}]
                }
            }),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::CREATED);
    create.assert();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["instanceCount"], 6);
    assert_eq!(body["notice"]["variant"], "success");
    assert_eq!(body["notice"]["title"], "Class Created");
}

#[tokio::test]
async fn test_create_rejected_by_upstream() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(POST).path("/calander");
        then.status(400).json_body(json!({
            "success": false,
            "message": "Validation failed",
            "errors": [
                {"field": "title", "message": "Title already exists"},
                {"field": "startTime", "message": "Start time overlaps"}
            ]
        }));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(with_json(
            Method::POST,
            "/classes",
            json!({"title": "Yoga Basics", "scheduledDate": "2025-11-24"}),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["variant"], "error");
    assert_eq!(body["title"], "Validation Error");
    assert_eq!(
        body["description"],
        "• Title already exists\n• Start time overlaps"
    );

    let notices = app.call(get("/notices")).await.unwrap();
    let notices = response_json(notices.into_body()).await;
    assert_eq!(notices.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_without_title() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app
        .call(with_json(Method::POST, "/classes", json!({"title": "  "})))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("title is required"));
}

#[tokio::test]
async fn test_preview_weekly_occurrences() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app
        .call(with_json(
            Method::POST,
            "/classes/preview",
            json!({
                "form": {
                    "title": "Yoga Basics",
                    "isRecurring": true,
                    "recurrenceType": "weekly",
                    "recurrenceStartDate": "2025-11-23",
                    "dayTimeSlots": {
                        "monday": [{"startTime": "09:00", "endTime": "10:00"}],
                        "friday": [{"startTime": "18:00", "endTime": "19:00"}]
                    }
                },
                "end": "2025-12-06"
            }),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["count"], 4);
    assert_eq!(body["occurrences"][0]["date"], "2025-11-24");
    assert_eq!(body["occurrences"][1]["date"], "2025-11-28");
    assert_eq!(body["occurrences"][1]["startTime"], "18:00");
}

fn yoga_instance() -> Value {
    json!({
        "id": "i1",
        "classId": "c1",
        "type": "recurring-instance",
        "title": "Yoga Basics",
        "location": "Studio A",
        "capacity": 20,
        "bookedCount": 5,
        "scheduledDate": "2025-11-24",
        "startTime": "09:00",
        "endTime": "10:00",
        "status": "scheduled",
        "isRecurring": true
    })
}

#[tokio::test]
async fn test_update_instance_scope() {
    // Arrange
    let mock_server = MockServer::start();
    let specific = mock_server.mock(|when, then| {
        when.method(PUT)
            .path("/calander/c1/instances/specific")
            .query_param("scheduledDate", "2025-11-24")
            .query_param("startTime", "09:00")
            .json_body(json!({"startTime": "10:00", "endTime": "11:00"}));
        then.status(200).json_body(json!({"success": true, "data": {}}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(with_json(
            Method::PUT,
            "/classes/c1",
            json!({
                "event": yoga_instance(),
                "changes": {
                    "scope": "instance",
                    "startTime": "10:00",
                    "endTime": "11:00",
                    "location": "Studio A"
                }
            }),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    specific.assert();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["notice"]["title"], "Instance Updated");
}

#[tokio::test]
async fn test_update_without_changes() {
    // Arrange
    let mock_server = MockServer::start();
    let series = mock_server.mock(|when, then| {
        when.method(PUT).path("/calander/c1");
        then.status(200);
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(with_json(
            Method::PUT,
            "/classes/c1",
            json!({"event": yoga_instance(), "changes": {"title": "Yoga Basics"}}),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    series.assert_hits(0);
}

#[tokio::test]
async fn test_update_wrong_class() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app
        .call(with_json(
            Method::PUT,
            "/classes/other",
            json!({"event": yoga_instance(), "changes": {"title": "Yoga Flow"}}),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_change_for_series_record() {
    // Arrange
    let mock_server = MockServer::start();
    let status = mock_server.mock(|when, then| {
        when.method(PATCH)
            .path("/calander/c2/status")
            .json_body(json!({"status": "active"}));
        then.status(200).json_body(json!({"success": true, "data": {}}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(with_json(
            Method::PATCH,
            "/events/status",
            json!({
                "event": {"id": "c2", "classId": "c2", "scheduledDate": "2025-11-26"},
                "status": "scheduled"
            }),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    status.assert();
}

#[tokio::test]
async fn test_status_change_failure_lists_fields() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(PUT).path("/calander/c1/instances/specific");
        then.status(422).json_body(json!({
            "errors": [{"field": "status", "message": "Cannot cancel a completed class"}]
        }));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(with_json(
            Method::PATCH,
            "/events/status",
            json!({
                "event": {"id": "i1", "classId": "c1", "scheduledDate": "2025-11-24", "startTime": "09:00"},
                "status": "cancelled"
            }),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["description"], "status: Cannot cancel a completed class");
}

#[tokio::test]
async fn test_regenerate_instances() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(POST).path("/calander/c1/regenerate");
        then.status(200)
            .json_body(json!({"success": true, "data": {"instanceCount": 8}}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(
            Request::builder()
                .method(Method::POST)
                .uri("/classes/c1/regenerate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["instanceCount"], 8);
}

#[tokio::test]
async fn test_list_instances_passes_paging() {
    // Arrange
    let mock_server = MockServer::start();
    let instances = mock_server.mock(|when, then| {
        when.method(GET)
            .path("/calander/c1/instances")
            .query_param("page", "2")
            .query_param("limit", "10");
        then.status(200).json_body(json!({
            "success": true,
            "data": [{
                "_id": "i11",
                "classId": "c1",
                "scheduledDate": "2025-12-01",
                "startTime": "09:00",
                "endTime": "10:00",
                "status": "scheduled"
            }],
            "pagination": {"page": 2, "limit": 10, "total": 11, "totalPages": 2}
        }));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(get("/classes/c1/instances?page=2&limit=10"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    instances.assert();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["data"][0]["_id"], "i11");
}

#[tokio::test]
async fn test_unknown_class_instances() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander/missing/instances");
        then.status(404)
            .json_body(json!({"success": false, "message": "Class not found"}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app.call(get("/classes/missing/instances")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_body_string(response.into_body()).await;
    assert_eq!(body, "Class not found");
}

#[tokio::test]
async fn test_dismiss_notice() {
    // Arrange
    let mock_server = MockServer::start();
    let mut app = build_router(create_test_state(&mock_server.base_url()));
    let refresh = app
        .call(
            Request::builder()
                .method(Method::POST)
                .uri("/schedule/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let notice = response_json(refresh.into_body()).await;
    assert_eq!(notice["variant"], "info");
    let id = notice["id"].as_str().unwrap().to_string();

    // Act
    let first = app
        .call(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/notices/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let second = app
        .call(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/notices/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(first.status(), StatusCode::NO_CONTENT);
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app.call(get("/openapi.json")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("/schedule.ical"));
    assert!(body.contains("/events/status"));
}

#[tokio::test]
async fn test_get_class() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(GET).path("/calander/c1");
        then.status(200).json_body(json!({
            "success": true,
            "data": {"_id": "c1", "title": "Yoga Basics", "isRecurring": false, "capacity": 20}
        }));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app.call(get("/classes/c1")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["title"], "Yoga Basics");
    assert_eq!(body["capacity"], 20);
}

#[tokio::test]
async fn test_instances_in_range() {
    // Arrange
    let mock_server = MockServer::start();
    let range = mock_server.mock(|when, then| {
        when.method(GET)
            .path("/calander/instances")
            .query_param("startDate", "2025-11-23")
            .query_param("endDate", "2025-11-29")
            .query_param("status", "cancelled");
        then.status(200).json_body(json!({"success": true, "data": []}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(get(
            "/instances?startDate=2025-11-23&endDate=2025-11-29&filter=cancelled",
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    range.assert();
}

#[tokio::test]
async fn test_instances_window_reversed() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app
        .call(get("/instances?startDate=2025-11-29&endDate=2025-11-23"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_instance_by_id() {
    // Arrange
    let mock_server = MockServer::start();
    let patch = mock_server.mock(|when, then| {
        when.method(PATCH)
            .path("/calander/instance/i1")
            .json_body(json!({"location": "Studio B"}));
        then.status(200).json_body(json!({"success": true, "data": {}}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(with_json(
            Method::PATCH,
            "/instances/i1",
            json!({"location": "Studio B"}),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    patch.assert();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["title"], "Instance Updated");
}

#[tokio::test]
async fn test_update_instance_without_changes() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app
        .call(with_json(Method::PATCH, "/instances/i1", json!({})))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test(start_paused = true)]
async fn test_screen_debounces_search_from_settings() {
    // Arrange
    let settings = Settings {
        search_debounce_ms: 300,
        ..Settings::default()
    };
    let state = AppState::new(settings).unwrap();
    let mut screen = state.screen();

    // Act
    screen.set_search("yoga");
    let early = tokio::time::timeout(Duration::from_millis(50), screen.search_settled()).await;
    screen.search_settled().await;

    // Assert
    assert!(early.is_err());
    assert_eq!(screen.settled_search(), "yoga");
}
