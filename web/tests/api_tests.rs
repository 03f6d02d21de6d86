//! HTTP tests for the full router over the in-memory adapters.
//!
//! Run with: `cargo test -p boxoffice-web --test api_tests`

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use boxoffice_core::cache::event_key;
use boxoffice_runtime::{AdmissionController, EventCatalog};
use boxoffice_testing::{
    InMemoryCache, InMemoryEventBus, InMemoryStore, fixtures, init_test_tracing, test_clock,
};
use boxoffice_web::{AppState, CORRELATION_ID_HEADER, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    server: TestServer,
    store: InMemoryStore,
    bus: InMemoryEventBus,
    cache: InMemoryCache,
}

fn state(store: &InMemoryStore, bus: &InMemoryEventBus, cache: &InMemoryCache) -> AppState {
    let admission = AdmissionController::new(
        Arc::new(store.clone()),
        Arc::new(bus.clone()),
        Arc::new(test_clock()),
    );
    let catalog = EventCatalog::new(Arc::new(store.clone()), Arc::new(cache.clone()));
    AppState::new(
        admission,
        catalog,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
}

fn harness() -> Harness {
    init_test_tracing();
    let store = InMemoryStore::new();
    let bus = InMemoryEventBus::new();
    let cache = InMemoryCache::new();
    let server = TestServer::new(build_router(state(&store, &bus, &cache))).unwrap();
    Harness {
        server,
        store,
        bus,
        cache,
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[tokio::test]
async fn booking_takes_a_seat() {
    let h = harness();
    let user = fixtures::seed_user(&h.store, "ada@example.com");
    let event = fixtures::seed_event(&h.store, "Gala", 2);

    let response = h
        .server
        .post("/bookings")
        .json(&json!({"userId": user.id, "eventId": event.id}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["userId"], json!(user.id));
    assert_eq!(body["eventId"], json!(event.id));
    assert!(body["bookingId"].is_string());
    assert_eq!(h.store.event(event.id).unwrap().available_seats, 1);
}

#[tokio::test]
async fn booking_without_ids_is_bad_request() {
    let h = harness();

    let response = h.server.post("/bookings").json(&json!({"userId": ""})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["message"], "userId and eventId are required");
}

#[tokio::test]
async fn booking_with_null_id_is_bad_request() {
    let h = harness();
    let event = fixtures::seed_event(&h.store, "Gala", 2);

    h.server
        .post("/bookings")
        .json(&json!({"userId": null, "eventId": event.id}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_with_numeric_ids_is_not_found() {
    let h = harness();
    let event = fixtures::seed_event(&h.store, "Gala", 2);

    let response = h
        .server
        .post("/bookings")
        .json(&json!({"userId": 1, "eventId": 2}))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(h.store.event(event.id).unwrap().available_seats, 2);
}

#[tokio::test]
async fn booking_with_malformed_body_is_bad_request() {
    let h = harness();

    let response = h
        .server
        .post("/bookings")
        .text("{not json")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_for_unknown_entities_is_not_found() {
    let h = harness();
    let user = fixtures::seed_user(&h.store, "ada@example.com");
    let event = fixtures::seed_event(&h.store, "Gala", 2);

    let unknown_user = h
        .server
        .post("/bookings")
        .json(&json!({"userId": "not-a-uuid", "eventId": event.id}))
        .await;
    unknown_user.assert_status(StatusCode::NOT_FOUND);

    let unknown_event = h
        .server
        .post("/bookings")
        .json(&json!({"userId": user.id, "eventId": uuid_string()}))
        .await;
    unknown_event.assert_status(StatusCode::NOT_FOUND);
    let body: Value = unknown_event.json();
    assert_eq!(body["code"], "NOT_FOUND");

    assert_eq!(h.store.event(event.id).unwrap().available_seats, 2);
}

#[tokio::test]
async fn booking_a_sold_out_event_is_conflict() {
    let h = harness();
    let user = fixtures::seed_user(&h.store, "ada@example.com");
    let event = fixtures::seed_event(&h.store, "Gala", 0);

    let response = h
        .server
        .post("/bookings")
        .json(&json!({"userId": user.id, "eventId": event.id}))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "SOLD_OUT");
    assert!(h.store.bookings().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_requests_for_the_last_seat() {
    let h = harness();
    let event = fixtures::seed_event(&h.store, "Encore", 1);
    let first = fixtures::seed_user(&h.store, "a@example.com");
    let second = fixtures::seed_user(&h.store, "b@example.com");

    let book = |user_id| {
        let request = h
            .server
            .post("/bookings")
            .json(&json!({"userId": user_id, "eventId": event.id}));
        async move { request.await.status_code().as_u16() }
    };
    let (a, b) = tokio::join!(book(first.id), book(second.id));

    let mut statuses = [a, b];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409]);
    assert_eq!(h.store.bookings().len(), 1);
    assert_eq!(h.store.event(event.id).unwrap().available_seats, 0);
}

#[tokio::test]
async fn booking_publishes_confirmation() {
    let h = harness();
    let user = fixtures::seed_user(&h.store, "ada@example.com");
    let event = fixtures::seed_event(&h.store, "Gala", 2);

    h.server
        .post("/bookings")
        .json(&json!({"userId": user.id, "eventId": event.id}))
        .await
        .assert_status(StatusCode::CREATED);

    for _ in 0..100 {
        if !h.bus.published().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.bus.published().len(), 1);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn create_event_starts_with_all_seats_free() {
    let h = harness();

    let response = h
        .server
        .post("/events")
        .json(&json!({"title": "Jazz Night", "seats": 120, "date": "2025-06-01T20:00:00Z"}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["title"], "Jazz Night");
    assert_eq!(body["total_seats"], 120);
    assert_eq!(body["available_seats"], 120);
    assert_eq!(body["event_date"], "2025-06-01T20:00:00.000Z");
    assert!(body.get("created_at").is_none());
}

#[tokio::test]
async fn create_event_accepts_whole_float_seats() {
    let h = harness();

    let response = h
        .server
        .post("/events")
        .json(&json!({"title": "A", "seats": 3.0, "date": "2025-06-01"}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["total_seats"], 3);
    assert_eq!(body["event_date"], "2025-06-01T00:00:00.000Z");
}

#[tokio::test]
async fn create_event_rejects_bad_input() {
    let h = harness();

    for body in [
        json!({"title": "No seats", "date": "2025-06-01"}),
        json!({"title": "Zero", "seats": 0, "date": "2025-06-01"}),
        json!({"title": "Fraction", "seats": 2.5, "date": "2025-06-01"}),
        json!({"title": "Bad date", "seats": 3, "date": "soon"}),
        json!({"seats": 3, "date": "2025-06-01"}),
    ] {
        h.server
            .post("/events")
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn list_events_filters_by_title_and_date() {
    let h = harness();
    for (title, date) in [
        ("Jazz Night", "2025-06-01"),
        ("Late Jazz", "2025-07-01"),
        ("Opera", "2025-06-15"),
    ] {
        h.server
            .post("/events")
            .json(&json!({"title": title, "seats": 10, "date": date}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = h
        .server
        .get("/events")
        .add_query_param("q", "jazz")
        .add_query_param("to", "2025-06-30")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let titles: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Jazz Night"]);
    let item = &body["items"][0];
    assert_eq!(item["event_date"], "2025-06-01T00:00:00.000Z");
    assert!(item["created_at"].as_str().unwrap().ends_with('Z'));
    assert_eq!(body["limit"], 20);
    assert_eq!(body["offset"], 0);
}

#[tokio::test]
async fn list_events_rejects_bad_date_filter() {
    let h = harness();

    h.server
        .get("/events")
        .add_query_param("from", "yesterday")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_read_of_an_event_is_cached() {
    let h = harness();
    let event = fixtures::seed_event(&h.store, "Gala", 4);
    let path = format!("/events/{}", event.id);

    let first: Value = h.server.get(&path).await.json();
    assert_eq!(first["cached"], false);
    assert_eq!(first["title"], "Gala");
    assert!(first.get("created_at").is_none());
    assert_eq!(first["event_date"].as_str().unwrap().len(), "2025-06-01T00:00:00.000Z".len());

    let second: Value = h.server.get(&path).await.json();
    assert_eq!(second["cached"], true);
    assert_eq!(second["available_seats"], 4);
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let h = harness();

    h.server
        .get(&format!("/events/{}", uuid_string()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .get("/events/nope")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_event_updates_and_invalidates() {
    let h = harness();
    let event = fixtures::seed_event(&h.store, "Gala", 4);
    let path = format!("/events/{}", event.id);
    h.server.get(&path).await.assert_status_ok();
    assert!(h.cache.contains(&event_key(event.id)));

    let response = h
        .server
        .patch(&path)
        .json(&json!({"title": "Grand Gala"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({"ok": true, "cacheInvalidated": true}));
    assert!(!h.cache.contains(&event_key(event.id)));

    let fresh: Value = h.server.get(&path).await.json();
    assert_eq!(fresh["cached"], false);
    assert_eq!(fresh["title"], "Grand Gala");
}

#[tokio::test]
async fn patch_event_requires_a_field() {
    let h = harness();
    let event = fixtures::seed_event(&h.store, "Gala", 4);

    h.server
        .patch(&format!("/events/{}", event.id))
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_invalidation_is_server_error() {
    let h = harness();
    let event = fixtures::seed_event(&h.store, "Gala", 4);
    h.cache.set_fail_deletes(true);

    let response = h
        .server
        .patch(&format!("/events/{}", event.id))
        .json(&json!({"title": "Grand Gala"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.store.event(event.id).unwrap().title, "Grand Gala");
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn register_and_read_user() {
    let h = harness();

    let response = h
        .server
        .post("/users")
        .json(&json!({"name": "Ada", "email": "ada@example.com"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["name"], "Ada");

    let id = created["id"].as_str().unwrap();
    let fetched: Value = h.server.get(&format!("/users/{id}")).await.json();
    assert_eq!(fetched["email"], "ada@example.com");

    let listed: Value = h.server.get("/users").await.json();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let h = harness();
    let body = json!({"name": "Ada", "email": "ada@example.com"});

    h.server
        .post("/users")
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);
    let response = h.server.post("/users").json(&body).await;

    response.assert_status(StatusCode::CONFLICT);
    let error: Value = response.json();
    assert_eq!(error["code"], "CONFLICT");
}

#[tokio::test]
async fn user_validation_and_lookup_errors() {
    let h = harness();

    h.server
        .post("/users")
        .json(&json!({"name": "Ada"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    h.server
        .get(&format!("/users/{}", uuid_string()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .get("/users/42")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Notifications, health, metrics, correlation
// ============================================================================

#[tokio::test]
async fn notifications_start_empty() {
    let h = harness();

    let response = h.server.get("/notifications").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness();

    let response = h.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"status": "ok"}));
}

#[tokio::test]
async fn metrics_route_follows_configuration() {
    let h = harness();
    h.server
        .get("/metrics")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let handle = PrometheusBuilder::new().build_recorder().handle();
    let with_metrics = state(&h.store, &h.bus, &h.cache).with_metrics(handle);
    let server = TestServer::new(build_router(with_metrics)).unwrap();
    server.get("/metrics").await.assert_status_ok();
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let h = harness();
    let id = "5f0c4f5e-8d4e-4e47-9d43-0d9a4b8f5c11";

    let response = h
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-correlation-id"),
            HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header(CORRELATION_ID_HEADER), id);
}

#[tokio::test]
async fn correlation_id_is_generated_when_absent() {
    let h = harness();

    let response = h.server.get("/health").await;

    let header = response.header(CORRELATION_ID_HEADER);
    assert!(header.to_str().unwrap().parse::<uuid::Uuid>().is_ok());
}

fn uuid_string() -> String {
    uuid::Uuid::new_v4().to_string()
}
