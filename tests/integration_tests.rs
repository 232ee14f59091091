use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tower::ServiceExt;

use nailbook::config::AppConfig;
use nailbook::db;
use nailbook::errors::AppError;
use nailbook::handlers;
use nailbook::models::{Booking, SlotSchedule, SlotTime};
use nailbook::services::clock::FixedClock;
use nailbook::state::AppState;
use nailbook::store::sqlite::SqliteStore;
use nailbook::store::{BookingFilter, BookingPatch, BookingStore};

// ── Helpers ──

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        business_name: "Polished Studio".to_string(),
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        schedule: SlotSchedule::default(),
        membership_validity_days: 90,
        analytics_top_n: 5,
    }
}

fn test_state(now: &str) -> (Arc<AppState>, Arc<FixedClock>) {
    let store = Arc::new(SqliteStore::new(db::init_db(":memory:").unwrap()));
    let clock = Arc::new(FixedClock::new(ts(now)));
    let state = Arc::new(AppState {
        bookings: store.clone(),
        payments: store.clone(),
        memberships: store,
        clock: clock.clone(),
        config: test_config(),
    });
    (state, clock)
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn book(state: &Arc<AppState>, customer: &str, date: &str, time: &str, amount: i64) -> Value {
    let (status, json) = send(
        state,
        json_request(
            "POST",
            "/api/bookings",
            json!({
                "customer_id": customer,
                "customer_name": customer.to_uppercase(),
                "service_name": "Gel Manicure",
                "category": "manicure",
                "date": date,
                "time": time,
                "amount_cents": amount,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

// ── Health & Slots ──

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state("2024-05-20 09:00");
    let (status, json) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_slots_require_valid_date() {
    let (state, _) = test_state("2024-05-20 09:00");

    let (status, json) = send(&state, get("/api/slots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_input");

    let (status, json) = send(&state, get("/api/slots?date=next-friday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_input");
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_slots_show_occupied_and_available() {
    let (state, _) = test_state("2024-05-20 09:00");
    book(&state, "cust-1", "2024-06-01", "2:00 PM", 4500).await;
    let cancelled = book(&state, "cust-2", "2024-06-01", "10:00", 4500).await;
    let id = cancelled["id"].as_str().unwrap();
    let (status, _) = send(
        &state,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/cancel"),
            json!({"reason": "schedule_conflict"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&state, get("/api/slots?date=2024-06-01")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["occupied"], json!(["14:00"]));
    let available = json["available"].as_array().unwrap();
    assert_eq!(available.len(), 17);
    assert!(available.contains(&json!("10:00")));
    assert!(!available.contains(&json!("14:00")));
}

// ── Booking ──

#[tokio::test]
async fn test_double_booking_rejected() {
    let (state, _) = test_state("2024-05-20 09:00");
    let first = book(&state, "cust-1", "2024-06-01", "14:00", 4500).await;
    assert_eq!(first["status"], "confirmed");
    assert_eq!(first["type"], "appointment");
    assert_eq!(first["time"], "14:00");

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/bookings",
            json!({
                "customer_id": "cust-2",
                "service_name": "Pedicure",
                "date": "2024-06-01",
                "time": "2:00 PM",
                "amount_cents": 6000,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "slot_taken");
}

#[tokio::test]
async fn test_booking_off_grid_time_rejected() {
    let (state, _) = test_state("2024-05-20 09:00");
    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/bookings",
            json!({
                "customer_id": "cust-1",
                "service_name": "Pedicure",
                "date": "2024-06-01",
                "time": "14:10",
                "amount_cents": 6000,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "validation_error");
}

#[tokio::test]
async fn test_get_booking_view_tracks_clock() {
    let (state, clock) = test_state("2024-05-20 09:00");
    let booked = book(&state, "cust-1", "2024-06-01", "14:00", 4500).await;
    let id = booked["id"].as_str().unwrap();

    let (status, json) = send(&state, get(&format!("/api/bookings/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["display_status"], "confirmed");
    assert_eq!(json["payment"]["amount_cents"], 4500);
    assert_eq!(json["payment"]["status"], "succeeded");
    assert_eq!(json["membership"], Value::Null);

    clock.set(ts("2024-06-01 14:00"));
    let (_, json) = send(&state, get(&format!("/api/bookings/{id}"))).await;
    assert_eq!(json["display_status"], "completed");
    assert_eq!(json["status"], "confirmed");

    let (status, json) = send(&state, get("/api/bookings/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_customer_history() {
    let (state, _) = test_state("2024-05-20 09:00");
    book(&state, "cust-1", "2024-06-01", "10:00", 4500).await;
    book(&state, "cust-1", "2024-06-15", "10:00", 4500).await;
    book(&state, "cust-2", "2024-06-15", "11:00", 4500).await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/memberships",
            json!({
                "customer_id": "cust-1",
                "package_name": "Gel Club",
                "sessions": 6,
                "amount_cents": 20000,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["membership"]["status"], "active");
    assert_eq!(json["booking"]["type"], "membership_purchase");

    let (status, json) = send(&state, get("/api/customers/cust-1/bookings")).await;
    assert_eq!(status, StatusCode::OK);
    let history = json.as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["date"], "2024-06-15");
    let membership = history
        .iter()
        .find(|v| v["type"] == "membership_purchase")
        .unwrap();
    assert_eq!(membership["display_status"], "active");
    assert_eq!(membership["membership"]["services_used"], 0);
}

// ── Reschedule ──

#[tokio::test]
async fn test_reschedule_conflict_and_success() {
    let (state, _) = test_state("2024-05-20 09:00");
    book(&state, "cust-a", "2024-06-01", "14:00", 4500).await;
    let b = book(&state, "cust-b", "2024-06-02", "10:00", 4500).await;
    let id = b["id"].as_str().unwrap();

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            json!({"date": "2024-06-01", "time": "14:00"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "slot_taken");

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            json!({"date": "2024-06-01", "time": "3:30 PM"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["date"], "2024-06-01");
    assert_eq!(json["time"], "15:30");
    assert_eq!(json["status"], "confirmed");
}

#[tokio::test]
async fn test_reschedule_to_yesterday() {
    let (state, _) = test_state("2024-05-20 09:00");
    let b = book(&state, "cust-b", "2024-06-02", "10:00", 4500).await;
    let id = b["id"].as_str().unwrap();

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            json!({"date": "2024-05-19", "time": "10:00"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "past_time");
}

#[tokio::test]
async fn test_reschedule_missing_booking() {
    let (state, _) = test_state("2024-05-20 09:00");
    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/bookings/ghost/reschedule",
            json!({"date": "2024-06-01", "time": "10:00"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

// ── Cancellation ──

#[tokio::test]
async fn test_cancel_three_days_before() {
    let (state, _) = test_state("2024-07-07 00:00");
    let booked = book(&state, "cust-1", "2024-07-10", "10:00", 8000).await;
    let id = booked["id"].as_str().unwrap();

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            &format!("/api/bookings/{id}/cancel"),
            json!({"reason": "found_another_salon"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "cancelled");
    assert_eq!(json["booking"]["cancellation"]["reason"], "found_another_salon");
    assert_eq!(
        json["booking"]["cancellation"]["cancelled_at"],
        "2024-07-07T00:00:00"
    );
    assert_eq!(json["refund"]["percent"], 100);
    assert_eq!(json["refund"]["amount_cents"], 8000);
}

#[tokio::test]
async fn test_cancel_twice_is_reported() {
    let (state, clock) = test_state("2024-07-07 00:00");
    let booked = book(&state, "cust-1", "2024-07-08", "12:00", 10000).await;
    let id = booked["id"].as_str().unwrap();
    let uri = format!("/api/bookings/{id}/cancel");

    let (status, json) = send(&state, json_request("POST", &uri, json!({"reason": "feeling_unwell"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["refund"]["tier"], "partial");
    assert_eq!(json["refund"]["amount_cents"], 5000);

    clock.set(ts("2024-07-07 08:00"));
    let (status, json) = send(&state, json_request("POST", &uri, json!({"reason": "other"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "already_cancelled");

    let (_, json) = send(&state, get(&format!("/api/bookings/{id}"))).await;
    assert_eq!(json["cancellation"]["cancelled_at"], "2024-07-07T00:00:00");
    assert_eq!(json["display_status"], "cancelled");
}

#[tokio::test]
async fn test_cancel_requires_reason() {
    let (state, _) = test_state("2024-07-07 00:00");
    let booked = book(&state, "cust-1", "2024-07-10", "10:00", 8000).await;
    let id = booked["id"].as_str().unwrap();

    let (status, json) = send(
        &state,
        json_request("POST", &format!("/api/bookings/{id}/cancel"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "validation_error");
}

// ── Calendar ──

#[tokio::test]
async fn test_calendar_download() {
    let (state, _) = test_state("2024-05-20 09:00");
    let booked = book(&state, "cust-1", "2024-06-01", "14:00", 4500).await;
    let id = booked["id"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(get(&format!("/api/bookings/{id}/calendar.ics")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("DTSTART:20240601T140000"));
    assert!(ics.contains("DTEND:20240601T143000"));
    assert!(ics.contains("SUMMARY:Gel Manicure at Polished Studio"));
}

#[tokio::test]
async fn test_calendar_not_found() {
    let (state, _) = test_state("2024-05-20 09:00");
    let (status, _) = send(&state, get("/api/bookings/missing/calendar.ics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Admin ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let (state, _) = test_state("2024-05-20 09:00");

    let (status, _) = send(&state, get("/api/admin/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/admin/overview")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");
}

#[tokio::test]
async fn test_admin_bookings_filter_and_delete() {
    let (state, _) = test_state("2024-05-20 09:00");
    let first = book(&state, "cust-1", "2024-06-01", "10:00", 4500).await;
    book(&state, "cust-2", "2024-06-02", "10:00", 4500).await;
    let id = first["id"].as_str().unwrap();

    let (status, json) = send(&state, admin_request("GET", "/api/admin/bookings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = send(&state, admin_request("GET", "/api/admin/bookings?date=2024-06-01")).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["customer_name"], "CUST-1");

    let (status, json) = send(&state, admin_request("GET", "/api/admin/bookings?status=upcoming")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_input");

    let (status, _) = send(&state, admin_request("DELETE", &format!("/api/admin/bookings/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&state, admin_request("DELETE", &format!("/api/admin/bookings/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&state, admin_request("GET", "/api/admin/bookings")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_overview_and_analytics() {
    let (state, _) = test_state("2024-05-20 09:00");
    book(&state, "cust-1", "2024-05-20", "15:00", 4500).await;
    book(&state, "cust-1", "2024-06-01", "10:00", 4500).await;
    book(&state, "cust-2", "2024-06-02", "10:00", 12000).await;

    let (status, json) = send(&state, admin_request("GET", "/api/admin/overview")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_bookings"], 3);
    assert_eq!(json["customers"], 2);
    assert_eq!(json["revenue_cents"], 21000);
    assert_eq!(json["appointments_today"], 1);
    assert_eq!(json["by_status"]["confirmed"], 3);

    let (status, json) = send(&state, admin_request("GET", "/api/admin/analytics?top=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["revenue_by_month"],
        json!([
            {"month": "2024-05", "revenue_cents": 4500},
            {"month": "2024-06", "revenue_cents": 16500},
        ])
    );
    assert_eq!(json["top_services"][0]["service_name"], "Gel Manicure");
    assert_eq!(json["top_services"][0]["percent"], 100.0);
    assert_eq!(json["top_customers"].as_array().unwrap().len(), 1);
    assert_eq!(json["top_customers"][0]["customer_id"], "cust-2");
    assert_eq!(json["top_customers"][0]["total_spent_cents"], 12000);
}

// ── Store outage ──

struct OfflineBookings;

fn offline() -> AppError {
    AppError::UnavailableData("bookings database offline".to_string())
}

#[async_trait::async_trait]
impl BookingStore for OfflineBookings {
    async fn find(&self, _filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        Err(offline())
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Booking>, AppError> {
        Err(offline())
    }

    async fn create(&self, _booking: Booking) -> Result<Booking, AppError> {
        Err(offline())
    }

    async fn update_by_id(&self, _id: &str, _patch: BookingPatch) -> Result<Option<Booking>, AppError> {
        Err(offline())
    }

    async fn occupied_times(
        &self,
        _date: NaiveDate,
        _exclude_id: Option<&str>,
    ) -> Result<Vec<SlotTime>, AppError> {
        Err(offline())
    }

    async fn delete_by_id(&self, _id: &str) -> Result<bool, AppError> {
        Err(offline())
    }
}

#[tokio::test]
async fn test_store_outage_returns_503() {
    let store = Arc::new(SqliteStore::new(db::init_db(":memory:").unwrap()));
    let state = Arc::new(AppState {
        bookings: Arc::new(OfflineBookings),
        payments: store.clone(),
        memberships: store,
        clock: Arc::new(FixedClock::new(ts("2024-05-20 09:00"))),
        config: test_config(),
    });

    let (status, json) = send(&state, get("/api/slots?date=2024-06-01")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["kind"], "unavailable_data");
    assert_eq!(json["retryable"], true);

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/bookings/bk-1/cancel",
            json!({"reason": "schedule_conflict"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["kind"], "unavailable_data");
}
