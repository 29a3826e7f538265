use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;

use assistant_cell::router::assistant_routes;
use shared_state::AppState;
use shared_utils::test_utils::memory_state;

fn create_test_app(state: Arc<AppState>) -> Router {
    Router::new().nest("/assistant", assistant_routes(state))
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// First Monday strictly after `date`.
fn next_monday_after(date: NaiveDate) -> NaiveDate {
    let mut day = date + Duration::days(1);
    while day.weekday() != Weekday::Mon {
        day += Duration::days(1);
    }
    day
}

// ==============================================================================
// BOOKING WEBHOOK
// ==============================================================================

#[tokio::test]
async fn test_webhook_booking_confirms_in_german() {
    let app = create_test_app(memory_state().await);

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/assistant/book",
        Some(json!({
            "patientName": "Anna Schmidt",
            "patientPhone": "+49 170 1234567",
            "requestedDate": "2025-03-10",
            "requestedTime": "09:00",
            "treatmentType": "Kontrolle"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Termin erfolgreich gebucht für 2025-03-10 um 09:00 Uhr."
    );
    assert_eq!(body["appointment"]["notes"], "Via Sofia gebucht");
    assert_eq!(body["appointment"]["treatment_type"], "Kontrolle");
    assert_eq!(body["appointment"]["end_time"], "09:30");
}

#[tokio::test]
async fn test_webhook_collision_offers_the_next_free_slot() {
    let app = create_test_app(memory_state().await);

    send_json(
        &app,
        Method::POST,
        "/assistant/book",
        Some(json!({
            "patientName": "Anna Schmidt",
            "requestedDate": "2025-03-10",
            "requestedTime": "09:00"
        })),
    )
    .await;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/assistant/book",
        Some(json!({
            "patientName": "Max Weber",
            "requestedDate": "2025-03-10",
            "requestedTime": "09:00"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Der gewünschte Termin ist bereits vergeben."));
    assert!(
        message.contains("Der nächste freie Termin ist Montag, 10. März 2025 um 09:30 Uhr."),
        "unexpected alternative: {}",
        message
    );
}

#[tokio::test]
async fn test_webhook_rejects_weekend_with_opening_hours() {
    let app = create_test_app(memory_state().await);

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/assistant/book",
        Some(json!({
            "patientName": "Anna Schmidt",
            "requestedDate": "2025-03-15",
            "requestedTime": "09:00"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Montag bis Freitag"));
}

// ==============================================================================
// SPOKEN SUMMARIES
// ==============================================================================

#[tokio::test]
async fn test_empty_day_and_unknown_patient_read_politely() {
    let app = create_test_app(memory_state().await);

    let (status, body) = send_json(&app, Method::GET, "/assistant/today", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Heute sind keine Termine geplant.");
    assert_eq!(body["count"], 0);

    let (status, body) =
        send_json(&app, Method::GET, "/assistant/patient/0301234567", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Sie haben aktuell keine anstehenden Termine bei uns."
    );
}

#[tokio::test]
async fn test_patient_summary_finds_upcoming_booking_by_phone() {
    let app = create_test_app(memory_state().await);

    let monday = next_monday_after(chrono::Local::now().date_naive());
    send_json(
        &app,
        Method::POST,
        "/assistant/book",
        Some(json!({
            "patientName": "Anna Schmidt",
            "patientPhone": "+49 170 123-4567",
            "requestedDate": monday.to_string(),
            "requestedTime": "09:00",
            "treatmentType": "Prophylaxe"
        })),
    )
    .await;

    // Differently formatted, same number
    let (status, body) = send_json(
        &app,
        Method::GET,
        "/assistant/patient/%2B491701234567",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Sie haben 1 anstehende Termine:"));
    assert!(message.contains("um 09:00 Uhr für Prophylaxe"));
}

// ==============================================================================
// SPOKEN AVAILABILITY
// ==============================================================================

#[tokio::test]
async fn test_check_date_weekend_past_and_invalid() {
    let app = create_test_app(memory_state().await);

    let (status, body) =
        send_json(&app, Method::GET, "/assistant/check-date/2025-03-15", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Am Wochenende haben wir geschlossen. Bitte wählen Sie einen Wochentag."
    );
    assert_eq!(body["available"], false);
    assert_eq!(body["isWeekend"], true);

    let (status, body) =
        send_json(&app, Method::GET, "/assistant/check-date/2024-01-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Dieses Datum liegt in der Vergangenheit. Bitte wählen Sie ein zukünftiges Datum."
    );
    assert_eq!(body["isPast"], true);

    let (status, body) =
        send_json(&app, Method::GET, "/assistant/check-date/gestern", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Ungültiges Datumsformat. Bitte verwenden Sie YYYY-MM-DD."
    );
}

#[tokio::test]
async fn test_open_day_names_free_slots() {
    let app = create_test_app(memory_state().await);

    let monday = next_monday_after(chrono::Local::now().date_naive());
    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/assistant/check-date/{}", monday),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["totalSlots"], 16);
    assert_eq!(body["freeSlots"], 16);

    let message = body["message"].as_str().unwrap();
    assert!(message.contains("haben wir noch 16 freie Termine"));
    // Only the first five times are read out loud
    assert!(message.contains("08:00, 08:30, 09:00, 09:30, 10:00 Uhr."));
}

#[tokio::test]
async fn test_next_available_speaks_the_earliest_slot() {
    let app = create_test_app(memory_state().await);

    let (status, body) = send_json(&app, Method::GET, "/assistant/next-available", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["time"], "08:00");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Der nächste freie Termin ist"));

    let found = NaiveDate::parse_from_str(body["date"].as_str().unwrap(), "%Y-%m-%d").unwrap();
    assert!(!matches!(found.weekday(), Weekday::Sat | Weekday::Sun));
}

#[tokio::test]
async fn test_suggest_times_collects_options_across_days() {
    let app = create_test_app(memory_state().await);

    let (status, body) = send_json(
        &app,
        Method::GET,
        "/assistant/suggest-times?days=7&limit=2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Ich kann Ihnen folgende Termine vorschlagen:"));

    for suggestion in body["suggestions"].as_array().unwrap() {
        let date =
            NaiveDate::parse_from_str(suggestion["date"].as_str().unwrap(), "%Y-%m-%d").unwrap();
        assert!(!matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
    }
}
