// libs/assistant-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_state::AppState;

use appointment_cell::models::{format_hhmm, AppointmentError, DayCheck};
use appointment_cell::services::availability::business_hours;

use crate::models::AssistantBookingRequest;
use crate::services::assistant::AssistantService;
use crate::services::narration::format_date_de;

#[derive(Debug, Deserialize)]
pub struct SuggestTimesParams {
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

type SpokenError = (StatusCode, Json<Value>);

/// Assistant callers get a sentence, never a raw error object.
fn technical_error(e: AppointmentError) -> SpokenError {
    tracing::error!("Assistant endpoint failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "message": "Es ist ein technischer Fehler aufgetreten. \
                        Bitte versuchen Sie es später erneut."
        })),
    )
}

// ==============================================================================
// BOOKING WEBHOOK
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssistantBookingRequest>,
) -> Result<Json<Value>, SpokenError> {
    let assistant = AssistantService::new(&state);

    let outcome = assistant.book(request).await.map_err(technical_error)?;

    Ok(Json(json!(outcome)))
}

// ==============================================================================
// SPOKEN SCHEDULE SUMMARIES
// ==============================================================================

#[axum::debug_handler]
pub async fn today(State(state): State<Arc<AppState>>) -> Result<Json<Value>, SpokenError> {
    let assistant = AssistantService::new(&state);

    let (message, appointments) = assistant.today_summary().await.map_err(technical_error)?;

    Ok(Json(json!({
        "message": message,
        "appointments": appointments,
        "count": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn patient_appointments(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> Result<Json<Value>, SpokenError> {
    let assistant = AssistantService::new(&state);

    let (message, appointments) = assistant
        .patient_summary(&phone)
        .await
        .map_err(technical_error)?;

    Ok(Json(json!({
        "message": message,
        "appointments": appointments,
        "count": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn week_overview(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, SpokenError> {
    let assistant = AssistantService::new(&state);

    let (message, appointments) = assistant.week_summary().await.map_err(technical_error)?;

    Ok(Json(json!({
        "message": message,
        "appointments": appointments,
        "count": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn upcoming(State(state): State<Arc<AppState>>) -> Result<Json<Value>, SpokenError> {
    let assistant = AssistantService::new(&state);

    let (message, appointments) = assistant
        .upcoming_summary()
        .await
        .map_err(technical_error)?;

    Ok(Json(json!({
        "message": message,
        "appointments": appointments,
        "count": appointments.len()
    })))
}

// ==============================================================================
// SPOKEN AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn next_available(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, SpokenError> {
    let assistant = AssistantService::new(&state);

    let (message, slot) = assistant
        .next_available_reply()
        .await
        .map_err(technical_error)?;

    Ok(Json(match slot {
        Some(slot) => json!({
            "message": message,
            "available": true,
            "date": slot.date,
            "time": format_hhmm(slot.time),
            "formattedDate": format_date_de(slot.date),
            "allAvailableTimes": slot.available_times.iter().copied()
                .map(format_hhmm).collect::<Vec<_>>()
        }),
        None => json!({
            "message": message,
            "available": false
        }),
    }))
}

#[axum::debug_handler]
pub async fn check_date(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<Value>, SpokenError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Ungültiges Datumsformat. Bitte verwenden Sie YYYY-MM-DD.",
                "available": false
            })),
        )
    })?;

    let assistant = AssistantService::new(&state);
    let (message, check) = assistant
        .check_date_reply(date)
        .await
        .map_err(technical_error)?;

    Ok(Json(match &check {
        DayCheck::Weekend => json!({
            "message": message,
            "available": false,
            "isWeekend": true
        }),
        DayCheck::Past => json!({
            "message": message,
            "available": false,
            "isPast": true
        }),
        DayCheck::Bookable { available, booked } => json!({
            "message": message,
            "available": !available.is_empty(),
            "date": date,
            "formattedDate": format_date_de(date),
            "availableTimes": available.iter().copied().map(format_hhmm).collect::<Vec<_>>(),
            "bookedTimes": booked.iter().copied().map(format_hhmm).collect::<Vec<_>>(),
            "totalSlots": business_hours().len(),
            "freeSlots": available.len()
        }),
    }))
}

#[axum::debug_handler]
pub async fn suggest_times(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestTimesParams>,
) -> Result<Json<Value>, SpokenError> {
    let assistant = AssistantService::new(&state);

    let days = params.days.unwrap_or(7);
    let limit = params.limit.unwrap_or(5);

    let (message, suggestions) = assistant
        .suggestions_reply(days, limit)
        .await
        .map_err(technical_error)?;

    let entries: Vec<Value> = suggestions
        .iter()
        .map(|s| {
            json!({
                "date": s.date,
                "time": format_hhmm(s.time),
                "formattedDate": format_date_de(s.date),
                "availableCount": s.available_count
            })
        })
        .collect();

    Ok(Json(json!({
        "message": message,
        "suggestions": entries,
        "count": entries.len()
    })))
}
