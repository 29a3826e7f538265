// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_state::AppState;

use crate::models::{
    format_hhmm, AppointmentError, CalendarEvent, CreateAppointmentRequest, DayAvailability,
    ListAppointmentsQuery, UpdateAppointmentRequest,
};
use crate::services::availability::{
    business_hours, today, AvailabilityService, DEFAULT_HORIZON_DAYS, DEFAULT_SUGGESTION_DAYS,
    DEFAULT_SUGGESTION_LIMIT,
};
use crate::services::store::AppointmentStore;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct NextAvailableParams {
    pub from: Option<NaiveDate>,
    /// Only consider slots strictly after this time on the first day,
    /// e.g. when offering an alternative for a collided booking.
    #[serde(default, with = "crate::models::hhmm_opt")]
    pub after: Option<chrono::NaiveTime>,
    pub horizon_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

fn appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::SlotTaken => {
            AppError::SlotTaken("Appointment slot conflicts with an existing booking".to_string())
        }
        AppointmentError::Validation(msg) => AppError::Validation(msg),
        AppointmentError::Database(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// APPOINTMENT CRUD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let store = AppointmentStore::new(&state);

    let appointments = store.list(&query).await.map_err(appointment_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

/// The same listing shaped as FullCalendar event objects for the calendar UI.
#[axum::debug_handler]
pub async fn calendar_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let store = AppointmentStore::new(&state);

    let appointments = store.list(&query).await.map_err(appointment_error)?;
    let events = appointments.iter().map(CalendarEvent::from).collect();

    Ok(Json(events))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let store = AppointmentStore::new(&state);

    let appointment = store
        .get(appointment_id)
        .await
        .map_err(appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let store = AppointmentStore::new(&state);

    let appointment = store.create(request).await.map_err(appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let store = AppointmentStore::new(&state);

    let appointment = store
        .update(appointment_id, request)
        .await
        .map_err(appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let store = AppointmentStore::new(&state);

    store
        .delete(appointment_id)
        .await
        .map_err(appointment_error)?;

    Ok(Json(json!({ "success": true })))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn next_available(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NextAvailableParams>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state);

    let from = params.from.unwrap_or_else(today);
    let horizon = params
        .horizon_days
        .unwrap_or(DEFAULT_HORIZON_DAYS)
        .min(DEFAULT_HORIZON_DAYS);

    let slot = availability
        .next_available_after(from, params.after, horizon)
        .await
        .map_err(appointment_error)?;

    // "Nothing free" is a regular outcome, not an error
    Ok(Json(match slot {
        Some(slot) => json!({
            "available": true,
            "date": slot.date,
            "time": format_hhmm(slot.time),
            "all_available_times": slot.available_times.iter().copied()
                .map(format_hhmm).collect::<Vec<_>>()
        }),
        None => json!({ "available": false }),
    }))
}

#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<DayAvailability>, AppError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        AppError::Validation("invalid date format, expected YYYY-MM-DD".to_string())
    })?;

    let availability = AvailabilityService::new(&state);
    let check = availability
        .check_date(date)
        .await
        .map_err(appointment_error)?;

    Ok(Json(DayAvailability::from_check(
        date,
        &check,
        business_hours().len(),
    )))
}

#[axum::debug_handler]
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state);

    let days = params.days.unwrap_or(DEFAULT_SUGGESTION_DAYS);
    let limit = params.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);

    let suggestions = availability
        .suggest_times(days, limit)
        .await
        .map_err(appointment_error)?;

    let entries: Vec<Value> = suggestions
        .iter()
        .map(|s| {
            json!({
                "date": s.date,
                "time": format_hhmm(s.time),
                "available_count": s.available_count
            })
        })
        .collect();

    Ok(Json(json!({
        "suggestions": entries,
        "count": entries.len()
    })))
}
