// libs/assistant-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use appointment_cell::models::{hhmm, Appointment};

/// Booking request as the voice assistant's webhook sends it. The aliases
/// match the assistant's own field spelling so either casing works.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantBookingRequest {
    #[serde(alias = "patientName")]
    pub patient_name: String,
    #[serde(default, alias = "patientPhone", alias = "phone")]
    pub patient_phone: Option<String>,
    #[serde(alias = "requestedDate", alias = "date")]
    pub requested_date: NaiveDate,
    #[serde(with = "hhmm", alias = "requestedTime", alias = "time")]
    pub requested_time: NaiveTime,
    #[serde(default, alias = "treatmentType")]
    pub treatment_type: Option<String>,
}

/// Outcome of a webhook booking attempt, already phrased for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
}
