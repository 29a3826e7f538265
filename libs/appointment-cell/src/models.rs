// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Appointments without an explicit end run for one slot.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;

/// Label used when the caller does not name a treatment.
pub const DEFAULT_TREATMENT: &str = "Beratung";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_name: String,
    pub phone: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub treatment_type: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Calendar display color, as the practice UI expects it.
    pub fn color(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "#28a745",
            AppointmentStatus::Cancelled => "#dc3545",
            AppointmentStatus::Completed => "#007bff",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(alias = "patientName")]
    pub patient_name: String,
    #[serde(default, alias = "patientPhone")]
    pub phone: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "hhmm", alias = "time")]
    pub start_time: NaiveTime,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, alias = "treatmentType")]
    pub treatment_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Patch semantics: absent fields keep their stored value. Moving
/// `start_time` without an explicit `end_time` preserves the duration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default, alias = "patientName")]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm_opt", alias = "time")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, alias = "treatmentType")]
    pub treatment_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

/// Calendar clients send `?date=&phone=` with unused filters left empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsQuery {
    #[serde(default, deserialize_with = "empty_as_none_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
}

fn empty_as_none<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

fn empty_as_none_date<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// Result of checking one calendar day for bookable slots.
#[derive(Debug, Clone, PartialEq)]
pub enum DayCheck {
    Weekend,
    Past,
    Bookable {
        available: Vec<NaiveTime>,
        booked: Vec<NaiveTime>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NextSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Up to five free times on that day, earliest first.
    pub available_times: Vec<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSuggestion {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub available_count: usize,
}

/// Wire form of a day partition, times as `HH:MM` strings.
#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub available: bool,
    pub is_weekend: bool,
    pub is_past: bool,
    pub available_times: Vec<String>,
    pub booked_times: Vec<String>,
    pub total_slots: usize,
    pub free_slots: usize,
}

impl DayAvailability {
    pub fn from_check(date: NaiveDate, check: &DayCheck, total_slots: usize) -> Self {
        match check {
            DayCheck::Weekend => Self {
                date,
                available: false,
                is_weekend: true,
                is_past: false,
                available_times: vec![],
                booked_times: vec![],
                total_slots,
                free_slots: 0,
            },
            DayCheck::Past => Self {
                date,
                available: false,
                is_weekend: false,
                is_past: true,
                available_times: vec![],
                booked_times: vec![],
                total_slots,
                free_slots: 0,
            },
            DayCheck::Bookable { available, booked } => Self {
                date,
                available: !available.is_empty(),
                is_weekend: false,
                is_past: false,
                available_times: available.iter().copied().map(format_hhmm).collect(),
                booked_times: booked.iter().copied().map(format_hhmm).collect(),
                total_slots,
                free_slots: available.len(),
            },
        }
    }
}

// ==============================================================================
// CALENDAR VIEW MODELS
// ==============================================================================

/// FullCalendar event object consumed by the practice's calendar UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub start: String,
    pub end: String,
    pub background_color: &'static str,
    pub extended_props: CalendarEventProps,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventProps {
    pub patient_name: String,
    pub phone: Option<String>,
    pub treatment_type: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

impl From<&Appointment> for CalendarEvent {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            title: format!("{} - {}", appointment.patient_name, appointment.treatment_type),
            start: format!("{}T{}", appointment.date, format_hhmm(appointment.start_time)),
            end: format!("{}T{}", appointment.date, format_hhmm(appointment.end_time)),
            background_color: appointment.status.color(),
            extended_props: CalendarEventProps {
                patient_name: appointment.patient_name.clone(),
                phone: appointment.phone.clone(),
                treatment_type: appointment.treatment_type.clone(),
                notes: appointment.notes.clone(),
                status: appointment.status.clone(),
            },
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment slot is already taken")]
    SlotTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

// ==============================================================================
// TIME FORMAT HELPERS
// ==============================================================================

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("invalid time '{}', expected HH:MM", raw))
}

/// Serde adapter for clock times on the wire (`"09:00"`).
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional clock times.
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_some(&super::format_hhmm(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|raw| super::parse_hhmm(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hhmm_accepts_both_precision_levels() {
        assert_eq!(
            parse_hhmm("09:00").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            parse_hhmm("09:00:00").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert!(parse_hhmm("9 Uhr").is_err());
    }

    #[test]
    fn appointment_times_serialize_without_seconds() {
        let appointment = Appointment {
            id: 1,
            patient_name: "Anna Schmidt".to_string(),
            phone: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            treatment_type: DEFAULT_TREATMENT.to_string(),
            notes: None,
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["start_time"], "09:00");
        assert_eq!(value["end_time"], "09:30");
        assert_eq!(value["status"], "confirmed");
    }

    #[test]
    fn create_request_accepts_webhook_field_spelling() {
        let request: CreateAppointmentRequest = serde_json::from_value(serde_json::json!({
            "patientName": "Max Weber",
            "patientPhone": "+49 170 1234567",
            "date": "2025-03-10",
            "time": "09:00"
        }))
        .unwrap();

        assert_eq!(request.patient_name, "Max Weber");
        assert_eq!(request.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(request.end_time.is_none());
    }

    #[test]
    fn calendar_event_carries_status_color() {
        let appointment = Appointment {
            id: 7,
            patient_name: "Anna Schmidt".to_string(),
            phone: Some("+491701234567".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            treatment_type: "Prophylaxe".to_string(),
            notes: None,
            status: AppointmentStatus::Cancelled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let event = CalendarEvent::from(&appointment);
        assert_eq!(event.title, "Anna Schmidt - Prophylaxe");
        assert_eq!(event.start, "2025-03-10T14:00");
        assert_eq!(event.background_color, "#dc3545");
    }
}
