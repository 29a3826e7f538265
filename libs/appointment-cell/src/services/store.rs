// libs/appointment-cell/src/services/store.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

use shared_events::EventBroadcaster;
use shared_state::AppState;

use crate::models::{
    format_hhmm, parse_hhmm, Appointment, AppointmentError, AppointmentStatus,
    CreateAppointmentRequest, ListAppointmentsQuery, UpdateAppointmentRequest,
    DEFAULT_DURATION_MINUTES, DEFAULT_TREATMENT,
};
use crate::services::availability::validate_bookable_slot;

const APPOINTMENT_COLUMNS: &str = "id, patient_name, phone, date, start_time, end_time, \
     treatment_type, notes, status, created_at, updated_at";

/// Durable storage for the practice's appointments.
///
/// Every mutation goes through here, whether it comes from the calendar UI
/// or from the assistant webhook, so both share one collision check and one
/// event stream. The slot collision itself is enforced by the partial unique
/// index on (date, start_time) - the insert is the check.
pub struct AppointmentStore {
    pool: SqlitePool,
    events: EventBroadcaster,
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: i64,
    patient_name: String,
    phone: Option<String>,
    date: String,
    start_time: String,
    end_time: String,
    treatment_type: String,
    notes: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = AppointmentError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, detail: String| {
            AppointmentError::Database(format!("corrupt {} in row {}: {}", what, row.id, detail))
        };

        Ok(Appointment {
            id: row.id,
            patient_name: row.patient_name.clone(),
            phone: row.phone.clone(),
            date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
                .map_err(|e| corrupt("date", e.to_string()))?,
            start_time: parse_hhmm(&row.start_time).map_err(|e| corrupt("start_time", e))?,
            end_time: parse_hhmm(&row.end_time).map_err(|e| corrupt("end_time", e))?,
            treatment_type: row.treatment_type.clone(),
            notes: row.notes.clone(),
            status: AppointmentStatus::from_str(&row.status)
                .map_err(|e| corrupt("status", e))?,
            created_at: parse_instant(&row.created_at)
                .map_err(|e| corrupt("created_at", e))?,
            updated_at: parse_instant(&row.updated_at)
                .map_err(|e| corrupt("updated_at", e))?,
        })
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

/// Keep only digits and `+`, the way the assistant reads numbers back.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

impl AppointmentStore {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.db.pool().clone(),
            events: state.events.clone(),
        }
    }

    /// List appointments ordered by (date, start_time), optionally filtered
    /// by date and/or patient phone number.
    pub async fn list(
        &self,
        query: &ListAppointmentsQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut sql = format!("SELECT {} FROM appointments", APPOINTMENT_COLUMNS);
        let mut clauses = Vec::new();
        if query.date.is_some() {
            clauses.push("date = ?");
        }
        if query.phone.is_some() {
            clauses.push("phone = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date, start_time");

        let mut fetch = sqlx::query_as::<_, AppointmentRow>(&sql);
        if let Some(date) = query.date {
            fetch = fetch.bind(format_date(date));
        }
        if let Some(phone) = &query.phone {
            fetch = fetch.bind(normalize_phone(phone));
        }

        let rows = fetch
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    /// Upcoming appointments for one patient, identified by phone number.
    pub async fn upcoming_by_phone(
        &self,
        phone: &str,
        from: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let sql = format!(
            "SELECT {} FROM appointments WHERE phone = ? AND date >= ? ORDER BY date, start_time",
            APPOINTMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(normalize_phone(phone))
            .bind(format_date(from))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    /// Appointments in the inclusive date window, earliest first.
    pub async fn between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
        limit: Option<i64>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut sql = format!(
            "SELECT {} FROM appointments WHERE date BETWEEN ? AND ? ORDER BY date, start_time",
            APPOINTMENT_COLUMNS
        );
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut fetch = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(format_date(from))
            .bind(format_date(until));
        if let Some(limit) = limit {
            fetch = fetch.bind(limit);
        }

        let rows = fetch
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Appointment, AppointmentError> {
        let sql = format!(
            "SELECT {} FROM appointments WHERE id = ?",
            APPOINTMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.ok_or(AppointmentError::NotFound)?.try_into()
    }

    /// Book a slot. A single conditional insert: the partial unique index
    /// rejects a second non-cancelled booking for the same (date, start_time),
    /// which surfaces here as `SlotTaken`.
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let patient_name = request.patient_name.trim().to_string();
        if patient_name.is_empty() {
            return Err(AppointmentError::Validation(
                "patient_name must not be empty".to_string(),
            ));
        }

        validate_bookable_slot(request.date, request.start_time)?;

        let start = request.start_time;
        let end = request
            .end_time
            .unwrap_or_else(|| start + Duration::minutes(DEFAULT_DURATION_MINUTES));
        if end <= start {
            return Err(AppointmentError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }

        let treatment_type = request
            .treatment_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TREATMENT.to_string());
        let phone = request
            .phone
            .as_deref()
            .map(normalize_phone)
            .filter(|p| !p.is_empty());
        let now = Utc::now();

        debug!("Booking {} at {} {}", patient_name, request.date, format_hhmm(start));

        let result = sqlx::query(
            r#"
            INSERT INTO appointments
                (patient_name, phone, date, start_time, end_time,
                 treatment_type, notes, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&patient_name)
        .bind(&phone)
        .bind(format_date(request.date))
        .bind(format_hhmm(start))
        .bind(format_hhmm(end))
        .bind(&treatment_type)
        .bind(&request.notes)
        .bind(AppointmentStatus::Confirmed.to_string())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(mutation_error)?;

        let appointment = self.get(result.last_insert_rowid()).await?;
        self.events.appointment_created(&appointment);

        info!(
            "Appointment {} booked for {} at {} {}",
            appointment.id, appointment.patient_name, appointment.date,
            format_hhmm(appointment.start_time)
        );
        Ok(appointment)
    }

    /// Apply a partial update (reschedule, status change, detail edits).
    /// Rescheduling into an occupied slot fails with `SlotTaken`, same
    /// invariant as booking.
    pub async fn update(
        &self,
        id: i64,
        patch: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get(id).await?;

        let date = patch.date.unwrap_or(current.date);
        let start = patch.start_time.unwrap_or(current.start_time);
        let end = resolve_end_time(&current, &patch, start);

        if date != current.date || start != current.start_time {
            validate_bookable_slot(date, start)?;
        }
        if end <= start {
            return Err(AppointmentError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }

        let patient_name = match patch.patient_name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AppointmentError::Validation(
                        "patient_name must not be empty".to_string(),
                    ));
                }
                name
            }
            None => current.patient_name.clone(),
        };
        let phone = match patch.phone {
            Some(raw) => {
                let normalized = normalize_phone(&raw);
                (!normalized.is_empty()).then_some(normalized)
            }
            None => current.phone.clone(),
        };
        let treatment_type = patch.treatment_type.unwrap_or(current.treatment_type);
        let notes = patch.notes.or(current.notes);
        let status = patch.status.unwrap_or(current.status);

        sqlx::query(
            r#"
            UPDATE appointments
            SET patient_name = ?, phone = ?, date = ?, start_time = ?, end_time = ?,
                treatment_type = ?, notes = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&patient_name)
        .bind(&phone)
        .bind(format_date(date))
        .bind(format_hhmm(start))
        .bind(format_hhmm(end))
        .bind(&treatment_type)
        .bind(&notes)
        .bind(status.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(mutation_error)?;

        let updated = self.get(id).await?;
        self.events.appointment_updated(&updated);

        info!("Appointment {} updated", id);
        Ok(updated)
    }

    /// Permanent removal; there is no soft delete.
    pub async fn delete(&self, id: i64) -> Result<(), AppointmentError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(AppointmentError::NotFound);
        }

        self.events.appointment_deleted(id);
        info!("Appointment {} deleted", id);
        Ok(())
    }

    /// Start times already taken on a day. Cancelled rows free their slot.
    pub async fn booked_times(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, AppointmentError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT start_time FROM appointments \
             WHERE date = ? AND status <> 'cancelled' ORDER BY start_time",
        )
        .bind(format_date(date))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|raw| {
                parse_hhmm(raw)
                    .map_err(|e| AppointmentError::Database(format!("corrupt start_time: {}", e)))
            })
            .collect()
    }
}

fn resolve_end_time(
    current: &Appointment,
    patch: &UpdateAppointmentRequest,
    new_start: NaiveTime,
) -> NaiveTime {
    match patch.end_time {
        Some(end) => end,
        // A moved start keeps its stored duration
        None if patch.start_time.is_some() => {
            new_start + (current.end_time - current.start_time)
        }
        None => current.end_time,
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn storage_error(e: sqlx::Error) -> AppointmentError {
    AppointmentError::Database(e.to_string())
}

fn mutation_error(e: sqlx::Error) -> AppointmentError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppointmentError::SlotTaken
        }
        _ => AppointmentError::Database(e.to_string()),
    }
}
