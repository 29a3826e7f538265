// libs/assistant-cell/src/services/assistant.rs
use chrono::{Datelike, Duration, NaiveDate};
use tracing::info;

use shared_state::AppState;

use appointment_cell::models::{
    format_hhmm, Appointment, AppointmentError, AppointmentStatus, CreateAppointmentRequest,
    DayCheck, ListAppointmentsQuery, NextSlot, SlotSuggestion,
};
use appointment_cell::services::availability::{today, AvailabilityService, DEFAULT_HORIZON_DAYS};
use appointment_cell::services::store::AppointmentStore;

use crate::models::{AssistantBookingRequest, BookingOutcome};
use crate::services::narration::{day_name_de, format_date_de};

const WEBHOOK_NOTES: &str = "Via Sofia gebucht";

/// Spoken-German view over the appointment store for the voice assistant.
/// All booking goes through the same store as the calendar UI, so the
/// assistant can never bypass the slot collision rules.
pub struct AssistantService {
    store: AppointmentStore,
    availability: AvailabilityService,
}

impl AssistantService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: AppointmentStore::new(state),
            availability: AvailabilityService::new(state),
        }
    }

    /// Book the requested slot, or explain why not and offer the next free one.
    pub async fn book(
        &self,
        request: AssistantBookingRequest,
    ) -> Result<BookingOutcome, AppointmentError> {
        let requested_date = request.requested_date;
        let requested_time = request.requested_time;
        info!(
            "Assistant booking request for {} at {} {}",
            request.patient_name, requested_date, format_hhmm(request.requested_time)
        );

        let create = CreateAppointmentRequest {
            patient_name: request.patient_name,
            phone: request.patient_phone,
            date: request.requested_date,
            start_time: request.requested_time,
            end_time: None,
            treatment_type: request.treatment_type,
            notes: Some(WEBHOOK_NOTES.to_string()),
        };

        match self.store.create(create).await {
            Ok(appointment) => {
                let message = format!(
                    "Termin erfolgreich gebucht für {} um {} Uhr.",
                    appointment.date,
                    format_hhmm(appointment.start_time)
                );
                Ok(BookingOutcome {
                    success: true,
                    message,
                    appointment: Some(appointment),
                })
            }
            Err(AppointmentError::SlotTaken) => {
                let mut message = "Der gewünschte Termin ist bereits vergeben.".to_string();
                match self
                    .availability
                    .next_available_after(
                        requested_date,
                        Some(requested_time),
                        DEFAULT_HORIZON_DAYS,
                    )
                    .await?
                {
                    Some(slot) => message.push_str(&format!(
                        " Der nächste freie Termin ist {} um {} Uhr.",
                        format_date_de(slot.date),
                        format_hhmm(slot.time)
                    )),
                    None => message.push_str(" Bitte rufen Sie uns direkt an."),
                }
                Ok(BookingOutcome {
                    success: false,
                    message,
                    appointment: None,
                })
            }
            Err(AppointmentError::Validation(_)) => Ok(BookingOutcome {
                success: false,
                message: "Termine sind nur Montag bis Freitag zwischen 08:00 und 12:00 Uhr \
                          sowie 14:00 und 18:00 Uhr möglich."
                    .to_string(),
                appointment: None,
            }),
            Err(e) => Err(e),
        }
    }

    /// Today's schedule, read out loud.
    pub async fn today_summary(&self) -> Result<(String, Vec<Appointment>), AppointmentError> {
        let date = today();
        let appointments = self.live_on_date(date).await?;

        if appointments.is_empty() {
            return Ok(("Heute sind keine Termine geplant.".to_string(), appointments));
        }

        let parts: Vec<String> = appointments
            .iter()
            .map(|apt| {
                format!(
                    "um {} Uhr {} für {}",
                    format_hhmm(apt.start_time),
                    apt.patient_name,
                    apt.treatment_type
                )
            })
            .collect();

        let message = format!(
            "Heute, {}, haben wir {} Termine: {}.",
            format_date_de(date),
            appointments.len(),
            parts.join(", ")
        );
        Ok((message, appointments))
    }

    /// A patient's upcoming appointments, looked up by phone number.
    pub async fn patient_summary(
        &self,
        phone: &str,
    ) -> Result<(String, Vec<Appointment>), AppointmentError> {
        let mut appointments = self.store.upcoming_by_phone(phone, today()).await?;
        appointments.retain(|apt| apt.status != AppointmentStatus::Cancelled);

        if appointments.is_empty() {
            return Ok((
                "Sie haben aktuell keine anstehenden Termine bei uns.".to_string(),
                appointments,
            ));
        }

        let parts: Vec<String> = appointments
            .iter()
            .map(|apt| {
                format!(
                    "{} um {} Uhr für {}",
                    format_date_de(apt.date),
                    format_hhmm(apt.start_time),
                    apt.treatment_type
                )
            })
            .collect();

        let message = format!(
            "Sie haben {} anstehende Termine: {}.",
            appointments.len(),
            parts.join(", ")
        );
        Ok((message, appointments))
    }

    /// Per-weekday counts for the current week, Monday through Sunday.
    pub async fn week_summary(&self) -> Result<(String, Vec<Appointment>), AppointmentError> {
        let date = today();
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let sunday = monday + Duration::days(6);

        let mut appointments = self.store.between(monday, sunday, None).await?;
        appointments.retain(|apt| apt.status != AppointmentStatus::Cancelled);

        if appointments.is_empty() {
            return Ok((
                "Diese Woche sind keine Termine geplant.".to_string(),
                appointments,
            ));
        }

        // Group by weekday, keeping date order
        let mut day_counts: Vec<(&'static str, usize)> = Vec::new();
        for apt in &appointments {
            let day = day_name_de(apt.date);
            match day_counts.last_mut() {
                Some((last_day, count)) if *last_day == day => *count += 1,
                _ => day_counts.push((day, 1)),
            }
        }

        let parts: Vec<String> = day_counts
            .iter()
            .map(|(day, count)| format!("{} {} Termine", day, count))
            .collect();

        let message = format!(
            "Diese Woche haben wir Termine an {} Tagen: {}.",
            day_counts.len(),
            parts.join(", ")
        );
        Ok((message, appointments))
    }

    /// The next 30 days, first ten appointments, naming the nearest one.
    pub async fn upcoming_summary(&self) -> Result<(String, Vec<Appointment>), AppointmentError> {
        let from = today();
        let until = from + Duration::days(30);

        let mut appointments = self.store.between(from, until, Some(10)).await?;
        appointments.retain(|apt| apt.status != AppointmentStatus::Cancelled);

        if appointments.is_empty() {
            return Ok((
                "In den nächsten 30 Tagen sind keine Termine geplant.".to_string(),
                appointments,
            ));
        }

        let next = &appointments[0];
        let message = format!(
            "In den nächsten 30 Tagen haben wir {} Termine. Der nächste Termin ist {} um {} Uhr mit {}.",
            appointments.len(),
            format_date_de(next.date),
            format_hhmm(next.start_time),
            next.patient_name
        );
        Ok((message, appointments))
    }

    /// Spoken version of the next-free-slot query.
    pub async fn next_available_reply(
        &self,
    ) -> Result<(String, Option<NextSlot>), AppointmentError> {
        let slot = self
            .availability
            .next_available(today(), DEFAULT_HORIZON_DAYS)
            .await?;

        let message = match &slot {
            Some(slot) => format!(
                "Der nächste freie Termin ist {} um {} Uhr.",
                format_date_de(slot.date),
                format_hhmm(slot.time)
            ),
            None => "In den nächsten 30 Tagen sind leider alle Termine belegt. \
                     Bitte rufen Sie uns direkt an."
                .to_string(),
        };
        Ok((message, slot))
    }

    /// Spoken availability for one explicit day.
    pub async fn check_date_reply(
        &self,
        date: NaiveDate,
    ) -> Result<(String, DayCheck), AppointmentError> {
        let check = self.availability.check_date(date).await?;

        let message = match &check {
            DayCheck::Weekend => {
                "Am Wochenende haben wir geschlossen. Bitte wählen Sie einen Wochentag."
                    .to_string()
            }
            DayCheck::Past => {
                "Dieses Datum liegt in der Vergangenheit. Bitte wählen Sie ein zukünftiges Datum."
                    .to_string()
            }
            DayCheck::Bookable { available, .. } if !available.is_empty() => format!(
                "Am {} haben wir noch {} freie Termine: {} Uhr.",
                format_date_de(date),
                available.len(),
                available
                    .iter()
                    .take(5)
                    .copied()
                    .map(format_hhmm)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            DayCheck::Bookable { .. } => format!(
                "Am {} sind leider alle Termine belegt. Soll ich Ihnen Alternativen vorschlagen?",
                format_date_de(date)
            ),
        };
        Ok((message, check))
    }

    /// A handful of options across the coming days, one per day.
    pub async fn suggestions_reply(
        &self,
        days_to_check: u32,
        max_suggestions: usize,
    ) -> Result<(String, Vec<SlotSuggestion>), AppointmentError> {
        let suggestions = self
            .availability
            .suggest_times(days_to_check, max_suggestions)
            .await?;

        let message = if suggestions.is_empty() {
            format!(
                "In den nächsten {} Tagen sind leider keine Termine frei. \
                 Bitte rufen Sie uns direkt an.",
                days_to_check
            )
        } else {
            let parts: Vec<String> = suggestions
                .iter()
                .map(|s| format!("{} um {} Uhr", format_date_de(s.date), format_hhmm(s.time)))
                .collect();
            format!(
                "Ich kann Ihnen folgende Termine vorschlagen: {}.",
                parts.join(", ")
            )
        };
        Ok((message, suggestions))
    }

    async fn live_on_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
        let query = ListAppointmentsQuery {
            date: Some(date),
            phone: None,
        };
        let mut appointments = self.store.list(&query).await?;
        appointments.retain(|apt| apt.status != AppointmentStatus::Cancelled);
        Ok(appointments)
    }
}
