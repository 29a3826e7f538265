// libs/appointment-cell/src/services/availability.rs
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Weekday};
use tracing::debug;

use shared_state::AppState;

use crate::models::{AppointmentError, DayCheck, NextSlot, SlotSuggestion};
use crate::services::store::AppointmentStore;

/// Slot grid step in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// How many days a next-free-slot scan looks ahead before giving up.
pub const DEFAULT_HORIZON_DAYS: u32 = 30;

pub const DEFAULT_SUGGESTION_DAYS: u32 = 7;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// The fixed daily grid: two windows around the practice's lunch break.
/// 08:00-12:00 and 14:00-18:00 in 30-minute steps, 16 start times total.
/// 12:00 through 13:30 must never appear as bookable.
pub fn business_hours() -> Vec<NaiveTime> {
    let mut grid = Vec::with_capacity(16);
    for (opens, closes) in [(8, 12), (14, 18)] {
        let mut slot = NaiveTime::from_hms_opt(opens, 0, 0).unwrap();
        let until = NaiveTime::from_hms_opt(closes, 0, 0).unwrap();
        while slot < until {
            grid.push(slot);
            slot += Duration::minutes(SLOT_MINUTES);
        }
    }
    grid
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The practice only books weekday appointments on the fixed grid.
pub fn validate_bookable_slot(
    date: NaiveDate,
    start_time: NaiveTime,
) -> Result<(), AppointmentError> {
    if is_weekend(date) {
        return Err(AppointmentError::Validation(
            "appointments can only be booked Monday through Friday".to_string(),
        ));
    }
    if !business_hours().contains(&start_time) {
        return Err(AppointmentError::Validation(
            "start_time must be on the 30-minute grid within business hours \
             (08:00-12:00, 14:00-18:00)"
                .to_string(),
        ));
    }
    Ok(())
}

/// Free/busy queries over the booked grid.
pub struct AvailabilityService {
    store: AppointmentStore,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: AppointmentStore::new(state),
        }
    }

    /// First free slot scanning forward day by day from `from`. Weekends are
    /// skipped but still consume the horizon, so the scan always terminates.
    /// `None` means the caller has to offer the manual-contact fallback.
    pub async fn next_available(
        &self,
        from: NaiveDate,
        horizon_days: u32,
    ) -> Result<Option<NextSlot>, AppointmentError> {
        self.next_available_after(from, None, horizon_days).await
    }

    /// Like `next_available`, but a collision at `after` on the first day
    /// offers the slot following it, not the day's earliest free time.
    pub async fn next_available_after(
        &self,
        from: NaiveDate,
        after: Option<NaiveTime>,
        horizon_days: u32,
    ) -> Result<Option<NextSlot>, AppointmentError> {
        for offset in 0..=i64::from(horizon_days) {
            let date = from + Duration::days(offset);
            if is_weekend(date) {
                continue;
            }

            let mut free = self.free_times(date).await?;
            if offset == 0 {
                if let Some(after) = after {
                    free.retain(|slot| *slot > after);
                }
            }
            if let Some(first) = free.first().copied() {
                debug!("Next free slot: {} {}", date, first);
                return Ok(Some(NextSlot {
                    date,
                    time: first,
                    available_times: free.into_iter().take(5).collect(),
                }));
            }
        }

        debug!("No free slot within {} days of {}", horizon_days, from);
        Ok(None)
    }

    /// Partition one day's grid into free and booked, with structured
    /// reasons for days that cannot be booked at all. The weekend check
    /// comes first: a Saturday in the past still reads as "closed".
    pub async fn check_date(&self, date: NaiveDate) -> Result<DayCheck, AppointmentError> {
        self.check_date_against(date, today()).await
    }

    pub async fn check_date_against(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<DayCheck, AppointmentError> {
        if is_weekend(date) {
            return Ok(DayCheck::Weekend);
        }
        if date < today {
            return Ok(DayCheck::Past);
        }

        let booked = self.store.booked_times(date).await?;
        let available = business_hours()
            .into_iter()
            .filter(|slot| !booked.contains(slot))
            .collect();

        Ok(DayCheck::Bookable { available, booked })
    }

    /// Up to `max_suggestions` options, one per day (each day's earliest free
    /// time), scanning `days_to_check` days forward from today.
    pub async fn suggest_times(
        &self,
        days_to_check: u32,
        max_suggestions: usize,
    ) -> Result<Vec<SlotSuggestion>, AppointmentError> {
        self.suggest_times_from(today(), days_to_check, max_suggestions)
            .await
    }

    pub async fn suggest_times_from(
        &self,
        from: NaiveDate,
        days_to_check: u32,
        max_suggestions: usize,
    ) -> Result<Vec<SlotSuggestion>, AppointmentError> {
        let mut suggestions = Vec::new();

        for offset in 0..i64::from(days_to_check) {
            if suggestions.len() >= max_suggestions {
                break;
            }

            let date = from + Duration::days(offset);
            if is_weekend(date) {
                continue;
            }

            let free = self.free_times(date).await?;
            if let Some(first) = free.first().copied() {
                suggestions.push(SlotSuggestion {
                    date,
                    time: first,
                    available_count: free.len(),
                });
            }
        }

        Ok(suggestions)
    }

    async fn free_times(&self, date: NaiveDate) -> Result<Vec<NaiveTime>, AppointmentError> {
        let booked = self.store.booked_times(date).await?;
        Ok(business_hours()
            .into_iter()
            .filter(|slot| !booked.contains(slot))
            .collect())
    }
}

/// The current local calendar day, built from local date fields. Formatting
/// an instant through UTC here would shift the visible date near midnight.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
