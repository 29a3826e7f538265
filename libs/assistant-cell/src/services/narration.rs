// libs/assistant-cell/src/services/narration.rs
//
// German date wording for the spoken replies. Everything here reads the
// local calendar fields directly; formatting an instant through a UTC
// serialization would shift the spoken date near midnight.
use chrono::{Datelike, NaiveDate, Weekday};

pub fn weekday_de(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

pub fn month_de(month: u32) -> &'static str {
    match month {
        1 => "Januar",
        2 => "Februar",
        3 => "März",
        4 => "April",
        5 => "Mai",
        6 => "Juni",
        7 => "Juli",
        8 => "August",
        9 => "September",
        10 => "Oktober",
        11 => "November",
        _ => "Dezember",
    }
}

pub fn day_name_de(date: NaiveDate) -> &'static str {
    weekday_de(date.weekday())
}

/// Long form as the assistant speaks it: "Montag, 10. März 2025".
pub fn format_date_de(date: NaiveDate) -> String {
    format!(
        "{}, {}. {} {}",
        weekday_de(date.weekday()),
        date.day(),
        month_de(date.month()),
        date.year()
    )
}
