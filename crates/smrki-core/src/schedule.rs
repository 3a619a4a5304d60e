//! Schedule creation rules and reminder time resolution.
//!
//! A schedule's `time` is free text typed by the user. It is resolved to the
//! next local instant at that time of day: today if still ahead, otherwise
//! tomorrow. Every resolved reminder is one-shot.

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::{Result, SmrkiError};
use crate::types::{Schedule, ScheduleForm};

/// Hour used when the time field is empty or malformed.
pub const DEFAULT_REMINDER_HOUR: u32 = 9;

/// Minute used when the time field is empty or malformed.
pub const DEFAULT_REMINDER_MINUTE: u32 = 0;

/// Notification text used when a schedule has an empty title.
pub const DEFAULT_REMINDER_MESSAGE: &str = "Reminder";

/// Alert text shown when the form is submitted incomplete.
pub const INCOMPLETE_FORM_MESSAGE: &str = "Fill both title and time";

/// Checks that both form fields are filled in.
///
/// # Errors
///
/// Returns [`SmrkiError::ValidationFailed`] if either field is empty.
pub fn validate_form(form: &ScheduleForm) -> Result<()> {
    if form.title.is_empty() || form.time.is_empty() {
        return Err(SmrkiError::ValidationFailed(
            INCOMPLETE_FORM_MESSAGE.to_string(),
        ));
    }
    Ok(())
}

/// Builds a new schedule from a validated form.
///
/// The id is the creation time in milliseconds. If that collides with an
/// existing schedule the candidate is advanced one millisecond at a time.
#[must_use]
pub fn new_schedule(form: &ScheduleForm, now_millis: i64, existing: &[Schedule]) -> Schedule {
    let mut candidate = now_millis;
    while existing.iter().any(|s| s.id == candidate.to_string()) {
        candidate += 1;
    }
    Schedule {
        id: candidate.to_string(),
        title: form.title.clone(),
        time: form.time.clone(),
    }
}

/// Returns the notification body for a schedule.
#[must_use]
pub fn reminder_message(schedule: &Schedule) -> String {
    if schedule.title.is_empty() {
        DEFAULT_REMINDER_MESSAGE.to_string()
    } else {
        schedule.title.clone()
    }
}

/// Parses a `HH:MM` string into a time of day.
///
/// Each component takes its leading decimal digits, and a component with no
/// digits counts as zero (`"7:xx"` is 07:00). Anything that is not exactly
/// two components, or is out of range, falls back to 09:00.
#[must_use]
pub fn parse_time_of_day(input: &str) -> NaiveTime {
    split_components(input)
        .and_then(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
        .unwrap_or_else(default_time_of_day)
}

/// Resolves a schedule time to the next matching instant relative to `now`.
///
/// The candidate is today at `HH:MM:00.000` in `now`'s timezone. If that is
/// already in the past, it moves forward exactly one calendar day.
pub fn resolve_fire_time<Tz: TimeZone>(time: &str, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive().and_time(parse_time_of_day(time));
    let candidate = localize(&tz, today);
    if candidate < *now {
        localize(&tz, today + Duration::days(1))
    } else {
        candidate
    }
}

fn default_time_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_REMINDER_HOUR, DEFAULT_REMINDER_MINUTE, 0)
        .unwrap_or(NaiveTime::MIN)
}

fn split_components(input: &str) -> Option<(u32, u32)> {
    let mut parts = input.split(':');
    let hour = parts.next()?;
    let minute = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((leading_number(hour)?, leading_number(minute)?))
}

fn leading_number(component: &str) -> Option<u32> {
    let trimmed = component.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = &trimmed[..end];
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

/// Maps a wall-clock time to an instant, skipping forward over DST gaps.
fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
