//! Plant-local time (America/Panama).
//!
//! Panama stays on UTC-05:00 all year, so a fixed offset is exact.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

const PANAMA_OFFSET_SECS: i32 = 5 * 3600;

/// The plant's timezone.
pub fn panama() -> FixedOffset {
    FixedOffset::west_opt(PANAMA_OFFSET_SECS).expect("UTC-05:00 is a valid offset")
}

pub fn to_panama(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&panama())
}

/// Scan time as shown to drivers, e.g. `3:07:42 PM`.
pub fn format_clock(instant: DateTime<Utc>) -> String {
    to_panama(instant).format("%-I:%M:%S %p").to_string()
}

/// Timestamp as shown in reports, e.g. `2025-10-25 08:00`.
pub fn format_report(instant: DateTime<Utc>) -> String {
    to_panama(instant).format("%Y-%m-%d %H:%M").to_string()
}

/// Panama calendar day of an instant.
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    to_panama(instant).date_naive()
}

/// UTC instant of local midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match panama().from_local_datetime(&midnight).single() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&midnight),
    }
}
