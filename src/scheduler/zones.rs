//! Time-zone resolution for bookings.
//!
//! Pickup addresses carry US ZIP codes; the last 5-digit run in the address
//! is matched against a static interval table. Bookings whose address yields
//! no zone fall back to their program's configured zone.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::{
    Anchorage, Chicago, Denver, Los_Angeles, New_York, Phoenix, Puerto_Rico,
};
use chrono_tz::Pacific::Honolulu;
use chrono_tz::Tz;

use super::error::ScheduleError;

/// ZIP interval table, first match wins. Exceptions (panhandles, split
/// states) precede the broad state ranges they carve out of.
const ZIP_ZONES: &[(u32, u32, Tz)] = &[
    (501, 599, New_York),
    (600, 999, Puerto_Rico),
    // New England through the Carolinas.
    (1000, 29999, New_York),
    // Florida panhandle ahead of the GA/FL block.
    (32401, 32599, Chicago),
    (30000, 34999, New_York),
    (35000, 36999, Chicago),
    // East Tennessee ahead of the TN/MS block.
    (37600, 37999, New_York),
    (37000, 39799, Chicago),
    (39800, 39999, New_York),
    // Western Kentucky ahead of the KY block.
    (42000, 42799, Chicago),
    (40000, 41999, New_York),
    (43000, 49999, New_York),
    (50000, 58999, Chicago),
    (59000, 59999, Denver),
    (60000, 74999, Chicago),
    // El Paso ahead of the TX block.
    (79800, 79999, Denver),
    (75000, 79799, Chicago),
    (80000, 83199, Denver),
    // Idaho panhandle ahead of the ID block.
    (83800, 83899, Los_Angeles),
    (83200, 84999, Denver),
    (85000, 86599, Phoenix),
    (87000, 88599, Denver),
    (89000, 89999, Los_Angeles),
    (90000, 96199, Los_Angeles),
    (96700, 96899, Honolulu),
    (97000, 99499, Los_Angeles),
    (99500, 99999, Anchorage),
];

/// Extract the last 5-digit run from an address and look its ZIP up in the
/// interval table.
pub fn timezone_from_address(address: &str) -> Option<Tz> {
    let zip = last_five_digit_run(address)?;
    ZIP_ZONES
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&zip))
        .map(|(_, _, tz)| *tz)
}

fn last_five_digit_run(address: &str) -> Option<u32> {
    let mut last = None;
    let mut run = String::new();
    for c in address.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            if run.len() == 5 {
                last = run.parse().ok();
            }
            run.clear();
        }
    }
    last
}

/// Parse an IANA zone name, e.g. "America/New_York".
pub fn parse_zone(name: &str) -> Result<Tz, ScheduleError> {
    name.parse()
        .map_err(|_| ScheduleError::InvalidZone(name.to_string()))
}

/// Combine a "Month Day, Year" date and an "HH:MM" time of day into an
/// absolute instant in the given zone.
///
/// During fall-back the first occurrence of the ambiguous hour is chosen;
/// spring-forward gaps are rejected as invalid.
pub fn resolve_instant(
    date: &str,
    time_of_day: &str,
    tz: Tz,
) -> Result<DateTime<Utc>, ScheduleError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%B %d, %Y")
        .map_err(|_| ScheduleError::InvalidDate(date.to_string()))?;
    let time = NaiveTime::parse_from_str(time_of_day.trim(), "%H:%M")
        .map_err(|_| ScheduleError::InvalidDate(time_of_day.to_string()))?;
    let naive = date.and_time(time);

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, _) => Ok(first.with_timezone(&Utc)),
        LocalResult::None => Err(ScheduleError::InvalidDate(format!(
            "{naive} does not exist in {tz}"
        ))),
    }
}
