//! Wire shapes and the raw→typed parse step for the schedule API.
//!
//! The remote endpoints wrap every payload in a `{status, data}`
//! envelope. Parsing distinguishes two failure modes the callers must
//! not conflate: an empty-but-valid response (status flag false, missing
//! data, empty `jadwal`) yields an empty [`Schedule`], while a
//! structurally invalid body (non-JSON, wrong field shapes) raises
//! [`NotifyError::Parse`].

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{NotifyError, Result};
use crate::types::{LocationSelection, Schedule, ScheduleDay};

/// Date format used by the `tanggal` field, e.g. `19/02/2026`.
const DAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// The `{status, data}` envelope wrapping every API payload.
///
/// `data` stays a plain `Option` so a missing field deserializes to
/// `None` without requiring `T: Default`.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: bool,
    data: Option<T>,
}

/// Month-page payload: the day entries live under `data.jadwal`.
#[derive(Debug, Deserialize)]
struct MonthData {
    #[serde(default)]
    jadwal: Vec<RawScheduleDay>,
}

/// One day entry as delivered by the API, before date validation.
#[derive(Debug, Deserialize)]
struct RawScheduleDay {
    tanggal: String,
    #[serde(default)]
    imsak: String,
    #[serde(default)]
    subuh: String,
    #[serde(default)]
    dzuhur: String,
    #[serde(default)]
    ashar: String,
    #[serde(default)]
    maghrib: String,
    #[serde(default)]
    isya: String,
}

/// Parse a month-page response body into a typed [`Schedule`].
///
/// Day entries whose `tanggal` does not parse as `DD/MM/YYYY` are
/// skipped with a warning; duplicate dates are dropped by the
/// schedule's uniqueness invariant.
///
/// # Errors
///
/// Returns [`NotifyError::Parse`] only for a structurally invalid body.
pub fn parse_month(body: &str) -> Result<Schedule> {
    let envelope: ApiEnvelope<MonthData> = serde_json::from_str(body)
        .map_err(|e| NotifyError::Parse(format!("invalid schedule response: {e}")))?;

    let mut schedule = Schedule::new();
    if !envelope.status {
        tracing::debug!("schedule response carried status=false; treating as no data");
        return Ok(schedule);
    }
    let Some(data) = envelope.data else {
        return Ok(schedule);
    };

    for raw in data.jadwal {
        match NaiveDate::parse_from_str(raw.tanggal.trim(), DAY_DATE_FORMAT) {
            Ok(date) => {
                let inserted = schedule.push(ScheduleDay {
                    date,
                    imsak: raw.imsak,
                    subuh: raw.subuh,
                    dzuhur: raw.dzuhur,
                    ashar: raw.ashar,
                    maghrib: raw.maghrib,
                    isya: raw.isya,
                });
                if !inserted {
                    tracing::warn!(date = %date, "duplicate day entry dropped");
                }
            }
            Err(_) => {
                tracing::warn!(tanggal = %raw.tanggal, "skipping day entry with malformed date");
            }
        }
    }
    Ok(schedule)
}

/// Parse a location-search response body.
///
/// # Errors
///
/// Returns [`NotifyError::Parse`] for a structurally invalid body; a
/// status-false or empty response yields an empty list.
pub fn parse_locations(body: &str) -> Result<Vec<LocationSelection>> {
    let envelope: ApiEnvelope<Vec<LocationSelection>> = serde_json::from_str(body)
        .map_err(|e| NotifyError::Parse(format!("invalid location response: {e}")))?;

    if !envelope.status {
        return Ok(Vec::new());
    }
    Ok(envelope.data.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH_BODY: &str = r#"{
        "status": true,
        "data": {
            "jadwal": [
                {"tanggal": "19/02/2026", "imsak": "04:30", "subuh": "04:40",
                 "dzuhur": "12:05", "ashar": "15:20", "maghrib": "18:05", "isya": "19:15"},
                {"tanggal": "20/02/2026", "imsak": "04:30", "subuh": "04:40",
                 "dzuhur": "12:05", "ashar": "15:20", "maghrib": "18:05", "isya": "19:15"}
            ]
        }
    }"#;

    #[test]
    fn parse_month_returns_typed_days() {
        let schedule = parse_month(MONTH_BODY).expect("valid body");
        assert_eq!(schedule.len(), 2);

        let first = schedule.iter().next().expect("first day");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 2, 19).expect("date"));
        assert_eq!(first.maghrib, "18:05");
    }

    #[test]
    fn status_false_yields_empty_schedule() {
        let body = r#"{"status": false, "data": {"jadwal": [{"tanggal": "19/02/2026"}]}}"#;
        let schedule = parse_month(body).expect("not a parse error");
        assert!(schedule.is_empty());
    }

    #[test]
    fn missing_data_yields_empty_schedule() {
        let schedule = parse_month(r#"{"status": true}"#).expect("not a parse error");
        assert!(schedule.is_empty());
    }

    #[test]
    fn empty_jadwal_yields_empty_schedule() {
        let body = r#"{"status": true, "data": {"jadwal": []}}"#;
        let schedule = parse_month(body).expect("not a parse error");
        assert!(schedule.is_empty());
    }

    #[test]
    fn non_json_body_is_parse_error() {
        let err = parse_month("<html>offline portal</html>").unwrap_err();
        assert!(matches!(err, NotifyError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn wrong_field_shape_is_parse_error() {
        // jadwal as a number is a structural violation, not "no data".
        let body = r#"{"status": true, "data": {"jadwal": 5}}"#;
        let err = parse_month(body).unwrap_err();
        assert!(matches!(err, NotifyError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn wrong_time_shape_is_parse_error() {
        let body = r#"{"status": true, "data": {"jadwal": [
            {"tanggal": "19/02/2026", "imsak": 430}
        ]}}"#;
        let err = parse_month(body).unwrap_err();
        assert!(matches!(err, NotifyError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn malformed_date_entry_skipped() {
        let body = r#"{"status": true, "data": {"jadwal": [
            {"tanggal": "not-a-date", "imsak": "04:30"},
            {"tanggal": "19/02/2026", "imsak": "04:30"}
        ]}}"#;
        let schedule = parse_month(body).expect("valid body");
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn duplicate_date_entry_dropped() {
        let body = r#"{"status": true, "data": {"jadwal": [
            {"tanggal": "19/02/2026", "maghrib": "18:05"},
            {"tanggal": "19/02/2026", "maghrib": "18:06"}
        ]}}"#;
        let schedule = parse_month(body).expect("valid body");
        assert_eq!(schedule.len(), 1);
        let day = schedule
            .day_for(NaiveDate::from_ymd_opt(2026, 2, 19).expect("date"))
            .expect("day");
        assert_eq!(day.maghrib, "18:05");
    }

    #[test]
    fn missing_time_fields_default_to_empty() {
        let body = r#"{"status": true, "data": {"jadwal": [{"tanggal": "19/02/2026"}]}}"#;
        let schedule = parse_month(body).expect("valid body");
        let day = schedule.iter().next().expect("day");
        assert!(day.imsak.is_empty());
        assert!(day.isya.is_empty());
    }

    #[test]
    fn parse_locations_returns_selections() {
        let body = r#"{"status": true, "data": [
            {"id": "1301", "lokasi": "KOTA JAKARTA"},
            {"id": "1219", "lokasi": "KOTA BANDUNG"}
        ]}"#;
        let locations = parse_locations(body).expect("valid body");
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].id, "1301");
        assert_eq!(locations[1].name, "KOTA BANDUNG");
    }

    #[test]
    fn parse_locations_status_false_is_empty() {
        let locations = parse_locations(r#"{"status": false}"#).expect("not a parse error");
        assert!(locations.is_empty());
    }

    #[test]
    fn parse_locations_invalid_shape_is_parse_error() {
        let err = parse_locations(r#"{"status": true, "data": "JAKARTA"}"#).unwrap_err();
        assert!(matches!(err, NotifyError::Parse(_)), "got {err:?}");
    }
}
