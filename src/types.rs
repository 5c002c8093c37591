//! Core types for prayer schedules and locations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The named daily prayer/fasting time points a [`ScheduleDay`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrayerLabel {
    /// Imsak — start of the daily fast.
    Imsak,
    /// Subuh — dawn prayer.
    Subuh,
    /// Dzuhur — midday prayer.
    Dzuhur,
    /// Ashar — afternoon prayer.
    Ashar,
    /// Maghrib — sunset prayer, breaking of the fast.
    Maghrib,
    /// Isya — night prayer.
    Isya,
}

impl PrayerLabel {
    /// Returns the human-readable name of this label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Imsak => "Imsak",
            Self::Subuh => "Subuh",
            Self::Dzuhur => "Dzuhur",
            Self::Ashar => "Ashar",
            Self::Maghrib => "Maghrib",
            Self::Isya => "Isya",
        }
    }

    /// Returns a lowercase slug suitable for alert tags.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Imsak => "imsak",
            Self::Subuh => "subuh",
            Self::Dzuhur => "dzuhur",
            Self::Ashar => "ashar",
            Self::Maghrib => "maghrib",
            Self::Isya => "isya",
        }
    }

    /// Returns all labels in chronological order within a day.
    pub fn all() -> &'static [PrayerLabel] {
        &[
            Self::Imsak,
            Self::Subuh,
            Self::Dzuhur,
            Self::Ashar,
            Self::Maghrib,
            Self::Isya,
        ]
    }
}

impl fmt::Display for PrayerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One calendar day of prayer times. Immutable once fetched.
///
/// Times are local "HH:MM" strings as delivered by the API; an empty
/// string means the source carried no value for that slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDay {
    /// The calendar date this day covers.
    pub date: NaiveDate,
    /// Imsak time, "HH:MM".
    pub imsak: String,
    /// Subuh time, "HH:MM".
    pub subuh: String,
    /// Dzuhur time, "HH:MM".
    pub dzuhur: String,
    /// Ashar time, "HH:MM".
    pub ashar: String,
    /// Maghrib time, "HH:MM".
    pub maghrib: String,
    /// Isya time, "HH:MM".
    pub isya: String,
}

impl ScheduleDay {
    /// Returns the raw "HH:MM" value for the given label.
    pub fn time_for(&self, label: PrayerLabel) -> &str {
        match label {
            PrayerLabel::Imsak => &self.imsak,
            PrayerLabel::Subuh => &self.subuh,
            PrayerLabel::Dzuhur => &self.dzuhur,
            PrayerLabel::Ashar => &self.ashar,
            PrayerLabel::Maghrib => &self.maghrib,
            PrayerLabel::Isya => &self.isya,
        }
    }
}

/// Parse a "HH:MM" string into minutes since midnight.
///
/// Returns `None` for empty or malformed values; the scheduler treats
/// those slots as absent rather than failing the tick.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (hh, mm) = value.trim().split_once(':')?;
    let hours: u32 = hh.parse().ok()?;
    let minutes: u32 = mm.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// An ordered sequence of [`ScheduleDay`] values.
///
/// Insertion order is chronological order; at most one day per calendar
/// date ([`Schedule::push`] drops duplicates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    days: Vec<ScheduleDay>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a day, enforcing the one-day-per-date invariant.
    ///
    /// Returns `false` (and drops the day) if a day with the same date
    /// is already present.
    pub fn push(&mut self, day: ScheduleDay) -> bool {
        if self.days.iter().any(|d| d.date == day.date) {
            return false;
        }
        self.days.push(day);
        true
    }

    /// Returns the day matching the given calendar date, if any.
    pub fn day_for(&self, date: NaiveDate) -> Option<&ScheduleDay> {
        self.days.iter().find(|d| d.date == date)
    }

    /// Returns the number of days in the schedule.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Returns `true` when the schedule holds no days.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Iterates over the days in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduleDay> {
        self.days.iter()
    }

    /// Returns a fixed-length window starting at the first day matching
    /// the `(day, month)` anchor.
    ///
    /// Falls back to the full schedule when the anchor is absent rather
    /// than failing — a partial month page should still render.
    pub fn window_from_anchor(&self, anchor_day: u32, anchor_month: u32, len: usize) -> Schedule {
        use chrono::Datelike;

        let start = self
            .days
            .iter()
            .position(|d| d.date.day() == anchor_day && d.date.month() == anchor_month);

        let days = match start {
            Some(idx) => self.days.iter().skip(idx).take(len).cloned().collect(),
            None => self.days.clone(),
        };
        Schedule { days }
    }
}

/// The user's selected location, persisted across sessions.
///
/// Serializes with the wire field name `lokasi` so the persisted JSON
/// matches the search endpoint's response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSelection {
    /// Remote location identifier.
    pub id: String,
    /// Display name, e.g. "JAKARTA".
    #[serde(rename = "lokasi")]
    pub name: String,
}

impl LocationSelection {
    /// Creates a selection from an id and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LocationSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
