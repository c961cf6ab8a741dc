use crate::domain::errors::{ConfigurationError, DomainError, DomainResult, ValidationReason};
use chrono::{DateTime, Datelike, NaiveTime, Offset, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

const TIME_FORMAT: &str = "%H:%M";

/// Which schedule a window belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "department_id", rename_all = "snake_case")]
pub enum BusinessHourScope {
    /// The default schedule, applied to agents without a department (or to
    /// everyone when the business-hour type is `Single`).
    Global,
    Department(String),
}

impl BusinessHourScope {
    /// Key stored in the `department_id` column; the global schedule uses an empty key.
    pub fn storage_key(&self) -> &str {
        match self {
            BusinessHourScope::Global => "",
            BusinessHourScope::Department(id) => id,
        }
    }

    pub fn from_storage_key(key: String) -> Self {
        if key.is_empty() {
            BusinessHourScope::Global
        } else {
            BusinessHourScope::Department(key)
        }
    }

    pub fn department_id(&self) -> Option<&str> {
        match self {
            BusinessHourScope::Global => None,
            BusinessHourScope::Department(id) => Some(id),
        }
    }
}

impl std::fmt::Display for BusinessHourScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessHourScope::Global => write!(f, "global"),
            BusinessHourScope::Department(id) => write!(f, "department:{}", id),
        }
    }
}

/// Business-hour type: one global schedule, or per-department schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessHourType {
    Single,
    #[default]
    Custom,
}

impl std::fmt::Display for BusinessHourType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessHourType::Single => write!(f, "single"),
            BusinessHourType::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for BusinessHourType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(BusinessHourType::Single),
            "custom" => Ok(BusinessHourType::Custom),
            _ => Err(format!("Invalid business hour type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHourWindow {
    pub id: String,
    pub scope: BusinessHourScope,
    pub day: String,   // "Monday", "Tuesday", etc.
    pub start: String, // "09:00"
    pub end: String,   // "17:00", exclusive
    pub timezone: String,
    pub utc_offset: String, // resolved when saved, e.g. "-03:00"
    pub created_at: String,
    pub updated_at: String,
}

impl BusinessHourWindow {
    /// Whether `at` falls inside this window, evaluated in the window's own timezone.
    pub fn contains(&self, at: DateTime<Utc>) -> Result<bool, ConfigurationError> {
        let tz = resolve_timezone(&self.timezone).ok_or_else(|| {
            ConfigurationError::UnknownTimezone {
                window_id: self.id.clone(),
                timezone: self.timezone.clone(),
            }
        })?;
        let start = parse_time(&self.start).ok_or_else(|| ConfigurationError::InvalidTime {
            window_id: self.id.clone(),
            value: self.start.clone(),
        })?;
        let end = parse_time(&self.end).ok_or_else(|| ConfigurationError::InvalidTime {
            window_id: self.id.clone(),
            value: self.end.clone(),
        })?;

        let local = at.with_timezone(&tz);
        let Ok(day) = self.day.parse::<Weekday>() else {
            return Ok(false);
        };
        if local.weekday() != day {
            return Ok(false);
        }

        let time = local.time();
        Ok(time >= start && time < end)
    }

    fn sort_key(&self) -> (u32, String) {
        let day = self
            .day
            .parse::<Weekday>()
            .map(|d| d.num_days_from_monday())
            .unwrap_or(u32::MAX);
        (day, self.start.clone())
    }
}

/// Order windows by weekday (Monday first), then start time.
pub fn sort_windows(windows: &mut [BusinessHourWindow]) {
    windows.sort_by_key(|w| w.sort_key());
}

/// DTO for saving (creating or replacing) a window
#[derive(Debug, Clone, Deserialize)]
pub struct SaveBusinessHourRequest {
    /// Absent for the global schedule
    pub department_id: Option<String>,
    pub day: String,
    pub start: String,
    pub end: String,
    pub timezone: String,
}

/// A save request that passed validation, normalised for storage.
#[derive(Debug, Clone)]
pub struct ValidatedWindow {
    pub scope: BusinessHourScope,
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub timezone: Tz,
}

impl SaveBusinessHourRequest {
    pub fn validate(&self) -> DomainResult<ValidatedWindow> {
        let scope = match self.department_id.as_deref().map(str::trim) {
            None => BusinessHourScope::Global,
            Some("") => {
                return Err(DomainError::validation(
                    ValidationReason::EmptyIdentifier,
                    "department_id must not be empty",
                ))
            }
            Some(id) => BusinessHourScope::Department(id.to_string()),
        };

        let day = self.day.trim().parse::<Weekday>().map_err(|_| {
            DomainError::validation(
                ValidationReason::InvalidDay,
                format!("Invalid day of week: {}", self.day),
            )
        })?;

        let start = parse_time(&self.start).ok_or_else(|| invalid_time(&self.start))?;
        let end = parse_time(&self.end).ok_or_else(|| invalid_time(&self.end))?;
        if start >= end {
            return Err(DomainError::validation(
                ValidationReason::StartNotBeforeEnd,
                format!("start {} must be before end {}", self.start, self.end),
            ));
        }

        let timezone = resolve_timezone(&self.timezone).ok_or_else(|| {
            DomainError::validation(
                ValidationReason::UnknownTimezone,
                format!("Invalid timezone: {}", self.timezone),
            )
        })?;

        Ok(ValidatedWindow {
            scope,
            day,
            start,
            end,
            timezone,
        })
    }
}

impl ValidatedWindow {
    pub fn into_window(self, id: String, now: DateTime<Utc>) -> BusinessHourWindow {
        let stamp = now.to_rfc3339();
        BusinessHourWindow {
            id,
            scope: self.scope,
            day: day_name(self.day).to_string(),
            start: self.start.format(TIME_FORMAT).to_string(),
            end: self.end.format(TIME_FORMAT).to_string(),
            utc_offset: utc_offset_label(&self.timezone, now),
            timezone: self.timezone.name().to_string(),
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

fn invalid_time(value: &str) -> DomainError {
    DomainError::validation(
        ValidationReason::InvalidTimeFormat,
        format!("Invalid time '{}', expected HH:MM", value),
    )
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).ok()
}

pub fn resolve_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Offset of `tz` from UTC at the given instant (DST aware), e.g. "+05:30".
pub fn utc_offset_label(tz: &Tz, at: DateTime<Utc>) -> String {
    tz.offset_from_utc_datetime(&at.naive_utc()).fix().to_string()
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
