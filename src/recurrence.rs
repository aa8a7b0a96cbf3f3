use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::models::{InstanceStatus, api_date};
use crate::reconcile::normalize_status;

/// Day of the week as the upstream API spells it. Ordered Sunday first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_weekday(date.weekday())
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            DayOfWeek::Sunday | DayOfWeek::Saturday => "S",
            DayOfWeek::Monday => "M",
            DayOfWeek::Tuesday | DayOfWeek::Thursday => "T",
            DayOfWeek::Wednesday => "W",
            DayOfWeek::Friday => "F",
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

/// A start/end pair in `HH:mm`. Either side may be empty while a form is
/// being filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(
        default,
        deserialize_with = "lenient_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<InstanceStatus>,
}

/// Slot statuses arrive in whatever spelling the backend stored.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<InstanceStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|raw| normalize_status(Some(&raw))))
}

impl TimeSlot {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            status: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.start_time.trim().is_empty() && !self.end_time.trim().is_empty()
    }

    pub fn start(&self) -> Option<NaiveTime> {
        parse_clock(&self.start_time)
    }

    pub fn end(&self) -> Option<NaiveTime> {
        parse_clock(&self.end_time)
    }
}

pub(crate) fn parse_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayWiseTimeSlot {
    pub day: DayOfWeek,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDayWiseTimeSlot {
    pub day: u32,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeSlots {
    #[serde(with = "api_date")]
    #[schema(value_type = String, format = "date", example = "2025-11-24")]
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Custom,
}

/// How a class repeats. Exactly one shape per recurring class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
pub enum RecurrenceConfig {
    Daily {
        #[serde(with = "api_date")]
        start_date: NaiveDate,
        #[serde(default, with = "api_date::option", skip_serializing_if = "Option::is_none")]
        end_date: Option<NaiveDate>,
        #[serde(default)]
        daily_time_slots: Vec<TimeSlot>,
    },
    Weekly {
        #[serde(with = "api_date")]
        start_date: NaiveDate,
        #[serde(default, with = "api_date::option", skip_serializing_if = "Option::is_none")]
        end_date: Option<NaiveDate>,
        #[serde(default)]
        day_wise_time_slots: Vec<DayWiseTimeSlot>,
        /// Older records list their days here instead of in `dayWiseTimeSlots`.
        #[serde(default, skip_serializing)]
        weekly_days: Vec<DayOfWeek>,
    },
    Monthly {
        #[serde(with = "api_date")]
        start_date: NaiveDate,
        #[serde(default, with = "api_date::option", skip_serializing_if = "Option::is_none")]
        end_date: Option<NaiveDate>,
        #[serde(default)]
        monthly_day_wise_slots: Vec<MonthlyDayWiseTimeSlot>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        specific_date_slots: Vec<DateTimeSlots>,
    },
    Custom {
        #[serde(with = "api_date")]
        start_date: NaiveDate,
        #[serde(default, with = "api_date::option", skip_serializing_if = "Option::is_none")]
        end_date: Option<NaiveDate>,
        custom_interval: u32,
        #[serde(default)]
        day_wise_time_slots: Vec<DayWiseTimeSlot>,
    },
}

fn sorted_days(days: impl Iterator<Item = DayOfWeek>) -> Vec<DayOfWeek> {
    let mut days: Vec<DayOfWeek> = days.collect();
    days.sort();
    days.dedup();
    days
}

/// One concrete slot a recurring class occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    #[serde(with = "api_date")]
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

impl RecurrenceConfig {
    pub fn kind(&self) -> RecurrenceType {
        match self {
            RecurrenceConfig::Daily { .. } => RecurrenceType::Daily,
            RecurrenceConfig::Weekly { .. } => RecurrenceType::Weekly,
            RecurrenceConfig::Monthly { .. } => RecurrenceType::Monthly,
            RecurrenceConfig::Custom { .. } => RecurrenceType::Custom,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        match self {
            RecurrenceConfig::Daily { start_date, .. }
            | RecurrenceConfig::Weekly { start_date, .. }
            | RecurrenceConfig::Monthly { start_date, .. }
            | RecurrenceConfig::Custom { start_date, .. } => *start_date,
        }
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            RecurrenceConfig::Daily { end_date, .. }
            | RecurrenceConfig::Weekly { end_date, .. }
            | RecurrenceConfig::Monthly { end_date, .. }
            | RecurrenceConfig::Custom { end_date, .. } => *end_date,
        }
    }

    /// Weekdays shown as active badges for this series.
    pub fn active_days(&self) -> Vec<DayOfWeek> {
        match self {
            RecurrenceConfig::Daily { .. } => DayOfWeek::ALL.to_vec(),
            RecurrenceConfig::Weekly {
                day_wise_time_slots,
                weekly_days,
                ..
            } => sorted_days(
                day_wise_time_slots
                    .iter()
                    .map(|entry| entry.day)
                    .chain(weekly_days.iter().copied()),
            ),
            RecurrenceConfig::Custom {
                day_wise_time_slots,
                ..
            } => sorted_days(day_wise_time_slots.iter().map(|entry| entry.day)),
            RecurrenceConfig::Monthly { .. } => Vec::new(),
        }
    }

    /// Expands the series into concrete slots inside the inclusive window.
    pub fn occurrences(&self, window_start: NaiveDate, window_end: NaiveDate) -> Vec<Occurrence> {
        let first = window_start.max(self.start_date());
        let last = match self.end_date() {
            Some(end) => window_end.min(end),
            None => window_end,
        };

        let mut occurrences = Vec::new();
        let mut date = first;
        while date <= last {
            for slot in self.slots_on(date) {
                if slot.is_complete() {
                    occurrences.push(Occurrence {
                        date,
                        start_time: slot.start_time.clone(),
                        end_time: slot.end_time.clone(),
                    });
                }
            }
            date += Duration::days(1);
        }

        occurrences.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.start_time.cmp(&b.start_time))
        });
        occurrences
    }

    fn slots_on(&self, date: NaiveDate) -> Vec<&TimeSlot> {
        match self {
            RecurrenceConfig::Daily {
                daily_time_slots, ..
            } => daily_time_slots.iter().collect(),
            RecurrenceConfig::Weekly {
                day_wise_time_slots,
                ..
            } => day_slots(day_wise_time_slots, DayOfWeek::of(date)),
            RecurrenceConfig::Custom {
                start_date,
                custom_interval,
                day_wise_time_slots,
                ..
            } => {
                let interval = i64::from((*custom_interval).max(1));
                let weeks = (week_start(date) - week_start(*start_date)).num_days() / 7;
                if weeks % interval == 0 {
                    day_slots(day_wise_time_slots, DayOfWeek::of(date))
                } else {
                    Vec::new()
                }
            }
            RecurrenceConfig::Monthly {
                monthly_day_wise_slots,
                specific_date_slots,
                ..
            } => {
                if specific_date_slots.is_empty() {
                    monthly_day_wise_slots
                        .iter()
                        .filter(|entry| entry.day == date.day())
                        .flat_map(|entry| entry.time_slots.iter())
                        .collect()
                } else {
                    specific_date_slots
                        .iter()
                        .filter(|entry| entry.date == date)
                        .flat_map(|entry| entry.time_slots.iter())
                        .collect()
                }
            }
        }
    }
}

fn day_slots(entries: &[DayWiseTimeSlot], day: DayOfWeek) -> Vec<&TimeSlot> {
    entries
        .iter()
        .filter(|entry| entry.day == day)
        .flat_map(|entry| entry.time_slots.iter())
        .collect()
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Groups slots per weekday, preserving the Sunday-first order.
pub fn day_wise(map: &BTreeMap<DayOfWeek, Vec<TimeSlot>>) -> Vec<DayWiseTimeSlot> {
    map.iter()
        .map(|(day, slots)| DayWiseTimeSlot {
            day: *day,
            time_slots: slots.clone(),
        })
        .collect()
}
