//! Create-class form state and its serialization into a create request.
//!
//! The form keeps every recurrence shape's inputs around while the admin
//! switches between types, but only the selected type is ever submitted.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{ClassDetails, ClassSchedule, CreateClassRequest, api_date};
use crate::recurrence::{
    DateTimeSlots, DayOfWeek, MonthlyDayWiseTimeSlot, RecurrenceConfig, RecurrenceType, TimeSlot,
    day_wise,
};

/// Upper bound on how many dates the monthly picker enumerates.
pub const MAX_SELECTABLE_DAYS: usize = 366;

pub const DEFAULT_CAPACITY: u32 = 20;
pub const DEFAULT_CUSTOM_INTERVAL: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Class title is required")]
    MissingTitle,
    #[error("End date must not be before the start date")]
    EndBeforeStart,
    #[error("Add at least one complete time slot")]
    NoCompleteSlots,
    #[error("Custom interval must be at least 1 week")]
    InvalidInterval,
    #[error("{0} is outside the selected date range")]
    DateOutOfRange(NaiveDate),
    #[error("Pick a start and end date before selecting dates")]
    RangeNotSet,
}

/// Which slot list an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTarget {
    Daily,
    Day(DayOfWeek),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotField {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassForm {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub location: String,
    pub capacity: u32,
    pub is_recurring: bool,
    #[serde(with = "api_date::option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub scheduled_date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub recurrence_type: RecurrenceType,
    #[serde(with = "api_date::option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub recurrence_start_date: Option<NaiveDate>,
    #[serde(with = "api_date::option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub recurrence_end_date: Option<NaiveDate>,
    pub daily_time_slots: Vec<TimeSlot>,
    #[schema(value_type = Object)]
    pub day_time_slots: BTreeMap<DayOfWeek, Vec<TimeSlot>>,
    pub custom_interval: u32,
    #[schema(value_type = Object)]
    pub date_time_slots: BTreeMap<NaiveDate, Vec<TimeSlot>>,
}

impl Default for ClassForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            instructor: String::new(),
            location: String::new(),
            capacity: DEFAULT_CAPACITY,
            is_recurring: false,
            scheduled_date: None,
            start_time: "09:00".into(),
            end_time: "10:00".into(),
            recurrence_type: RecurrenceType::Weekly,
            recurrence_start_date: None,
            recurrence_end_date: None,
            daily_time_slots: vec![TimeSlot::new("09:00", "10:00")],
            day_time_slots: BTreeMap::new(),
            custom_interval: DEFAULT_CUSTOM_INTERVAL,
            date_time_slots: BTreeMap::new(),
        }
    }
}

impl ClassForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_recurrence_type(&mut self, kind: RecurrenceType) {
        self.is_recurring = true;
        self.recurrence_type = kind;
    }

    pub fn set_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.recurrence_start_date = start;
        self.recurrence_end_date = end;
        let selectable: BTreeSet<NaiveDate> = self.selectable_dates().into_iter().collect();
        self.date_time_slots
            .retain(|date, _| selectable.contains(date));
    }

    /// Selecting a day seeds one empty slot; deselecting drops the day.
    pub fn toggle_day(&mut self, day: DayOfWeek) {
        if self.day_time_slots.remove(&day).is_none() {
            self.day_time_slots.insert(day, vec![TimeSlot::default()]);
        }
    }

    pub fn selected_days(&self) -> Vec<DayOfWeek> {
        self.day_time_slots.keys().copied().collect()
    }

    /// Every date between the recurrence start and end, inclusive.
    pub fn selectable_dates(&self) -> Vec<NaiveDate> {
        let (Some(start), Some(end)) = (self.recurrence_start_date, self.recurrence_end_date) else {
            return Vec::new();
        };
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .take(MAX_SELECTABLE_DAYS)
            .collect()
    }

    pub fn toggle_date(&mut self, date: NaiveDate) -> Result<(), FormError> {
        if self.date_time_slots.remove(&date).is_some() {
            return Ok(());
        }
        let (Some(start), Some(end)) = (self.recurrence_start_date, self.recurrence_end_date) else {
            return Err(FormError::RangeNotSet);
        };
        if !in_range(date, start, Some(end)) {
            return Err(FormError::DateOutOfRange(date));
        }
        self.date_time_slots.insert(date, vec![TimeSlot::default()]);
        Ok(())
    }

    /// Complete slots of the selected recurrence type.
    pub fn submitted_slots(&self) -> Vec<&TimeSlot> {
        let slots: Vec<&TimeSlot> = match self.recurrence_type {
            RecurrenceType::Daily => self.daily_time_slots.iter().collect(),
            RecurrenceType::Weekly | RecurrenceType::Custom => {
                self.day_time_slots.values().flatten().collect()
            }
            RecurrenceType::Monthly => self.date_time_slots.values().flatten().collect(),
        };
        slots.into_iter().filter(|slot| slot.is_complete()).collect()
    }

    pub fn selected_dates(&self) -> Vec<NaiveDate> {
        self.date_time_slots.keys().copied().collect()
    }

    fn slots_mut(&mut self, target: SlotTarget) -> Option<&mut Vec<TimeSlot>> {
        match target {
            SlotTarget::Daily => Some(&mut self.daily_time_slots),
            SlotTarget::Day(day) => self.day_time_slots.get_mut(&day),
            SlotTarget::Date(date) => self.date_time_slots.get_mut(&date),
        }
    }

    pub fn add_slot(&mut self, target: SlotTarget) -> bool {
        match self.slots_mut(target) {
            Some(slots) => {
                slots.push(TimeSlot::default());
                true
            }
            None => false,
        }
    }

    /// Removes a slot; the last remaining slot of a target stays.
    pub fn remove_slot(&mut self, target: SlotTarget, index: usize) -> bool {
        match self.slots_mut(target) {
            Some(slots) if slots.len() > 1 && index < slots.len() => {
                slots.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn update_slot(
        &mut self,
        target: SlotTarget,
        index: usize,
        field: SlotField,
        value: impl Into<String>,
    ) -> bool {
        let Some(slot) = self.slots_mut(target).and_then(|slots| slots.get_mut(index)) else {
            return false;
        };
        match field {
            SlotField::Start => slot.start_time = value.into(),
            SlotField::End => slot.end_time = value.into(),
        }
        true
    }

    fn details(&self) -> ClassDetails {
        ClassDetails {
            title: self.title.trim().to_string(),
            description: optional(&self.description),
            instructor: optional(&self.instructor),
            location: optional(&self.location),
            capacity: Some(self.capacity),
            availability: None,
        }
    }

    /// Serializes the form. Missing dates default to `today`.
    pub fn build(&self, today: NaiveDate) -> Result<CreateClassRequest, FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::MissingTitle);
        }

        if !self.is_recurring {
            return Ok(CreateClassRequest {
                details: self.details(),
                schedule: ClassSchedule::OneTime {
                    scheduled_date: self.scheduled_date.unwrap_or(today),
                    start_time: self.start_time.clone(),
                    end_time: self.end_time.clone(),
                },
            });
        }

        let start_date = self.recurrence_start_date.unwrap_or(today);
        let end_date = self.recurrence_end_date;
        if end_date.is_some_and(|end| end < start_date) {
            return Err(FormError::EndBeforeStart);
        }

        let recurrence = match self.recurrence_type {
            RecurrenceType::Daily => {
                let daily_time_slots = complete(&self.daily_time_slots);
                if daily_time_slots.is_empty() {
                    return Err(FormError::NoCompleteSlots);
                }
                RecurrenceConfig::Daily {
                    start_date,
                    end_date,
                    daily_time_slots,
                }
            }
            RecurrenceType::Weekly => {
                let day_wise_time_slots = day_wise(&complete_map(&self.day_time_slots));
                if day_wise_time_slots.is_empty() {
                    return Err(FormError::NoCompleteSlots);
                }
                RecurrenceConfig::Weekly {
                    start_date,
                    end_date,
                    weekly_days: Vec::new(),
                    day_wise_time_slots,
                }
            }
            RecurrenceType::Custom => {
                if self.custom_interval < 1 {
                    return Err(FormError::InvalidInterval);
                }
                let day_wise_time_slots = day_wise(&complete_map(&self.day_time_slots));
                if day_wise_time_slots.is_empty() {
                    return Err(FormError::NoCompleteSlots);
                }
                RecurrenceConfig::Custom {
                    start_date,
                    end_date,
                    custom_interval: self.custom_interval,
                    day_wise_time_slots,
                }
            }
            RecurrenceType::Monthly => {
                let dates = complete_map(&self.date_time_slots);
                if dates.is_empty() {
                    return Err(FormError::NoCompleteSlots);
                }
                if let Some(date) = dates
                    .keys()
                    .find(|date| !in_range(**date, start_date, end_date))
                {
                    return Err(FormError::DateOutOfRange(*date));
                }
                RecurrenceConfig::Monthly {
                    start_date,
                    end_date,
                    monthly_day_wise_slots: by_day_of_month(&dates),
                    specific_date_slots: dates
                        .into_iter()
                        .map(|(date, time_slots)| DateTimeSlots { date, time_slots })
                        .collect(),
                }
            }
        };

        Ok(CreateClassRequest {
            details: self.details(),
            schedule: ClassSchedule::Recurring(recurrence),
        })
    }
}

/// Inside `[start, end]` and within the picker's day cap.
fn in_range(date: NaiveDate, start: NaiveDate, end: Option<NaiveDate>) -> bool {
    date >= start
        && end.is_none_or(|end| date <= end)
        && date < start + Duration::days(MAX_SELECTABLE_DAYS as i64)
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn complete(slots: &[TimeSlot]) -> Vec<TimeSlot> {
    slots.iter().filter(|s| s.is_complete()).cloned().collect()
}

/// Drops incomplete slots, then any key left without a slot.
fn complete_map<K: Ord + Copy>(map: &BTreeMap<K, Vec<TimeSlot>>) -> BTreeMap<K, Vec<TimeSlot>> {
    map.iter()
        .filter_map(|(key, slots)| {
            let slots = complete(slots);
            (!slots.is_empty()).then_some((*key, slots))
        })
        .collect()
}

fn by_day_of_month(dates: &BTreeMap<NaiveDate, Vec<TimeSlot>>) -> Vec<MonthlyDayWiseTimeSlot> {
    let mut days: BTreeMap<u32, Vec<TimeSlot>> = BTreeMap::new();
    for (date, slots) in dates {
        let entry = days.entry(date.day()).or_default();
        for slot in slots {
            if !entry.contains(slot) {
                entry.push(slot.clone());
            }
        }
    }
    days.into_iter()
        .map(|(day, time_slots)| MonthlyDayWiseTimeSlot { day, time_slots })
        .collect()
}
