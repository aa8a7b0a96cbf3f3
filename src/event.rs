use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{InstanceStatus, api_date};
use crate::recurrence::RecurrenceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EventKind {
    #[serde(rename = "one-time")]
    OneTime,
    #[serde(rename = "recurring-instance")]
    RecurringInstance,
}

impl EventKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "one-time" => Some(EventKind::OneTime),
            "recurring-instance" => Some(EventKind::RecurringInstance),
            _ => None,
        }
    }
}

/// A class or one of its instances, flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub class_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub availability: Option<bool>,
    pub booked_count: u32,
    #[serde(with = "api_date")]
    #[schema(value_type = String, format = "date", example = "2025-11-24")]
    pub scheduled_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: InstanceStatus,
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub recurrence: Option<RecurrenceConfig>,
}

impl CalendarEvent {
    /// The parent class record itself rather than one generated instance.
    pub fn is_series_record(&self) -> bool {
        self.id == self.class_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == InstanceStatus::Cancelled
    }

    /// Hour of the start time, used to bucket the event into a grid row.
    pub fn start_hour(&self) -> Option<u32> {
        self.start_time
            .split(':')
            .next()
            .and_then(|hour| hour.trim().parse().ok())
    }
}
