use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::event::{CalendarEvent, EventKind};
use crate::models::{CalendarItem, ClassRecord, ClassStatus, InstanceStatus, api_date};

const DEFAULT_START_TIME: &str = "09:00";
const DEFAULT_END_TIME: &str = "10:00";

/// Collapses the spellings the backend uses into the three display states.
pub fn normalize_status(raw: Option<&str>) -> InstanceStatus {
    let Some(raw) = raw else {
        return InstanceStatus::Scheduled;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "canceled" | "cancelled" => InstanceStatus::Cancelled,
        "completed" => InstanceStatus::Completed,
        "active" | "scheduled" | "" => InstanceStatus::Scheduled,
        other => {
            warn!(status = other, "unknown status, treating as scheduled");
            InstanceStatus::Scheduled
        }
    }
}

/// Builds the displayable event list. A non-empty calendar view wins
/// outright; the classes list is only a fallback.
pub fn reconcile(
    calendar: &[CalendarItem],
    classes: &[ClassRecord],
    today: NaiveDate,
) -> Vec<CalendarEvent> {
    debug!(
        calendar_count = calendar.len(),
        classes_count = classes.len(),
        "reconciling schedule sources"
    );

    if !calendar.is_empty() {
        calendar.iter().filter_map(from_calendar_item).collect()
    } else {
        classes
            .iter()
            .filter_map(|class| from_class(class, today))
            .collect()
    }
}

fn from_calendar_item(item: &CalendarItem) -> Option<CalendarEvent> {
    let Some(id) = item.id.clone().filter(|id| !id.is_empty()) else {
        warn!(title = %item.title, "calendar item without id skipped");
        return None;
    };
    let Some(scheduled_date) = item.scheduled_date.as_deref().and_then(api_date::parse) else {
        warn!(%id, "calendar item without a usable date skipped");
        return None;
    };

    let explicit_kind = item.kind.as_deref().and_then(EventKind::parse);
    let flagged = item.is_recurring.unwrap_or(false);
    let is_recurring = flagged || explicit_kind == Some(EventKind::RecurringInstance);
    let kind = explicit_kind.unwrap_or(if flagged {
        EventKind::RecurringInstance
    } else {
        EventKind::OneTime
    });

    Some(CalendarEvent {
        class_id: item.class_id.clone().unwrap_or_else(|| id.clone()),
        id,
        kind,
        title: item.title.clone(),
        description: item.description.clone(),
        instructor: item.instructor.clone(),
        location: item.location.clone(),
        capacity: item.capacity,
        availability: item.availability,
        booked_count: item.booked_count.unwrap_or(0),
        scheduled_date,
        start_time: item.start_time.clone().unwrap_or_default(),
        end_time: item.end_time.clone().unwrap_or_default(),
        status: normalize_status(item.status.as_deref()),
        is_recurring,
        recurrence: if is_recurring {
            item.recurrence.clone()
        } else {
            None
        },
    })
}

fn from_class(class: &ClassRecord, today: NaiveDate) -> Option<CalendarEvent> {
    if class.id.is_empty() {
        warn!(title = %class.title, "class without id skipped");
        return None;
    }

    let scheduled_date = class
        .scheduled_date
        .as_deref()
        .and_then(api_date::parse)
        .or_else(|| class.recurrence.as_ref().map(|r| r.start_date()))
        .unwrap_or(today);

    Some(CalendarEvent {
        id: class.id.clone(),
        class_id: class.id.clone(),
        kind: if class.is_recurring {
            EventKind::RecurringInstance
        } else {
            EventKind::OneTime
        },
        title: class.title.clone(),
        description: class.description.clone(),
        instructor: class.instructor.clone(),
        location: class.location.clone(),
        capacity: class.capacity,
        availability: class.availability,
        booked_count: 0,
        scheduled_date,
        start_time: non_empty(class.start_time.as_deref(), DEFAULT_START_TIME),
        end_time: non_empty(class.end_time.as_deref(), DEFAULT_END_TIME),
        status: normalize_status(class.status.as_deref()),
        is_recurring: class.is_recurring,
        recurrence: if class.is_recurring {
            class.recurrence.clone()
        } else {
            None
        },
    })
}

fn non_empty(value: Option<&str>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventFilter {
    #[default]
    All,
    Scheduled,
    Completed,
    Cancelled,
}

impl EventFilter {
    /// Status parameter pushed to the API; classes call scheduled `active`.
    pub fn api_status(self) -> Option<ClassStatus> {
        match self {
            EventFilter::All => None,
            EventFilter::Scheduled => Some(ClassStatus::Active),
            EventFilter::Completed => Some(ClassStatus::Completed),
            EventFilter::Cancelled => Some(ClassStatus::Cancelled),
        }
    }

    pub fn matches(self, status: InstanceStatus) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Scheduled => status == InstanceStatus::Scheduled,
            EventFilter::Completed => status == InstanceStatus::Completed,
            EventFilter::Cancelled => status == InstanceStatus::Cancelled,
        }
    }
}

pub fn matches_search(event: &CalendarEvent, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let contains = |field: Option<&str>| {
        field
            .map(|value| value.to_lowercase().contains(&query))
            .unwrap_or(false)
    };
    contains(Some(&event.title))
        || contains(event.instructor.as_deref())
        || contains(event.location.as_deref())
}

/// Client-side narrowing; applied even when the API already filtered.
pub fn filter_events(
    events: Vec<CalendarEvent>,
    filter: EventFilter,
    search: &str,
) -> Vec<CalendarEvent> {
    events
        .into_iter()
        .filter(|event| filter.matches(event.status))
        .filter(|event| matches_search(event, search))
        .collect()
}
