use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::event::CalendarEvent;
use crate::models::{InstanceStatus, api_date};
use crate::recurrence::{DayOfWeek, week_start};

/// Start hours of the week grid rows. The last row runs until midnight.
pub const SLOT_HOURS: [u32; 6] = [6, 9, 12, 15, 18, 21];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekDay {
    #[serde(with = "api_date")]
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// `Sun`, `Mon`, ...
    pub weekday: String,
    pub day_number: u32,
    pub event_count: usize,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotRow {
    pub hour: u32,
    /// `6 AM`, `12 PM`, ...
    pub label: String,
    /// One cell per day of the week, Sunday first.
    pub cells: Vec<Vec<CalendarEvent>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub days: Vec<WeekDay>,
    pub rows: Vec<SlotRow>,
}

fn hour_label(hour: u32) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display} {suffix}")
}

/// Index of the row whose `[hour, next hour)` range holds `hour`.
fn row_for(hour: u32) -> Option<usize> {
    if hour >= 24 {
        return None;
    }
    SLOT_HOURS.iter().rposition(|start| hour >= *start)
}

impl WeekGrid {
    /// Lays out the Sunday-start week containing `anchor`. Events before the
    /// first row only count toward their day.
    pub fn build(anchor: NaiveDate, events: &[CalendarEvent], today: NaiveDate) -> Self {
        let start = week_start(anchor);
        let dates: Vec<NaiveDate> = (0..7).map(|offset| start + Duration::days(offset)).collect();

        let days = dates
            .iter()
            .map(|date| {
                let day = DayOfWeek::of(*date);
                WeekDay {
                    date: *date,
                    weekday: day.full_name()[..3].to_string(),
                    day_number: date.day(),
                    event_count: events.iter().filter(|e| e.scheduled_date == *date).count(),
                    is_today: *date == today,
                }
            })
            .collect();

        let mut rows: Vec<SlotRow> = SLOT_HOURS
            .iter()
            .map(|hour| SlotRow {
                hour: *hour,
                label: hour_label(*hour),
                cells: vec![Vec::new(); 7],
            })
            .collect();

        for event in events {
            let Some(column) = dates.iter().position(|d| *d == event.scheduled_date) else {
                continue;
            };
            let Some(row) = event.start_hour().and_then(row_for) else {
                continue;
            };
            rows[row].cells[column].push(event.clone());
        }
        for row in &mut rows {
            for cell in &mut row.cells {
                cell.sort_by(|a, b| a.start_time.cmp(&b.start_time));
            }
        }

        Self { days, rows }
    }
}

/// One line of the list view.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub id: String,
    pub class_id: String,
    #[serde(with = "api_date")]
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// `Mon, Nov 24`
    pub date_label: String,
    /// `09:00 - 10:00`
    pub time_range: String,
    pub title: String,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub booked_count: u32,
    pub capacity: Option<u32>,
    pub overbooked: bool,
    pub status: InstanceStatus,
    pub cancelled: bool,
    pub is_recurring: bool,
    /// Weekday badges, `S M T W T F S` style.
    pub recurrence_days: Vec<String>,
}

impl From<&CalendarEvent> for ListRow {
    fn from(event: &CalendarEvent) -> Self {
        let recurrence_days = event
            .recurrence
            .as_ref()
            .map(|r| {
                r.active_days()
                    .into_iter()
                    .map(|day| day.abbreviation().to_string())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: event.id.clone(),
            class_id: event.class_id.clone(),
            date: event.scheduled_date,
            date_label: event.scheduled_date.format("%a, %b %-d").to_string(),
            time_range: format!("{} - {}", event.start_time, event.end_time),
            title: event.title.clone(),
            instructor: event.instructor.clone(),
            location: event.location.clone(),
            booked_count: event.booked_count,
            capacity: event.capacity,
            overbooked: event
                .capacity
                .is_some_and(|capacity| event.booked_count > capacity),
            status: event.status,
            cancelled: event.is_cancelled(),
            is_recurring: event.is_recurring,
            recurrence_days,
        }
    }
}

/// Rows in date then start time order.
pub fn list_rows(events: &[CalendarEvent]) -> Vec<ListRow> {
    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by(|a, b| {
        a.scheduled_date
            .cmp(&b.scheduled_date)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
    sorted.into_iter().map(ListRow::from).collect()
}
