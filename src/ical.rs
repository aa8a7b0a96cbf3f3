use chrono::{Duration, NaiveDateTime};
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarDateTime, Component, Event, EventLike, EventStatus};

use crate::event::CalendarEvent;
use crate::models::api_date;
use crate::recurrence::parse_clock;

#[derive(Clone)]
pub struct ICalExporter {
    name: String,
    tz: Tz,
}

impl ICalExporter {
    pub fn new(name: impl Into<String>, tz: Tz) -> Self {
        Self {
            name: name.into(),
            tz,
        }
    }

    fn at(&self, date_time: NaiveDateTime) -> CalendarDateTime {
        CalendarDateTime::WithTimezone {
            date_time,
            tzid: self.tz.name().to_string(),
        }
    }

    pub fn generate(&self, events: &[CalendarEvent]) -> Vec<u8> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name(&self.name);

        for item in events {
            let Some(start_time) = parse_clock(&item.start_time) else {
                continue;
            };
            let start = item.scheduled_date.and_time(start_time);
            let end = parse_clock(&item.end_time)
                .map(|end| item.scheduled_date.and_time(end))
                .filter(|end| *end > start)
                .unwrap_or_else(|| start + Duration::hours(1));

            let mut event = Event::new();
            event.summary(&item.title);
            event.starts(self.at(start));
            event.ends(self.at(end));
            if let Some(location) = &item.location {
                event.location(location);
            }

            let mut description = Vec::new();
            if let Some(text) = item.description.as_deref().filter(|d| !d.is_empty()) {
                description.push(text.to_string());
            }
            if let Some(instructor) = &item.instructor {
                description.push(format!("Instructor: {instructor}"));
            }
            description.push(format!("Class: {}", item.class_id));
            event.description(&description.join("\n"));

            event.uid(&format!(
                "{}-{}-{}@class-schedule",
                item.id,
                item.scheduled_date.format(api_date::FORMAT),
                item.start_time.replace(':', "")
            ));
            if item.is_cancelled() {
                event.status(EventStatus::Cancelled);
            }
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}
