use chrono::{Datelike, Duration, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::api_date;
use crate::recurrence::week_start;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateViewMode {
    Day,
    #[default]
    Week,
    Month,
}

/// The visible window and the strings the API is queried with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(with = "api_date")]
    #[schema(value_type = String, format = "date")]
    pub start: NaiveDate,
    #[serde(with = "api_date")]
    #[schema(value_type = String, format = "date")]
    pub end: NaiveDate,
    pub label: String,
    pub start_str: String,
    pub end_str: String,
}

impl DateRange {
    pub fn for_view(anchor: NaiveDate, mode: DateViewMode) -> Self {
        let (start, end, label) = match mode {
            // The API rejects a degenerate range, so a day spans into the next.
            DateViewMode::Day => (
                anchor,
                anchor + Duration::days(1),
                anchor.format("%b %-d, %Y").to_string(),
            ),
            DateViewMode::Week => {
                let start = week_start(anchor);
                let end = start + Duration::days(6);
                let label = format!("{} - {}", start.format("%b %-d"), end.format("%b %-d, %Y"));
                (start, end, label)
            }
            DateViewMode::Month => {
                let start = anchor.with_day(1).unwrap_or(anchor);
                let end = last_day_of_month(start);
                (start, end, anchor.format("%B %Y").to_string())
            }
        };

        Self {
            start,
            end,
            label,
            start_str: start.format(api_date::FORMAT).to_string(),
            end_str: end.format(api_date::FORMAT).to_string(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

/// Moves the anchor one unit of the current view backwards.
pub fn previous(anchor: NaiveDate, mode: DateViewMode) -> NaiveDate {
    match mode {
        DateViewMode::Day => anchor - Duration::days(1),
        DateViewMode::Week => anchor - Duration::weeks(1),
        DateViewMode::Month => anchor
            .checked_sub_months(Months::new(1))
            .unwrap_or(anchor),
    }
}

/// Moves the anchor one unit of the current view forwards.
pub fn next(anchor: NaiveDate, mode: DateViewMode) -> NaiveDate {
    match mode {
        DateViewMode::Day => anchor + Duration::days(1),
        DateViewMode::Week => anchor + Duration::weeks(1),
        DateViewMode::Month => anchor
            .checked_add_months(Months::new(1))
            .unwrap_or(anchor),
    }
}

pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}
