use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::date_range::{self, DateRange, DateViewMode};
use crate::debounce::Debouncer;
use crate::reconcile::EventFilter;
use crate::service::{LoadError, ScheduleQuery, ScheduleService, ScheduleSnapshot};

/// Navigation and search state of the schedule page, without any rendering.
///
/// Typing updates the live search text immediately, which narrows the loaded
/// events client-side. The text only reaches the upstream query once it has
/// been stable for the debounce delay.
pub struct ScheduleScreen {
    service: Arc<ScheduleService>,
    tz: Tz,
    view: DateViewMode,
    anchor: NaiveDate,
    filter: EventFilter,
    search_input: String,
    search: Debouncer<String>,
}

impl ScheduleScreen {
    pub fn new(service: Arc<ScheduleService>, tz: Tz, debounce: Duration) -> Self {
        Self {
            service,
            tz,
            view: DateViewMode::default(),
            anchor: date_range::today(tz),
            filter: EventFilter::default(),
            search_input: String::new(),
            search: Debouncer::new(String::new(), debounce),
        }
    }

    pub fn service(&self) -> &ScheduleService {
        &self.service
    }

    pub fn view(&self) -> DateViewMode {
        self.view
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn filter(&self) -> EventFilter {
        self.filter
    }

    pub fn range(&self) -> DateRange {
        DateRange::for_view(self.anchor, self.view)
    }

    pub fn set_view(&mut self, view: DateViewMode) {
        self.view = view;
    }

    pub fn set_anchor(&mut self, anchor: NaiveDate) {
        self.anchor = anchor;
    }

    pub fn previous(&mut self) {
        self.anchor = date_range::previous(self.anchor, self.view);
    }

    pub fn next(&mut self) {
        self.anchor = date_range::next(self.anchor, self.view);
    }

    pub fn today(&mut self) {
        self.anchor = date_range::today(self.tz);
    }

    pub fn set_filter(&mut self, filter: EventFilter) {
        self.filter = filter;
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search_input = text.into();
        self.search.push(self.search_input.clone());
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// The search text currently driving upstream queries.
    pub fn settled_search(&self) -> String {
        self.search.current()
    }

    /// Resolves once the debounced search caught up with the input.
    pub async fn search_settled(&self) {
        let target = self.search_input.clone();
        let mut settled = self.search.subscribe();
        // The debouncer lives as long as `self`, so the channel stays open.
        let _ = settled.wait_for(|value| *value == target).await;
    }

    pub fn query(&self) -> ScheduleQuery {
        ScheduleQuery {
            anchor: self.anchor,
            view: self.view,
            filter: self.filter,
            search: self.settled_search(),
            live_search: self.search_input.clone(),
        }
    }

    pub async fn load(&self) -> Result<ScheduleSnapshot, LoadError> {
        self.service
            .load(&self.query(), date_range::today(self.tz))
            .await
    }
}
