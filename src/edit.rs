use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::event::CalendarEvent;
use crate::models::{UpdateClassRequest, UpdateInstanceRequest};

/// Whether an edit applies to the whole series or to one occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpdateScope {
    #[default]
    Series,
    Instance,
}

impl UpdateScope {
    /// One-time classes have no instances to single out.
    pub fn available_for(event: &CalendarEvent) -> &'static [UpdateScope] {
        if event.is_recurring {
            &[UpdateScope::Series, UpdateScope::Instance]
        } else {
            &[UpdateScope::Series]
        }
    }
}

/// Values submitted from the edit dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EditForm {
    pub scope: UpdateScope,
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditPlan {
    NoChanges,
    Series {
        class_id: String,
        request: UpdateClassRequest,
    },
    Instance {
        class_id: String,
        scheduled_date: NaiveDate,
        start_time: String,
        request: UpdateInstanceRequest,
    },
}

/// `Some(new)` only when it differs from what the event already shows.
fn changed<T: PartialEq + Clone>(new: &Option<T>, current: Option<&T>) -> Option<T> {
    match new {
        Some(value) if Some(value) != current => Some(value.clone()),
        _ => None,
    }
}

impl EditForm {
    /// Diffs the form against the event and picks the endpoint by scope.
    /// Fields the scope cannot edit are ignored.
    pub fn plan(&self, event: &CalendarEvent) -> EditPlan {
        let scope = if UpdateScope::available_for(event).contains(&self.scope) {
            self.scope
        } else {
            UpdateScope::Series
        };

        match scope {
            UpdateScope::Series => {
                let request = UpdateClassRequest {
                    title: changed(&self.title, Some(&event.title)),
                    description: changed(&self.description, event.description.as_ref()),
                    instructor: changed(&self.instructor, event.instructor.as_ref()),
                    location: changed(&self.location, event.location.as_ref()),
                    capacity: changed(&self.capacity, event.capacity.as_ref()),
                    ..UpdateClassRequest::default()
                };
                if request.is_empty() {
                    EditPlan::NoChanges
                } else {
                    EditPlan::Series {
                        class_id: event.class_id.clone(),
                        request,
                    }
                }
            }
            UpdateScope::Instance => {
                let request = UpdateInstanceRequest {
                    start_time: changed(&self.start_time, Some(&event.start_time)),
                    end_time: changed(&self.end_time, Some(&event.end_time)),
                    description: changed(&self.description, event.description.as_ref()),
                    location: changed(&self.location, event.location.as_ref()),
                    capacity: changed(&self.capacity, event.capacity.as_ref()),
                    status: None,
                };
                if request.is_empty() {
                    EditPlan::NoChanges
                } else {
                    EditPlan::Instance {
                        class_id: event.class_id.clone(),
                        scheduled_date: event.scheduled_date,
                        start_time: event.start_time.clone(),
                        request,
                    }
                }
            }
        }
    }
}
