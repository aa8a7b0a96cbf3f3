use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::builder::{ClassForm, FormError};
use crate::client::{ClassApiClient, ClientError};
use crate::date_range::{DateRange, DateViewMode};
use crate::edit::{EditForm, EditPlan};
use crate::envelope::Page;
use crate::event::CalendarEvent;
use crate::models::{
    CalendarItem, ClassInstance, ClassQuery, ClassRecord, InstanceStatus, RangeQuery,
    UpdateInstanceRequest,
};
use crate::notice::{FailureText, FieldStyle, Notice, NoticeCenter, failure_notice};
use crate::reconcile::{EventFilter, filter_events, reconcile};

pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Everything that decides which events a schedule load shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleQuery {
    pub anchor: NaiveDate,
    pub view: DateViewMode,
    pub filter: EventFilter,
    /// Settled search text sent to the API.
    pub search: String,
    /// Live search text used for client-side narrowing.
    pub live_search: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub range: DateRange,
    pub events: Vec<CalendarEvent>,
    /// Set when the calendar view failed and the classes list was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_error: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load schedule: {0}")]
    Upstream(#[from] ClientError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    UpdateStatus,
    Delete,
    Regenerate,
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("a {0:?} request is already in progress")]
    Pending(MutationKind),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("{}", .notice.title)]
    Upstream {
        notice: Notice,
        #[source]
        source: ClientError,
    },
}

/// Identifies the event whose status is changing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventRef {
    pub id: String,
    pub class_id: String,
    #[serde(with = "crate::models::api_date")]
    #[schema(value_type = String, format = "date")]
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
}

impl EventRef {
    pub fn is_series_record(&self) -> bool {
        self.id == self.class_id
    }
}

impl From<&CalendarEvent> for EventRef {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: event.id.clone(),
            class_id: event.class_id.clone(),
            scheduled_date: event.scheduled_date,
            start_time: Some(event.start_time.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u64>,
}

struct Cached<T> {
    fetched_at: Instant,
    value: Arc<T>,
}

/// Cached upstream responses keyed by the exact query that produced them.
pub struct QueryCache {
    stale_after: Duration,
    calendar: RwLock<HashMap<RangeQuery, Cached<Vec<CalendarItem>>>>,
    classes: RwLock<HashMap<ClassQuery, Cached<Vec<ClassRecord>>>>,
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            calendar: RwLock::new(HashMap::new()),
            classes: RwLock::new(HashMap::new()),
        }
    }

    async fn calendar(&self, key: &RangeQuery) -> Option<Arc<Vec<CalendarItem>>> {
        let map = self.calendar.read().await;
        map.get(key)
            .filter(|c| c.fetched_at.elapsed() < self.stale_after)
            .map(|c| c.value.clone())
    }

    async fn classes(&self, key: &ClassQuery) -> Option<Arc<Vec<ClassRecord>>> {
        let map = self.classes.read().await;
        map.get(key)
            .filter(|c| c.fetched_at.elapsed() < self.stale_after)
            .map(|c| c.value.clone())
    }

    async fn store_calendar(&self, key: RangeQuery, value: Vec<CalendarItem>) -> Arc<Vec<CalendarItem>> {
        insert_fresh(&mut *self.calendar.write().await, key, value, self.stale_after)
    }

    async fn store_classes(&self, key: ClassQuery, value: Vec<ClassRecord>) -> Arc<Vec<ClassRecord>> {
        insert_fresh(&mut *self.classes.write().await, key, value, self.stale_after)
    }

    /// Drops both sources so the next load refetches them.
    pub async fn invalidate_all(&self) {
        self.calendar.write().await.clear();
        self.classes.write().await.clear();
    }

    pub async fn len(&self) -> (usize, usize) {
        (
            self.calendar.read().await.len(),
            self.classes.read().await.len(),
        )
    }
}

/// Stores `value` under `key` after evicting everything already stale.
fn insert_fresh<K: Eq + Hash, V>(
    map: &mut HashMap<K, Cached<V>>,
    key: K,
    value: V,
    stale_after: Duration,
) -> Arc<V> {
    map.retain(|_, cached| cached.fetched_at.elapsed() < stale_after);
    let value = Arc::new(value);
    map.insert(
        key,
        Cached {
            fetched_at: Instant::now(),
            value: value.clone(),
        },
    );
    value
}

/// Per-kind in-flight flags; a second submit of the same kind is refused.
#[derive(Default)]
struct PendingSet {
    kinds: Mutex<HashSet<MutationKind>>,
}

struct PendingGuard<'a> {
    set: &'a PendingSet,
    kind: MutationKind,
}

impl PendingSet {
    fn begin(&self, kind: MutationKind) -> Result<PendingGuard<'_>, MutationError> {
        let mut kinds = self.kinds.lock().unwrap_or_else(|e| e.into_inner());
        if !kinds.insert(kind) {
            return Err(MutationError::Pending(kind));
        }
        Ok(PendingGuard { set: self, kind })
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.kinds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&kind)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.set
            .kinds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.kind);
    }
}

const CREATE_FAILED: FailureText = FailureText {
    title: "Creation Failed",
    validation_title: "Validation Error",
    message: "Failed to create class schedule",
    style: FieldStyle::Bullets,
};

const UPDATE_FAILED: FailureText = FailureText {
    title: "Update Failed",
    validation_title: "Validation Error",
    message: "Failed to update class",
    style: FieldStyle::Bullets,
};

const STATUS_FAILED: FailureText = FailureText {
    title: "Update Failed",
    validation_title: "Update Failed",
    message: "Failed to update status",
    style: FieldStyle::Labeled,
};

const DELETE_FAILED: FailureText = FailureText {
    title: "Delete Failed",
    validation_title: "Delete Failed",
    message: "Failed to delete class",
    style: FieldStyle::Bullets,
};

const REGENERATE_FAILED: FailureText = FailureText {
    title: "Regeneration Failed",
    validation_title: "Regeneration Failed",
    message: "Failed to regenerate instances",
    style: FieldStyle::Bullets,
};

/// Loads the reconciled schedule and runs every mutation against the API.
pub struct ScheduleService {
    client: ClassApiClient,
    cache: QueryCache,
    notices: Arc<NoticeCenter>,
    pending: PendingSet,
    page_limit: u32,
}

impl ScheduleService {
    pub fn new(
        client: ClassApiClient,
        notices: Arc<NoticeCenter>,
        stale_after: Duration,
        page_limit: u32,
    ) -> Self {
        Self {
            client,
            cache: QueryCache::new(stale_after),
            notices,
            pending: PendingSet::default(),
            page_limit,
        }
    }

    pub fn client(&self) -> &ClassApiClient {
        &self.client
    }

    pub fn notices(&self) -> &NoticeCenter {
        &self.notices
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.pending.is_pending(kind)
    }

    async fn fetch_calendar(&self, key: RangeQuery) -> Result<Arc<Vec<CalendarItem>>, ClientError> {
        if let Some(hit) = self.cache.calendar(&key).await {
            return Ok(hit);
        }
        let items = self.client.calendar_view(&key).await?;
        Ok(self.cache.store_calendar(key, items).await)
    }

    async fn fetch_classes(&self, key: ClassQuery) -> Result<Arc<Vec<ClassRecord>>, ClientError> {
        if let Some(hit) = self.cache.classes(&key).await {
            return Ok(hit);
        }
        let page = self.client.list_classes(&key).await?;
        Ok(self.cache.store_classes(key, page.data).await)
    }

    /// Queries both sources concurrently and reconciles them. Either one may
    /// fail as long as the other answers.
    pub async fn load(
        &self,
        query: &ScheduleQuery,
        today: NaiveDate,
    ) -> Result<ScheduleSnapshot, LoadError> {
        let range = DateRange::for_view(query.anchor, query.view);
        let status = query.filter.api_status();

        let calendar_key = RangeQuery {
            start_date: range.start,
            end_date: range.end,
            status,
        };
        let classes_key = ClassQuery {
            page: Some(1),
            limit: Some(self.page_limit),
            status,
            search: Some(query.search.trim().to_string()).filter(|s| !s.is_empty()),
            ..ClassQuery::default()
        };

        let (calendar, classes) = tokio::join!(
            self.fetch_calendar(calendar_key),
            self.fetch_classes(classes_key)
        );

        let (calendar, calendar_error) = match calendar {
            Ok(items) => (items, None),
            Err(err) => {
                warn!(error = %err, "calendar view failed, falling back to classes list");
                (Arc::new(Vec::new()), Some(err.to_string()))
            }
        };
        let classes = match classes {
            Ok(classes) => classes,
            Err(err) if calendar_error.is_none() => {
                warn!(error = %err, "classes list failed");
                Arc::new(Vec::new())
            }
            Err(err) => return Err(LoadError::Upstream(err)),
        };

        let events = reconcile(&calendar, &classes, today);
        let events = filter_events(events, query.filter, &query.live_search);

        Ok(ScheduleSnapshot {
            range,
            events,
            calendar_error,
        })
    }

    fn fail(&self, err: ClientError, text: FailureText) -> MutationError {
        let notice = self.notices.push(failure_notice(&err, text));
        MutationError::Upstream {
            notice,
            source: err,
        }
    }

    pub async fn create(
        &self,
        form: &ClassForm,
        today: NaiveDate,
    ) -> Result<MutationOutcome, MutationError> {
        let _guard = self.pending.begin(MutationKind::Create)?;
        let request = form.build(today)?;

        let envelope = match self.client.create_class(&request).await {
            Ok(envelope) => envelope,
            Err(err) => return Err(self.fail(err, CREATE_FAILED)),
        };
        self.cache.invalidate_all().await;

        let count = envelope.data.instance_count();
        info!(title = %request.details.title, instances = count, "class created");
        let description = if count > 0 {
            format!(
                "\"{}\" has been scheduled with {count} instances",
                request.details.title
            )
        } else {
            format!("\"{}\" has been scheduled", request.details.title)
        };
        Ok(MutationOutcome {
            notice: self.notices.success("Class Created", description),
            instance_count: Some(count),
        })
    }

    pub async fn update(
        &self,
        event: &CalendarEvent,
        form: &EditForm,
    ) -> Result<Option<MutationOutcome>, MutationError> {
        let _guard = self.pending.begin(MutationKind::Update)?;

        let (result, title, description) = match form.plan(event) {
            EditPlan::NoChanges => return Ok(None),
            EditPlan::Series { class_id, request } => (
                self.client.update_class(&class_id, &request).await,
                "Class Updated",
                "The class has been updated successfully",
            ),
            EditPlan::Instance {
                class_id,
                scheduled_date,
                start_time,
                request,
            } => (
                self.client
                    .update_specific_instance(&class_id, scheduled_date, Some(&start_time), &request)
                    .await,
                "Instance Updated",
                "The specific class instance has been updated",
            ),
        };

        if let Err(err) = result {
            return Err(self.fail(err, UPDATE_FAILED));
        }
        self.cache.invalidate_all().await;
        Ok(Some(MutationOutcome {
            notice: self.notices.success(title, description),
            instance_count: None,
        }))
    }

    /// Updates one instance addressed by its own id.
    pub async fn update_instance(
        &self,
        instance_id: &str,
        request: &UpdateInstanceRequest,
    ) -> Result<Notice, MutationError> {
        let _guard = self.pending.begin(MutationKind::Update)?;

        if let Err(err) = self.client.update_instance(instance_id, request).await {
            return Err(self.fail(err, UPDATE_FAILED));
        }
        self.cache.invalidate_all().await;
        Ok(self.notices.success(
            "Instance Updated",
            "The specific class instance has been updated",
        ))
    }

    /// Parent records change through the class status endpoint, generated
    /// instances through the specific-instance endpoint.
    pub async fn change_status(
        &self,
        event: &EventRef,
        status: InstanceStatus,
    ) -> Result<MutationOutcome, MutationError> {
        let _guard = self.pending.begin(MutationKind::UpdateStatus)?;

        let result = if event.is_series_record() {
            self.client
                .update_class_status(&event.class_id, status.as_class_status())
                .await
        } else {
            let request = UpdateInstanceRequest {
                status: Some(status),
                ..UpdateInstanceRequest::default()
            };
            self.client
                .update_specific_instance(
                    &event.class_id,
                    event.scheduled_date,
                    event.start_time.as_deref(),
                    &request,
                )
                .await
        };

        if let Err(err) = result {
            return Err(self.fail(err, STATUS_FAILED));
        }
        self.cache.invalidate_all().await;
        info!(id = %event.id, status = status.as_str(), "status changed");
        Ok(MutationOutcome {
            notice: self.notices.success(
                "Status Updated",
                format!("Class status changed to {}", status.as_str()),
            ),
            instance_count: None,
        })
    }

    /// Deletes the parent class, which takes its future instances with it.
    pub async fn delete(&self, class_id: &str, title: &str) -> Result<MutationOutcome, MutationError> {
        let _guard = self.pending.begin(MutationKind::Delete)?;

        if let Err(err) = self.client.delete_class(class_id).await {
            return Err(self.fail(err, DELETE_FAILED));
        }
        self.cache.invalidate_all().await;
        info!(class_id, "class deleted");
        let description = if title.is_empty() {
            "The class and its future instances have been deleted".to_string()
        } else {
            format!("\"{title}\" and its future instances have been deleted")
        };
        Ok(MutationOutcome {
            notice: self.notices.success("Class Deleted", description),
            instance_count: None,
        })
    }

    pub async fn regenerate(&self, class_id: &str) -> Result<MutationOutcome, MutationError> {
        let _guard = self.pending.begin(MutationKind::Regenerate)?;

        let count = match self.client.regenerate_instances(class_id).await {
            Ok(count) => count,
            Err(err) => return Err(self.fail(err, REGENERATE_FAILED)),
        };
        self.cache.invalidate_all().await;
        Ok(MutationOutcome {
            notice: self.notices.success(
                "Instances Regenerated",
                format!("{count} instances have been generated"),
            ),
            instance_count: Some(count),
        })
    }

    pub async fn instances(
        &self,
        class_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<ClassInstance>, ClientError> {
        self.client.class_instances(class_id, page, limit).await
    }

    /// Records a manual refresh: cached data is dropped and an info notice
    /// is shown.
    pub async fn refresh(&self) -> Notice {
        self.cache.invalidate_all().await;
        self.notices.info("Refreshing data...")
    }
}
