use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, NaiveDate};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    AppState,
    builder::ClassForm,
    date_range::{self, DateRange, DateViewMode},
    edit::EditForm,
    error::ApiError,
    event::CalendarEvent,
    layout::{ListRow, WeekGrid, list_rows},
    models::{ClassRecord, ClassSchedule, InstanceStatus, RangeQuery, UpdateInstanceRequest, api_date},
    notice::Notice,
    recurrence::Occurrence,
    reconcile::EventFilter,
    service::{EventRef, MutationOutcome, ScheduleQuery},
    validation::{
        validate_capacity, validate_class_form, validate_edit_form, validate_weeks, validate_window,
    },
};

/// Days previewed when neither the request nor the series has an end.
const DEFAULT_PREVIEW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Week,
    List,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    #[serde(default)]
    pub view: DateViewMode,
    pub date: Option<String>,
    #[serde(default)]
    pub filter: EventFilter,
    #[serde(default)]
    pub search: String,
    pub layout: Option<LayoutKind>,
}

#[derive(Debug, Deserialize)]
pub struct IcalParams {
    pub date: Option<String>,
    #[serde(default = "default_weeks")]
    pub weeks: u8,
    #[serde(default)]
    pub filter: EventFilter,
    #[serde(default)]
    pub search: String,
}

fn default_weeks() -> u8 {
    1
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub range: DateRange,
    pub events: Vec<CalendarEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<WeekGrid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ListRow>>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub form: ClassForm,
    #[serde(default, with = "api_date::option")]
    #[schema(value_type = Option<String>, format = "date")]
    pub start: Option<NaiveDate>,
    #[serde(default, with = "api_date::option")]
    #[schema(value_type = Option<String>, format = "date")]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub count: usize,
    pub occurrences: Vec<Occurrence>,
}

/// The event as shown in the schedule plus the edited values.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub event: CalendarEvent,
    pub changes: EditForm,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub event: EventRef,
    pub status: InstanceStatus,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub filter: EventFilter,
}

#[derive(Debug, Deserialize)]
pub struct InstancesParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn parse_date(value: Option<&str>, today: NaiveDate) -> Result<NaiveDate, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(today),
        Some(raw) => api_date::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid date: {raw}"))),
    }
}

#[utoipa::path(get, path = "/", tag = "schedule")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Class Schedule API",
        "endpoints": {
            "/schedule": "Get the reconciled schedule as JSON",
            "/schedule.ical": "Download the schedule as iCal file",
            "/classes": "Create, update and delete classes",
            "/notices": "Notices produced by recent actions"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "schedule")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/healthz/ready",
    responses(
        (status = 200, description = "Class API reachable"),
        (status = 503, description = "Class API unreachable")
    ),
    tag = "schedule"
)]
pub async fn healthz_ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.client().health().await {
        Ok(health) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ok", "upstream": health.status})),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "unavailable", "error": err.to_string()})),
        ),
    }
}

#[utoipa::path(
    get,
    path = "/schedule",
    params(
        ("view" = Option<DateViewMode>, Query, description = "day, week or month (default week)"),
        ("date" = Option<String>, Query, description = "Anchor date yyyy-MM-dd (default today)"),
        ("filter" = Option<EventFilter>, Query, description = "all, scheduled, completed or cancelled"),
        ("search" = Option<String>, Query, description = "Matches title, instructor or location"),
        ("layout" = Option<LayoutKind>, Query, description = "Add a week grid or list rows")
    ),
    responses(
        (status = 200, description = "Reconciled schedule", body = ScheduleResponse),
        (status = 400, description = "Invalid query"),
        (status = 503, description = "Class API unreachable")
    ),
    tag = "schedule"
)]
pub async fn get_schedule(
    State(state): State<AppState>,
    Query(params): Query<ScheduleParams>,
) -> Result<impl IntoResponse, ApiError> {
    let today = date_range::today(state.tz);
    let anchor = parse_date(params.date.as_deref(), today)?;

    let query = ScheduleQuery {
        anchor,
        view: params.view,
        filter: params.filter,
        search: params.search.clone(),
        live_search: params.search,
    };
    let snapshot = state.service.load(&query, today).await?;

    let (week, rows) = match params.layout {
        Some(LayoutKind::Week) => (Some(WeekGrid::build(anchor, &snapshot.events, today)), None),
        Some(LayoutKind::List) => (None, Some(list_rows(&snapshot.events))),
        None => (None, None),
    };

    Ok(Json(ScheduleResponse {
        range: snapshot.range,
        events: snapshot.events,
        calendar_error: snapshot.calendar_error,
        week,
        rows,
        notices: state.notices.active(),
    }))
}

#[utoipa::path(
    get,
    path = "/schedule.ical",
    params(
        ("date" = Option<String>, Query, description = "Any date of the first week (default today)"),
        ("weeks" = Option<u8>, Query, description = "Number of weeks (1-6)"),
        ("filter" = Option<EventFilter>, Query, description = "all, scheduled, completed or cancelled"),
        ("search" = Option<String>, Query, description = "Matches title, instructor or location")
    ),
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 400, description = "Invalid query"),
        (status = 404, description = "No classes found")
    ),
    tag = "schedule"
)]
pub async fn get_ical(
    State(state): State<AppState>,
    Query(params): Query<IcalParams>,
) -> Result<impl IntoResponse, ApiError> {
    let weeks = validate_weeks(params.weeks)?;
    let today = date_range::today(state.tz);
    let anchor = parse_date(params.date.as_deref(), today)?;

    let queries: Vec<ScheduleQuery> = (0..weeks)
        .map(|i| ScheduleQuery {
            anchor: anchor + Duration::weeks(i.into()),
            view: DateViewMode::Week,
            filter: params.filter,
            search: params.search.clone(),
            live_search: params.search.clone(),
        })
        .collect();
    let futures = queries.iter().map(|query| state.service.load(query, today));

    let snapshots = try_join_all(futures).await?;
    // The classes-list fallback ignores the window, so weeks can overlap.
    let mut seen = HashSet::new();
    let events: Vec<CalendarEvent> = snapshots
        .into_iter()
        .flat_map(|snapshot| snapshot.events)
        .filter(|event| {
            seen.insert((
                event.id.clone(),
                event.scheduled_date,
                event.start_time.clone(),
            ))
        })
        .collect();

    if events.is_empty() {
        return Err(ApiError::NotFound("No classes found".into()));
    }

    let body = state.exporter.generate(&events);
    Ok((
        StatusCode::OK,
        [
            ("content-type", "text/calendar"),
            (
                "content-disposition",
                "attachment; filename=class_schedule.ics",
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/schedule/refresh",
    responses((status = 200, description = "Cached data dropped", body = Notice)),
    tag = "schedule"
)]
pub async fn refresh_schedule(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.refresh().await)
}

#[utoipa::path(
    post,
    path = "/classes",
    request_body = ClassForm,
    responses(
        (status = 201, description = "Class created", body = MutationOutcome),
        (status = 400, description = "Invalid form"),
        (status = 409, description = "A create request is already running")
    ),
    tag = "classes"
)]
pub async fn create_class(
    State(state): State<AppState>,
    Json(form): Json<ClassForm>,
) -> Result<impl IntoResponse, ApiError> {
    validate_class_form(&form)?;
    let outcome = state
        .service
        .create(&form, date_range::today(state.tz))
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[utoipa::path(
    post,
    path = "/classes/preview",
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Occurrences the form would create", body = PreviewResponse),
        (status = 400, description = "Invalid form or window")
    ),
    tag = "classes"
)]
pub async fn preview_class(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let today = date_range::today(state.tz);
    let built = request.form.build(today)?;

    let occurrences = match built.schedule {
        ClassSchedule::OneTime {
            scheduled_date,
            start_time,
            end_time,
        } => vec![Occurrence {
            date: scheduled_date,
            start_time,
            end_time,
        }],
        ClassSchedule::Recurring(config) => {
            let start = request.start.unwrap_or(config.start_date());
            let end = request
                .end
                .or(config.end_date())
                .unwrap_or(start + Duration::days(DEFAULT_PREVIEW_DAYS));
            let (start, end) = validate_window(start, end)?;
            config.occurrences(start, end)
        }
    };

    Ok(Json(PreviewResponse {
        count: occurrences.len(),
        occurrences,
    }))
}

#[utoipa::path(
    put,
    path = "/classes/{id}",
    params(("id" = String, Path, description = "Class id")),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Class or instance updated", body = MutationOutcome),
        (status = 204, description = "Nothing changed"),
        (status = 400, description = "Invalid changes")
    ),
    tag = "classes"
)]
pub async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.event.class_id != id {
        return Err(ApiError::BadRequest(
            "event does not belong to this class".into(),
        ));
    }
    validate_edit_form(&request.changes)?;

    match state
        .service
        .update(&request.event, &request.changes)
        .await?
    {
        Some(outcome) => Ok((StatusCode::OK, Json(outcome)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/events/status",
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status changed", body = MutationOutcome),
        (status = 409, description = "A status change is already running")
    ),
    tag = "classes"
)]
pub async fn change_status(
    State(state): State<AppState>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .service
        .change_status(&request.event, request.status)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(
        ("id" = String, Path, description = "Class id"),
        ("title" = Option<String>, Query, description = "Title used in the notice")
    ),
    responses((status = 200, description = "Class and future instances deleted", body = MutationOutcome)),
    tag = "classes"
)]
pub async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.service.delete(&id, &params.title).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/classes/{id}/regenerate",
    params(("id" = String, Path, description = "Class id")),
    responses((status = 200, description = "Instances regenerated", body = MutationOutcome)),
    tag = "classes"
)]
pub async fn regenerate_instances(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.service.regenerate(&id).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/classes/{id}/instances",
    params(
        ("id" = String, Path, description = "Class id"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated instances"),
        (status = 404, description = "Class not found")
    ),
    tag = "classes"
)]
pub async fn list_instances(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<InstancesParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .service
        .instances(&id, params.page, params.limit)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/notices",
    responses((status = 200, description = "Active notices", body = [Notice])),
    tag = "notices"
)]
pub async fn list_notices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.notices.active())
}

#[utoipa::path(
    delete,
    path = "/notices/{id}",
    params(("id" = String, Path, description = "Notice id")),
    responses(
        (status = 204, description = "Notice dismissed"),
        (status = 404, description = "No such notice")
    ),
    tag = "notices"
)]
pub async fn dismiss_notice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.notices.dismiss(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("notice {id} not found")))
    }
}

#[utoipa::path(
    get,
    path = "/classes/{id}",
    params(("id" = String, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class record", body = ClassRecord),
        (status = 404, description = "Class not found")
    ),
    tag = "classes"
)]
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let class = state.service.client().get_class(&id).await?;
    Ok(Json(class))
}

#[utoipa::path(
    get,
    path = "/instances",
    params(
        ("startDate" = String, Query, description = "First day yyyy-MM-dd"),
        ("endDate" = String, Query, description = "Last day yyyy-MM-dd"),
        ("filter" = Option<EventFilter>, Query, description = "all, scheduled, completed or cancelled")
    ),
    responses(
        (status = 200, description = "Instances in the window"),
        (status = 400, description = "Invalid window")
    ),
    tag = "classes"
)]
pub async fn instances_in_range(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let today = date_range::today(state.tz);
    let (start_date, end_date) = validate_window(
        parse_date(Some(&params.start_date), today)?,
        parse_date(Some(&params.end_date), today)?,
    )?;
    let query = RangeQuery {
        start_date,
        end_date,
        status: params.filter.api_status(),
    };
    let instances = state.service.client().instances_in_range(&query).await?;
    Ok(Json(instances))
}

#[utoipa::path(
    patch,
    path = "/instances/{id}",
    params(("id" = String, Path, description = "Instance id")),
    request_body = UpdateInstanceRequest,
    responses(
        (status = 200, description = "Instance updated", body = Notice),
        (status = 204, description = "Nothing to change")
    ),
    tag = "classes"
)]
pub async fn update_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateInstanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if let Some(capacity) = request.capacity {
        validate_capacity(capacity)?;
    }
    let notice = state.service.update_instance(&id, &request).await?;
    Ok(Json(notice).into_response())
}
