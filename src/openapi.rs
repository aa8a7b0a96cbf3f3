use utoipa::OpenApi;

use crate::builder::ClassForm;
use crate::date_range::{DateRange, DateViewMode};
use crate::edit::{EditForm, UpdateScope};
use crate::envelope::Pagination;
use crate::event::{CalendarEvent, EventKind};
use crate::handlers::{
    LayoutKind, PreviewRequest, PreviewResponse, ScheduleResponse, StatusChangeRequest,
    UpdateRequest,
};
use crate::layout::{ListRow, SlotRow, WeekDay, WeekGrid};
use crate::models::{
    ClassInstance, ClassRecord, ClassStatus, InstanceStatus, UpdateClassRequest, UpdateInstanceRequest,
};
use crate::notice::{Notice, NoticeVariant};
use crate::recurrence::{DayOfWeek, Occurrence, RecurrenceType, TimeSlot};
use crate::reconcile::EventFilter;
use crate::service::{EventRef, MutationOutcome};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::get_schedule,
        crate::handlers::get_ical,
        crate::handlers::refresh_schedule,
        crate::handlers::create_class,
        crate::handlers::preview_class,
        crate::handlers::get_class,
        crate::handlers::update_class,
        crate::handlers::change_status,
        crate::handlers::delete_class,
        crate::handlers::regenerate_instances,
        crate::handlers::list_instances,
        crate::handlers::instances_in_range,
        crate::handlers::update_instance,
        crate::handlers::list_notices,
        crate::handlers::dismiss_notice
    ),
    components(schemas(
        CalendarEvent,
        EventKind,
        DateRange,
        DateViewMode,
        EventFilter,
        LayoutKind,
        ScheduleResponse,
        WeekGrid,
        WeekDay,
        SlotRow,
        ListRow,
        ClassForm,
        TimeSlot,
        DayOfWeek,
        RecurrenceType,
        PreviewRequest,
        PreviewResponse,
        Occurrence,
        UpdateRequest,
        EditForm,
        UpdateScope,
        StatusChangeRequest,
        EventRef,
        ClassStatus,
        InstanceStatus,
        ClassInstance,
        ClassRecord,
        UpdateClassRequest,
        UpdateInstanceRequest,
        Pagination,
        MutationOutcome,
        Notice,
        NoticeVariant
    )),
    tags(
        (name = "schedule", description = "Reconciled class schedule"),
        (name = "classes", description = "Class and instance mutations"),
        (name = "notices", description = "Notices produced by recent actions")
    ),
)]
pub struct ApiDoc;
