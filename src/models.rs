use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::recurrence::RecurrenceConfig;

/// Lenient `yyyy-MM-dd` serde for dates that the upstream API sometimes
/// sends as full ISO timestamps.
pub mod api_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn parse(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        let head = value.get(..10).unwrap_or(value);
        NaiveDate::parse_from_str(head, FORMAT).ok()
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`")))
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => super::parse(value)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid date `{value}`"))),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    Active,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl InstanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Scheduled => "scheduled",
            InstanceStatus::Cancelled => "cancelled",
            InstanceStatus::Completed => "completed",
        }
    }

    /// Class records call the scheduled state `active`.
    pub fn as_class_status(self) -> ClassStatus {
        match self {
            InstanceStatus::Scheduled => ClassStatus::Active,
            InstanceStatus::Cancelled => ClassStatus::Cancelled,
            InstanceStatus::Completed => ClassStatus::Completed,
        }
    }
}

/// A class template as returned by the classes endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub availability: Option<bool>,
    #[serde(default)]
    pub is_recurring: bool,
    pub status: Option<String>,
    pub scheduled_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub recurrence: Option<RecurrenceConfig>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// `classId` on an instance is either the id or the populated class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ClassRef {
    Id(String),
    Populated(Box<ClassRecord>),
}

impl ClassRef {
    pub fn id(&self) -> &str {
        match self {
            ClassRef::Id(id) => id,
            ClassRef::Populated(class) => &class.id,
        }
    }
}

/// One concrete occurrence of a recurring class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassInstance {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub class_id: ClassRef,
    pub scheduled_date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: Option<String>,
    pub booked_count: Option<u32>,
    pub attended_count: Option<u32>,
    pub no_show_count: Option<u32>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// An entry of the unified calendar-view payload. The backend is loose
/// about which fields it fills in, so everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub class_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub availability: Option<bool>,
    pub booked_count: Option<u32>,
    pub scheduled_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<String>,
    pub is_recurring: Option<bool>,
    #[schema(value_type = Option<Object>)]
    pub recurrence: Option<RecurrenceConfig>,
}

/// Fields shared by every class create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetails {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassSchedule {
    OneTime {
        scheduled_date: NaiveDate,
        start_time: String,
        end_time: String,
    },
    Recurring(RecurrenceConfig),
}

/// Create request; serializes to the flat one-time shape or to
/// `{isRecurring: true, recurrence}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "CreateClassBody")]
pub struct CreateClassRequest {
    pub details: ClassDetails,
    pub schedule: ClassSchedule,
}

impl CreateClassRequest {
    pub fn is_recurring(&self) -> bool {
        matches!(self.schedule, ClassSchedule::Recurring(_))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateClassBody {
    #[serde(flatten)]
    details: ClassDetails,
    is_recurring: bool,
    #[serde(with = "api_date::option", skip_serializing_if = "Option::is_none")]
    scheduled_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recurrence: Option<RecurrenceConfig>,
}

impl From<CreateClassRequest> for CreateClassBody {
    fn from(request: CreateClassRequest) -> Self {
        match request.schedule {
            ClassSchedule::OneTime {
                scheduled_date,
                start_time,
                end_time,
            } => CreateClassBody {
                details: request.details,
                is_recurring: false,
                scheduled_date: Some(scheduled_date),
                start_time: Some(start_time),
                end_time: Some(end_time),
                recurrence: None,
            },
            ClassSchedule::Recurring(recurrence) => CreateClassBody {
                details: request.details,
                is_recurring: true,
                scheduled_date: None,
                start_time: None,
                end_time: None,
                recurrence: Some(recurrence),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClassStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub recurrence: Option<RecurrenceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(
        default,
        with = "api_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, format = "date")]
    pub scheduled_date: Option<NaiveDate>,
}

impl UpdateClassRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstanceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InstanceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl UpdateInstanceRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of `POST /calander`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedClass {
    pub class: Option<ClassRecord>,
    #[serde(default)]
    pub instances: Vec<ClassInstance>,
    pub instance_count: Option<u64>,
}

impl CreatedClass {
    pub fn instance_count(&self) -> u64 {
        self.instance_count
            .unwrap_or(self.instances.len() as u64)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegeneratedInstances {
    #[serde(default)]
    pub instance_count: u64,
}

/// Query parameters of `GET /calander`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ClassStatus>,
    pub is_recurring: Option<bool>,
    pub availability: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
}

impl ClassQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status_param(status)));
        }
        if let Some(is_recurring) = self.is_recurring {
            params.push(("isRecurring", is_recurring.to_string()));
        }
        if let Some(availability) = self.availability {
            params.push(("availability", availability.to_string()));
        }
        if let Some(start) = self.start_date {
            params.push(("startDate", start.format(api_date::FORMAT).to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("endDate", end.format(api_date::FORMAT).to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("search", search.to_string()));
        }
        params
    }
}

/// Query parameters of the date-ranged endpoints (`/calendar`, `/instances`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<ClassStatus>,
}

impl RangeQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            (
                "startDate",
                self.start_date.format(api_date::FORMAT).to_string(),
            ),
            ("endDate", self.end_date.format(api_date::FORMAT).to_string()),
        ];
        if let Some(status) = self.status {
            params.push(("status", status_param(status)));
        }
        params
    }
}

fn status_param(status: ClassStatus) -> String {
    match status {
        ClassStatus::Active => "active",
        ClassStatus::Cancelled => "cancelled",
        ClassStatus::Completed => "completed",
    }
    .to_string()
}
