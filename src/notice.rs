use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;

use crate::client::ClientError;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Notice {
    pub id: String,
    pub variant: NoticeVariant,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip)]
    created_at: Option<Instant>,
}

impl Notice {
    pub fn new(variant: NoticeVariant, title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: String::new(),
            variant,
            title: title.into(),
            description,
            created_at: None,
        }
    }
}

/// How validation messages are listed in an error notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStyle {
    /// `• message`
    Bullets,
    /// `field: message`
    Labeled,
}

/// Fallback wording for one kind of failed action.
#[derive(Debug, Clone, Copy)]
pub struct FailureText {
    pub title: &'static str,
    pub validation_title: &'static str,
    pub message: &'static str,
    pub style: FieldStyle,
}

/// Turns a failed upstream call into the notice shown to the admin.
pub fn failure_notice(err: &ClientError, text: FailureText) -> Notice {
    let Some(body) = err.body() else {
        return Notice::new(NoticeVariant::Error, text.title, Some(err.to_string()));
    };

    if !body.errors.is_empty() {
        let joined = body
            .errors
            .iter()
            .map(|e| match text.style {
                FieldStyle::Bullets => format!("• {}", e.message),
                FieldStyle::Labeled => format!("{}: {}", e.field, e.message),
            })
            .collect::<Vec<_>>()
            .join("\n");
        let description = if joined.trim().is_empty() {
            body.message.clone().unwrap_or_else(|| text.message.to_string())
        } else {
            joined
        };
        return Notice::new(
            NoticeVariant::Error,
            body.title.clone().unwrap_or_else(|| text.validation_title.to_string()),
            Some(description),
        );
    }

    Notice::new(
        NoticeVariant::Error,
        body.title.clone().unwrap_or_else(|| text.title.to_string()),
        Some(
            body.message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| text.message.to_string()),
        ),
    )
}

/// Holds the notices currently on screen. Ids are unique per center.
pub struct NoticeCenter {
    next_id: AtomicU64,
    ttl: Duration,
    notices: Mutex<Vec<Notice>>,
}

impl NoticeCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            ttl,
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, mut notice: Notice) -> Notice {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        notice.id = format!("notice-{id}");
        notice.created_at = Some(Instant::now());
        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        notices.push(notice.clone());
        notice
    }

    pub fn success(&self, title: impl Into<String>, description: impl Into<String>) -> Notice {
        self.push(Notice::new(
            NoticeVariant::Success,
            title,
            Some(description.into()),
        ))
    }

    pub fn info(&self, title: impl Into<String>) -> Notice {
        self.push(Notice::new(NoticeVariant::Info, title, None))
    }

    pub fn warning(&self, title: impl Into<String>, description: impl Into<String>) -> Notice {
        self.push(Notice::new(
            NoticeVariant::Warning,
            title,
            Some(description.into()),
        ))
    }

    pub fn dismiss(&self, id: &str) -> bool {
        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        let before = notices.len();
        notices.retain(|n| n.id != id);
        notices.len() != before
    }

    /// Notices younger than the ttl; older ones are dropped.
    pub fn active(&self) -> Vec<Notice> {
        let now = Instant::now();
        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        notices.retain(|n| {
            n.created_at
                .map(|created| now.duration_since(created) < self.ttl)
                .unwrap_or(false)
        });
        notices.clone()
    }
}

impl Default for NoticeCenter {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
