use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    fn single_page(len: usize) -> Self {
        Self {
            page: 1,
            limit: len as u32,
            total: len as u64,
            total_pages: 1,
        }
    }
}

/// `{success, message?, data}` after normalization.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub success: bool,
    pub title: Option<String>,
    pub message: Option<String>,
    pub data: T,
}

/// `{success, data[], pagination}` after normalization.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// The fields every backend response shape may carry, current or legacy.
#[derive(Debug)]
pub(crate) struct RawEnvelope {
    pub success: bool,
    pub title: Option<String>,
    pub message: Option<String>,
    pub data: Value,
    pub pagination: Option<Pagination>,
}

impl RawEnvelope {
    /// Accepts `{success, data}`, the legacy `{title, message, data}`, a bare
    /// array, or a bare object that is the payload itself.
    pub fn normalize(body: Value) -> Self {
        match body {
            Value::Object(mut map) if map.contains_key("data") => {
                let success = map
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let title = take_string(&mut map, "title");
                let message = take_string(&mut map, "message");
                let pagination = map
                    .remove("pagination")
                    .and_then(|value| serde_json::from_value(value).ok());
                let data = map.remove("data").unwrap_or(Value::Null);
                Self {
                    success,
                    title,
                    message,
                    data,
                    pagination,
                }
            }
            Value::Object(mut map)
                if map.get("success").and_then(Value::as_bool) == Some(false) =>
            {
                Self {
                    success: false,
                    title: take_string(&mut map, "title"),
                    message: take_string(&mut map, "message"),
                    data: Value::Object(map),
                    pagination: None,
                }
            }
            other => Self {
                success: true,
                title: None,
                message: None,
                data: other,
                pagination: None,
            },
        }
    }

    pub fn into_envelope<T: DeserializeOwned>(self) -> Result<Envelope<T>, serde_json::Error> {
        let data = serde_json::from_value(self.data)?;
        Ok(Envelope {
            success: self.success,
            title: self.title,
            message: self.message,
            data,
        })
    }

    pub fn into_page<T: DeserializeOwned>(self) -> Result<Page<T>, serde_json::Error> {
        let data: Vec<T> = match self.data {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other)?,
        };
        let pagination = self
            .pagination
            .unwrap_or_else(|| Pagination::single_page(data.len()));
        Ok(Page { data, pagination })
    }
}

fn take_string(map: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_normalize_current_shape() {
        let raw = RawEnvelope::normalize(json!({
            "success": true,
            "data": [1, 2, 3],
            "pagination": {"page": 2, "limit": 3, "total": 9, "totalPages": 3}
        }));
        let page: Page<u32> = raw.into_page().unwrap();
        assert_eq!(page.data, vec![1, 2, 3]);
        assert_eq!(page.pagination.page, 2);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn test_normalize_legacy_shape_without_success() {
        let raw = RawEnvelope::normalize(json!({
            "title": "OK",
            "message": "Fetched",
            "data": {"instanceCount": 4}
        }));
        assert!(raw.success);
        assert_eq!(raw.message.as_deref(), Some("Fetched"));
        let envelope: Envelope<Value> = raw.into_envelope().unwrap();
        assert_eq!(envelope.data["instanceCount"], 4);
        assert_eq!(envelope.title.as_deref(), Some("OK"));
    }

    #[test]
    fn test_normalize_bare_array_defaults_pagination() {
        let page: Page<String> = RawEnvelope::normalize(json!(["a", "b"]))
            .into_page()
            .unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn test_normalize_rejection() {
        let raw = RawEnvelope::normalize(json!({
            "success": false,
            "message": "Class not found"
        }));
        assert!(!raw.success);
        assert_eq!(raw.message.as_deref(), Some("Class not found"));
    }
}
