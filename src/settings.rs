use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub debug: bool,
    pub enable_swagger: bool,
    pub port: u16,
    /// IANA zone name used to decide what "today" is.
    pub timezone: String,
    pub stale_after_secs: u64,
    pub notice_ttl_secs: u64,
    pub search_debounce_ms: u64,
    pub classes_page_limit: u32,
    pub calendar_name: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_API_BASE_URL, APP_PORT, ...; `__` separates nested keys
            .add_source(Environment::with_prefix("APP").prefix_separator("_").separator("__"))
            .set_default("api_base_url", "http://localhost:3000/api/v1")?
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("timezone", "UTC")?
            .set_default("stale_after_secs", 30)?
            .set_default("notice_ttl_secs", 5)?
            .set_default("search_debounce_ms", 500)?
            .set_default("classes_page_limit", 100)?
            .set_default("calendar_name", "Class Schedule")?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.api_url()?;
        settings.tz()?;
        Ok(settings)
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base_url)
            .map_err(|err| ConfigError::Message(format!("invalid api_base_url: {err}")))
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| ConfigError::Message(format!("invalid timezone: {err}")))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api/v1".into(),
            debug: false,
            enable_swagger: true,
            port: 8080,
            timezone: "UTC".into(),
            stale_after_secs: 30,
            notice_ttl_secs: 5,
            search_debounce_ms: 500,
            classes_page_limit: 100,
            calendar_name: "Class Schedule".into(),
        }
    }
}
