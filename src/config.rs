use std::path::PathBuf;
use std::time::Duration;

use crate::llm::DEMO_KEY;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub hotpepper_api_key: Option<String>,
    pub rakuten_application_id: Option<String>,
    /// In-memory storage when unset.
    pub plans_file: Option<PathBuf>,
    pub generation_timeout: Duration,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Unset, blank and unparseable values all fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            gemini_api_key: var("GEMINI_API_KEY").unwrap_or_else(|| DEMO_KEY.to_string()),
            gemini_api_base: var("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string()),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            hotpepper_api_key: var("HOTPEPPER_API_KEY"),
            rakuten_application_id: var("RAKUTEN_APPLICATION_ID"),
            plans_file: var("TRIP_PLANS_FILE").map(PathBuf::from),
            generation_timeout: Duration::from_secs(
                var("GENERATION_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            port: var("PORT").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.gemini_api_key == DEMO_KEY
    }
}
