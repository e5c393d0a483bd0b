use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-provisioned key; sessions fall back to user-typed keys when absent.
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub port: u16,
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let gemini_api_base = lookup("GEMINI_API_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let gemini_model = lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let port = lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080);
        let idle_minutes: u64 = lookup("SESSION_IDLE_MINUTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            gemini_api_key,
            gemini_api_base,
            gemini_model,
            port,
            session_idle: Duration::from_secs(idle_minutes * 60),
        }
    }
}
