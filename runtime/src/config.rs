use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_API_BASE: &str = "https://jsonplaceholder.typicode.com";
pub const LOOKUP_TIMEOUT_MS: u64 = 15_000;
pub const LOOKUP_TIMEOUT_MS_MIN: u64 = 100;
pub const LOOKUP_TIMEOUT_MS_MAX: u64 = 120_000;

pub const API_BASE_ENV: &str = "REPLYDESK_API_BASE";
pub const LOOKUP_TIMEOUT_ENV: &str = "REPLYDESK_LOOKUP_TIMEOUT_MS";
pub const HOST_FIELDS_ENV: &str = "REPLYDESK_HOST_FIELDS";
pub const STATE_DIR_ENV: &str = "REPLYDESK_STATE_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API base URL '{value}': {source}")]
    InvalidApiBase {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Runtime settings for one widget instance.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub api_base: Url,
    pub lookup_timeout: Duration,
    /// JSON file standing in for the host capability. `None` = no host.
    pub host_fields: Option<PathBuf>,
    /// Where the remembered manual email lives. `None` = do not remember.
    pub state_dir: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn defaults() -> Self {
        Self {
            api_base: default_api_base(),
            lookup_timeout: Duration::from_millis(LOOKUP_TIMEOUT_MS),
            host_fields: None,
            state_dir: default_state_dir(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Resolve settings through `var`, keyed by the `REPLYDESK_*` names.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_raw(
            var(API_BASE_ENV),
            var(LOOKUP_TIMEOUT_ENV),
            var(HOST_FIELDS_ENV),
            var(STATE_DIR_ENV),
        )
    }

    pub fn from_raw(
        api_base_raw: Option<String>,
        timeout_raw: Option<String>,
        host_fields_raw: Option<String>,
        state_dir_raw: Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::defaults();
        let api_base = match non_blank(api_base_raw) {
            Some(value) => parse_api_base(&value)?,
            None => defaults.api_base,
        };
        let timeout_ms = parse_env_u64_with_bounds(
            timeout_raw,
            LOOKUP_TIMEOUT_MS_MIN,
            LOOKUP_TIMEOUT_MS_MAX,
            LOOKUP_TIMEOUT_MS,
        );
        Ok(Self {
            api_base,
            lookup_timeout: Duration::from_millis(timeout_ms),
            host_fields: non_blank(host_fields_raw).map(PathBuf::from),
            state_dir: non_blank(state_dir_raw)
                .map(PathBuf::from)
                .or(defaults.state_dir),
        })
    }
}

/// Parse and normalize an API base so relative joins keep its path.
pub fn parse_api_base(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| ConfigError::InvalidApiBase {
        value: trimmed.to_string(),
        source,
    })
}

fn default_api_base() -> Url {
    Url::parse(&format!("{DEFAULT_API_BASE}/")).expect("static default API base")
}

pub fn default_state_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("replydesk"))
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env_u64_with_bounds(raw: Option<String>, min: u64, max: u64, default: u64) -> u64 {
    match raw.and_then(|value| value.trim().parse::<u64>().ok()) {
        Some(parsed) => parsed.clamp(min, max),
        None => default,
    }
}
