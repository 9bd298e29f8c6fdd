use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::i18n::Language;

pub const DEFAULT_CITY: &str = "lviv";
pub const DEFAULT_PULL_INTERVAL: u64 = 10;
pub const MIN_PULL_INTERVAL: u64 = 5;
pub const MAX_PULL_INTERVAL: u64 = 60;
pub const DEFAULT_FEED_URL: &str = "https://api.waqi.info/feed";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Upper bound for every outbound HTTP request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Keys recognised in the config file and in the environment.
const KEYS: &[&str] = &[
    "API_KEY",
    "BOT_API_KEY",
    "TELEGRAM_BOT_API_KEY",
    "CITY",
    "LANGUAGE",
    "CHAT_ID",
    "PULL_INTERVAL",
    "LOG_LEVEL",
    "SILENT",
    "FEED_URL",
    "TELEGRAM_API_URL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            "critical" => Some(LogLevel::Critical),
            _ => None,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has no level above error
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// A non-fatal problem found while loading configuration. The default
/// was substituted; the warning is logged once tracing is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    CityDefaulted,
    InvalidLanguage(Option<String>),
    AlertsDisabled,
    InvalidPullInterval(String),
    InvalidLogLevel(String),
    InvalidSilent(Option<String>),
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::CityDefaulted => {
                write!(f, "CITY is not set, defaulting to {}", DEFAULT_CITY)
            }
            ConfigWarning::InvalidLanguage(None) => {
                write!(f, "LANGUAGE is not set, defaulting to English")
            }
            ConfigWarning::InvalidLanguage(Some(v)) => {
                write!(f, "LANGUAGE '{}' is not supported, defaulting to English", v)
            }
            ConfigWarning::AlertsDisabled => {
                write!(f, "CHAT_ID is not set, alerts will not be sent")
            }
            ConfigWarning::InvalidPullInterval(v) => write!(
                f,
                "PULL_INTERVAL '{}' is invalid, defaulting to {} minutes",
                v, DEFAULT_PULL_INTERVAL
            ),
            ConfigWarning::InvalidLogLevel(v) => {
                write!(f, "LOG_LEVEL '{}' is invalid, using default value info", v)
            }
            ConfigWarning::InvalidSilent(None) => {
                write!(f, "SILENT is not set, using default value false")
            }
            ConfigWarning::InvalidSilent(Some(v)) => {
                write!(f, "SILENT '{}' is not a boolean, using default value false", v)
            }
        }
    }
}

/// Optional config file. A flat table keyed by the lower-cased
/// environment names; values are validated like environment strings.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub api_key: Option<toml::Value>,
    pub bot_api_key: Option<toml::Value>,
    pub telegram_bot_api_key: Option<toml::Value>,
    pub city: Option<toml::Value>,
    pub language: Option<toml::Value>,
    pub chat_id: Option<toml::Value>,
    pub pull_interval: Option<toml::Value>,
    pub log_level: Option<toml::Value>,
    pub silent: Option<toml::Value>,
    pub feed_url: Option<toml::Value>,
    pub telegram_api_url: Option<toml::Value>,
}

impl FileConfig {
    fn into_entries(self) -> Vec<(&'static str, toml::Value)> {
        [
            ("API_KEY", self.api_key),
            ("BOT_API_KEY", self.bot_api_key),
            ("TELEGRAM_BOT_API_KEY", self.telegram_bot_api_key),
            ("CITY", self.city),
            ("LANGUAGE", self.language),
            ("CHAT_ID", self.chat_id),
            ("PULL_INTERVAL", self.pull_interval),
            ("LOG_LEVEL", self.log_level),
            ("SILENT", self.silent),
            ("FEED_URL", self.feed_url),
            ("TELEGRAM_API_URL", self.telegram_api_url),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

/// Settings merged from the config file and the environment, keyed by
/// the environment names.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Parse the config file. Non-string values are stringified.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content).context("Failed to parse config file")?;
        let values = file
            .into_entries()
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key.to_string(), value)
            })
            .collect();
        Ok(Self { values })
    }

    /// Override known keys with whatever `lookup` returns for them.
    pub fn overlay<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in KEYS {
            if let Some(value) = lookup(key) {
                self.values.insert((*key).to_string(), value);
            }
        }
    }

    #[cfg(test)]
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_ascii_uppercase(), value.into());
    }

    /// Trimmed value, with empty strings treated as unset.
    fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub bot_token: String,
    /// City as written by the operator, used in messages.
    pub city: String,
    pub language: Language,
    pub chat_id: Option<String>,
    /// Poll interval in minutes, always within [5, 60].
    pub pull_interval: u64,
    pub log_level: LogLevel,
    pub silent: bool,
    pub feed_url: String,
    pub telegram_api_url: String,
}

impl Config {
    /// Load configuration: optional TOML file, then `.env`, then the
    /// process environment. An explicit `path` must exist; otherwise
    /// `./config.toml` is used when present.
    pub fn load(path: Option<&Path>) -> Result<(Self, Vec<ConfigWarning>)> {
        let mut settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Settings::from_toml_str(&content)
                    .with_context(|| format!("Invalid config file: {}", path.display()))?
            }
            None => {
                let default_path = Path::new("config.toml");
                if default_path.exists() {
                    let content = std::fs::read_to_string(default_path)
                        .context("Failed to read config.toml")?;
                    Settings::from_toml_str(&content).context("Invalid config.toml")?
                } else {
                    Settings::default()
                }
            }
        };

        dotenvy::dotenv().ok();
        settings.overlay(|key| std::env::var(key).ok());

        Self::from_settings(&settings)
    }

    /// Validate merged settings, substituting defaults for invalid
    /// optional values. Missing credentials are fatal.
    pub fn from_settings(settings: &Settings) -> Result<(Self, Vec<ConfigWarning>)> {
        let mut warnings = Vec::new();

        let api_key = settings
            .get("API_KEY")
            .context("API_KEY is not set")?
            .to_string();
        let bot_token = settings
            .get("BOT_API_KEY")
            .or_else(|| settings.get("TELEGRAM_BOT_API_KEY"))
            .context("BOT_API_KEY is not set")?
            .to_string();

        let city = match settings.get("CITY") {
            Some(city) => city.to_string(),
            None => {
                warnings.push(ConfigWarning::CityDefaulted);
                DEFAULT_CITY.to_string()
            }
        };

        let raw_language = settings.get("LANGUAGE");
        let language = match raw_language.and_then(Language::parse) {
            Some(language) => language,
            None => {
                warnings.push(ConfigWarning::InvalidLanguage(
                    raw_language.map(str::to_string),
                ));
                Language::default()
            }
        };

        let chat_id = settings.get("CHAT_ID").map(str::to_string);
        if chat_id.is_none() {
            warnings.push(ConfigWarning::AlertsDisabled);
        }

        let pull_interval = match settings.get("PULL_INTERVAL") {
            None => DEFAULT_PULL_INTERVAL,
            Some(raw) => match normalize_pull_interval(raw) {
                Some(minutes) => minutes,
                None => {
                    warnings.push(ConfigWarning::InvalidPullInterval(raw.to_string()));
                    DEFAULT_PULL_INTERVAL
                }
            },
        };

        let log_level = match settings.get("LOG_LEVEL") {
            None => LogLevel::default(),
            Some(raw) => LogLevel::parse(raw).unwrap_or_else(|| {
                warnings.push(ConfigWarning::InvalidLogLevel(raw.to_string()));
                LogLevel::default()
            }),
        };

        let raw_silent = settings.get("SILENT");
        let silent = match raw_silent.and_then(parse_bool) {
            Some(silent) => silent,
            None => {
                warnings.push(ConfigWarning::InvalidSilent(raw_silent.map(str::to_string)));
                false
            }
        };

        let feed_url = settings
            .get("FEED_URL")
            .unwrap_or(DEFAULT_FEED_URL)
            .trim_end_matches('/')
            .to_string();
        let telegram_api_url = settings
            .get("TELEGRAM_API_URL")
            .unwrap_or(DEFAULT_TELEGRAM_API_URL)
            .trim_end_matches('/')
            .to_string();

        let config = Config {
            api_key,
            bot_token,
            city,
            language,
            chat_id,
            pull_interval,
            log_level,
            silent,
            feed_url,
            telegram_api_url,
        };
        Ok((config, warnings))
    }

    /// Lower-cased city used as the feed URL path segment.
    pub fn city_slug(&self) -> String {
        self.city.to_lowercase()
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.pull_interval * 60)
    }
}

/// Parse a poll interval in minutes. `None` when it is not an integer
/// or falls outside [5, 60].
pub fn normalize_pull_interval(raw: &str) -> Option<u64> {
    let minutes: i64 = raw.trim().parse().ok()?;
    if (MIN_PULL_INTERVAL as i64..=MAX_PULL_INTERVAL as i64).contains(&minutes) {
        Some(minutes as u64)
    } else {
        None
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        let mut settings = Settings::default();
        settings.set("API_KEY", "waqi-token");
        settings.set("BOT_API_KEY", "123:abc");
        settings
    }

    fn pull_interval_for(raw: &str) -> u64 {
        let mut settings = base_settings();
        settings.set("PULL_INTERVAL", raw);
        let (config, _) = Config::from_settings(&settings).unwrap();
        config.pull_interval
    }

    #[test]
    fn test_pull_interval_normalization() {
        assert_eq!(pull_interval_for("3"), 10);
        assert_eq!(pull_interval_for("5"), 5);
        assert_eq!(pull_interval_for("60"), 60);
        assert_eq!(pull_interval_for("90"), 10);
    }

    #[test]
    fn test_pull_interval_not_a_number() {
        let mut settings = base_settings();
        settings.set("PULL_INTERVAL", "soon");
        let (config, warnings) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.pull_interval, DEFAULT_PULL_INTERVAL);
        assert!(warnings.contains(&ConfigWarning::InvalidPullInterval("soon".into())));
    }

    #[test]
    fn test_defaults() {
        let (config, warnings) = Config::from_settings(&base_settings()).unwrap();
        assert_eq!(config.city, "lviv");
        assert_eq!(config.language, Language::En);
        assert_eq!(config.chat_id, None);
        assert_eq!(config.pull_interval, 10);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.silent);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.telegram_api_url, DEFAULT_TELEGRAM_API_URL);
        assert!(warnings.contains(&ConfigWarning::AlertsDisabled));
        assert!(warnings.contains(&ConfigWarning::CityDefaulted));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let mut settings = Settings::default();
        settings.set("BOT_API_KEY", "123:abc");
        let err = Config::from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_missing_bot_token_is_fatal() {
        let mut settings = Settings::default();
        settings.set("API_KEY", "waqi-token");
        settings.set("BOT_API_KEY", "   ");
        let err = Config::from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("BOT_API_KEY"));
    }

    #[test]
    fn test_legacy_bot_token_key() {
        let mut settings = Settings::default();
        settings.set("API_KEY", "waqi-token");
        settings.set("TELEGRAM_BOT_API_KEY", "456:def");
        let (config, _) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.bot_token, "456:def");
    }

    #[test]
    fn test_language_and_city() {
        let mut settings = base_settings();
        settings.set("LANGUAGE", "UK");
        settings.set("CITY", "Krakow");
        let (config, _) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.language, Language::Uk);
        assert_eq!(config.city, "Krakow");
        assert_eq!(config.city_slug(), "krakow");
    }

    #[test]
    fn test_unsupported_language_falls_back() {
        let mut settings = base_settings();
        settings.set("LANGUAGE", "de");
        let (config, warnings) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.language, Language::En);
        assert!(warnings.contains(&ConfigWarning::InvalidLanguage(Some("de".into()))));
    }

    #[test]
    fn test_log_level_and_silent() {
        let mut settings = base_settings();
        settings.set("LOG_LEVEL", "WARNING");
        settings.set("SILENT", "True");
        let (config, _) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.log_level, LogLevel::Warning);
        assert_eq!(config.log_level.as_directive(), "warn");
        assert!(config.silent);

        settings.set("LOG_LEVEL", "verbose");
        settings.set("SILENT", "maybe");
        let (config, warnings) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.silent);
        assert!(warnings.contains(&ConfigWarning::InvalidLogLevel("verbose".into())));
        assert!(warnings.contains(&ConfigWarning::InvalidSilent(Some("maybe".into()))));
    }

    #[test]
    fn test_toml_file_with_environment_overlay() {
        let mut settings = Settings::from_toml_str(
            r#"
            api_key = "from-file"
            bot_api_key = "1:file"
            city = "Warsaw"
            pull_interval = 15
            silent = true
            chat_id = -100123
            "#,
        )
        .unwrap();
        settings.overlay(|key| match key {
            "CITY" => Some("Lviv".to_string()),
            _ => None,
        });

        let (config, warnings) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.city, "Lviv");
        assert_eq!(config.pull_interval, 15);
        assert!(config.silent);
        assert_eq!(config.chat_id.as_deref(), Some("-100123"));
        assert!(!warnings.contains(&ConfigWarning::AlertsDisabled));
    }

    #[test]
    fn test_toml_file_unknown_keys_ignored() {
        let settings = Settings::from_toml_str(
            r#"
            api_key = "from-file"
            bot_api_key = "1:file"
            language = "pl"
            colour = "blue"
            "#,
        )
        .unwrap();
        let (config, _) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.language, Language::Pl);
    }

    #[test]
    fn test_toml_file_rejects_malformed_content() {
        assert!(Settings::from_toml_str("api_key = ").is_err());
    }

    #[test]
    fn test_base_urls_trailing_slash_trimmed() {
        let mut settings = base_settings();
        settings.set("FEED_URL", "http://localhost:8080/feed/");
        let (config, _) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.feed_url, "http://localhost:8080/feed");
    }

    #[test]
    fn test_poll_period() {
        let mut settings = base_settings();
        settings.set("PULL_INTERVAL", "7");
        let (config, _) = Config::from_settings(&settings).unwrap();
        assert_eq!(config.poll_period(), Duration::from_secs(420));
    }
}
