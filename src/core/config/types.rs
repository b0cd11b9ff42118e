use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) telemetry: TelemetrySettings,
    pub(super) attempt: AttemptSettings,
    pub(super) limits: TestLimits,
    pub(super) ai: AiSettings,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
}

/// Countdown and draft defaults for student attempts.
#[derive(Debug, Clone)]
pub struct AttemptSettings {
    /// Length of one countdown "second". Hosts keep this at 1000.
    pub tick_millis: u64,
    pub default_duration_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct TestLimits {
    pub max_questions: usize,
    pub max_total_marks: u32,
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}
