use std::time::Duration;

use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_u32, parse_u64,
    parse_usize,
};
use super::types::{
    AiSettings, AttemptSettings, ConfigError, Environment, RuntimeSettings, Settings,
    TelemetrySettings, TestLimits,
};

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("TESTFLOW_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("TESTFLOW_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let log_level = env_or_default("TESTFLOW_LOG_LEVEL", "info");
        let json = env_optional("TESTFLOW_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let tick_millis =
            parse_u64("TESTFLOW_TICK_MILLIS", env_or_default("TESTFLOW_TICK_MILLIS", "1000"))?;
        let default_duration_minutes = parse_u32(
            "TESTFLOW_DEFAULT_DURATION_MINUTES",
            env_or_default("TESTFLOW_DEFAULT_DURATION_MINUTES", "60"),
        )?;

        let max_questions =
            parse_usize("TESTFLOW_MAX_QUESTIONS", env_or_default("TESTFLOW_MAX_QUESTIONS", "200"))?;
        let max_total_marks = parse_u32(
            "TESTFLOW_MAX_TOTAL_MARKS",
            env_or_default("TESTFLOW_MAX_TOTAL_MARKS", "1000"),
        )?;

        let api_key = env_or_default("AI_API_KEY", "");
        let base_url = env_or_default("AI_BASE_URL", "");
        let model = env_or_default("AI_MODEL", "gpt-4o-mini");
        let max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "1024"))?;
        let request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "30"))?;

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
            attempt: AttemptSettings { tick_millis, default_duration_minutes },
            limits: TestLimits { max_questions, max_total_marks },
            ai: AiSettings { api_key, base_url, model, max_tokens, request_timeout },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub fn attempt(&self) -> &AttemptSettings {
        &self.attempt
    }

    pub fn limits(&self) -> &TestLimits {
        &self.limits
    }

    pub fn ai(&self) -> &AiSettings {
        &self.ai
    }

    /// Period of one countdown step.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.attempt.tick_millis)
    }

    pub fn with_ai(mut self, ai: AiSettings) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_limits(mut self, limits: TestLimits) -> Self {
        self.limits = limits;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt.tick_millis == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TESTFLOW_TICK_MILLIS",
                value: "0".to_string(),
            });
        }

        if self.attempt.default_duration_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TESTFLOW_DEFAULT_DURATION_MINUTES",
                value: "0".to_string(),
            });
        }

        if self.limits.max_questions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TESTFLOW_MAX_QUESTIONS",
                value: "0".to_string(),
            });
        }

        if self.limits.max_total_marks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TESTFLOW_MAX_TOTAL_MARKS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.ai.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("AI_API_KEY"));
        }
        if self.ai.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("AI_BASE_URL"));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            runtime: RuntimeSettings { environment: Environment::Development, strict_config: false },
            telemetry: TelemetrySettings {
                log_level: "info".to_string(),
                json: false,
                prometheus_enabled: false,
            },
            attempt: AttemptSettings { tick_millis: 1000, default_duration_minutes: 60 },
            limits: TestLimits { max_questions: 200, max_total_marks: 1000 },
            ai: AiSettings {
                api_key: String::new(),
                base_url: String::new(),
                model: "gpt-4o-mini".to_string(),
                max_tokens: 1024,
                request_timeout: 30,
            },
        }
    }
}
