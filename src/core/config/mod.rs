mod parsing;
mod settings;
mod types;

pub use types::{
    AiSettings, AttemptSettings, ConfigError, Environment, RuntimeSettings, Settings,
    TelemetrySettings, TestLimits,
};
