pub mod clock;
pub mod config;
pub mod metrics;
pub mod state;
pub mod telemetry;
pub mod time;
