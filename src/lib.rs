//! Test lifecycle engine: question bank, test definitions, student attempts with a
//! countdown, scoring, and the submission and mark stores.

pub mod core;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod schemas;
pub mod services;
pub mod sessions;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::config::Settings;
pub use crate::core::state::AppState;
pub use crate::errors::TestFlowError;
pub use crate::sessions::{open_attempt, AttemptSession, AttemptStage};

use crate::core::telemetry;

/// Loads `.env` and settings, then installs tracing and the metrics recorder.
///
/// Hosts with their own subscriber or recorder call `Settings::load` instead.
pub fn init() -> anyhow::Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    tracing::info!(
        environment = settings.runtime().environment.as_str(),
        tick_millis = settings.attempt().tick_millis,
        ai_configured = !settings.ai().api_key.is_empty(),
        "testflow initialised"
    );
    Ok(settings)
}
