//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only values that later sources commonly override are seeded here; every
/// other field falls back to its serde default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("app.generation_cost", i64::from(crate::ledger::GENERATION_COST))?
        .set_default("app.initial_credits", i64::from(crate::ledger::DEFAULT_CREDITS))
}
