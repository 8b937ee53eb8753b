//! Environment source: `REZI_<SECTION>__<KEY>` variables, e.g. `REZI_PROVIDER__MODEL`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Variables consulted, in order, when no API key is configured.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("REZI")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

pub fn api_key_fallback() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
}
