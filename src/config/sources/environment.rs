//! Environment source: BITROT_CHECK__<FIELD> and BITROT_LOGGING__<FIELD>.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add `BITROT_` prefixed environment overrides to builder.
///
/// `BITROT_LOG*` variables belong to the logging initializer and are not
/// matched here since they lack the `__` section separator.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("BITROT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
