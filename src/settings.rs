//! Configuration for the batch tool, read from an `annex.toml` file next to
//! the working directory with `ANNEX_*` environment overrides.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{AnnexError, Result};

/// Orphan deletes run in batches of this many rows unless configured.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Path of the SQLite database file.
    pub database: String,
    /// Upper bound on rows deleted per statement during reconciliation.
    pub batch_size: usize,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .set_default("database", "annex.db")
            .map_err(|e| AnnexError::Configuration(e.to_string()))?
            .set_default("batch_size", DEFAULT_BATCH_SIZE as i64)
            .map_err(|e| AnnexError::Configuration(e.to_string()))?
            .add_source(File::with_name("annex").required(false))
            .add_source(Environment::with_prefix("ANNEX"))
            .build()
            .map_err(|e| AnnexError::Configuration(e.to_string()))?;
        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| AnnexError::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(AnnexError::Configuration(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_batch_size_is_a_configuration_error() {
        let settings = Settings {
            database: "annex.db".into(),
            batch_size: 0,
        };
        assert!(matches!(
            settings.validate(),
            Err(AnnexError::Configuration(_))
        ));
    }

    #[test]
    fn positive_batch_size_passes_validation() {
        let settings = Settings {
            database: "annex.db".into(),
            batch_size: DEFAULT_BATCH_SIZE,
        };
        assert!(settings.validate().is_ok());
    }
}
