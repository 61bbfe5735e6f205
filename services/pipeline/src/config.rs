//! Pipeline configuration from environment variables.
//!
//! Invalid configuration (zero divisor, ambiguous synonym tables) fails at
//! startup; nothing here is deferred to request time.

use anyhow::{bail, Context, Result};

use crate::headers;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Divisor turning an annual cost into an hourly cost.
    pub annual_hours_divisor: f64,
    /// Maximum rows per chunk sent to the store in one statement batch.
    pub chunk_size: usize,
    /// Referential violations tolerated before a load is blocked.
    pub max_referential_violations: usize,
    /// Margin cache time-to-live in minutes.
    pub cache_ttl_minutes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            annual_hours_divisor: 1920.0,
            chunk_size: 1000,
            max_referential_violations: 0,
            cache_ttl_minutes: 15,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            annual_hours_divisor: env_parse("ANNUAL_HOURS_DIVISOR", defaults.annual_hours_divisor)?,
            chunk_size: env_parse("LOAD_CHUNK_SIZE", defaults.chunk_size)?,
            max_referential_violations: env_parse(
                "MAX_REFERENTIAL_VIOLATIONS",
                defaults.max_referential_violations,
            )?,
            cache_ttl_minutes: env_parse("MARGIN_CACHE_TTL_MINUTES", defaults.cache_ttl_minutes)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.annual_hours_divisor == 0.0 || !self.annual_hours_divisor.is_finite() {
            bail!("ANNUAL_HOURS_DIVISOR must be a non-zero finite number");
        }
        if self.chunk_size == 0 {
            bail!("LOAD_CHUNK_SIZE must be at least 1");
        }
        headers::validate_synonym_tables()?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_zero_divisor_is_fatal() {
        let config = PipelineConfig {
            annual_hours_divisor: 0.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_chunk_size_is_fatal() {
        let config = PipelineConfig {
            chunk_size: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
