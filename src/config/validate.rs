//! Configuration validation.

use crate::config::Config;
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    if !(confidence::MIN..=confidence::MAX).contains(&defaults.threshold) {
        return Err(Error::ConfigValidation {
            message: format!(
                "threshold must be between {} and {}, got {}",
                confidence::MIN,
                confidence::MAX,
                defaults.threshold
            ),
        });
    }

    if defaults.max_lag_seconds < 0 {
        return Err(Error::ConfigValidation {
            message: format!(
                "max_lag_seconds must be non-negative, got {}",
                defaults.max_lag_seconds
            ),
        });
    }

    if defaults.batch_size == 0 {
        return Err(Error::ConfigValidation {
            message: "batch_size must be at least 1".to_string(),
        });
    }

    if defaults.frames_per_video == 0 {
        return Err(Error::ConfigValidation {
            message: "frames_per_video must be at least 1".to_string(),
        });
    }

    if !(confidence::MIN..=confidence::MAX).contains(&config.detector.confidence) {
        return Err(Error::ConfigValidation {
            message: format!(
                "detector confidence must be between {} and {}, got {}",
                confidence::MIN,
                confidence::MAX,
                config.detector.confidence
            ),
        });
    }

    Ok(())
}
