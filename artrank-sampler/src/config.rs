use serde::{Deserialize, Serialize};
use std::path::Path;

use artrank_sim::thresholds::{
    DEFAULT_ARTIST_BOOST, DEFAULT_BIAS_THRESHOLD, DEFAULT_CONFIDENCE_MARGIN, DEFAULT_MAX_ATTEMPTS,
};

use crate::error::{SamplerError, SamplerResult};

/// What identifies a triple for deduplication in the user-grounded
/// strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// The profile sequence is the anchor; synthetic strategies are allowed.
    #[default]
    Profile,
    /// The user id is the anchor; synthetic strategies must not sample.
    User,
}

/// Tuning knobs for a sampling engine.
///
/// Every field has a default, so a JSON config only needs the fields it
/// changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Probability of drawing from the anchor's cluster/artist rather than a
    /// uniformly random cluster.
    pub threshold: f64,
    /// Required score gap for the margin-filtered strategies.
    pub confidence_margin: f64,
    /// Bonus added to a pair score when both items share a known artist.
    pub artist_boost: f64,
    /// Maximum profile length; `None` uses the whole history.
    pub max_profile_size: Option<usize>,
    /// Draw attempts per requested sample before it is skipped.
    pub max_attempts: usize,
    pub identity: IdentityMode,
    /// RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BIAS_THRESHOLD,
            confidence_margin: DEFAULT_CONFIDENCE_MARGIN,
            artist_boost: DEFAULT_ARTIST_BOOST,
            max_profile_size: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            identity: IdentityMode::Profile,
            seed: None,
        }
    }
}

impl SamplerConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SamplerResult<Self> {
        let config: SamplerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> SamplerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SamplerError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> SamplerResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SamplerError::InvalidConfig {
                field: "threshold",
                reason: format!("must be within [0, 1], got {}", self.threshold),
            });
        }
        if !self.confidence_margin.is_finite() || self.confidence_margin < 0.0 {
            return Err(SamplerError::InvalidConfig {
                field: "confidence_margin",
                reason: format!("must be a non-negative number, got {}", self.confidence_margin),
            });
        }
        if !self.artist_boost.is_finite() {
            return Err(SamplerError::InvalidConfig {
                field: "artist_boost",
                reason: format!("must be finite, got {}", self.artist_boost),
            });
        }
        if self.max_profile_size == Some(0) {
            return Err(SamplerError::InvalidConfig {
                field: "max_profile_size",
                reason: "must be at least 1 when set".into(),
            });
        }
        if self.max_attempts == 0 {
            return Err(SamplerError::InvalidConfig {
                field: "max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
