// Configuration, loaded from TOML with defaults for every field

use crate::error::{ListingError, Result};
use crate::models::{MAX_RATING, MIN_RATING};
use crate::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub api: ApiConfig,
    pub seed: SeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub message: String,
    pub version: String,
    pub app: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            message: "Welcome to ALX Travel App API".to_string(),
            version: "v1".to_string(),
            app: "listings".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    // Days between consecutive check-in dates
    pub booking_spacing_days: u32,
    pub min_stay_nights: u32,
    pub max_stay_nights: u32,
    pub min_rating: i32,
    pub max_rating: i32,
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            booking_spacing_days: 30,
            min_stay_nights: 2,
            max_stay_nights: 7,
            min_rating: 3,
            max_rating: 5,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    // EnvFilter directive, overridden by RUST_LOG
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "travel_listings=info".to_string(),
            json: false,
        }
    }
}

fn config_error(message: impl Into<String>) -> ListingError {
    ListingError::Config {
        message: message.into(),
    }
}

impl ListingConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ListingConfig = toml::from_str(content)
            .map_err(|e| config_error(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

impl Validate for SeedConfig {
    fn validate(&self) -> Result<()> {
        if self.booking_spacing_days == 0 {
            return Err(config_error("seed.booking_spacing_days must be at least 1"));
        }
        if self.min_stay_nights == 0 || self.min_stay_nights > self.max_stay_nights {
            return Err(config_error(format!(
                "seed stay range {}..={} must be non-empty and start at 1 or more",
                self.min_stay_nights, self.max_stay_nights
            )));
        }
        // Bookings for the same property must not overlap
        if self.max_stay_nights > self.booking_spacing_days {
            return Err(config_error(format!(
                "seed.max_stay_nights ({}) must not exceed seed.booking_spacing_days ({})",
                self.max_stay_nights, self.booking_spacing_days
            )));
        }
        if self.min_rating < MIN_RATING
            || self.max_rating > MAX_RATING
            || self.min_rating > self.max_rating
        {
            return Err(config_error(format!(
                "seed rating range {}..={} must lie within {}..={}",
                self.min_rating, self.max_rating, MIN_RATING, MAX_RATING
            )));
        }
        Ok(())
    }
}

impl Validate for ListingConfig {
    fn validate(&self) -> Result<()> {
        if self.api.version.trim().is_empty() {
            return Err(config_error("api.version cannot be empty"));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(config_error("logging.filter cannot be empty"));
        }
        self.seed.validate()
    }
}
