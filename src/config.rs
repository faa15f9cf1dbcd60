use crate::adjustments::{InjuryConfig, SituationalConfig, WeatherConfig};
use crate::edge::{EdgeConfig, Evaluator, StakingConfig};
use crate::error::{LinesmithError, Result};
use crate::ratings::RatingConfig;
use crate::tracker::TrackerConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ratings: RatingConfig,
    pub situational: SituationalConfig,
    pub weather: WeatherConfig,
    pub injury: InjuryConfig,
    pub edge: EdgeConfig,
    pub staking: StakingConfig,
    pub tracker: TrackerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives used when RUST_LOG is unset
    pub filter: String,
    /// Enable JSON formatted console logs
    pub json: bool,
    /// Directory for daily-rolling log files (LINESMITH_LOG_DIR overrides)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,linesmith=debug".to_string(),
            json: false,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("LINESMITH_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (LINESMITH_STAKING__BANKROLL, etc.)
            .add_source(
                Environment::with_prefix("LINESMITH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject malformed tables and thresholds
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        self.ratings.validate(&mut errors);
        self.situational.validate(&mut errors);
        self.weather.validate(&mut errors);
        self.injury.validate(&mut errors);
        self.edge.validate(&mut errors);
        self.staking.validate(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LinesmithError::Configuration(errors.join("; ")))
        }
    }

    /// Evaluator built from the validated configuration
    pub fn evaluator(&self) -> Result<Evaluator> {
        self.validate()?;
        Evaluator::new(
            self.ratings.home_field,
            self.situational.clone(),
            self.weather.clone(),
            self.injury.clone(),
            self.edge.clone(),
        )
    }
}
