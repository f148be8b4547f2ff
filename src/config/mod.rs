use crate::prayer::{CalculationMethod, CalculationParams, CoordinateError, Coordinates};
use chrono::Weekday;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Complete Muezzin configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MuezzinConfig {
    #[serde(default)]
    pub calculation: CalculationConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Prayer time calculation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CalculationConfig {
    /// Calculation convention (twilight angles)
    #[serde(default = "default_method")]
    pub method: CalculationMethod,
    /// Asr shadow factor (1 = standard, 2 = Hanafi)
    #[serde(default = "default_asr_shadow_factor")]
    pub asr_shadow_factor: f64,
    /// Coordinates assigned to newly registered groups
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
    /// The one configured zone, as a UTC offset in minutes
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_method() -> CalculationMethod {
    CalculationMethod::MuslimWorldLeague
}

fn default_asr_shadow_factor() -> f64 {
    1.0
}

fn default_latitude() -> f64 {
    31.582045
}

fn default_longitude() -> f64 {
    74.329376
}

fn default_utc_offset_minutes() -> i32 {
    300
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            asr_shadow_factor: default_asr_shadow_factor(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl CalculationConfig {
    /// Method parameters with the configured asr factor applied.
    pub fn params(&self) -> CalculationParams {
        let mut params = self.method.params();
        params.asr_shadow_factor = self.asr_shadow_factor;
        params
    }

    /// Validated default coordinates for new registrations.
    pub fn default_coordinates(&self) -> Result<Coordinates, CoordinateError> {
        Coordinates::new(self.default_latitude, self.default_longitude)
    }
}

/// Tick loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between ticks (seconds). Must stay at or below 60: the
    /// matcher uses exact-minute equality, which a coarser poll would miss.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// Minutes before each anchor for the pre-reminder variant (0 disables)
    #[serde(default = "default_pre_reminder_minutes")]
    pub pre_reminder_minutes: i64,
}

fn default_tick_interval() -> u64 {
    60
}

fn default_pre_reminder_minutes() -> i64 {
    15
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            pre_reminder_minutes: default_pre_reminder_minutes(),
        }
    }
}

/// Fixed broadcast configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Daily verse broadcast clock time
    #[serde(default = "default_daily_hour")]
    pub daily_hour: u32,
    #[serde(default)]
    pub daily_minute: u32,
    /// Weekly broadcast weekday (full or short English name)
    #[serde(default = "default_weekly_weekday")]
    pub weekly_weekday: String,
    #[serde(default = "default_weekly_hour")]
    pub weekly_hour: u32,
    #[serde(default = "default_weekly_minute")]
    pub weekly_minute: u32,
}

fn default_daily_hour() -> u32 {
    9
}

fn default_weekly_weekday() -> String {
    "Friday".to_string()
}

fn default_weekly_hour() -> u32 {
    9
}

fn default_weekly_minute() -> u32 {
    30
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            daily_hour: default_daily_hour(),
            daily_minute: 0,
            weekly_weekday: default_weekly_weekday(),
            weekly_hour: default_weekly_hour(),
            weekly_minute: default_weekly_minute(),
        }
    }
}

impl BroadcastConfig {
    /// Parse the configured weekly broadcast weekday.
    pub fn weekday(&self) -> Result<Weekday, ConfigError> {
        self.weekly_weekday
            .parse()
            .map_err(|_| ConfigError::InvalidWeekday(self.weekly_weekday.clone()))
    }
}

/// Persisted state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the persisted state document
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("muezzin-state.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Outbound notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Webhook endpoint for outbound notifications; empty means log-only
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Remote content configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Random verse endpoint (Al-Quran Cloud format)
    #[serde(default = "default_verse_url")]
    pub verse_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_verse_url() -> String {
    "https://api.alquran.cloud/v1/ayah/random/ur.junagarhi".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            verse_url: default_verse_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Registry bootstrap configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// Entity ids registered at startup (normally groups register lazily
    /// through the message-ingestion hook)
    #[serde(default)]
    pub seed_entities: Vec<String>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    TickIntervalOutOfRange(u64),
    InvalidCoordinates(CoordinateError),
    UtcOffsetOutOfRange(i32),
    InvalidWeekday(String),
    InvalidClockTime(u32, u32),
    NonPositiveAsrFactor(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TickIntervalOutOfRange(secs) => {
                write!(f, "tick interval {} outside 1..=60 seconds", secs)
            }
            ConfigError::InvalidCoordinates(e) => write!(f, "invalid default coordinates: {}", e),
            ConfigError::UtcOffsetOutOfRange(minutes) => {
                write!(f, "utc offset {} minutes outside +/-14 hours", minutes)
            }
            ConfigError::InvalidWeekday(s) => write!(f, "unrecognized weekday '{}'", s),
            ConfigError::InvalidClockTime(h, m) => {
                write!(f, "invalid clock time {:02}:{:02}", h, m)
            }
            ConfigError::NonPositiveAsrFactor(v) => {
                write!(f, "asr shadow factor {} must be positive", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl MuezzinConfig {
    /// Validate cross-field constraints after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=60).contains(&self.scheduler.tick_interval_seconds) {
            return Err(ConfigError::TickIntervalOutOfRange(
                self.scheduler.tick_interval_seconds,
            ));
        }
        self.calculation
            .default_coordinates()
            .map_err(ConfigError::InvalidCoordinates)?;
        if self.calculation.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ConfigError::UtcOffsetOutOfRange(
                self.calculation.utc_offset_minutes,
            ));
        }
        if self.calculation.asr_shadow_factor <= 0.0 {
            return Err(ConfigError::NonPositiveAsrFactor(
                self.calculation.asr_shadow_factor,
            ));
        }
        self.broadcast.weekday()?;
        for (hour, minute) in [
            (self.broadcast.daily_hour, self.broadcast.daily_minute),
            (self.broadcast.weekly_hour, self.broadcast.weekly_minute),
        ] {
            if hour > 23 || minute > 59 {
                return Err(ConfigError::InvalidClockTime(hour, minute));
            }
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<MuezzinConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: MuezzinConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MuezzinConfig::default();
        assert_eq!(config.scheduler.tick_interval_seconds, 60);
        assert_eq!(config.scheduler.pre_reminder_minutes, 15);
        assert_eq!(config.calculation.method, CalculationMethod::MuslimWorldLeague);
        assert_eq!(config.calculation.utc_offset_minutes, 300);
        assert_eq!(config.broadcast.weekly_weekday, "Friday");
        assert_eq!(config.store.path, PathBuf::from("muezzin-state.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [calculation]
            method = "Karachi"
            asr_shadow_factor = 2.0
            default_latitude = 24.8607
            default_longitude = 67.0011
            utc_offset_minutes = 300

            [scheduler]
            tick_interval_seconds = 30
            pre_reminder_minutes = 10

            [broadcast]
            daily_hour = 8
            daily_minute = 15
            weekly_weekday = "Fri"
            weekly_hour = 10
            weekly_minute = 0

            [store]
            path = "/var/lib/muezzin/state.json"

            [notifier]
            webhook_url = "http://localhost:8080/notify"

            [registry]
            seed_entities = ["group-1", "group-2"]
        "#;

        let config: MuezzinConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.calculation.method, CalculationMethod::Karachi);
        assert_eq!(config.calculation.asr_shadow_factor, 2.0);
        assert_eq!(config.scheduler.tick_interval_seconds, 30);
        assert_eq!(config.broadcast.weekday().unwrap(), Weekday::Fri);
        assert_eq!(config.registry.seed_entities.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [scheduler]
            pre_reminder_minutes = 20
        "#;

        let config: MuezzinConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.scheduler.pre_reminder_minutes, 20);
        assert_eq!(config.scheduler.tick_interval_seconds, 60); // Default
        assert_eq!(config.calculation.utc_offset_minutes, 300); // Default
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = MuezzinConfig::default();
        config.scheduler.tick_interval_seconds = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::TickIntervalOutOfRange(0))
        );

        let mut config = MuezzinConfig::default();
        config.scheduler.tick_interval_seconds = 120;
        assert!(config.validate().is_err());

        let mut config = MuezzinConfig::default();
        config.calculation.default_latitude = 120.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCoordinates(_))
        ));

        let mut config = MuezzinConfig::default();
        config.calculation.utc_offset_minutes = 900;
        assert_eq!(config.validate(), Err(ConfigError::UtcOffsetOutOfRange(900)));

        let mut config = MuezzinConfig::default();
        config.broadcast.weekly_weekday = "Someday".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeekday(_))
        ));

        let mut config = MuezzinConfig::default();
        config.broadcast.daily_hour = 24;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidClockTime(24, 0))
        ));
    }

    #[test]
    fn weekday_accepts_short_and_full_names() {
        let mut broadcast = BroadcastConfig::default();
        for name in ["Fri", "Friday", "fri", "friday"] {
            broadcast.weekly_weekday = name.to_string();
            assert_eq!(broadcast.weekday().unwrap(), Weekday::Fri, "{}", name);
        }
    }
}
