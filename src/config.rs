//! TOML-based heater configuration and per-tick reload provider.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level heater configuration parsed from TOML.
///
/// All fields have defaults so a partial file is accepted. The file is
/// re-read every control tick through a [`ConfigProvider`], so parameters
/// can be changed while the controller is running.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaterConfig {
    /// Temperature-to-target charge curve parameters.
    pub charge_curve: ChargeCurveConfig,
    /// Night-tariff window parameters.
    pub tariff: TariffConfig,
    /// Weather forecast parameters.
    pub forecast: ForecastConfig,
    /// GPIO pin and PWM channel assignment.
    pub gpio: GpioConfig,
    /// Optional telemetry publishing endpoint.
    pub telemetry: TelemetryConfig,
    /// Control loop timing.
    pub run: RunConfig,
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            charge_curve: ChargeCurveConfig::default(),
            tariff: TariffConfig::default(),
            forecast: ForecastConfig::default(),
            gpio: GpioConfig::default(),
            telemetry: TelemetryConfig::default(),
            run: RunConfig::default(),
        }
    }
}

/// Temperature-to-target charge curve parameters.
///
/// Full charge below `e1` °C, no charge above `e2` °C, linear in between
/// down to the `e15` % base level at `e2`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChargeCurveConfig {
    /// Full-charge boundary temperature (°C).
    pub e1: f64,
    /// No-charge boundary temperature (°C).
    pub e2: f64,
    /// Base charge level at the `e2` boundary (%).
    pub e15: f64,
}

impl Default for ChargeCurveConfig {
    fn default() -> Self {
        Self {
            e1: 5.0,
            e2: 15.0,
            e15: 20.0,
        }
    }
}

/// Night-tariff window parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Nominal length of the night-tariff window in seconds.
    pub night_duration_secs: u32,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            // 8 hours
            night_duration_secs: 28_800,
        }
    }
}

/// Weather forecast parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// OpenWeatherMap city id used as the forecast location.
    pub location_id: u64,
    /// Sun-correction weight `ZK`: degrees added per 100 % sunshine.
    pub sun_weight_zk: f64,
    /// API key; if empty, the `OWM_API_KEY` environment variable is used.
    pub api_key: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            location_id: 0,
            sun_weight_zk: 3.0,
            api_key: String::new(),
        }
    }
}

/// GPIO pin and PWM channel assignment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpioConfig {
    /// Input pin carrying the night-tariff signal (active low).
    pub tariff_pin: u64,
    /// Input pin carrying the charge-enable signal (active low).
    pub enable_pin: u64,
    /// Sysfs PWM chip index for the duty output.
    pub pwm_chip: u32,
    /// Sysfs PWM channel index on that chip.
    pub pwm_channel: u32,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            tariff_pin: 23,
            enable_pin: 7,
            pwm_chip: 0,
            pwm_channel: 0,
        }
    }
}

/// Optional telemetry publishing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// POST endpoint for `(tariff, setpoint)` pairs; `None` disables publishing.
    pub url: Option<String>,
}

/// Control loop timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Seconds between control ticks in production mode.
    pub tick_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { tick_secs: 60 }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"charge_curve.e1"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl HeaterConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid. The
    /// `e1 < e2` invariant guards the division in the target interpolation.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let c = &self.charge_curve;
        if c.e1 >= c.e2 {
            errors.push(ConfigError {
                field: "charge_curve.e1".into(),
                message: format!("must be < charge_curve.e2 (got e1={}, e2={})", c.e1, c.e2),
            });
        }
        if !(0.0..=100.0).contains(&c.e15) {
            errors.push(ConfigError {
                field: "charge_curve.e15".into(),
                message: "must be in [0, 100]".into(),
            });
        }

        if self.tariff.night_duration_secs == 0 {
            errors.push(ConfigError {
                field: "tariff.night_duration_secs".into(),
                message: "must be > 0".into(),
            });
        }

        if self.forecast.sun_weight_zk < 0.0 {
            errors.push(ConfigError {
                field: "forecast.sun_weight_zk".into(),
                message: "must be >= 0".into(),
            });
        }

        if self.run.tick_secs == 0 {
            errors.push(ConfigError {
                field: "run.tick_secs".into(),
                message: "must be > 0".into(),
            });
        }

        if self.gpio.tariff_pin == self.gpio.enable_pin {
            errors.push(ConfigError {
                field: "gpio.tariff_pin".into(),
                message: "must differ from gpio.enable_pin".into(),
            });
        }

        errors
    }
}

/// Source of the current configuration, consulted once per tick.
///
/// Decouples the control loop from file I/O so tests can supply a fixed
/// configuration and production can re-read the TOML file while running.
pub trait ConfigProvider {
    /// Returns the current configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration cannot be produced; the
    /// control loop then keeps the previous good configuration.
    fn load(&self) -> Result<HeaterConfig, ConfigError>;
}

/// File-backed provider that re-reads the TOML file on every call.
pub struct FileConfig {
    path: PathBuf,
}

impl FileConfig {
    /// Creates a provider reading from the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigProvider for FileConfig {
    fn load(&self) -> Result<HeaterConfig, ConfigError> {
        HeaterConfig::from_toml_file(&self.path)
    }
}

/// Provider returning a fixed in-memory configuration (simulation, tests).
pub struct StaticConfig(pub HeaterConfig);

impl ConfigProvider for StaticConfig {
    fn load(&self) -> Result<HeaterConfig, ConfigError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = HeaterConfig::default();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "default should be valid: {errors:?}");
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[charge_curve]
e1 = 3.0
e2 = 17.0
e15 = 25.0

[tariff]
night_duration_secs = 25200

[forecast]
location_id = 2759794
sun_weight_zk = 2.5

[gpio]
tariff_pin = 23
enable_pin = 7
pwm_chip = 0
pwm_channel = 0

[telemetry]
url = "http://192.168.2.10:8080/heating"

[run]
tick_secs = 30
"#;
        let cfg = HeaterConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.charge_curve.e2), Some(17.0));
        assert_eq!(cfg.as_ref().map(|c| c.tariff.night_duration_secs), Some(25_200));
        assert_eq!(cfg.as_ref().map(|c| c.run.tick_secs), Some(30));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[charge_curve]
e1 = 2.0
"#;
        let cfg = HeaterConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.charge_curve.e1), Some(2.0));
        // e2 and the tariff section keep their defaults
        assert_eq!(cfg.as_ref().map(|c| c.charge_curve.e2), Some(15.0));
        assert_eq!(cfg.as_ref().map(|c| c.tariff.night_duration_secs), Some(28_800));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[charge_curve]
e1 = 5.0
bogus_field = true
"#;
        let result = HeaterConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validation_catches_inverted_curve_bounds() {
        let mut cfg = HeaterConfig::default();
        cfg.charge_curve.e1 = 15.0;
        cfg.charge_curve.e2 = 5.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "charge_curve.e1"));
    }

    #[test]
    fn validation_catches_equal_curve_bounds() {
        let mut cfg = HeaterConfig::default();
        cfg.charge_curve.e1 = 10.0;
        cfg.charge_curve.e2 = 10.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "charge_curve.e1"));
    }

    #[test]
    fn validation_catches_zero_night_duration() {
        let mut cfg = HeaterConfig::default();
        cfg.tariff.night_duration_secs = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "tariff.night_duration_secs"));
    }

    #[test]
    fn validation_catches_zero_tick_interval() {
        let mut cfg = HeaterConfig::default();
        cfg.run.tick_secs = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "run.tick_secs"));
    }

    #[test]
    fn validation_catches_pin_clash() {
        let mut cfg = HeaterConfig::default();
        cfg.gpio.enable_pin = cfg.gpio.tariff_pin;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "gpio.tariff_pin"));
    }

    #[test]
    fn static_provider_round_trips() {
        let mut cfg = HeaterConfig::default();
        cfg.charge_curve.e15 = 33.0;
        let provider = StaticConfig(cfg);
        let loaded = provider.load().expect("static load cannot fail");
        assert_eq!(loaded.charge_curve.e15, 33.0);
    }
}
