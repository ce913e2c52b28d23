use std::{fs, str::FromStr, time::Duration};

use log::{debug, trace, LevelFilter};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use validator::{Validate, ValidationError};

use crate::{
    config_error,
    core::{error::ErrorContext, DispatchResult},
};

pub const CONFIG_PATH_ENV: &str = "CFN_DISPATCH_CONFIG";
pub const SAFETY_MARGIN_ENV: &str = "CFN_DISPATCH_SAFETY_MARGIN_MS";

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct DispatcherConfig {
    /// Subtracted from the remaining budget when arming the deadline guard
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(
        rename = "safety_margin_ms",
        default = "DispatcherConfig::default_safety_margin"
    )]
    pub safety_margin: Duration,

    /// Upper bound for one callback PUT
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(
        rename = "callback_timeout_ms",
        default = "DispatcherConfig::default_callback_timeout"
    )]
    #[validate(custom(function = "validate_non_zero"))]
    pub callback_timeout: Duration,

    #[validate(nested)]
    #[serde(default)]
    pub log: Log,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            safety_margin: Self::default_safety_margin(),
            callback_timeout: Self::default_callback_timeout(),
            log: Log::default(),
        }
    }
}

// Config file load and validation
impl DispatcherConfig {
    fn default_safety_margin() -> Duration {
        Duration::from_millis(500)
    }

    fn default_callback_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub fn load_from_yaml<P>(path: P) -> DispatchResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .with_context(&format!("Unable to read conf file from {path}"))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> DispatchResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: DispatcherConfig =
            serde_yaml::from_str(conf_str).with_context("Unable to parse yaml conf")?;

        trace!("Loaded conf: {conf:?}");

        conf.validate().with_context("Conf file valid failed")?;

        Ok(conf)
    }

    /// Config entry point: optional file named by `CFN_DISPATCH_CONFIG`,
    /// then environment overrides
    pub fn from_env() -> DispatchResult<Self> {
        let mut conf = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from_yaml(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(margin) = std::env::var(SAFETY_MARGIN_ENV) {
            conf.merge_safety_margin(&margin)?;
        }

        conf.validate().with_context("Conf valid failed")?;
        Ok(conf)
    }

    fn merge_safety_margin(&mut self, value: &str) -> DispatchResult<()> {
        let millis: u64 = value
            .trim()
            .parse()
            .map_err(|e| config_error!("Invalid {} '{}': {}", SAFETY_MARGIN_ENV, value, e))?;
        self.safety_margin = Duration::from_millis(millis);
        Ok(())
    }

    pub fn to_yaml(&self) -> DispatchResult<String> {
        serde_yaml::to_string(self).with_context("Unable to serialize conf")
    }
}

fn validate_non_zero(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        Err(ValidationError::new("duration_must_be_positive"))
    } else {
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Log {
    #[validate(custom(function = "Log::validate_level"))]
    #[serde(default = "Log::default_level")]
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }

    fn validate_level(level: &str) -> Result<(), ValidationError> {
        LevelFilter::from_str(level)
            .map(|_| ())
            .map_err(|_| ValidationError::new("invalid_log_level"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let conf = DispatcherConfig::from_yaml("{}").unwrap();
        assert_eq!(conf.safety_margin, Duration::from_millis(500));
        assert_eq!(conf.callback_timeout, Duration::from_secs(30));
        assert_eq!(conf.log.level, "info");
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
safety_margin_ms: 1500
callback_timeout_ms: 2000
log:
  level: debug
        "#;

        let conf = DispatcherConfig::from_yaml(yaml).unwrap();
        assert_eq!(conf.safety_margin, Duration::from_millis(1500));
        assert_eq!(conf.callback_timeout, Duration::from_secs(2));
        assert_eq!(conf.log.level, "debug");
    }

    #[test]
    fn test_zero_callback_timeout_is_rejected() {
        let err = DispatcherConfig::from_yaml("callback_timeout_ms: 0").unwrap_err();
        assert!(err.to_string().contains("Conf file valid failed"));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let yaml = r#"
log:
  level: loud
        "#;
        assert!(DispatcherConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        let err = DispatcherConfig::from_yaml("safety_margin_ms: [").unwrap_err();
        assert!(err.to_string().contains("Unable to parse yaml conf"));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let path = std::env::temp_dir().join(format!("cfn-dispatch-{}.yaml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "safety_margin_ms: 250").unwrap();

        let conf = DispatcherConfig::load_from_yaml(path.display().to_string()).unwrap();
        assert_eq!(conf.safety_margin, Duration::from_millis(250));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_safety_margin_override() {
        let mut conf = DispatcherConfig::default();
        conf.merge_safety_margin("750").unwrap();
        assert_eq!(conf.safety_margin, Duration::from_millis(750));

        assert!(conf.merge_safety_margin("soon").is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let conf = DispatcherConfig::default();
        let yaml = conf.to_yaml().unwrap();
        assert!(yaml.contains("safety_margin_ms: 500"));
    }
}
