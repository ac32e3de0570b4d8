//! Pass configuration: which property to apply and whether to re-verify.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names the property to activate.
pub const PROPERTY_ENV: &str = "GRAFT_SUBGRAPH_PROPERTY";
/// Optional boolean; turns on post-pass invariant checking.
pub const VERIFY_ENV: &str = "GRAFT_VERIFY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    MissingVariable(&'static str),
    #[error("Property name must not be empty")]
    EmptyProperty,
    #[error("Invalid value '{value}' for {var}")]
    InvalidValue { var: &'static str, value: String },
    #[error("Malformed pass configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    /// Registry name of the property to apply.
    pub property: String,
    /// Re-validate the graph after the pass and roll back on failure.
    #[serde(default)]
    pub verify: bool,
}

impl PassConfig {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into(), verify: false }
    }

    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.checked()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let property = lookup(PROPERTY_ENV).ok_or(ConfigError::MissingVariable(PROPERTY_ENV))?;
        let verify = match lookup(VERIFY_ENV) {
            Some(raw) => parse_flag(VERIFY_ENV, &raw)?,
            None => false,
        };
        Self { property: property.trim().to_string(), verify }.checked()
    }

    fn checked(self) -> Result<Self, ConfigError> {
        if self.property.trim().is_empty() {
            return Err(ConfigError::EmptyProperty);
        }
        Ok(self)
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value: raw.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[rstest]
    #[case("1", true)]
    #[case("TRUE", true)]
    #[case("on", true)]
    #[case("0", false)]
    #[case("no", false)]
    #[case("", false)]
    fn test_verify_flag_parsing(#[case] raw: &str, #[case] expected: bool) {
        let config = PassConfig::from_lookup(env(&[(PROPERTY_ENV, "fuse"), (VERIFY_ENV, raw)])).unwrap();
        assert_eq!(config.verify, expected);
    }

    #[test]
    fn test_from_lookup_requires_property() {
        let err = PassConfig::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(PROPERTY_ENV)));

        let err = PassConfig::from_lookup(env(&[(PROPERTY_ENV, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyProperty));
    }

    #[test]
    fn test_invalid_flag_is_reported() {
        let err = PassConfig::from_lookup(env(&[(PROPERTY_ENV, "fuse"), (VERIFY_ENV, "maybe")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value 'maybe' for GRAFT_VERIFY");
    }

    #[test]
    fn test_from_json_defaults_verify() {
        let config = PassConfig::from_json(r#"{"property": "conv_relu"}"#).unwrap();
        assert_eq!(config, PassConfig::new("conv_relu"));

        assert!(matches!(PassConfig::from_json(r#"{"verify": true}"#), Err(ConfigError::Json(_))));
    }
}
