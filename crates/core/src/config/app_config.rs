use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Environment variable selecting the configuration overlay.
pub const ENVIRONMENT_VAR: &str = "STRATA_ENV";

/// Environment enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                expected: "development, testing, or production".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Environment {
    /// Read the environment from `STRATA_ENV`, defaulting to development
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse(),
            Err(env::VarError::NotPresent) => Ok(Environment::Development),
            Err(e) => Err(ConfigError::environment_error(format!(
                "{}: {}",
                ENVIRONMENT_VAR, e
            ))),
        }
    }

    /// Name of the overlay directory for this environment
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        }
    }

    /// Check if environment is production
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Testing);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::remove_var(ENVIRONMENT_VAR);
        assert_eq!(Environment::from_env().unwrap(), Environment::Development);

        env::set_var(ENVIRONMENT_VAR, "production");
        let environment = Environment::from_env().unwrap();
        assert!(environment.is_production());
        assert_eq!(environment.to_string(), "production");

        env::set_var(ENVIRONMENT_VAR, "nowhere");
        assert!(Environment::from_env().is_err());
        env::remove_var(ENVIRONMENT_VAR);
    }
}
