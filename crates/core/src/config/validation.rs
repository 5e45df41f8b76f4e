use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Environment variable error: {message}")]
    EnvironmentError { message: String },

    #[error("File system error: {message}")]
    FileSystemError { message: String },

    #[error("Parsing error in {file}: {message}")]
    ParsingError { file: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a parsing error tied to the file that failed
    pub fn parsing(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParsingError {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create an environment error
    pub fn environment_error(message: impl Into<String>) -> Self {
        Self::EnvironmentError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ConfigError::missing_required("database.default", "Set the default connection name");
        assert_eq!(
            err.to_string(),
            "Missing required field: database.default. Set the default connection name"
        );

        let err = ConfigError::invalid_value("environment", "qa", "development, testing, or production");
        assert!(err.to_string().contains("'qa'"));

        let err = ConfigError::parsing("config/database.yaml", "expected a mapping");
        assert_eq!(
            err.to_string(),
            "Parsing error in config/database.yaml: expected a mapping"
        );
    }
}
