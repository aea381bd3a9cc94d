//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors raised while reading or checking an `overdrive.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    IoError {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML or does not match the expected tables.
    #[error("failed to parse {origin}: {message}")]
    ParseError {
        /// Where the text came from (a file path, or `<inline>`).
        origin: String,
        /// Parser message, including the offending location.
        message: String,
    },

    /// A setting parsed but is out of range.
    #[error("invalid `{field}`: {reason}")]
    ValidationError {
        /// Dotted name of the setting.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_origin() {
        let err = ConfigError::ParseError {
            origin: "tb/overdrive.toml".into(),
            message: "expected '=' at line 2".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse tb/overdrive.toml: expected '=' at line 2"
        );
    }

    #[test]
    fn validation_error_names_field() {
        let err = ConfigError::ValidationError {
            field: "simulation.max_deltas",
            reason: "must be at least 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid `simulation.max_deltas`: must be at least 1"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error;
        let err = ConfigError::IoError {
            path: PathBuf::from("tb/overdrive.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("failed to read tb/overdrive.toml"));
        assert!(err.source().is_some());
    }
}
