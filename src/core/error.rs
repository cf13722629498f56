//! Error handling for Cartwheel.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`CartwheelError`]) for precise handling in
//!    code; update failures must survive as values inside
//!    [`crate::updater::UpdateStatus`], so every failure mode has a variant.
//! 2. **User-friendly presentation** ([`ErrorContext`]) with actionable
//!    suggestions for CLI users.
//!
//! Standard library and TOML errors convert automatically via `#[from]`.
//! [`user_friendly_error`] turns any [`anyhow::Error`] reaching the binary's
//! top level into a colored, suggestion-bearing report.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Cartwheel operations.
///
/// Each variant represents a specific failure mode with enough context to
/// produce an actionable message. Errors from the external toolkit keep the
/// dependency and platform they concern so a failed update can be explained
/// per record.
#[derive(Error, Debug)]
pub enum CartwheelError {
    /// The external dependency toolkit executable is not installed or not in PATH.
    #[error("Dependency toolkit '{command}' is not installed or not found in PATH")]
    ToolkitNotFound {
        /// The executable name that was searched for
        command: String,
    },

    /// A toolkit process could not be spawned for an operation.
    #[error("Toolkit invocation failed: {operation}")]
    ToolkitCommandError {
        /// The toolkit operation that failed (e.g. "update", "build")
        operation: String,
        /// What went wrong launching the process
        stderr: String,
    },

    /// Dependency resolution (stage 1 of an update run) failed.
    #[error("Failed to resolve dependencies in {directory}")]
    ResolveFailed {
        /// The record directory the resolve ran against
        directory: String,
        /// The reason reported by the toolkit
        reason: String,
    },

    /// A single build job (stage 2 of an update run) failed.
    #[error("Failed to build '{dependency}' for {platform}")]
    BuildFailed {
        /// The dependency the job was building
        dependency: String,
        /// The target platform of the job
        platform: String,
        /// The reason reported by the toolkit
        reason: String,
    },

    /// The persisted roster file could not be parsed.
    #[error("Invalid roster file syntax in {file}")]
    RosterParseError {
        /// Path to the roster file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A blank manifest would overwrite an existing file.
    #[error("A manifest already exists at {path}")]
    ManifestExists {
        /// Path of the manifest file that already exists
        path: String,
    },

    /// A roster index supplied on the command line is out of range.
    #[error("Record index {index} is out of range (roster has {len} records)")]
    RecordOutOfRange {
        /// The offending index
        index: usize,
        /// Current roster length
        len: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// File system error.
    #[error("File system error: {operation}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the file system error occurred
        path: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Other error.
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Wrapper that adds user-friendly context to a [`CartwheelError`].
///
/// Suggestions are actionable steps rendered in green; details explain the
/// failure and are rendered in yellow. This is how the CLI presents every
/// terminal error.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying Cartwheel error
    pub error: CartwheelError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: CartwheelError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining why the error occurred.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with color coding.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`] with suggestions
/// for well-known failure modes.
///
/// Unrecognized errors fall through to a generic context that preserves the
/// full `anyhow` cause chain for diagnostics.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<CartwheelError>() {
        Ok(cartwheel_error) => return contextualize(cartwheel_error),
        Err(other) => other,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(CartwheelError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check file ownership or run with elevated permissions")
                .with_details(
                    "Cartwheel does not have permission to read or write the file",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(CartwheelError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(CartwheelError::RosterParseError {
            file: "roster.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion(
            "Delete the roster file and re-add your manifests, or fix the TOML syntax if you edited it by hand",
        );
    }

    // Generic error - include the full cause chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(CartwheelError::Other { message })
}

/// Attach suggestions to the `CartwheelError` variants a user can act on.
fn contextualize(error: CartwheelError) -> ErrorContext {
    match &error {
        CartwheelError::ToolkitNotFound { command } => {
            let suggestion = format!(
                "Install '{command}' and make sure it is in your PATH, or point the \
                 'toolkit.command' setting at the executable"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        CartwheelError::ManifestExists { .. } => ErrorContext::new(error)
            .with_suggestion("Add the existing manifest to the roster instead of creating a new one"),
        CartwheelError::RecordOutOfRange { len, .. } => {
            let details = format!("Valid indices are 0..{len}; run 'cartwheel list' to see them");
            ErrorContext::new(error).with_details(details)
        }
        CartwheelError::RosterParseError { .. } => ErrorContext::new(error).with_suggestion(
            "Delete the roster file and re-add your manifests, or fix the TOML syntax if you edited it by hand",
        ),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = CartwheelError::BuildFailed {
            dependency: "Alamofire".to_string(),
            platform: "desktop".to_string(),
            reason: "exit status 1".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to build 'Alamofire' for desktop");

        let err = CartwheelError::RecordOutOfRange { index: 7, len: 3 };
        assert!(err.to_string().contains("index 7"));
    }

    #[test]
    fn test_user_friendly_error_attaches_suggestion() {
        let err = anyhow::Error::new(CartwheelError::ToolkitNotFound {
            command: "carthage".to_string(),
        });
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.unwrap().contains("carthage"));
    }

    #[test]
    fn test_user_friendly_error_preserves_chain() {
        use anyhow::Context;

        let err: anyhow::Error = Err::<(), _>(anyhow::anyhow!("root cause"))
            .context("outer context")
            .unwrap_err();
        let ctx = user_friendly_error(err);
        let rendered = ctx.error.to_string();
        assert!(rendered.contains("outer context"));
        assert!(rendered.contains("root cause"));
    }
}
