use std::process::ExitStatus;

/// Errors that can occur while querying a repository.
///
/// Library crates use this type directly; the binary crate converts to a
/// `miette` report at the boundary. "Not found" conditions are not errors:
/// backends return `Ok(None)` for paths or revisions that do not resolve.
///
/// # Examples
///
/// ```
/// use repolens_core::LensError;
///
/// let err = LensError::Validation("revision must be HEAD or a number".into());
/// assert!(err.to_string().contains("HEAD or a number"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LensError {
    /// Filesystem or process-spawn failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or unsafe identifier or argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// A content hash failed validation before reaching the tool.
    #[error("invalid hash '{value}': {reason}")]
    InvalidHash {
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An operation was invoked before `open` succeeded.
    #[error("repository is not open")]
    NotOpen,

    /// The external tool exited with a non-zero status.
    #[error("`{program} {}` failed ({status}): {stderr}", .args.join(" "))]
    Command {
        /// Executable that was run.
        program: String,
        /// Arguments it was given.
        args: Vec<String>,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The external tool did not finish within the configured timeout.
    #[error("`{program}` timed out after {seconds}s")]
    Timeout {
        /// Executable that was run.
        program: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Tool output (diff text, XML, listings) could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// The repository type tag is not one of the supported backends.
    #[error("unknown repository type: {0}")]
    UnknownRepoType(String),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LensError {
    /// Whether this is a non-zero exit of the external tool whose stderr
    /// contains `needle`.
    pub fn is_command_failure_containing(&self, needle: &str) -> bool {
        matches!(self, LensError::Command { stderr, .. } if stderr.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LensError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn invalid_hash_names_value_and_reason() {
        let err = LensError::InvalidHash {
            value: "abc-123".into(),
            reason: "Hash is not alphanumeric",
        };
        let msg = err.to_string();
        assert!(msg.contains("abc-123"));
        assert!(msg.contains("Hash is not alphanumeric"));
    }

    #[test]
    fn not_open_displays_message() {
        assert_eq!(LensError::NotOpen.to_string(), "repository is not open");
    }

    #[test]
    fn timeout_shows_program() {
        let err = LensError::Timeout {
            program: "svn".into(),
            seconds: 5,
        };
        assert_eq!(err.to_string(), "`svn` timed out after 5s");
    }
}
