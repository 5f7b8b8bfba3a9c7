use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LensError;

/// Top-level configuration loaded from `.repolens.toml`.
///
/// Every section is optional; missing keys fall back to defaults.
///
/// # Examples
///
/// ```
/// use repolens_core::LensConfig;
///
/// let config = LensConfig::default();
/// assert_eq!(config.git.binary, "git");
/// assert_eq!(config.metadata.open_delimiter, "{@{");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LensConfig {
    /// Git executable settings.
    #[serde(default)]
    pub git: GitConfig,
    /// Subversion executable settings.
    #[serde(default)]
    pub svn: SvnConfig,
    /// Process execution limits.
    #[serde(default)]
    pub exec: ExecConfig,
    /// Sentinel tokens used by the Git metadata codec.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl LensConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Io`] if the file cannot be read, or
    /// [`LensError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use repolens_core::LensConfig;
    /// use std::path::Path;
    ///
    /// let config = LensConfig::from_file(Path::new(".repolens.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LensError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Toml`] if parsing fails, or
    /// [`LensError::Config`] if the metadata delimiters are unusable.
    ///
    /// # Examples
    ///
    /// ```
    /// use repolens_core::LensConfig;
    ///
    /// let toml = r#"
    /// [exec]
    /// timeout_secs = 10
    /// "#;
    /// let config = LensConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.exec.timeout_secs, 10);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LensError> {
        let config: Self = toml::from_str(content)?;
        config.metadata.validate()?;
        Ok(config)
    }
}

/// Git executable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Path or name of the `git` executable.
    #[serde(default = "default_git_binary")]
    pub binary: String,
}

fn default_git_binary() -> String {
    "git".into()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
        }
    }
}

/// Subversion executable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvnConfig {
    /// Path or name of the `svn` client.
    #[serde(default = "default_svn_binary")]
    pub binary: String,
    /// Path or name of `svnadmin`, used only to create repositories.
    #[serde(default = "default_svnadmin_binary")]
    pub admin_binary: String,
}

fn default_svn_binary() -> String {
    "svn".into()
}

fn default_svnadmin_binary() -> String {
    "svnadmin".into()
}

impl Default for SvnConfig {
    fn default() -> Self {
        Self {
            binary: default_svn_binary(),
            admin_binary: default_svnadmin_binary(),
        }
    }
}

/// Limits applied to every external process.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use repolens_core::ExecConfig;
///
/// let config = ExecConfig::default();
/// assert_eq!(config.timeout(), Some(Duration::from_secs(60)));
///
/// let unbounded = ExecConfig { timeout_secs: 0 };
/// assert_eq!(unbounded.timeout(), None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Seconds before a tool invocation is killed (default: 60, 0 = never).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ExecConfig {
    /// The timeout as a [`Duration`], or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Sentinel tokens bounding each field in Git's combined metadata output.
///
/// A commit message that contains the closing token followed by the opening
/// token can confuse the single-pass extraction. That case is detected and
/// handled by the per-field fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Token written before each field value (default: `{@{`).
    #[serde(default = "default_open_delimiter")]
    pub open_delimiter: String,
    /// Token written after each field value (default: `}@}`).
    #[serde(default = "default_close_delimiter")]
    pub close_delimiter: String,
}

fn default_open_delimiter() -> String {
    "{@{".into()
}

fn default_close_delimiter() -> String {
    "}@}".into()
}

impl MetadataConfig {
    fn validate(&self) -> Result<(), LensError> {
        if self.open_delimiter.is_empty() || self.close_delimiter.is_empty() {
            return Err(LensError::Config(
                "metadata delimiters must not be empty".into(),
            ));
        }
        // `%` would be read by git as the start of a placeholder.
        if self.open_delimiter.contains('%') || self.close_delimiter.contains('%') {
            return Err(LensError::Config(
                "metadata delimiters must not contain '%'".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            open_delimiter: default_open_delimiter(),
            close_delimiter: default_close_delimiter(),
        }
    }
}
