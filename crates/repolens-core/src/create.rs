use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::LensError;
use crate::process::ToolRunner;

fn mode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[0-9]+|[ugoa]+[+=-][rwxX]+)$").expect("mode pattern is valid")
    })
}

/// The permission mode to apply to a new repository, or `None` when `mode`
/// is absent or not a chmod-style mode (`0750`, `g+rwX`).
///
/// # Examples
///
/// ```
/// use repolens_core::valid_mode;
///
/// assert_eq!(valid_mode(Some("0750")), Some("0750"));
/// assert_eq!(valid_mode(Some("g+rwX")), Some("g+rwX"));
/// assert_eq!(valid_mode(Some("750; rm -rf /")), None);
/// assert_eq!(valid_mode(None), None);
/// ```
pub fn valid_mode(mode: Option<&str>) -> Option<&str> {
    mode.filter(|m| mode_pattern().is_match(m))
}

/// Recursively apply `mode` to `base` with `chmod -R`.
///
/// Invalid modes are ignored with a warning, matching how repository
/// creation treats them.
///
/// # Errors
///
/// Returns [`LensError::Command`] if `chmod` fails.
pub fn apply_mode(base: &Path, mode: Option<&str>, timeout: Option<Duration>) -> Result<(), LensError> {
    let Some(requested) = mode else {
        return Ok(());
    };
    let Some(mode) = valid_mode(Some(requested)) else {
        warn!(mode = requested, "ignoring invalid permission mode");
        return Ok(());
    };
    debug!(mode, base = %base.display(), "applying permission mode");
    let chmod = ToolRunner::new("chmod").with_timeout(timeout);
    chmod.run_checked(&[OsStr::new("-R"), OsStr::new(mode), base.as_os_str()])?;
    Ok(())
}
