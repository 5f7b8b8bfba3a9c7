//! Identifier checks applied before any `git` invocation.

use repolens_core::LensError;

/// Check that `hash` is a non-empty, purely alphanumeric object id.
///
/// # Errors
///
/// Returns [`LensError::InvalidHash`] with reason `"Hash is zero length"` or
/// `"Hash is not alphanumeric"`.
///
/// # Examples
///
/// ```
/// use repolens_git::ensure_valid_hash;
///
/// assert!(ensure_valid_hash("b1bcad6cc5be9a89df080a810a03c81970ddcfb5").is_ok());
/// assert!(ensure_valid_hash("b1bcad6-03c8").is_err());
/// assert!(ensure_valid_hash("").is_err());
/// ```
pub fn ensure_valid_hash(hash: &str) -> Result<(), LensError> {
    if hash.is_empty() {
        return Err(LensError::InvalidHash {
            value: hash.to_string(),
            reason: "Hash is zero length",
        });
    }
    if !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LensError::InvalidHash {
            value: hash.to_string(),
            reason: "Hash is not alphanumeric",
        });
    }
    Ok(())
}

/// Check a ref-like revision (`main`, `feature/x`, `HEAD~2`, a hash).
///
/// Refs are passed as discrete arguments, so only values git could mistake
/// for an option, or that contain control characters, are refused.
///
/// # Errors
///
/// Returns [`LensError::Validation`] for an empty value, a leading `-`, or a
/// control character.
///
/// # Examples
///
/// ```
/// use repolens_git::ensure_valid_ref;
///
/// assert!(ensure_valid_ref("feature/branch-1").is_ok());
/// assert!(ensure_valid_ref("--output=/tmp/x").is_err());
/// ```
pub fn ensure_valid_ref(rev: &str) -> Result<(), LensError> {
    if rev.is_empty() {
        return Err(LensError::Validation("revision is empty".into()));
    }
    if rev.starts_with('-') {
        return Err(LensError::Validation(format!(
            "revision '{rev}' looks like an option"
        )));
    }
    if rev.chars().any(char::is_control) {
        return Err(LensError::Validation(format!(
            "revision {rev:?} contains control characters"
        )));
    }
    Ok(())
}
