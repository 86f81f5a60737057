//! Bucket name and key validation.
//!
//! Bucket names end up as path segments on the remote server, so they are
//! held to a stricter rule set than keys:
//! - Must be non-empty
//! - Must not contain whitespace, control characters, or `/`
//!
//! Keys are opaque to the repository and only need to be non-empty.

use crate::error::TypeError;

/// Validate a bucket name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use crepo_types::validate_bucket_name;
///
/// assert!(validate_bucket_name("corpus").is_ok());
/// assert!(validate_bucket_name("").is_err());
/// assert!(validate_bucket_name("a/b").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::InvalidBucketName {
            name: name.to_string(),
            reason: "bucket name must not be empty".into(),
        });
    }

    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == '/')
    {
        return Err(TypeError::InvalidBucketName {
            name: name.to_string(),
            reason: format!("contains forbidden character: {ch:?}"),
        });
    }

    Ok(())
}

/// Validate an object or collection key.
pub fn validate_key(key: &str) -> Result<(), TypeError> {
    if key.is_empty() {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty".into(),
        });
    }
    Ok(())
}
