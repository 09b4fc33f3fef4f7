//! Reconciliation steps.
//!
//! Each submodule adds one group of steps to
//! [`crate::reconciler::BucketReconciler`]. Steps map every failure to a
//! [`crate::error::ReconcileError`] tagged with the bucket, object, or prefix
//! they were working on.

pub mod access_policy;
pub mod delete;
pub mod encryption;
pub mod folder;
pub mod tagging;
pub mod tiering;
pub mod versioning;

/// Normalize a folder path into a key prefix ending with `/`.
///
/// Returns `None` for blank paths, which would otherwise address the whole
/// bucket.
///
/// # Examples
///
/// ```
/// use stowage_s3::ops::folder_prefix;
///
/// assert_eq!(folder_prefix("raw").as_deref(), Some("raw/"));
/// assert_eq!(folder_prefix("raw/").as_deref(), Some("raw/"));
/// assert_eq!(folder_prefix(" / "), None);
/// ```
#[must_use]
pub fn folder_prefix(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.chars().all(|c| c == '/') {
        return None;
    }
    if trimmed.ends_with('/') {
        Some(trimmed.to_owned())
    } else {
        Some(format!("{trimmed}/"))
    }
}
