//! Deterministic bucket naming.
//!
//! A bucket name is derived from `{domain}-{product}-{environment}`:
//!
//! 1. join the parts with `-`, strip every whitespace character, lowercase;
//! 2. hash the full normalized string with SHA-256 (lowercase hex);
//! 3. keep at most [`STEM_MAX_LEN`] characters of the normalized string;
//! 4. append the first [`HASH_SUFFIX_LEN`] hex characters of the digest,
//!    with no separator.
//!
//! The algorithm is a compatibility contract: existing buckets are found
//! again only if it never changes.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stowage_model::DataProduct;

/// Maximum bucket name length.
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Minimum bucket name length.
pub const MIN_BUCKET_NAME_LEN: usize = 3;

/// Longest normalized stem kept before the hash suffix.
pub const STEM_MAX_LEN: usize = 58;

/// Number of hex digest characters appended to the stem.
pub const HASH_SUFFIX_LEN: usize = 5;

/// A derived bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketName(String);

impl BucketName {
    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A derived name that S3 would reject.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid bucket name '{name}': {reason}")]
pub struct InvalidBucketName {
    /// The offending name.
    pub name: String,
    /// Which rule it breaks.
    pub reason: String,
}

/// Derive a bucket name from ordered logical parts.
///
/// # Examples
///
/// ```
/// use stowage_s3::naming::derive_bucket_name;
///
/// let name = derive_bucket_name(&["finance", "cashflow", "dev"]);
/// assert_eq!(name.as_str(), "finance-cashflow-devf44c1");
/// ```
#[must_use]
pub fn derive_bucket_name<S: AsRef<str>>(parts: &[S]) -> BucketName {
    let joined = parts.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("-");
    let normalized: String = joined
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
    let stem: String = normalized.chars().take(STEM_MAX_LEN).collect();

    BucketName(format!("{stem}{}", &digest[..HASH_SUFFIX_LEN]))
}

/// Bucket shared by every storage area of a data product.
#[must_use]
pub fn data_product_bucket_name(data_product: &DataProduct) -> BucketName {
    derive_bucket_name(&[
        data_product.domain.as_str(),
        data_product.name.as_str(),
        data_product.environment.as_str(),
    ])
}

/// Check a name against the S3 bucket naming rules.
///
/// # Errors
///
/// Returns [`InvalidBucketName`] naming the first rule violated.
pub fn validate_bucket_name(name: &str) -> Result<(), InvalidBucketName> {
    let reject = |reason: &str| {
        Err(InvalidBucketName {
            name: name.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()) {
        return reject(&format!(
            "must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
        ));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return reject("must only contain lowercase letters, numbers, hyphens, and dots");
    }

    let bytes = name.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !edge_ok(bytes[0]) || !edge_ok(bytes[bytes.len() - 1]) {
        return reject("must start and end with a letter or number");
    }

    if name.contains("..") {
        return reject("must not contain consecutive dots");
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return reject("must not be formatted as an IP address");
    }
    if name.starts_with("xn--") || name.starts_with("sthree-") {
        return reject("must not start with a reserved prefix");
    }
    if name.ends_with("-s3alias") || name.ends_with("--ol-s3") {
        return reject("must not end with a reserved suffix");
    }

    Ok(())
}
