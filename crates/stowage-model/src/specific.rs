//! Storage-specific desired state.
//!
//! [`StorageSpecific`] describes what the bucket should look like: region,
//! encryption mode, versioning and retention, intelligent tiering, and tags.
//! [`StorageSpecific::validate`] checks every field constraint at once and
//! reports all violations, not just the first.

use serde::{Deserialize, Serialize};

/// Minimum number of days a version must be noncurrent before expiring.
pub const MIN_NONCURRENT_DAYS: u32 = 1;

/// Bounds on the number of newer noncurrent versions to keep.
pub const VERSIONS_TO_RETAIN_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

/// Allowed window for the archive access tier, in days.
pub const ARCHIVE_ACCESS_DAYS_RANGE: std::ops::RangeInclusive<u32> = 90..=730;

/// Allowed window for the deep archive access tier, in days.
pub const DEEP_ARCHIVE_ACCESS_DAYS_RANGE: std::ops::RangeInclusive<u32> = 180..=730;

/// Server-side encryption mode requested for the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncryptionMode {
    /// S3-managed keys with the AES-256 algorithm.
    #[default]
    #[serde(rename = "AES256", alias = "default")]
    Default,
    /// A key created and owned by the key-management service.
    #[serde(rename = "aws:kms", alias = "kms")]
    ManagedKey,
}

/// A single bucket tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl BucketTag {
    /// Create a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Expiration policy for noncurrent object versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoncurrentRetention {
    /// Days a version stays noncurrent before it becomes eligible to expire.
    pub days_after_become_non_current: u32,
    /// Newer noncurrent versions always kept regardless of age.
    pub number_of_versions_to_retain: u32,
}

/// Lifecycle configuration of a versioned bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleConfiguration {
    /// Permanently delete noncurrent versions after a retention window.
    #[serde(default)]
    pub permanently_delete: Option<NoncurrentRetention>,
}

/// Intelligent-tiering archive configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligentTieringPolicy {
    /// Move objects to the archive access tier.
    #[serde(default)]
    pub archive_access_tier_enabled: bool,
    /// Days without access before archiving.
    #[serde(default)]
    pub archive_access_tier_days: u32,
    /// Move objects to the deep archive access tier.
    #[serde(default)]
    pub deep_archive_access_tier_enabled: bool,
    /// Days without access before deep archiving.
    #[serde(default)]
    pub deep_archive_access_tier_days: u32,
}

impl IntelligentTieringPolicy {
    /// Whether at least one archive tier is turned on.
    #[must_use]
    pub fn any_tier_enabled(&self) -> bool {
        self.archive_access_tier_enabled || self.deep_archive_access_tier_enabled
    }
}

/// Desired state of a storage area's bucket.
///
/// # Examples
///
/// ```
/// use stowage_model::{EncryptionMode, StorageSpecific};
///
/// let specific: StorageSpecific = serde_json::from_str(
///     r#"{"region": "eu-west-1", "serverSideEncryption": "aws:kms", "multipleVersion": true}"#,
/// )
/// .unwrap();
/// assert_eq!(specific.server_side_encryption, EncryptionMode::ManagedKey);
/// assert!(specific.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpecific {
    /// Region the bucket must live in.
    pub region: String,

    /// Encryption mode.
    #[serde(default)]
    pub server_side_encryption: EncryptionMode,

    /// Keep every version of every object.
    #[serde(default)]
    pub multiple_version: bool,

    /// Retention rule for noncurrent versions; only applied when versioning is on.
    #[serde(default, rename = "lifeCycleConfiguration")]
    pub lifecycle_configuration: Option<LifecycleConfiguration>,

    /// Intelligent-tiering archive configuration.
    #[serde(default)]
    pub intelligent_tiering_configuration: Option<IntelligentTieringPolicy>,

    /// Tags applied to the bucket and to any key created for it.
    #[serde(default)]
    pub bucket_tags: Vec<BucketTag>,
}

impl StorageSpecific {
    /// Create a specific for `region` with every optional feature off.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            server_side_encryption: EncryptionMode::Default,
            multiple_version: false,
            lifecycle_configuration: None,
            intelligent_tiering_configuration: None,
            bucket_tags: Vec::new(),
        }
    }

    /// The noncurrent-version retention rule, if one is configured.
    #[must_use]
    pub fn noncurrent_retention(&self) -> Option<NoncurrentRetention> {
        self.lifecycle_configuration
            .and_then(|lc| lc.permanently_delete)
    }

    /// Check every field constraint.
    ///
    /// # Errors
    ///
    /// Returns one human-readable message per violated constraint.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();

        if self.region.trim().is_empty() {
            violations.push("region must not be blank".to_owned());
        }

        if let Some(retention) = self.noncurrent_retention() {
            if retention.days_after_become_non_current < MIN_NONCURRENT_DAYS {
                violations.push("daysAfterBecomeNonCurrent must be greater than 0".to_owned());
            }
            if !VERSIONS_TO_RETAIN_RANGE.contains(&retention.number_of_versions_to_retain) {
                violations.push(format!(
                    "numberOfVersionsToRetain must be between {} and {}",
                    VERSIONS_TO_RETAIN_RANGE.start(),
                    VERSIONS_TO_RETAIN_RANGE.end()
                ));
            }
        }

        if let Some(tiering) = &self.intelligent_tiering_configuration {
            if tiering.archive_access_tier_enabled
                && !ARCHIVE_ACCESS_DAYS_RANGE.contains(&tiering.archive_access_tier_days)
            {
                violations.push(format!(
                    "archiveAccessTierDays must be between {} and {} when archiveAccessTierEnabled is true",
                    ARCHIVE_ACCESS_DAYS_RANGE.start(),
                    ARCHIVE_ACCESS_DAYS_RANGE.end()
                ));
            }
            if tiering.deep_archive_access_tier_enabled
                && !DEEP_ARCHIVE_ACCESS_DAYS_RANGE.contains(&tiering.deep_archive_access_tier_days)
            {
                violations.push(format!(
                    "deepArchiveAccessTierDays must be between {} and {} when deepArchiveAccessTierEnabled is true",
                    DEEP_ARCHIVE_ACCESS_DAYS_RANGE.start(),
                    DEEP_ARCHIVE_ACCESS_DAYS_RANGE.end()
                ));
            }
        }

        for (i, tag) in self.bucket_tags.iter().enumerate() {
            if tag.key.trim().is_empty() {
                violations.push(format!("bucketTags[{i}].key must not be blank"));
            }
            if tag.value.trim().is_empty() {
                violations.push(format!("bucketTags[{i}].value must not be blank"));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
