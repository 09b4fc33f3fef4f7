//! Reconciler configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use typed_builder::TypedBuilder;

use crate::waiter::WaitPolicy;

/// Default prefix of the per-bucket key alias.
pub const DEFAULT_KMS_ALIAS_PREFIX: &str = "alias/stowage";

const ALIAS_DIGEST_LEN: usize = 8;

/// Configuration of the reconciliation engine.
///
/// # Examples
///
/// ```
/// use stowage_s3::ReconcilerConfig;
///
/// let config = ReconcilerConfig::builder().bucket_wait_timeout_seconds(5).build();
/// assert_eq!(config.bucket_wait().timeout.as_secs(), 5);
/// assert_eq!(config.key_alias("b1"), "alias/stowage/b1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilerConfig {
    /// Window for a created bucket to become visible.
    #[builder(default = 60)]
    pub bucket_wait_timeout_seconds: u64,

    /// Window for a created folder marker to become visible.
    #[builder(default = 20)]
    pub object_wait_timeout_seconds: u64,

    /// Delay between existence checks.
    #[builder(default = 5000)]
    pub wait_poll_interval_ms: u64,

    /// Bucket policy template overriding the bundled one.
    #[builder(default)]
    pub bucket_policy_path: Option<PathBuf>,

    /// Key policy template overriding the bundled one.
    #[builder(default)]
    pub kms_policy_path: Option<PathBuf>,

    /// Prefix of the deterministic alias `{prefix}/{bucket}` given to each key.
    #[builder(default = String::from(DEFAULT_KMS_ALIAS_PREFIX))]
    pub kms_alias_prefix: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            bucket_wait_timeout_seconds: 60,
            object_wait_timeout_seconds: 20,
            wait_poll_interval_ms: 5000,
            bucket_policy_path: None,
            kms_policy_path: None,
            kms_alias_prefix: String::from(DEFAULT_KMS_ALIAS_PREFIX),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_BUCKET_WAIT_TIMEOUT_SECONDS` | `60` |
    /// | `S3_OBJECT_WAIT_TIMEOUT_SECONDS` | `20` |
    /// | `S3_WAIT_POLL_INTERVAL_MS` | `5000` |
    /// | `BUCKET_POLICY_PATH` | *(bundled)* |
    /// | `KMS_POLICY_PATH` | *(bundled)* |
    /// | `KMS_ALIAS_PREFIX` | `alias/stowage` |
    ///
    /// Unparsable numbers keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from `lookup`, which maps a variable name to
    /// its value.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let path = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };

        let mut config = Self::default();
        if let Some(n) = number("S3_BUCKET_WAIT_TIMEOUT_SECONDS") {
            config.bucket_wait_timeout_seconds = n;
        }
        if let Some(n) = number("S3_OBJECT_WAIT_TIMEOUT_SECONDS") {
            config.object_wait_timeout_seconds = n;
        }
        if let Some(n) = number("S3_WAIT_POLL_INTERVAL_MS") {
            config.wait_poll_interval_ms = n;
        }
        config.bucket_policy_path = path("BUCKET_POLICY_PATH");
        config.kms_policy_path = path("KMS_POLICY_PATH");
        if let Some(v) = lookup("KMS_ALIAS_PREFIX") {
            if !v.trim().is_empty() {
                config.kms_alias_prefix = v;
            }
        }

        config
    }

    /// Wait policy for bucket creation.
    #[must_use]
    pub fn bucket_wait(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.bucket_wait_timeout_seconds),
            self.poll_interval(),
        )
    }

    /// Wait policy for folder marker creation.
    #[must_use]
    pub fn object_wait(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.object_wait_timeout_seconds),
            self.poll_interval(),
        )
    }

    /// Alias of the key owned by `bucket`.
    ///
    /// Characters KMS does not accept in alias names (such as `.`) become `-`.
    /// When that rewrites the name, the first 8 hex chars of the SHA-256 of
    /// the bucket name are appended so distinct buckets keep distinct aliases.
    #[must_use]
    pub fn key_alias(&self, bucket: &str) -> String {
        let mut suffix: String = bucket
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | ':') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        if suffix != bucket {
            let digest = hex::encode(Sha256::digest(bucket.as_bytes()));
            suffix.push('-');
            suffix.push_str(&digest[..ALIAS_DIGEST_LEN]);
        }
        format!("{}/{suffix}", self.kms_alias_prefix.trim_end_matches('/'))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms.max(1))
    }
}
