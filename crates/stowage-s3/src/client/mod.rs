//! Remote API capabilities used by the reconciliation engine.
//!
//! The engine never talks to an SDK directly. It receives an
//! [`ObjectStore`] and a [`KeyManager`] already bound to the desired region,
//! and a [`ClientFactory`] that resolves them. [`aws`] provides the
//! production implementations on top of the AWS SDK.

pub mod aws;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use stowage_core::{AccountId, AwsRegion};
use stowage_model::BucketTag;

use crate::error::ApiResult;

/// Key of one stored object, as produced by listing and consumed by deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentifier(String);

impl ObjectIdentifier {
    /// Wrap an object key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The object key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Objects on this page.
    pub objects: Vec<ObjectIdentifier>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_continuation_token: Option<String>,
}

/// An object that a batch delete reported as not deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    /// Object key.
    pub key: String,
    /// Service error code.
    pub code: Option<String>,
    /// Service error message.
    pub message: String,
}

/// Default server-side encryption currently configured on a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketEncryption {
    /// S3-managed keys (`AES256`).
    Aes256,
    /// A key-management key (`aws:kms`).
    ManagedKey {
        /// Key id or ARN, when one is pinned.
        key_id: Option<String>,
    },
    /// Any other algorithm.
    Other(String),
}

impl BucketEncryption {
    /// Whether the externally managed key mode is active.
    #[must_use]
    pub fn is_managed_key(&self) -> bool {
        matches!(self, Self::ManagedKey { .. })
    }
}

/// A bucket-wide rule expiring noncurrent versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoncurrentExpirationRule {
    /// Rule id.
    pub id: String,
    /// Days a version must be noncurrent before it expires.
    pub noncurrent_days: u32,
    /// Newer noncurrent versions always retained.
    pub newer_noncurrent_versions: u32,
}

/// A bucket-wide intelligent-tiering configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieringRule {
    /// Configuration id.
    pub id: String,
    /// Days before moving to the archive access tier, when enabled.
    pub archive_access_days: Option<u32>,
    /// Days before moving to the deep archive access tier, when enabled.
    pub deep_archive_access_days: Option<u32>,
}

/// Parameters for creating an encryption key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateKeyRequest {
    /// Human-readable description.
    pub description: String,
    /// Key policy document.
    pub policy: String,
    /// Tags attached to the key.
    pub tags: Vec<BucketTag>,
}

/// Object-storage management API bound to one region.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Names of every bucket owned by the caller.
    async fn list_bucket_names(&self) -> ApiResult<Vec<String>>;

    /// Create a bucket in `region`.
    async fn create_bucket(&self, bucket: &str, region: &AwsRegion) -> ApiResult<()>;

    /// Existence check for a bucket; `Ok(false)` when it is not found.
    async fn head_bucket(&self, bucket: &str) -> ApiResult<bool>;

    /// Raw location constraint of a bucket (`None` for the default region).
    async fn bucket_location(&self, bucket: &str) -> ApiResult<Option<String>>;

    /// Replace the bucket tag set.
    async fn put_bucket_tagging(&self, bucket: &str, tags: &[BucketTag]) -> ApiResult<()>;

    /// Replace the bucket access policy.
    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> ApiResult<()>;

    /// Current default encryption; `None` when none is configured.
    async fn get_bucket_encryption(&self, bucket: &str) -> ApiResult<Option<BucketEncryption>>;

    /// Replace the default encryption.
    async fn put_bucket_encryption(
        &self,
        bucket: &str,
        encryption: &BucketEncryption,
    ) -> ApiResult<()>;

    /// Turn versioning on.
    async fn enable_versioning(&self, bucket: &str) -> ApiResult<()>;

    /// Replace the lifecycle configuration with a single expiration rule.
    async fn put_noncurrent_expiration(
        &self,
        bucket: &str,
        rule: &NoncurrentExpirationRule,
    ) -> ApiResult<()>;

    /// Install an intelligent-tiering configuration.
    async fn put_intelligent_tiering(&self, bucket: &str, rule: &TieringRule) -> ApiResult<()>;

    /// Write a zero-byte object.
    async fn put_empty_object(&self, bucket: &str, key: &str) -> ApiResult<()>;

    /// Existence check for an object; `Ok(false)` when it is not found.
    async fn head_object(&self, bucket: &str, key: &str) -> ApiResult<bool>;

    /// One page of objects under `prefix`.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> ApiResult<ObjectPage>;

    /// Delete up to [`crate::ops::delete::MAX_DELETE_BATCH`] objects in one call.
    ///
    /// Per-item failures are returned, not raised.
    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectIdentifier],
    ) -> ApiResult<Vec<DeleteFailure>>;
}

/// Key-management API bound to one region.
#[async_trait]
pub trait KeyManager: Send + Sync + fmt::Debug {
    /// Resolve an alias to its key id; `Ok(None)` when the alias does not exist.
    async fn find_key_by_alias(&self, alias: &str) -> ApiResult<Option<String>>;

    /// Create a symmetric encrypt/decrypt key and return its id.
    async fn create_key(&self, request: &CreateKeyRequest) -> ApiResult<String>;

    /// Point `alias` at `key_id`.
    async fn create_alias(&self, alias: &str, key_id: &str) -> ApiResult<()>;

    /// Schedule `key_id` for deletion after `pending_days` days.
    async fn schedule_key_deletion(&self, key_id: &str, pending_days: u32) -> ApiResult<()>;
}

/// Resolves regional clients and the caller identity.
#[async_trait]
pub trait ClientFactory: Send + Sync + fmt::Debug {
    /// Object-storage client for `region`.
    fn object_store(&self, region: &AwsRegion) -> Arc<dyn ObjectStore>;

    /// Key-management client for `region`.
    fn key_manager(&self, region: &AwsRegion) -> Arc<dyn KeyManager>;

    /// Account the credentials belong to.
    async fn account_id(&self) -> ApiResult<AccountId>;
}
