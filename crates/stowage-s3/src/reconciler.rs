//! Bucket reconciliation orchestrator.
//!
//! [`BucketReconciler`] drives a bucket towards a [`StorageSpecific`]:
//!
//! 1. resolve existence; create and wait if absent, otherwise check that the
//!    bucket lives in the desired region;
//! 2. tagging, access policy, encryption;
//! 3. versioning and its noncurrent-version lifecycle rule, when requested;
//! 4. intelligent tiering, when at least one archive tier is enabled.
//!
//! Every step is applied in order and the first failure ends the pass.
//! Nothing already applied is rolled back: each step is idempotent, so
//! running the pass again is how a partial failure is repaired.
//!
//! The individual steps live in [`crate::ops`].

use std::future::Future;

use stowage_core::{AccountId, AwsRegion};
use stowage_model::StorageSpecific;
use tracing::{error, info};

use crate::client::{KeyManager, ObjectStore};
use crate::config::ReconcilerConfig;
use crate::error::{ApiResult, ReconcileError, ReconcileResult, Step, Target};
use crate::waiter::{WaitError, WaitPolicy, wait_until};

/// Legacy location constraint S3 still reports for `eu-west-1`.
const LEGACY_EU_LOCATION: &str = "EU";

/// Reconciles one bucket through region-bound clients.
///
/// The reconciler borrows everything it needs and holds no state of its own,
/// so reconciliations of different buckets can run concurrently.
#[derive(Debug, Clone, Copy)]
pub struct BucketReconciler<'a> {
    pub(crate) store: &'a dyn ObjectStore,
    pub(crate) keys: &'a dyn KeyManager,
    pub(crate) config: &'a ReconcilerConfig,
}

impl<'a> BucketReconciler<'a> {
    /// Create a reconciler over clients bound to the bucket's desired region.
    #[must_use]
    pub fn new(
        store: &'a dyn ObjectStore,
        keys: &'a dyn KeyManager,
        config: &'a ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            keys,
            config,
        }
    }

    /// Create or update `bucket` so that it matches `specific`.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::InvalidSpecific`] if `specific` breaks a field
    ///   constraint; checked before any remote call.
    /// - [`ReconcileError::RegionConflict`] if the bucket exists elsewhere;
    ///   no configuration call is made in that case.
    /// - [`ReconcileError::PropagationTimeout`] if a created bucket never
    ///   becomes visible.
    /// - [`ReconcileError::Step`] for the first remote call that fails.
    pub async fn reconcile(
        &self,
        bucket: &str,
        specific: &StorageSpecific,
        account: &AccountId,
    ) -> ReconcileResult<()> {
        specific
            .validate()
            .map_err(|violations| ReconcileError::InvalidSpecific {
                component: bucket.to_owned(),
                violations,
            })?;
        let desired = AwsRegion::parse(&specific.region)
            .map_err(|e| ReconcileError::InvalidRequest(e.to_string()))?;

        info!(bucket, region = %desired, "reconciling bucket");

        if self.bucket_exists(bucket).await? {
            let actual = self.bucket_region(bucket).await?;
            if actual != desired {
                error!(bucket, actual = %actual, desired = %desired, "bucket region conflict");
                return Err(ReconcileError::RegionConflict {
                    bucket: bucket.to_owned(),
                    actual: actual.to_string(),
                    desired: desired.to_string(),
                });
            }
        } else {
            self.create_bucket(bucket, &desired).await?;
        }

        self.apply_tagging(bucket, &specific.bucket_tags).await?;
        self.apply_access_policy(bucket).await?;
        self.apply_encryption(
            bucket,
            specific.server_side_encryption,
            &specific.bucket_tags,
            account,
        )
        .await?;
        if specific.multiple_version {
            self.apply_versioning(bucket, specific.noncurrent_retention())
                .await?;
        }
        self.apply_intelligent_tiering(bucket, specific.intelligent_tiering_configuration.as_ref())
            .await?;

        info!(bucket, "bucket reconciled");
        Ok(())
    }

    /// Whether a bucket with this name is owned by the caller.
    ///
    /// Names are compared case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Step`] if the buckets cannot be listed.
    pub async fn bucket_exists(&self, bucket: &str) -> ReconcileResult<bool> {
        let names = self
            .store
            .list_bucket_names()
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::CheckExistence, e))?;
        Ok(names.iter().any(|name| name.eq_ignore_ascii_case(bucket)))
    }

    /// Region the bucket lives in.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Step`] if the location cannot be read.
    pub async fn bucket_region(&self, bucket: &str) -> ReconcileResult<AwsRegion> {
        let location = self
            .store
            .bucket_location(bucket)
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::GetRegion, e))?;
        Ok(normalize_location(location.as_deref()))
    }

    async fn create_bucket(&self, bucket: &str, region: &AwsRegion) -> ReconcileResult<()> {
        info!(bucket, region = %region, "creating bucket");
        self.store
            .create_bucket(bucket, region)
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::CreateBucket, e))?;

        await_existence(Target::bucket(bucket), self.config.bucket_wait(), || {
            self.store.head_bucket(bucket)
        })
        .await
    }
}

/// Map a raw location constraint to a region.
///
/// S3 reports `us-east-1` as an absent or empty constraint and `eu-west-1`
/// as the legacy `EU` value on old buckets.
#[must_use]
pub fn normalize_location(location: Option<&str>) -> AwsRegion {
    match location.map(str::trim) {
        None | Some("") => AwsRegion::default(),
        Some(LEGACY_EU_LOCATION) => AwsRegion::new("eu-west-1"),
        Some(other) => AwsRegion::new(other),
    }
}

/// Wait for `target` to become visible and classify the outcome.
pub(crate) async fn await_existence<F, Fut>(
    target: Target,
    policy: WaitPolicy,
    check: F,
) -> ReconcileResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<bool>>,
{
    match wait_until(policy, check).await {
        Ok(()) => Ok(()),
        Err(WaitError::NotConfirmed { timeout }) => {
            error!(%target, timeout_secs = timeout.as_secs(), "resource not visible in time");
            Err(ReconcileError::PropagationTimeout { target, timeout })
        }
        Err(WaitError::Check(err)) => Err(ReconcileError::step(target, Step::AwaitExistence, err)),
    }
}
