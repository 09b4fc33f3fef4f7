//! Versioning and noncurrent-version expiration.

use stowage_model::NoncurrentRetention;
use tracing::{debug, info};

use crate::client::NoncurrentExpirationRule;
use crate::error::{ReconcileError, ReconcileResult, Step, Target};
use crate::reconciler::BucketReconciler;

/// Id of the lifecycle rule expiring noncurrent versions.
pub const NONCURRENT_EXPIRATION_RULE_ID: &str = "stowage-noncurrent-expiration";

impl BucketReconciler<'_> {
    /// Enable versioning, then install the expiration rule if `retention` is set.
    ///
    /// Without a retention rule noncurrent versions are kept forever.
    pub(crate) async fn apply_versioning(
        &self,
        bucket: &str,
        retention: Option<NoncurrentRetention>,
    ) -> ReconcileResult<()> {
        info!(bucket, "enabling versioning");
        self.store
            .enable_versioning(bucket)
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::Versioning, e))?;

        let Some(retention) = retention else {
            debug!(bucket, "no noncurrent version retention requested");
            return Ok(());
        };

        let rule = NoncurrentExpirationRule {
            id: NONCURRENT_EXPIRATION_RULE_ID.to_owned(),
            noncurrent_days: retention.days_after_become_non_current,
            newer_noncurrent_versions: retention.number_of_versions_to_retain,
        };
        info!(
            bucket,
            noncurrent_days = rule.noncurrent_days,
            newer_noncurrent_versions = rule.newer_noncurrent_versions,
            "applying noncurrent version expiration"
        );
        self.store
            .put_noncurrent_expiration(bucket, &rule)
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::Lifecycle, e))
    }
}
