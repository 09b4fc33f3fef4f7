//! Intelligent-tiering archive configuration.

use stowage_model::IntelligentTieringPolicy;
use tracing::{debug, info};

use crate::client::TieringRule;
use crate::error::{ReconcileError, ReconcileResult, Step, Target};
use crate::reconciler::BucketReconciler;

/// Id of the bucket-wide intelligent-tiering configuration.
pub const INTELLIGENT_TIERING_ID: &str = "stowage-intelligent-tiering";

impl BucketReconciler<'_> {
    /// Install one tiering per enabled archive tier; skip when none is enabled.
    pub(crate) async fn apply_intelligent_tiering(
        &self,
        bucket: &str,
        policy: Option<&IntelligentTieringPolicy>,
    ) -> ReconcileResult<()> {
        let Some(policy) = policy.filter(|p| p.any_tier_enabled()) else {
            debug!(bucket, "no intelligent tiering requested");
            return Ok(());
        };

        let rule = TieringRule {
            id: INTELLIGENT_TIERING_ID.to_owned(),
            archive_access_days: policy
                .archive_access_tier_enabled
                .then_some(policy.archive_access_tier_days),
            deep_archive_access_days: policy
                .deep_archive_access_tier_enabled
                .then_some(policy.deep_archive_access_tier_days),
        };
        info!(
            bucket,
            archive_access_days = ?rule.archive_access_days,
            deep_archive_access_days = ?rule.deep_archive_access_days,
            "applying intelligent tiering"
        );
        self.store
            .put_intelligent_tiering(bucket, &rule)
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::IntelligentTiering, e))
    }
}
