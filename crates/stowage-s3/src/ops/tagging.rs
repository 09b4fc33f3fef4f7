//! Bucket tagging.

use stowage_model::BucketTag;
use tracing::{debug, info};

use crate::error::{ReconcileError, ReconcileResult, Step, Target};
use crate::reconciler::BucketReconciler;

impl BucketReconciler<'_> {
    /// Replace the bucket tag set in one call; no call at all for an empty set.
    pub(crate) async fn apply_tagging(&self, bucket: &str, tags: &[BucketTag]) -> ReconcileResult<()> {
        if tags.is_empty() {
            debug!(bucket, "no bucket tags requested");
            return Ok(());
        }

        info!(bucket, count = tags.len(), "applying bucket tags");
        self.store
            .put_bucket_tagging(bucket, tags)
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::Tagging, e))
    }
}
