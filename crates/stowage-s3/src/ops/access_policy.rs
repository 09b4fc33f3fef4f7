//! Bucket access policy.

use tracing::info;

use crate::error::{ReconcileError, ReconcileResult, Step, Target};
use crate::policy::render_bucket_policy;
use crate::reconciler::BucketReconciler;

impl BucketReconciler<'_> {
    /// Render the bucket policy template for `bucket` and apply it.
    ///
    /// An unreadable template and a rejected policy fail the same step with
    /// different causes.
    pub(crate) async fn apply_access_policy(&self, bucket: &str) -> ReconcileResult<()> {
        let target = || Target::bucket(bucket);

        let policy = render_bucket_policy(self.config, bucket)
            .await
            .map_err(|e| ReconcileError::step(target(), Step::AccessPolicy, e))?;

        info!(bucket, "applying bucket policy");
        self.store
            .put_bucket_policy(bucket, &policy)
            .await
            .map_err(|e| ReconcileError::step(target(), Step::AccessPolicy, e))
    }
}
