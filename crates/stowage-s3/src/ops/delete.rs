//! Prefix deletion in fixed-size batches.
//!
//! Every object under the prefix is listed first, page by page. The prefix
//! marker is added as a target even when the listing is empty, so an empty
//! folder is still removed. Targets are then deleted in batches of at most
//! [`MAX_DELETE_BATCH`]. Per-object failures reported by a batch are
//! collected across all batches and returned together; a batch call that
//! fails as a whole stops the deletion.

use stowage_model::Problem;
use tracing::{error, info};

use super::folder_prefix;
use crate::client::{DeleteFailure, ObjectIdentifier};
use crate::error::{ReconcileError, ReconcileResult, Step, Target};
use crate::reconciler::BucketReconciler;

/// Most keys a single delete call accepts.
pub const MAX_DELETE_BATCH: usize = 1000;

impl BucketReconciler<'_> {
    /// Delete every object under `prefix`, and the prefix marker itself.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::InvalidRequest`] for a blank prefix.
    /// - [`ReconcileError::Step`] if listing fails or a batch call fails as
    ///   a whole.
    /// - [`ReconcileError::PartialDeletion`] with one problem per object the
    ///   service refused to delete.
    pub async fn delete_by_prefix(&self, bucket: &str, prefix: &str) -> ReconcileResult<()> {
        let prefix = folder_prefix(prefix).ok_or_else(|| {
            ReconcileError::InvalidRequest(format!(
                "[Bucket: {bucket}] Error: Refusing to delete with a blank prefix."
            ))
        })?;

        let mut targets = self.list_under_prefix(bucket, &prefix).await?;
        let marker = ObjectIdentifier::new(prefix.as_str());
        if !targets.contains(&marker) {
            targets.push(marker);
        }

        info!(bucket, prefix = %prefix, count = targets.len(), "deleting objects");

        let mut problems = Vec::new();
        for (batch, chunk) in targets.chunks(MAX_DELETE_BATCH).enumerate() {
            let failures = self.store.delete_objects(bucket, chunk).await.map_err(|e| {
                ReconcileError::step(Target::prefix(bucket, &prefix), Step::DeleteObjects, e)
            })?;
            if !failures.is_empty() {
                error!(bucket, prefix = %prefix, batch, failed = failures.len(), "objects not deleted");
            }
            problems.extend(failures.into_iter().map(delete_problem));
        }

        if problems.is_empty() {
            info!(bucket, prefix = %prefix, "prefix deleted");
            Ok(())
        } else {
            Err(ReconcileError::PartialDeletion {
                target: Target::prefix(bucket, &prefix),
                problems,
            })
        }
    }

    async fn list_under_prefix(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> ReconcileResult<Vec<ObjectIdentifier>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let page = self
                .store
                .list_objects_page(bucket, prefix, continuation_token)
                .await
                .map_err(|e| ReconcileError::step(Target::prefix(bucket, prefix), Step::ListObjects, e))?;
            objects.extend(page.objects);

            match page.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        Ok(objects)
    }
}

fn delete_problem(failure: DeleteFailure) -> Problem {
    let message = format!(
        "Error deleting object with key '{}': {}",
        failure.key, failure.message
    );
    match failure.code {
        Some(code) => Problem::with_cause(message, code),
        None => Problem::new(message),
    }
}
