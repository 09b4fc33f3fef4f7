//! Folder markers.

use tracing::info;

use super::folder_prefix;
use crate::error::{ReconcileError, ReconcileResult, Step, Target};
use crate::reconciler::{BucketReconciler, await_existence};

impl BucketReconciler<'_> {
    /// Write the zero-byte marker `{folder}/` and wait until it is visible.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::InvalidRequest`] for a blank folder path.
    /// - [`ReconcileError::Step`] if the marker cannot be written or checked.
    /// - [`ReconcileError::PropagationTimeout`] if it never becomes visible.
    pub async fn create_folder(&self, bucket: &str, folder: &str) -> ReconcileResult<()> {
        let key = folder_prefix(folder).ok_or_else(|| {
            ReconcileError::InvalidRequest(format!(
                "[Bucket: {bucket}] Error: The folder path must not be blank."
            ))
        })?;

        info!(bucket, key = %key, "creating folder marker");
        self.store
            .put_empty_object(bucket, &key)
            .await
            .map_err(|e| ReconcileError::step(Target::object(bucket, &key), Step::CreateFolder, e))?;

        await_existence(Target::object(bucket, &key), self.config.object_wait(), || {
            self.store.head_object(bucket, &key)
        })
        .await
    }
}
