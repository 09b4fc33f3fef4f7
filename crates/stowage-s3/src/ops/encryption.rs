//! Default bucket encryption.
//!
//! [`EncryptionMode::Default`] applies `AES256` unconditionally.
//! [`EncryptionMode::ManagedKey`] first reads the current configuration and
//! stops if a managed key is already in force. Otherwise the key registered
//! under the bucket's alias is reused, or a new key is created and given
//! that alias, and the key is set as the bucket default. The alias makes a
//! retry after a failure between "key created" and "key applied" pick up the
//! same key instead of creating another. A key whose alias could not be
//! created is scheduled for deletion, since no later pass can find it.

use stowage_core::AccountId;
use stowage_model::{BucketTag, EncryptionMode};
use tracing::{debug, error, info, warn};

use crate::client::{BucketEncryption, CreateKeyRequest};
use crate::error::{ApiError, ReconcileError, ReconcileResult, Step, StepError, Target};
use crate::policy::render_key_policy;
use crate::reconciler::BucketReconciler;

/// Minimum waiting period KMS accepts before deleting a key.
const KEY_DELETION_PENDING_DAYS: u32 = 7;

impl BucketReconciler<'_> {
    /// Apply the requested encryption mode.
    pub(crate) async fn apply_encryption(
        &self,
        bucket: &str,
        mode: EncryptionMode,
        tags: &[BucketTag],
        account: &AccountId,
    ) -> ReconcileResult<()> {
        match mode {
            EncryptionMode::Default => {
                info!(bucket, "applying AES256 default encryption");
                self.store
                    .put_bucket_encryption(bucket, &BucketEncryption::Aes256)
                    .await
                    .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::Encryption, e))
            }
            EncryptionMode::ManagedKey => self
                .apply_managed_key(bucket, tags, account)
                .await
                .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::Encryption, e)),
        }
    }

    async fn apply_managed_key(
        &self,
        bucket: &str,
        tags: &[BucketTag],
        account: &AccountId,
    ) -> Result<(), StepError> {
        let current = self.store.get_bucket_encryption(bucket).await?;
        if current.as_ref().is_some_and(BucketEncryption::is_managed_key) {
            debug!(bucket, "managed key encryption already configured");
            return Ok(());
        }

        let key_id = self.resolve_key(bucket, tags, account).await?;

        info!(bucket, key_id = %key_id, "applying managed key encryption");
        self.store
            .put_bucket_encryption(
                bucket,
                &BucketEncryption::ManagedKey {
                    key_id: Some(key_id),
                },
            )
            .await?;
        Ok(())
    }

    async fn resolve_key(
        &self,
        bucket: &str,
        tags: &[BucketTag],
        account: &AccountId,
    ) -> Result<String, StepError> {
        let alias = self.config.key_alias(bucket);
        if let Some(key_id) = self.keys.find_key_by_alias(&alias).await? {
            info!(bucket, alias = %alias, key_id = %key_id, "reusing existing key");
            return Ok(key_id);
        }

        let request = CreateKeyRequest {
            description: format!("Key generated for bucket '{bucket}'"),
            policy: render_key_policy(self.config, account).await?,
            tags: tags.to_vec(),
        };
        let key_id = self.keys.create_key(&request).await?;
        info!(bucket, alias = %alias, key_id = %key_id, "created encryption key");

        if let Err(err) = self.keys.create_alias(&alias, &key_id).await {
            return Err(self.discard_unaliased_key(bucket, &key_id, err).await.into());
        }
        Ok(key_id)
    }

    /// Schedule a key that never got its alias for deletion, so the next
    /// pass does not leave it behind.
    ///
    /// The returned error names the key either way.
    async fn discard_unaliased_key(&self, bucket: &str, key_id: &str, err: ApiError) -> ApiError {
        let note = match self
            .keys
            .schedule_key_deletion(key_id, KEY_DELETION_PENDING_DAYS)
            .await
        {
            Ok(()) => {
                warn!(bucket, key_id, "alias creation failed, key scheduled for deletion");
                format!("key {key_id} scheduled for deletion")
            }
            Err(cleanup) => {
                error!(bucket, key_id, error = %cleanup, "alias creation failed, key left without alias");
                format!("key {key_id} left without alias: {cleanup}")
            }
        };
        ApiError {
            message: format!("{} ({note})", err.message),
            ..err
        }
    }
}
