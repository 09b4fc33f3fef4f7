//! Policy document templates.
//!
//! Both templates are bundled into the binary and can be replaced by a file
//! on disk. Placeholders are substituted verbatim.

use std::borrow::Cow;
use std::path::Path;

use stowage_core::AccountId;
use tracing::debug;

use crate::config::ReconcilerConfig;
use crate::error::StepError;

/// Bundled bucket policy: deny every request not sent over TLS.
pub const BUCKET_POLICY_TEMPLATE: &str = include_str!("../policies/bucket-policy.json");

/// Bundled key policy: full control for the owning account, use by S3.
pub const KEY_POLICY_TEMPLATE: &str = include_str!("../policies/key-policy.json");

/// Placeholder replaced by the bucket name.
pub const BUCKET_NAME_PLACEHOLDER: &str = "{bucketName}";

/// Placeholder replaced by the account id.
pub const ACCOUNT_ID_PLACEHOLDER: &str = "{accountID}";

/// Read `override_path` when set, otherwise return the bundled template.
///
/// # Errors
///
/// Returns [`StepError::Template`] if the override cannot be read.
pub async fn load_template(
    override_path: Option<&Path>,
    bundled: &'static str,
) -> Result<Cow<'static, str>, StepError> {
    match override_path {
        Some(path) => {
            debug!(path = %path.display(), "reading policy template override");
            tokio::fs::read_to_string(path)
                .await
                .map(Cow::Owned)
                .map_err(|source| StepError::Template {
                    path: path.display().to_string(),
                    source,
                })
        }
        None => Ok(Cow::Borrowed(bundled)),
    }
}

/// Bucket policy for `bucket`.
///
/// # Errors
///
/// Returns [`StepError::Template`] if the override cannot be read.
pub async fn render_bucket_policy(
    config: &ReconcilerConfig,
    bucket: &str,
) -> Result<String, StepError> {
    let template = load_template(config.bucket_policy_path.as_deref(), BUCKET_POLICY_TEMPLATE).await?;
    Ok(template.replace(BUCKET_NAME_PLACEHOLDER, bucket))
}

/// Key policy for keys owned by `account`.
///
/// # Errors
///
/// Returns [`StepError::Template`] if the override cannot be read.
pub async fn render_key_policy(
    config: &ReconcilerConfig,
    account: &AccountId,
) -> Result<String, StepError> {
    let template = load_template(config.kms_policy_path.as_deref(), KEY_POLICY_TEMPLATE).await?;
    Ok(template.replace(ACCOUNT_ID_PLACEHOLDER, account.as_str()))
}
