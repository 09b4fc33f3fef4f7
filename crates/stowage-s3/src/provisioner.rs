//! Storage-area provisioning entry points.
//!
//! [`StorageAreaProvisioner`] is what a provisioning protocol calls. It
//! checks the request once at the boundary (component present, storage-area
//! kind, valid specific, valid bucket name), resolves region-bound clients
//! from its [`ClientFactory`], and runs the [`BucketReconciler`].
//!
//! Every data product gets one bucket named after
//! `{domain}-{product}-{environment}`; each storage area owns the folder
//! `v{major}/{component}`, where `component` is the last segment of its
//! component id. Major versions of one data product share the bucket but never
//! a folder.

use std::collections::BTreeMap;

use stowage_core::AwsRegion;
use stowage_model::{FailedOperation, InfoEntry, ProvisionInfo, ProvisionRequest, StorageArea};
use tracing::{error, info};

use crate::client::ClientFactory;
use crate::config::ReconcilerConfig;
use crate::error::{ReconcileError, ReconcileResult, Step, Target};
use crate::naming::{BucketName, data_product_bucket_name, validate_bucket_name};
use crate::reconciler::BucketReconciler;

/// A request that passed the boundary checks.
#[derive(Debug)]
struct Checked<'r> {
    area: &'r StorageArea,
    bucket: BucketName,
    folder: String,
    region: AwsRegion,
}

/// Provision, unprovision, and validate storage areas.
///
/// # Examples
///
/// ```no_run
/// use stowage_core::StowageConfig;
/// use stowage_s3::{AwsClientFactory, ReconcilerConfig, StorageAreaProvisioner};
///
/// # async fn run(request: stowage_model::ProvisionRequest) {
/// let factory = AwsClientFactory::from_config(&StowageConfig::from_env()).await;
/// let provisioner = StorageAreaProvisioner::new(factory, ReconcilerConfig::from_env());
/// match provisioner.provision(&request).await {
///     Ok(info) => println!("{}", info.public_info["location"].value),
///     Err(failed) => eprintln!("{failed}"),
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct StorageAreaProvisioner<F: ClientFactory> {
    factory: F,
    config: ReconcilerConfig,
}

impl<F: ClientFactory> StorageAreaProvisioner<F> {
    /// Create a provisioner.
    #[must_use]
    pub fn new(factory: F, config: ReconcilerConfig) -> Self {
        Self { factory, config }
    }

    /// The client factory.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// The reconciler configuration.
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Check a request without changing anything.
    ///
    /// Besides the boundary checks, an existing bucket must already live in
    /// the requested region.
    ///
    /// # Errors
    ///
    /// Returns a [`FailedOperation`] listing what is wrong with the request.
    pub async fn validate(&self, request: &ProvisionRequest) -> Result<(), FailedOperation> {
        self.run_validate(request).await.map_err(|e| fail("validation", e))
    }

    /// Reconcile the data product bucket and create the storage area folder.
    ///
    /// Returns the bucket, folder, and `s3://` location as both public and
    /// private info.
    ///
    /// # Errors
    ///
    /// Returns a [`FailedOperation`] for the first step that fails.
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionInfo, FailedOperation> {
        self.run_provision(request).await.map_err(|e| fail("provisioning", e))
    }

    /// Delete everything under the storage area folder.
    ///
    /// A bucket that does not exist has nothing to delete and is a success.
    ///
    /// # Errors
    ///
    /// Returns a [`FailedOperation`] carrying one problem per object that
    /// could not be deleted.
    pub async fn unprovision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionInfo, FailedOperation> {
        self.run_unprovision(request).await.map_err(|e| fail("unprovisioning", e))
    }

    async fn run_validate(&self, request: &ProvisionRequest) -> ReconcileResult<()> {
        let checked = check(request)?;
        let store = self.factory.object_store(&checked.region);
        let keys = self.factory.key_manager(&checked.region);
        let reconciler = BucketReconciler::new(store.as_ref(), keys.as_ref(), &self.config);

        let bucket = checked.bucket.as_str();
        if reconciler.bucket_exists(bucket).await? {
            let actual = reconciler.bucket_region(bucket).await?;
            if actual != checked.region {
                return Err(ReconcileError::RegionConflict {
                    bucket: bucket.to_owned(),
                    actual: actual.to_string(),
                    desired: checked.region.to_string(),
                });
            }
        }

        info!(component = %checked.area.name, bucket, "validation succeeded");
        Ok(())
    }

    async fn run_provision(&self, request: &ProvisionRequest) -> ReconcileResult<ProvisionInfo> {
        let checked = check(request)?;
        let bucket = checked.bucket.as_str();
        let folder = checked.folder.as_str();
        info!(component = %checked.area.name, bucket, folder, region = %checked.region, "provisioning storage area");

        let store = self.factory.object_store(&checked.region);
        let keys = self.factory.key_manager(&checked.region);
        let account = self
            .factory
            .account_id()
            .await
            .map_err(|e| ReconcileError::step(Target::bucket(bucket), Step::ResolveAccount, e))?;

        let reconciler = BucketReconciler::new(store.as_ref(), keys.as_ref(), &self.config);
        reconciler
            .reconcile(bucket, &checked.area.specific, &account)
            .await?;
        reconciler.create_folder(bucket, folder).await?;

        let mut entries = BTreeMap::new();
        entries.insert("bucket".to_owned(), InfoEntry::string("Bucket name", bucket));
        entries.insert("folder".to_owned(), InfoEntry::string("Folder name", folder));
        entries.insert(
            "location".to_owned(),
            InfoEntry::string("Location", format!("s3://{bucket}/{folder}")),
        );

        info!(component = %checked.area.name, "provisioning completed successfully");
        Ok(ProvisionInfo::shared(entries))
    }

    async fn run_unprovision(&self, request: &ProvisionRequest) -> ReconcileResult<ProvisionInfo> {
        let checked = check(request)?;
        let bucket = checked.bucket.as_str();
        let folder = checked.folder.as_str();

        let store = self.factory.object_store(&checked.region);
        let keys = self.factory.key_manager(&checked.region);
        let reconciler = BucketReconciler::new(store.as_ref(), keys.as_ref(), &self.config);

        if reconciler.bucket_exists(bucket).await? {
            info!(component = %checked.area.name, bucket, folder, "unprovisioning storage area");
            reconciler.delete_by_prefix(bucket, folder).await?;
        } else {
            info!(bucket, "bucket does not exist, nothing to delete");
        }

        let message = format!(
            "Unprovisioning of {} completed successfully",
            checked.area.name
        );
        info!(component = %checked.area.name, "{message}");

        let mut entries = BTreeMap::new();
        entries.insert(
            "result".to_owned(),
            InfoEntry::string("Operation result", message),
        );
        Ok(ProvisionInfo::shared(entries))
    }
}

/// Boundary checks shared by every entry point.
fn check(request: &ProvisionRequest) -> ReconcileResult<Checked<'_>> {
    let component = request.component.as_ref().ok_or_else(|| {
        ReconcileError::InvalidRequest("Invalid operation request: Component is missing".to_owned())
    })?;

    let area = component.as_storage_area().ok_or_else(|| {
        ReconcileError::InvalidRequest(format!(
            "Invalid component type. {} is not a valid Storage Area",
            component.name()
        ))
    })?;

    area.specific
        .validate()
        .map_err(|violations| ReconcileError::InvalidSpecific {
            component: area.name.clone(),
            violations,
        })?;

    let region = AwsRegion::parse(&area.specific.region)
        .map_err(|e| ReconcileError::InvalidRequest(e.to_string()))?;

    let bucket = data_product_bucket_name(&request.data_product);
    validate_bucket_name(bucket.as_str())
        .map_err(|e| ReconcileError::InvalidRequest(e.to_string()))?;

    Ok(Checked {
        area,
        bucket,
        folder: area.folder_path(&request.data_product),
        region,
    })
}

fn fail(operation: &str, err: ReconcileError) -> FailedOperation {
    error!(operation, kind = ?err.kind(), error = %err, "operation failed");
    err.into()
}
