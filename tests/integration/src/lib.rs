//! Integration tests for Stowage.
//!
//! These tests require an S3/KMS/STS compatible endpoint at `localhost:4566`
//! (override with `S3_ENDPOINT_URL`). They are marked `#[ignore]` so they don't
//! run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p stowage-integration -- --ignored
//! ```

use std::sync::Once;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use stowage_model::{
    Component, DataProduct, OpaqueComponent, ProvisionRequest, StorageArea, StorageSpecific,
};
use stowage_s3::{AwsClientFactory, ReconcilerConfig, StorageAreaProvisioner};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Shared SDK configuration pointing at the local server.
pub async fn sdk_config() -> SdkConfig {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .load()
        .await
}

/// Create a configured S3 client pointing at the local server.
pub async fn s3_client() -> aws_sdk_s3::Client {
    let sdk_config = sdk_config().await;
    let config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

/// Create a configured KMS client pointing at the local server.
pub async fn kms_client() -> aws_sdk_kms::Client {
    aws_sdk_kms::Client::new(&sdk_config().await)
}

/// A provisioner with short propagation windows.
pub async fn provisioner() -> StorageAreaProvisioner<AwsClientFactory> {
    let factory = AwsClientFactory::new(sdk_config().await, true);
    let config = ReconcilerConfig::builder()
        .bucket_wait_timeout_seconds(10)
        .object_wait_timeout_seconds(10)
        .wait_poll_interval_ms(200)
        .kms_alias_prefix("alias/stowage-it".into())
        .build();
    StorageAreaProvisioner::new(factory, config)
}

/// A data product with a unique name, so every test owns its bucket.
#[must_use]
pub fn test_data_product(prefix: &str) -> DataProduct {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    let name = format!("{prefix}{id}");
    DataProduct {
        id: format!("urn:dmb:dp:it:{name}:0"),
        name,
        domain: "it".to_owned(),
        environment: "test".to_owned(),
        version: Some("0.1.0".to_owned()),
    }
}

/// A request for the storage area `folder` of `data_product`.
#[must_use]
pub fn storage_area_request(
    data_product: &DataProduct,
    folder: &str,
    specific: StorageSpecific,
) -> ProvisionRequest {
    ProvisionRequest {
        data_product: data_product.clone(),
        component: Some(Component::StorageArea(StorageArea {
            id: format!("{}:{folder}", data_product.id),
            name: folder.to_owned(),
            description: None,
            specific,
        })),
    }
}

/// A request whose component is not a storage area.
#[must_use]
pub fn workload_request(data_product: &DataProduct) -> ProvisionRequest {
    ProvisionRequest {
        data_product: data_product.clone(),
        component: Some(Component::Workload(OpaqueComponent {
            id: format!("{}:job", data_product.id),
            name: "job".to_owned(),
            specific: serde_json::Value::Null,
        })),
    }
}

/// Bucket name the provisioner derives for `data_product`.
#[must_use]
pub fn bucket_of(data_product: &DataProduct) -> String {
    stowage_s3::naming::data_product_bucket_name(data_product).to_string()
}

/// Delete every object version and the bucket itself, ignoring errors.
pub async fn cleanup_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    if let Ok(resp) = client.list_object_versions().bucket(bucket).send().await {
        for version in resp.versions() {
            if let Some(key) = version.key() {
                let _ = client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .set_version_id(version.version_id().map(str::to_owned))
                    .send()
                    .await;
            }
        }
        for marker in resp.delete_markers() {
            if let Some(key) = marker.key() {
                let _ = client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .set_version_id(marker.version_id().map(str::to_owned))
                    .send()
                    .await;
            }
        }
    }

    if let Ok(resp) = client.list_objects_v2().bucket(bucket).send().await {
        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

/// Keys currently stored under `prefix`.
pub async fn keys_under(client: &aws_sdk_s3::Client, bucket: &str, prefix: &str) -> Vec<String> {
    let resp = client
        .list_objects_v2()
        .bucket(bucket)
        .prefix(prefix)
        .send()
        .await
        .expect("list_objects_v2");
    resp.contents()
        .iter()
        .filter_map(|o| o.key().map(str::to_owned))
        .collect()
}

mod test_validate;
