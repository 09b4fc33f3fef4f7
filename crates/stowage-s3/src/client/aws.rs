//! AWS SDK implementations of the remote capabilities.
//!
//! [`AwsClientFactory`] loads the shared SDK configuration once and builds
//! one S3 and one KMS client per region on demand, caching them in a
//! [`RegionCache`]. Service errors are flattened into [`ApiError`] with the
//! operation name and the service error code.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_kms::types::{KeySpec, KeyUsageType};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types as s3;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use stowage_core::{AccountId, AwsRegion, RegionCache, StowageConfig};
use stowage_model::BucketTag;
use tracing::{debug, info};

use super::{
    BucketEncryption, ClientFactory, CreateKeyRequest, DeleteFailure, KeyManager,
    NoncurrentExpirationRule, ObjectIdentifier, ObjectPage, ObjectStore, TieringRule,
};
use crate::error::{ApiError, ApiResult};

/// Error code S3 returns when a bucket has no default encryption.
const NO_ENCRYPTION_CODE: &str = "ServerSideEncryptionConfigurationNotFoundError";

/// Error code S3 returns when the caller already owns the bucket being created.
const ALREADY_OWNED_CODE: &str = "BucketAlreadyOwnedByYou";

/// Flatten an SDK error into an [`ApiError`].
fn sdk_error<E>(operation: &'static str, err: &SdkError<E, HttpResponse>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let service = err.as_service_error();
    match service.and_then(|e| e.code()) {
        Some(code) => {
            let message = service
                .and_then(|e| e.message())
                .map_or_else(|| DisplayErrorContext(err).to_string(), ToOwned::to_owned);
            ApiError::with_code(operation, code, message)
        }
        None => ApiError::new(operation, DisplayErrorContext(err).to_string()),
    }
}

/// Service error code of an SDK error, if any.
fn error_code<E>(err: &SdkError<E, HttpResponse>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|e| e.code())
}

/// Whether the raw response was a 404.
fn is_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool {
    err.raw_response()
        .is_some_and(|response| response.status().as_u16() == 404)
}

/// A request could not be assembled locally.
fn build_error(operation: &'static str, err: &impl fmt::Display) -> ApiError {
    ApiError::new(operation, format!("invalid request: {err}"))
}

/// Clamp a day/count value into the SDK's `i32` fields.
fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// [`ObjectStore`] backed by `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: aws_sdk_s3::Client,
}

impl AwsObjectStore {
    /// Wrap an S3 client.
    #[must_use]
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn list_bucket_names(&self) -> ApiResult<Vec<String>> {
        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_buckets()
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListBuckets", &e))?;

            names.extend(
                output
                    .buckets()
                    .iter()
                    .filter_map(|b| b.name().map(ToOwned::to_owned)),
            );

            match output.continuation_token() {
                Some(token) if !token.is_empty() => continuation_token = Some(token.to_owned()),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn create_bucket(&self, bucket: &str, region: &AwsRegion) -> ApiResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if !region.is_default() {
            request = request.create_bucket_configuration(
                s3::CreateBucketConfiguration::builder()
                    .location_constraint(s3::BucketLocationConstraint::from(region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) if error_code(&err) == Some(ALREADY_OWNED_CODE) => {
                debug!(bucket, "bucket already owned by caller");
                Ok(())
            }
            Err(err) => Err(sdk_error("CreateBucket", &err)),
        }
    }

    async fn head_bucket(&self, bucket: &str) -> ApiResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(sdk_error("HeadBucket", &err)),
        }
    }

    async fn bucket_location(&self, bucket: &str) -> ApiResult<Option<String>> {
        let output = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| sdk_error("GetBucketLocation", &e))?;

        Ok(output
            .location_constraint()
            .map(|c| c.as_str().to_owned())
            .filter(|c| !c.is_empty()))
    }

    async fn put_bucket_tagging(&self, bucket: &str, tags: &[BucketTag]) -> ApiResult<()> {
        let tag_set = tags
            .iter()
            .map(|t| {
                s3::Tag::builder()
                    .key(&t.key)
                    .value(&t.value)
                    .build()
                    .map_err(|e| build_error("PutBucketTagging", &e))
            })
            .collect::<ApiResult<Vec<_>>>()?;
        let tagging = s3::Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| build_error("PutBucketTagging", &e))?;

        self.client
            .put_bucket_tagging()
            .bucket(bucket)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| sdk_error("PutBucketTagging", &e))?;
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> ApiResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| sdk_error("PutBucketPolicy", &e))?;
        Ok(())
    }

    async fn get_bucket_encryption(&self, bucket: &str) -> ApiResult<Option<BucketEncryption>> {
        let output = match self.client.get_bucket_encryption().bucket(bucket).send().await {
            Ok(output) => output,
            Err(err) if error_code(&err) == Some(NO_ENCRYPTION_CODE) => return Ok(None),
            Err(err) => return Err(sdk_error("GetBucketEncryption", &err)),
        };

        let defaults: Vec<&s3::ServerSideEncryptionByDefault> = output
            .server_side_encryption_configuration()
            .map(|c| {
                c.rules()
                    .iter()
                    .filter_map(s3::ServerSideEncryptionRule::apply_server_side_encryption_by_default)
                    .collect()
            })
            .unwrap_or_default();

        let chosen = defaults
            .iter()
            .find(|d| *d.sse_algorithm() == s3::ServerSideEncryption::AwsKms)
            .or_else(|| defaults.first());

        Ok(chosen.map(|d| match d.sse_algorithm() {
            s3::ServerSideEncryption::Aes256 => BucketEncryption::Aes256,
            s3::ServerSideEncryption::AwsKms => BucketEncryption::ManagedKey {
                key_id: d.kms_master_key_id().map(ToOwned::to_owned),
            },
            other => BucketEncryption::Other(other.as_str().to_owned()),
        }))
    }

    async fn put_bucket_encryption(
        &self,
        bucket: &str,
        encryption: &BucketEncryption,
    ) -> ApiResult<()> {
        let by_default = match encryption {
            BucketEncryption::Aes256 => s3::ServerSideEncryptionByDefault::builder()
                .sse_algorithm(s3::ServerSideEncryption::Aes256),
            BucketEncryption::ManagedKey { key_id } => {
                s3::ServerSideEncryptionByDefault::builder()
                    .sse_algorithm(s3::ServerSideEncryption::AwsKms)
                    .set_kms_master_key_id(key_id.clone())
            }
            BucketEncryption::Other(algorithm) => s3::ServerSideEncryptionByDefault::builder()
                .sse_algorithm(s3::ServerSideEncryption::from(algorithm.as_str())),
        }
        .build()
        .map_err(|e| build_error("PutBucketEncryption", &e))?;

        let rule = s3::ServerSideEncryptionRule::builder()
            .apply_server_side_encryption_by_default(by_default)
            .build();
        let configuration = s3::ServerSideEncryptionConfiguration::builder()
            .rules(rule)
            .build()
            .map_err(|e| build_error("PutBucketEncryption", &e))?;

        self.client
            .put_bucket_encryption()
            .bucket(bucket)
            .server_side_encryption_configuration(configuration)
            .send()
            .await
            .map_err(|e| sdk_error("PutBucketEncryption", &e))?;
        Ok(())
    }

    async fn enable_versioning(&self, bucket: &str) -> ApiResult<()> {
        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(
                s3::VersioningConfiguration::builder()
                    .status(s3::BucketVersioningStatus::Enabled)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error("PutBucketVersioning", &e))?;
        Ok(())
    }

    async fn put_noncurrent_expiration(
        &self,
        bucket: &str,
        rule: &NoncurrentExpirationRule,
    ) -> ApiResult<()> {
        let expiration = s3::NoncurrentVersionExpiration::builder()
            .noncurrent_days(to_i32(rule.noncurrent_days))
            .newer_noncurrent_versions(to_i32(rule.newer_noncurrent_versions))
            .build();
        let lifecycle_rule = s3::LifecycleRule::builder()
            .id(&rule.id)
            .status(s3::ExpirationStatus::Enabled)
            .filter(s3::LifecycleRuleFilter::builder().build())
            .noncurrent_version_expiration(expiration)
            .build()
            .map_err(|e| build_error("PutBucketLifecycleConfiguration", &e))?;
        let configuration = s3::BucketLifecycleConfiguration::builder()
            .rules(lifecycle_rule)
            .build()
            .map_err(|e| build_error("PutBucketLifecycleConfiguration", &e))?;

        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(bucket)
            .lifecycle_configuration(configuration)
            .transition_default_minimum_object_size(
                s3::TransitionDefaultMinimumObjectSize::AllStorageClasses128K,
            )
            .send()
            .await
            .map_err(|e| sdk_error("PutBucketLifecycleConfiguration", &e))?;
        Ok(())
    }

    async fn put_intelligent_tiering(&self, bucket: &str, rule: &TieringRule) -> ApiResult<()> {
        let tiers = [
            (rule.archive_access_days, s3::IntelligentTieringAccessTier::ArchiveAccess),
            (
                rule.deep_archive_access_days,
                s3::IntelligentTieringAccessTier::DeepArchiveAccess,
            ),
        ];
        let tierings = tiers
            .into_iter()
            .filter_map(|(days, tier)| days.map(|d| (d, tier)))
            .map(|(days, tier)| {
                s3::Tiering::builder()
                    .days(to_i32(days))
                    .access_tier(tier)
                    .build()
                    .map_err(|e| build_error("PutBucketIntelligentTieringConfiguration", &e))
            })
            .collect::<ApiResult<Vec<_>>>()?;

        let configuration = s3::IntelligentTieringConfiguration::builder()
            .id(&rule.id)
            .status(s3::IntelligentTieringStatus::Enabled)
            .set_tierings(Some(tierings))
            .build()
            .map_err(|e| build_error("PutBucketIntelligentTieringConfiguration", &e))?;

        self.client
            .put_bucket_intelligent_tiering_configuration()
            .bucket(bucket)
            .id(&rule.id)
            .intelligent_tiering_configuration(configuration)
            .send()
            .await
            .map_err(|e| sdk_error("PutBucketIntelligentTieringConfiguration", &e))?;
        Ok(())
    }

    async fn put_empty_object(&self, bucket: &str, key: &str) -> ApiResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|e| sdk_error("PutObject", &e))?;
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> ApiResult<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(sdk_error("HeadObject", &err)),
        }
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> ApiResult<ObjectPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| sdk_error("ListObjectsV2", &e))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(s3::Object::key)
            .map(ObjectIdentifier::new)
            .collect();
        let next_continuation_token = if output.is_truncated() == Some(true) {
            output.next_continuation_token().map(ToOwned::to_owned)
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_continuation_token,
        })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectIdentifier],
    ) -> ApiResult<Vec<DeleteFailure>> {
        let identifiers = objects
            .iter()
            .map(|o| {
                s3::ObjectIdentifier::builder()
                    .key(o.key())
                    .build()
                    .map_err(|e| build_error("DeleteObjects", &e))
            })
            .collect::<ApiResult<Vec<_>>>()?;
        let delete = s3::Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(|e| build_error("DeleteObjects", &e))?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteObjects", &e))?;

        Ok(output
            .errors()
            .iter()
            .map(|e| DeleteFailure {
                key: e.key().unwrap_or_default().to_owned(),
                code: e.code().map(ToOwned::to_owned),
                message: e.message().unwrap_or("unknown error").to_owned(),
            })
            .collect())
    }
}

/// [`KeyManager`] backed by `aws-sdk-kms`.
#[derive(Debug, Clone)]
pub struct AwsKeyManager {
    client: aws_sdk_kms::Client,
}

impl AwsKeyManager {
    /// Wrap a KMS client.
    #[must_use]
    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyManager for AwsKeyManager {
    async fn find_key_by_alias(&self, alias: &str) -> ApiResult<Option<String>> {
        match self.client.describe_key().key_id(alias).send().await {
            Ok(output) => Ok(output.key_metadata().map(|m| m.key_id().to_owned())),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(aws_sdk_kms::operation::describe_key::DescribeKeyError::is_not_found_exception) =>
            {
                Ok(None)
            }
            Err(err) => Err(sdk_error("DescribeKey", &err)),
        }
    }

    async fn create_key(&self, request: &CreateKeyRequest) -> ApiResult<String> {
        let tags = request
            .tags
            .iter()
            .map(|t| {
                aws_sdk_kms::types::Tag::builder()
                    .tag_key(&t.key)
                    .tag_value(&t.value)
                    .build()
                    .map_err(|e| build_error("CreateKey", &e))
            })
            .collect::<ApiResult<Vec<_>>>()?;

        let mut call = self
            .client
            .create_key()
            .description(&request.description)
            .key_usage(KeyUsageType::EncryptDecrypt)
            .key_spec(KeySpec::SymmetricDefault)
            .policy(&request.policy);
        if !tags.is_empty() {
            call = call.set_tags(Some(tags));
        }

        let output = call.send().await.map_err(|e| sdk_error("CreateKey", &e))?;
        output
            .key_metadata()
            .map(|m| m.key_id().to_owned())
            .ok_or_else(|| ApiError::new("CreateKey", "response did not include key metadata"))
    }

    async fn create_alias(&self, alias: &str, key_id: &str) -> ApiResult<()> {
        self.client
            .create_alias()
            .alias_name(alias)
            .target_key_id(key_id)
            .send()
            .await
            .map_err(|e| sdk_error("CreateAlias", &e))?;
        Ok(())
    }

    async fn schedule_key_deletion(&self, key_id: &str, pending_days: u32) -> ApiResult<()> {
        self.client
            .schedule_key_deletion()
            .key_id(key_id)
            .pending_window_in_days(to_i32(pending_days))
            .send()
            .await
            .map_err(|e| sdk_error("ScheduleKeyDeletion", &e))?;
        Ok(())
    }
}

/// [`ClientFactory`] that builds AWS SDK clients per region.
#[derive(Debug)]
pub struct AwsClientFactory {
    sdk_config: SdkConfig,
    force_path_style: bool,
    stores: RegionCache<AwsObjectStore>,
    key_managers: RegionCache<AwsKeyManager>,
    sts: aws_sdk_sts::Client,
}

impl AwsClientFactory {
    /// Load the ambient AWS configuration (credentials chain, profile) and
    /// apply the endpoint override from `config`.
    ///
    /// A custom endpoint switches S3 to path-style addressing, which local
    /// emulators require.
    pub async fn from_config(config: &StowageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.default_region.to_string()));
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;

        info!(
            default_region = %config.default_region,
            endpoint_url = ?config.endpoint_url,
            "loaded AWS configuration"
        );

        Self::new(sdk_config, config.endpoint_url.is_some())
    }

    /// Build a factory from an already loaded SDK configuration.
    #[must_use]
    pub fn new(sdk_config: SdkConfig, force_path_style: bool) -> Self {
        let sts = aws_sdk_sts::Client::new(&sdk_config);
        Self {
            sdk_config,
            force_path_style,
            stores: RegionCache::new(),
            key_managers: RegionCache::new(),
            sts,
        }
    }
}

#[async_trait]
impl ClientFactory for AwsClientFactory {
    fn object_store(&self, region: &AwsRegion) -> Arc<dyn ObjectStore> {
        self.stores.get_or_insert_with(region, || {
            debug!(%region, "building S3 client");
            let conf = aws_sdk_s3::config::Builder::from(&self.sdk_config)
                .region(Region::new(region.to_string()))
                .force_path_style(self.force_path_style)
                .build();
            AwsObjectStore::new(aws_sdk_s3::Client::from_conf(conf))
        })
    }

    fn key_manager(&self, region: &AwsRegion) -> Arc<dyn KeyManager> {
        self.key_managers.get_or_insert_with(region, || {
            debug!(%region, "building KMS client");
            let conf = aws_sdk_kms::config::Builder::from(&self.sdk_config)
                .region(Region::new(region.to_string()))
                .build();
            AwsKeyManager::new(aws_sdk_kms::Client::from_conf(conf))
        })
    }

    async fn account_id(&self) -> ApiResult<AccountId> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| sdk_error("GetCallerIdentity", &e))?;
        let account = output
            .account()
            .ok_or_else(|| ApiError::new("GetCallerIdentity", "response did not include an account"))?;
        AccountId::new(account).map_err(|e| ApiError::new("GetCallerIdentity", e.to_string()))
    }
}
