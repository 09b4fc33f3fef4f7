//! In-memory stand-in for the remote services, for unit tests.
//!
//! [`FakeCloud`] implements [`ObjectStore`], [`KeyManager`] and
//! [`ClientFactory`] over one shared state. It records every call, pages
//! listings, hides freshly created resources for a configurable number of
//! checks, fails chosen operations, and reports per-item delete errors.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use stowage_core::{AccountId, AwsRegion};
use stowage_model::BucketTag;

use crate::client::{
    BucketEncryption, ClientFactory, CreateKeyRequest, DeleteFailure, KeyManager,
    NoncurrentExpirationRule, ObjectIdentifier, ObjectPage, ObjectStore, TieringRule,
};
use crate::error::{ApiError, ApiResult};
use crate::ops::delete::MAX_DELETE_BATCH;

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ListBuckets,
    CreateBucket { bucket: String, region: String },
    HeadBucket { bucket: String },
    GetBucketLocation { bucket: String },
    PutBucketTagging { bucket: String },
    PutBucketPolicy { bucket: String, policy: String },
    GetBucketEncryption { bucket: String },
    PutBucketEncryption { bucket: String, encryption: BucketEncryption },
    PutBucketVersioning { bucket: String },
    PutBucketLifecycleConfiguration { bucket: String },
    PutBucketIntelligentTieringConfiguration { bucket: String },
    PutObject { bucket: String, key: String },
    HeadObject { bucket: String, key: String },
    ListObjectsV2 { bucket: String, prefix: String },
    DeleteObjects { bucket: String, keys: Vec<String> },
    DescribeKey { alias: String },
    CreateKey,
    CreateAlias { alias: String, key_id: String },
    ScheduleKeyDeletion { key_id: String, pending_days: u32 },
    GetCallerIdentity,
}

impl Call {
    /// Remote operation name.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::ListBuckets => "ListBuckets",
            Self::CreateBucket { .. } => "CreateBucket",
            Self::HeadBucket { .. } => "HeadBucket",
            Self::GetBucketLocation { .. } => "GetBucketLocation",
            Self::PutBucketTagging { .. } => "PutBucketTagging",
            Self::PutBucketPolicy { .. } => "PutBucketPolicy",
            Self::GetBucketEncryption { .. } => "GetBucketEncryption",
            Self::PutBucketEncryption { .. } => "PutBucketEncryption",
            Self::PutBucketVersioning { .. } => "PutBucketVersioning",
            Self::PutBucketLifecycleConfiguration { .. } => "PutBucketLifecycleConfiguration",
            Self::PutBucketIntelligentTieringConfiguration { .. } => {
                "PutBucketIntelligentTieringConfiguration"
            }
            Self::PutObject { .. } => "PutObject",
            Self::HeadObject { .. } => "HeadObject",
            Self::ListObjectsV2 { .. } => "ListObjectsV2",
            Self::DeleteObjects { .. } => "DeleteObjects",
            Self::DescribeKey { .. } => "DescribeKey",
            Self::CreateKey => "CreateKey",
            Self::CreateAlias { .. } => "CreateAlias",
            Self::ScheduleKeyDeletion { .. } => "ScheduleKeyDeletion",
            Self::GetCallerIdentity => "GetCallerIdentity",
        }
    }

    /// Calls that remove data or leave a new resource behind on every run.
    pub(crate) fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DeleteObjects { .. } | Self::CreateKey | Self::CreateAlias { .. }
        )
    }
}

/// Observable state of one fake bucket.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeBucket {
    pub(crate) region: String,
    pub(crate) tags: Vec<BucketTag>,
    pub(crate) policy: Option<String>,
    pub(crate) encryption: Option<BucketEncryption>,
    pub(crate) versioning: bool,
    pub(crate) lifecycle: Option<NoncurrentExpirationRule>,
    pub(crate) tiering: Option<TieringRule>,
    objects: BTreeSet<String>,
    hidden_checks: u32,
}

#[derive(Debug)]
struct State {
    buckets: BTreeMap<String, FakeBucket>,
    hidden_objects: HashMap<(String, String), u32>,
    calls: Vec<Call>,
    failures: HashMap<String, String>,
    visibility_delay: u32,
    page_size: usize,
    delete_item_errors: HashMap<usize, usize>,
    delete_batches: usize,
    aliases: HashMap<String, String>,
    created_keys: Vec<CreateKeyRequest>,
    pending_deletion: Vec<String>,
    requested_regions: Vec<AwsRegion>,
    account: AccountId,
}

/// Shared in-memory object store, key manager, and client factory.
#[derive(Debug, Clone)]
pub(crate) struct FakeCloud {
    state: Arc<Mutex<State>>,
}

impl FakeCloud {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                buckets: BTreeMap::new(),
                hidden_objects: HashMap::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
                visibility_delay: 0,
                page_size: MAX_DELETE_BATCH,
                delete_item_errors: HashMap::new(),
                delete_batches: 0,
                aliases: HashMap::new(),
                created_keys: Vec::new(),
                pending_deletion: Vec::new(),
                requested_regions: Vec::new(),
                account: AccountId::default(),
            })),
        }
    }

    // -- setup --------------------------------------------------------------

    /// Add an existing bucket; `region` is stored as the raw location.
    pub(crate) fn seed_bucket(&self, bucket: &str, region: &str) {
        self.state.lock().buckets.insert(
            bucket.to_owned(),
            FakeBucket {
                region: region.to_owned(),
                ..FakeBucket::default()
            },
        );
    }

    /// Add visible objects to an existing bucket.
    pub(crate) fn seed_objects(&self, bucket: &str, keys: Vec<String>) {
        if let Some(b) = self.state.lock().buckets.get_mut(bucket) {
            b.objects.extend(keys);
        }
    }

    pub(crate) fn set_encryption(&self, bucket: &str, encryption: BucketEncryption) {
        if let Some(b) = self.state.lock().buckets.get_mut(bucket) {
            b.encryption = Some(encryption);
        }
    }

    /// Hide every resource created from now on for `checks` existence checks.
    pub(crate) fn set_visibility_delay(&self, checks: u32) {
        self.state.lock().visibility_delay = checks;
    }

    /// Make every call to `operation` fail with `code`.
    pub(crate) fn fail_on(&self, operation: &str, code: &str) {
        self.state
            .lock()
            .failures
            .insert(operation.to_owned(), code.to_owned());
    }

    pub(crate) fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub(crate) fn set_page_size(&self, page_size: usize) {
        self.state.lock().page_size = page_size.max(1);
    }

    /// Make the first `count` keys of delete batch `batch` (zero-based) fail.
    pub(crate) fn fail_delete_items(&self, batch: usize, count: usize) {
        self.state.lock().delete_item_errors.insert(batch, count);
    }

    pub(crate) fn set_account(&self, account: AccountId) {
        self.state.lock().account = account;
    }

    // -- inspection ---------------------------------------------------------

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub(crate) fn bucket(&self, bucket: &str) -> Option<FakeBucket> {
        self.state.lock().buckets.get(bucket).cloned()
    }

    /// Keys currently stored in `bucket`, sorted.
    pub(crate) fn objects(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .buckets
            .get(bucket)
            .map(|b| b.objects.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn created_keys(&self) -> Vec<CreateKeyRequest> {
        self.state.lock().created_keys.clone()
    }

    /// Keys scheduled for deletion, in call order.
    pub(crate) fn pending_deletion(&self) -> Vec<String> {
        self.state.lock().pending_deletion.clone()
    }

    pub(crate) fn alias(&self, alias: &str) -> Option<String> {
        self.state.lock().aliases.get(alias).cloned()
    }

    pub(crate) fn requested_regions(&self) -> Vec<AwsRegion> {
        self.state.lock().requested_regions.clone()
    }

    // -- internals ----------------------------------------------------------

    /// Record `call` and return the injected failure for it, if any.
    fn record(&self, call: Call) -> ApiResult<()> {
        let mut state = self.state.lock();
        let operation = call.name();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(code) => Err(ApiError::with_code(
                operation,
                code.clone(),
                format!("injected {code}"),
            )),
            None => Ok(()),
        }
    }

    fn with_bucket<T>(
        &self,
        operation: &'static str,
        bucket: &str,
        f: impl FnOnce(&mut FakeBucket) -> T,
    ) -> ApiResult<T> {
        let mut state = self.state.lock();
        state
            .buckets
            .get_mut(bucket)
            .map(f)
            .ok_or_else(|| no_such_bucket(operation, bucket))
    }
}

fn no_such_bucket(operation: &'static str, bucket: &str) -> ApiError {
    ApiError::with_code(
        operation,
        "NoSuchBucket",
        format!("The specified bucket does not exist: {bucket}"),
    )
}

#[async_trait]
impl ObjectStore for FakeCloud {
    async fn list_bucket_names(&self) -> ApiResult<Vec<String>> {
        self.record(Call::ListBuckets)?;
        Ok(self.state.lock().buckets.keys().cloned().collect())
    }

    async fn create_bucket(&self, bucket: &str, region: &AwsRegion) -> ApiResult<()> {
        self.record(Call::CreateBucket {
            bucket: bucket.to_owned(),
            region: region.to_string(),
        })?;
        let mut state = self.state.lock();
        let hidden_checks = state.visibility_delay;
        state.buckets.entry(bucket.to_owned()).or_insert(FakeBucket {
            region: region.to_string(),
            hidden_checks,
            ..FakeBucket::default()
        });
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> ApiResult<bool> {
        self.record(Call::HeadBucket {
            bucket: bucket.to_owned(),
        })?;
        let mut state = self.state.lock();
        Ok(match state.buckets.get_mut(bucket) {
            Some(b) if b.hidden_checks > 0 => {
                b.hidden_checks -= 1;
                false
            }
            Some(_) => true,
            None => false,
        })
    }

    async fn bucket_location(&self, bucket: &str) -> ApiResult<Option<String>> {
        self.record(Call::GetBucketLocation {
            bucket: bucket.to_owned(),
        })?;
        self.with_bucket("GetBucketLocation", bucket, |b| {
            (b.region != AwsRegion::DEFAULT).then(|| b.region.clone())
        })
    }

    async fn put_bucket_tagging(&self, bucket: &str, tags: &[BucketTag]) -> ApiResult<()> {
        self.record(Call::PutBucketTagging {
            bucket: bucket.to_owned(),
        })?;
        self.with_bucket("PutBucketTagging", bucket, |b| b.tags = tags.to_vec())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> ApiResult<()> {
        self.record(Call::PutBucketPolicy {
            bucket: bucket.to_owned(),
            policy: policy.to_owned(),
        })?;
        self.with_bucket("PutBucketPolicy", bucket, |b| {
            b.policy = Some(policy.to_owned());
        })
    }

    async fn get_bucket_encryption(&self, bucket: &str) -> ApiResult<Option<BucketEncryption>> {
        self.record(Call::GetBucketEncryption {
            bucket: bucket.to_owned(),
        })?;
        self.with_bucket("GetBucketEncryption", bucket, |b| b.encryption.clone())
    }

    async fn put_bucket_encryption(
        &self,
        bucket: &str,
        encryption: &BucketEncryption,
    ) -> ApiResult<()> {
        self.record(Call::PutBucketEncryption {
            bucket: bucket.to_owned(),
            encryption: encryption.clone(),
        })?;
        self.with_bucket("PutBucketEncryption", bucket, |b| {
            b.encryption = Some(encryption.clone());
        })
    }

    async fn enable_versioning(&self, bucket: &str) -> ApiResult<()> {
        self.record(Call::PutBucketVersioning {
            bucket: bucket.to_owned(),
        })?;
        self.with_bucket("PutBucketVersioning", bucket, |b| b.versioning = true)
    }

    async fn put_noncurrent_expiration(
        &self,
        bucket: &str,
        rule: &NoncurrentExpirationRule,
    ) -> ApiResult<()> {
        self.record(Call::PutBucketLifecycleConfiguration {
            bucket: bucket.to_owned(),
        })?;
        self.with_bucket("PutBucketLifecycleConfiguration", bucket, |b| {
            b.lifecycle = Some(rule.clone());
        })
    }

    async fn put_intelligent_tiering(&self, bucket: &str, rule: &TieringRule) -> ApiResult<()> {
        self.record(Call::PutBucketIntelligentTieringConfiguration {
            bucket: bucket.to_owned(),
        })?;
        self.with_bucket("PutBucketIntelligentTieringConfiguration", bucket, |b| {
            b.tiering = Some(rule.clone());
        })
    }

    async fn put_empty_object(&self, bucket: &str, key: &str) -> ApiResult<()> {
        self.record(Call::PutObject {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })?;
        self.with_bucket("PutObject", bucket, |b| b.objects.insert(key.to_owned()))?;
        let mut state = self.state.lock();
        let delay = state.visibility_delay;
        if delay > 0 {
            state
                .hidden_objects
                .insert((bucket.to_owned(), key.to_owned()), delay);
        }
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> ApiResult<bool> {
        self.record(Call::HeadObject {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })?;
        let mut state = self.state.lock();
        if let Some(remaining) = state
            .hidden_objects
            .get_mut(&(bucket.to_owned(), key.to_owned()))
        {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(false);
            }
        }
        Ok(state
            .buckets
            .get(bucket)
            .is_some_and(|b| b.objects.contains(key)))
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> ApiResult<ObjectPage> {
        self.record(Call::ListObjectsV2 {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
        })?;
        let page_size = self.state.lock().page_size;
        let start: usize = continuation_token
            .as_deref()
            .map_or(0, |t| t.parse().expect("fake continuation token"));

        self.with_bucket("ListObjectsV2", bucket, |b| {
            let matching: Vec<&String> = b.objects.iter().filter(|k| k.starts_with(prefix)).collect();
            let end = (start + page_size).min(matching.len());
            ObjectPage {
                objects: matching[start..end]
                    .iter()
                    .map(|k| ObjectIdentifier::new(k.as_str()))
                    .collect(),
                next_continuation_token: (end < matching.len()).then(|| end.to_string()),
            }
        })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectIdentifier],
    ) -> ApiResult<Vec<DeleteFailure>> {
        self.record(Call::DeleteObjects {
            bucket: bucket.to_owned(),
            keys: objects.iter().map(|o| o.key().to_owned()).collect(),
        })?;
        if objects.len() > MAX_DELETE_BATCH {
            return Err(ApiError::with_code(
                "DeleteObjects",
                "MalformedXML",
                "too many keys in one request",
            ));
        }

        let mut state = self.state.lock();
        let batch = state.delete_batches;
        state.delete_batches += 1;
        let failing = state.delete_item_errors.get(&batch).copied().unwrap_or(0);

        let b = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket("DeleteObjects", bucket))?;
        let mut failures = Vec::new();
        for (i, object) in objects.iter().enumerate() {
            if i < failing {
                failures.push(DeleteFailure {
                    key: object.key().to_owned(),
                    code: Some("AccessDenied".to_owned()),
                    message: "Access Denied".to_owned(),
                });
            } else {
                b.objects.remove(object.key());
            }
        }
        Ok(failures)
    }
}

#[async_trait]
impl KeyManager for FakeCloud {
    async fn find_key_by_alias(&self, alias: &str) -> ApiResult<Option<String>> {
        self.record(Call::DescribeKey {
            alias: alias.to_owned(),
        })?;
        Ok(self.state.lock().aliases.get(alias).cloned())
    }

    async fn create_key(&self, request: &CreateKeyRequest) -> ApiResult<String> {
        self.record(Call::CreateKey)?;
        let mut state = self.state.lock();
        state.created_keys.push(request.clone());
        Ok(format!("key-{}", state.created_keys.len()))
    }

    async fn create_alias(&self, alias: &str, key_id: &str) -> ApiResult<()> {
        self.record(Call::CreateAlias {
            alias: alias.to_owned(),
            key_id: key_id.to_owned(),
        })?;
        let mut state = self.state.lock();
        if state.aliases.contains_key(alias) {
            return Err(ApiError::with_code(
                "CreateAlias",
                "AlreadyExistsException",
                format!("An alias with the name {alias} already exists"),
            ));
        }
        state.aliases.insert(alias.to_owned(), key_id.to_owned());
        Ok(())
    }

    async fn schedule_key_deletion(&self, key_id: &str, pending_days: u32) -> ApiResult<()> {
        self.record(Call::ScheduleKeyDeletion {
            key_id: key_id.to_owned(),
            pending_days,
        })?;
        self.state.lock().pending_deletion.push(key_id.to_owned());
        Ok(())
    }
}

#[async_trait]
impl ClientFactory for FakeCloud {
    fn object_store(&self, region: &AwsRegion) -> Arc<dyn ObjectStore> {
        self.state.lock().requested_regions.push(region.clone());
        Arc::new(self.clone())
    }

    fn key_manager(&self, _region: &AwsRegion) -> Arc<dyn KeyManager> {
        Arc::new(self.clone())
    }

    async fn account_id(&self) -> ApiResult<AccountId> {
        self.record(Call::GetCallerIdentity)?;
        Ok(self.state.lock().account.clone())
    }
}
