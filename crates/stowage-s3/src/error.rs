//! Reconciliation error types.
//!
//! Three layers, innermost first:
//!
//! - [`ApiError`]: one remote call failed.
//! - [`StepError`]: one reconciliation step failed, either because a remote
//!   call failed or because its policy template could not be read.
//! - [`ReconcileError`]: what the orchestrator returns, tagged with the
//!   bucket/prefix/object it was working on.
//!
//! [`ReconcileError`] converts into the caller-facing
//! [`FailedOperation`] through [`From`], preserving every accumulated
//! [`Problem`].
//!
//! # Usage
//!
//! ```
//! use stowage_model::FailedOperation;
//! use stowage_s3::error::{ErrorKind, ReconcileError};
//!
//! let err = ReconcileError::RegionConflict {
//!     bucket: "finance-reporting-prod3af1f".to_owned(),
//!     actual: "us-east-1".to_owned(),
//!     desired: "eu-west-1".to_owned(),
//! };
//! assert_eq!(err.kind(), ErrorKind::Precondition);
//! let failed: FailedOperation = err.into();
//! assert_eq!(failed.problems.len(), 1);
//! ```

use std::error::Error as _;
use std::fmt;
use std::time::Duration;

use stowage_model::{FailedOperation, Problem};

/// A single remote call that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct ApiError {
    /// Remote operation name (e.g. `PutBucketPolicy`).
    pub operation: &'static str,
    /// Service error code, when the service returned one.
    pub code: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl ApiError {
    /// Create an error without a service code.
    #[must_use]
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    /// Create an error carrying a service error code.
    #[must_use]
    pub fn with_code(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Convenience result type for remote calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Why a reconciliation step failed.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The remote service rejected the call or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A policy template could not be read.
    #[error("cannot read policy template {path}: {source}")]
    Template {
        /// Where the template was read from.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// The reconciliation step that was running when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Resolving the account the credentials belong to.
    ResolveAccount,
    /// Checking whether the bucket exists.
    CheckExistence,
    /// Creating the bucket.
    CreateBucket,
    /// Reading the bucket region.
    GetRegion,
    /// Waiting for a freshly created resource to become visible.
    AwaitExistence,
    /// Applying bucket tags.
    Tagging,
    /// Applying the access policy.
    AccessPolicy,
    /// Configuring server-side encryption.
    Encryption,
    /// Enabling versioning.
    Versioning,
    /// Installing the noncurrent-version lifecycle rule.
    Lifecycle,
    /// Installing the intelligent-tiering configuration.
    IntelligentTiering,
    /// Writing a folder marker.
    CreateFolder,
    /// Listing objects under a prefix.
    ListObjects,
    /// Deleting a batch of objects.
    DeleteObjects,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Self::ResolveAccount => "resolving the caller account",
            Self::CheckExistence => "checking the bucket existence",
            Self::CreateBucket => "creating the bucket",
            Self::GetRegion => "getting the region of the bucket",
            Self::AwaitExistence => "waiting for the resource to exist",
            Self::Tagging => "applying tags to the bucket",
            Self::AccessPolicy => "applying the access policy",
            Self::Encryption => "configuring encryption",
            Self::Versioning => "enabling versioning",
            Self::Lifecycle => "applying lifecycle configuration",
            Self::IntelligentTiering => "applying intelligent-tiering configuration",
            Self::CreateFolder => "creating the folder",
            Self::ListObjects => "listing objects",
            Self::DeleteObjects => "deleting objects",
        };
        f.write_str(action)
    }
}

/// The resource a failure refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A whole bucket.
    Bucket(String),
    /// One object in a bucket.
    Object {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },
    /// Every object under a prefix.
    Prefix {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
    },
}

impl Target {
    /// Target a bucket.
    #[must_use]
    pub fn bucket(bucket: &str) -> Self {
        Self::Bucket(bucket.to_owned())
    }

    /// Target an object.
    #[must_use]
    pub fn object(bucket: &str, key: &str) -> Self {
        Self::Object {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        }
    }

    /// Target a prefix.
    #[must_use]
    pub fn prefix(bucket: &str, prefix: &str) -> Self {
        Self::Prefix {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket(bucket) => write!(f, "[Bucket: {bucket}]"),
            Self::Object { bucket, key } => write!(f, "[Bucket: {bucket}, Object: {key}]"),
            Self::Prefix { bucket, prefix } => write!(f, "[Bucket: {bucket}, Prefix: {prefix}]"),
        }
    }
}

/// Coarse classification of a [`ReconcileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Region mismatch, invalid component, missing input. Never retried.
    Precondition,
    /// A remote call failed.
    Remote,
    /// The remote side accepted a change that did not become visible in time.
    Propagation,
    /// Some items of a batched operation failed.
    PartialBatch,
}

/// Error returned by the reconciliation engine.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The request is missing required input or names the wrong component type.
    #[error("{0}")]
    InvalidRequest(String),

    /// The storage specific violates one or more field constraints.
    #[error("Invalid storage specific for {component}: {}", violations.join("; "))]
    InvalidSpecific {
        /// Component name.
        component: String,
        /// One message per violated constraint.
        violations: Vec<String>,
    },

    /// The bucket exists in a region other than the desired one.
    #[error(
        "[Bucket: {bucket}] Error: The bucket already exists in region {actual} and cannot be created or updated in region {desired}."
    )]
    RegionConflict {
        /// Bucket name.
        bucket: String,
        /// Region the bucket lives in.
        actual: String,
        /// Region requested by the caller.
        desired: String,
    },

    /// A step failed.
    #[error("{target} Error: An unexpected error occurred while {step}. Details: {source}")]
    Step {
        /// What the step was working on.
        target: Target,
        /// Which step failed.
        step: Step,
        /// Why it failed.
        #[source]
        source: StepError,
    },

    /// A created resource did not become visible within the wait window.
    #[error(
        "{target} Error: The resource does not exist or an unexpected condition occurred (not confirmed within {}s).",
        timeout.as_secs()
    )]
    PropagationTimeout {
        /// The resource waited for.
        target: Target,
        /// The configured wait window.
        timeout: Duration,
    },

    /// One or more objects could not be deleted.
    #[error("{target} Error(s) during object deletion.")]
    PartialDeletion {
        /// The prefix being deleted.
        target: Target,
        /// One problem per object that failed to delete.
        problems: Vec<Problem>,
    },
}

impl ReconcileError {
    /// Wrap a step failure with its target.
    pub fn step(target: Target, step: Step, source: impl Into<StepError>) -> Self {
        Self::Step {
            target,
            step,
            source: source.into(),
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) | Self::InvalidSpecific { .. } | Self::RegionConflict { .. } => {
                ErrorKind::Precondition
            }
            Self::Step { .. } => ErrorKind::Remote,
            Self::PropagationTimeout { .. } => ErrorKind::Propagation,
            Self::PartialDeletion { .. } => ErrorKind::PartialBatch,
        }
    }
}

impl From<ReconcileError> for FailedOperation {
    fn from(err: ReconcileError) -> Self {
        let message = err.to_string();
        let problems = match err {
            ReconcileError::PartialDeletion { problems, .. } => problems,
            ReconcileError::InvalidSpecific { violations, .. } => {
                violations.into_iter().map(Problem::new).collect()
            }
            ReconcileError::Step { ref source, .. } => {
                let cause = source
                    .source()
                    .map_or_else(|| source.to_string(), ToString::to_string);
                vec![Problem::with_cause(message.clone(), cause)]
            }
            ReconcileError::InvalidRequest(_)
            | ReconcileError::RegionConflict { .. }
            | ReconcileError::PropagationTimeout { .. } => vec![Problem::new(message.clone())],
        };
        FailedOperation::new(message, problems)
    }
}

/// Convenience result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
