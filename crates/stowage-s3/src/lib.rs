//! Bucket reconciliation engine for Stowage storage areas.
//!
//! This crate makes an S3 bucket match a desired
//! [`StorageSpecific`](stowage_model::StorageSpecific) and manages one folder
//! per storage area inside it. It derives deterministic bucket names, drives
//! the ordered configuration sequence against an eventually consistent API,
//! waits for creations to propagate, deletes prefixes in bounded batches,
//! and reports every partial failure.
//!
//! # Architecture
//!
//! ```text
//! StorageAreaProvisioner (validate / provision / unprovision)
//!        |
//!        v
//! BucketReconciler (reconcile, create_folder, delete_by_prefix)
//!        |            |
//!        v            v
//!   ops::* steps   waiter (bounded existence polling)
//!        |
//!        v
//! ObjectStore / KeyManager traits  <-- ClientFactory (one client per region)
//!        |
//!        v
//!   AWS SDK (aws-sdk-s3, aws-sdk-kms, aws-sdk-sts)
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod naming;
pub mod ops;
pub mod policy;
pub mod provisioner;
pub mod reconciler;
pub mod waiter;

#[cfg(test)]
pub(crate) mod testing;

pub use client::aws::AwsClientFactory;
pub use client::{ClientFactory, KeyManager, ObjectStore};
pub use config::ReconcilerConfig;
pub use error::{ReconcileError, ReconcileResult};
pub use naming::{BucketName, derive_bucket_name};
pub use provisioner::StorageAreaProvisioner;
pub use reconciler::BucketReconciler;
