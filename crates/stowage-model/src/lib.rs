//! Request and response data model for Stowage provisioning.
//!
//! These types are owned by the caller and are read-only to the
//! reconciliation engine. They deserialize from the camelCase JSON documents
//! produced by the provisioning protocol:
//!
//! ```text
//! ProvisionRequest
//!   ├── DataProduct (domain, name, environment)
//!   └── Component (tagged by `kind`)
//!         └── StorageArea
//!               └── StorageSpecific (region, encryption, versioning, tags, ...)
//! ```

pub mod request;
pub mod response;
pub mod specific;

pub use request::{Component, DataProduct, OpaqueComponent, ProvisionRequest, StorageArea};
pub use response::{FailedOperation, InfoEntry, Problem, ProvisionInfo};
pub use specific::{
    BucketTag, EncryptionMode, IntelligentTieringPolicy, LifecycleConfiguration,
    NoncurrentRetention, StorageSpecific,
};
