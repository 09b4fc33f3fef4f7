//! Provisioning requests.

use serde::{Deserialize, Serialize};

use crate::specific::StorageSpecific;

/// A request to provision, unprovision, or validate one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    /// The data product owning the component.
    pub data_product: DataProduct,
    /// The component to act on. Requests without one are rejected.
    #[serde(default)]
    pub component: Option<Component>,
}

/// The logical owner of a storage area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProduct {
    /// Fully qualified data product identifier.
    #[serde(default)]
    pub id: String,
    /// Data product name.
    pub name: String,
    /// Business domain.
    pub domain: String,
    /// Deployment environment (e.g. `dev`, `prod`).
    pub environment: String,
    /// Data product version.
    #[serde(default)]
    pub version: Option<String>,
}

impl DataProduct {
    /// Major version of the data product.
    ///
    /// Taken from the last segment of the id
    /// (`urn:dmb:dp:{domain}:{product}:{major}`) when it is numeric, otherwise
    /// from the leading part of `version`.
    #[must_use]
    pub fn major_version(&self) -> Option<&str> {
        let from_id = self.id.rsplit(':').next().map(str::trim).filter(|s| is_major(s));
        from_id.or_else(|| {
            self.version
                .as_deref()
                .and_then(|v| v.trim().trim_start_matches('v').split('.').next())
                .filter(|s| is_major(s))
        })
    }
}

fn is_major(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// A data product component, tagged by `kind`.
///
/// Only [`Component::StorageArea`] carries a [`StorageSpecific`]; the kind
/// is checked once when the request enters the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Component {
    /// A storage area backed by an object-storage bucket.
    StorageArea(StorageArea),
    /// A workload; not handled by this provisioner.
    Workload(OpaqueComponent),
    /// An output port; not handled by this provisioner.
    OutputPort(OpaqueComponent),
}

impl Component {
    /// Component identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::StorageArea(c) => &c.id,
            Self::Workload(c) | Self::OutputPort(c) => &c.id,
        }
    }

    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::StorageArea(c) => &c.name,
            Self::Workload(c) | Self::OutputPort(c) => &c.name,
        }
    }

    /// The `kind` tag as it appears on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageArea(_) => "storageArea",
            Self::Workload(_) => "workload",
            Self::OutputPort(_) => "outputPort",
        }
    }

    /// Borrow the storage area, if this component is one.
    #[must_use]
    pub fn as_storage_area(&self) -> Option<&StorageArea> {
        match self {
            Self::StorageArea(c) => Some(c),
            Self::Workload(_) | Self::OutputPort(_) => None,
        }
    }
}

/// A storage-area component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageArea {
    /// Component URN, e.g. `urn:dmb:cmp:finance:reporting:0:raw-storage-area`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Desired bucket state.
    pub specific: StorageSpecific,
}

impl StorageArea {
    /// Name of the folder this component owns inside the bucket.
    ///
    /// This is the last `:`-separated segment of the component id, or the
    /// display name when the id is blank.
    #[must_use]
    pub fn folder_name(&self) -> &str {
        self.id
            .rsplit(':')
            .map(str::trim)
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.name.as_str())
    }

    /// Major version carried by the component id
    /// (`urn:dmb:cmp:{domain}:{product}:{major}:{component}`).
    #[must_use]
    pub fn major_version(&self) -> Option<&str> {
        self.id.rsplit(':').nth(1).map(str::trim).filter(|s| is_major(s))
    }

    /// Path of the folder this component owns, `v{major}/{folder_name}`.
    ///
    /// Each major version of a data product gets its own subtree, so
    /// unprovisioning one major never touches another's objects. The major
    /// comes from the component id, then from `data_product`, then `0`.
    #[must_use]
    pub fn folder_path(&self, data_product: &DataProduct) -> String {
        let major = self
            .major_version()
            .or_else(|| data_product.major_version())
            .unwrap_or("0");
        format!("v{major}/{}", self.folder_name())
    }
}

/// A component kind this provisioner does not manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueComponent {
    /// Component identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Kind-specific payload, kept verbatim.
    #[serde(default)]
    pub specific: serde_json::Value,
}
