//! Operation results reported back to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One thing that went wrong during an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    /// What failed, with enough context (bucket, prefix, key) to act on.
    pub message: String,
    /// Rendered underlying cause, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl Problem {
    /// A problem without an underlying cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// A problem caused by another error.
    #[must_use]
    pub fn with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}

/// A failed operation: a summary plus every problem collected along the way.
///
/// # Examples
///
/// ```
/// use stowage_model::FailedOperation;
///
/// let failed = FailedOperation::single("Component is missing");
/// assert_eq!(failed.problems.len(), 1);
/// assert_eq!(failed.to_string(), "Component is missing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct FailedOperation {
    /// Summary of the failure.
    pub message: String,
    /// Ordered sub-problems.
    pub problems: Vec<Problem>,
}

impl FailedOperation {
    /// Create a failed operation from a summary and its problems.
    #[must_use]
    pub fn new(message: impl Into<String>, problems: Vec<Problem>) -> Self {
        Self {
            message: message.into(),
            problems,
        }
    }

    /// A failure whose only problem repeats the summary.
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            problems: vec![Problem::new(message.clone())],
            message,
        }
    }
}

/// A labelled value shown to users after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoEntry {
    /// Value type; always `string` for entries produced here.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable label.
    pub label: String,
    /// The value itself.
    pub value: String,
}

impl InfoEntry {
    /// A string entry.
    #[must_use]
    pub fn string(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: "string".to_owned(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Information returned by a successful provision or unprovision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionInfo {
    /// Entries visible to every consumer.
    pub public_info: BTreeMap<String, InfoEntry>,
    /// Entries visible to the owner only.
    pub private_info: BTreeMap<String, InfoEntry>,
}

impl ProvisionInfo {
    /// Publish the same entries publicly and privately.
    #[must_use]
    pub fn shared(entries: BTreeMap<String, InfoEntry>) -> Self {
        Self {
            public_info: entries.clone(),
            private_info: entries,
        }
    }
}
