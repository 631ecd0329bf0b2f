//! Configuration model consumed by the dispatcher.
//!
//! These are plain data records. Parsing them from disk is the job of
//! `core::loader`; once loaded they are never mutated.

use std::collections::BTreeMap;
use std::time::Duration;

use rmcp::model::JsonObject;
use serde::{Deserialize, Serialize};

use super::error::LoadError;

/// Convert a timeout given in seconds. Zero, negative, NaN and infinite
/// values are rejected.
pub fn positive_seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|duration| !duration.is_zero())
}

/// Settings for one configured group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Identifier used as the qualified-name prefix (`<group_id>.<op>`).
    #[serde(alias = "name")]
    pub group_id: String,

    /// Registered group type to instantiate. Defaults to `group_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Human-readable description of the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Group-local settings handed to the group constructor.
    #[serde(default)]
    pub config: JsonObject,

    /// Packages the group expects to be available. Informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    /// Per-operation timeout overrides, in seconds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timeouts: BTreeMap<String, f64>,
}

impl GroupConfig {
    /// Create a group entry with no settings.
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            kind: None,
            description: None,
            config: JsonObject::new(),
            packages: Vec::new(),
            timeouts: BTreeMap::new(),
        }
    }

    /// Set the group type to instantiate.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Add a group-local setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Override the timeout of one operation.
    pub fn with_timeout(mut self, operation: impl Into<String>, timeout: Duration) -> Self {
        self.timeouts.insert(operation.into(), timeout.as_secs_f64());
        self
    }

    /// The registered group type this entry refers to.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.group_id)
    }

    /// The validated timeout override for `operation`, if any.
    pub fn timeout_for(&self, operation: &str) -> Result<Option<Duration>, LoadError> {
        self.timeouts
            .get(operation)
            .map(|secs| {
                positive_seconds(*secs).ok_or_else(|| {
                    LoadError::configuration(
                        &self.group_id,
                        format!("invalid timeout {} for operation '{}'", secs, operation),
                    )
                })
            })
            .transpose()
    }
}

/// A complete service: a name plus an ordered list of groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name reported to clients.
    pub name: String,

    /// Human-readable description of the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Groups to load, in order.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl ServiceConfig {
    /// Create an empty service.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            groups: Vec::new(),
        }
    }

    /// Append a group.
    pub fn with_group(mut self, group: GroupConfig) -> Self {
        self.groups.push(group);
        self
    }

    /// Wrap a single group into a one-group service named after it.
    pub fn from_group(group: GroupConfig) -> Self {
        Self {
            name: group.group_id.clone(),
            description: group.description.clone(),
            groups: vec![group],
        }
    }

    /// Find a group entry by id.
    pub fn group(&self, group_id: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    /// Narrow the service down to a single group.
    pub fn select_group(&self, group_id: &str) -> Option<Self> {
        self.group(group_id).map(|group| Self {
            name: self.name.clone(),
            description: self.description.clone(),
            groups: vec![group.clone()],
        })
    }
}

/// How unknown keys in a group's settings are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsPolicy {
    /// Unknown keys are logged and ignored.
    #[default]
    Lenient,
    /// Unknown keys fail group construction.
    Strict,
}

impl std::str::FromStr for SettingsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown settings policy: {}", other)),
        }
    }
}
