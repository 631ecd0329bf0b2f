//! Group definitions and the catalog of group types.
//!
//! A group type implements [`ServiceGroup`]: it declares its settings shape,
//! how to construct an instance from those settings, and the list of
//! operations it exposes. Group types are registered explicitly in a
//! [`GroupCatalog`]; there is no process-wide registry.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::{handler::server::tool::cached_schema_for_type, model::JsonObject};
use schemars::JsonSchema;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::{GroupConfig, SettingsPolicy};
use super::error::LoadError;
use super::operation::{BoundHandler, Operation, OperationMetadata};

/// A named collection of operations sharing group-local state.
///
/// One instance is created per configured group and lives for the whole
/// process. Operations run concurrently against the same instance, so any
/// mutable state must carry its own synchronization.
pub trait ServiceGroup: Send + Sync + Sized + 'static {
    /// Registered type name, referenced by `GroupConfig::kind`.
    const KIND: &'static str;

    /// Description of the group type.
    const DESCRIPTION: &'static str = "";

    /// Shape of the group-local settings.
    type Settings: DeserializeOwned + JsonSchema + 'static;

    /// Construct an instance from validated settings.
    fn new(settings: Self::Settings) -> anyhow::Result<Self>;

    /// The operations this group exposes, in declaration order.
    fn operations() -> Vec<Operation<Self>>;
}

/// Settings type for groups that take no configuration.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoSettings {}

/// Operations of a freshly constructed group, bound to the instance.
pub(crate) type BoundOperations = Vec<(OperationMetadata, BoundHandler)>;

type Factory = Box<dyn Fn(&GroupConfig, SettingsPolicy) -> Result<BoundOperations, LoadError> + Send + Sync>;

/// Static description of a registered group type.
#[derive(Debug, Clone)]
pub struct GroupDescription {
    pub kind: &'static str,
    pub description: &'static str,
    pub settings_schema: Arc<JsonObject>,
    pub operations: Vec<OperationMetadata>,
}

struct CatalogEntry {
    kind: &'static str,
    describe: fn() -> GroupDescription,
    factory: Factory,
}

/// Explicit mapping from group kind to group type.
#[derive(Default)]
pub struct GroupCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<&'static str, usize>,
}

impl std::fmt::Debug for GroupCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupCatalog")
            .field("kinds", &self.kinds().collect::<Vec<_>>())
            .finish()
    }
}

impl GroupCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group type. A later registration of the same kind
    /// replaces the earlier one.
    pub fn register<G: ServiceGroup>(&mut self) -> &mut Self {
        let entry = CatalogEntry {
            kind: G::KIND,
            describe: describe::<G>,
            factory: Box::new(instantiate::<G>),
        };
        match self.index.get(G::KIND) {
            Some(&i) => {
                warn!("Group kind '{}' registered twice, keeping the latest", G::KIND);
                self.entries[i] = entry;
            }
            None => {
                self.index.insert(G::KIND, self.entries.len());
                self.entries.push(entry);
            }
        }
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<G: ServiceGroup>(mut self) -> Self {
        self.register::<G>();
        self
    }

    /// Whether a kind is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.index.contains_key(kind)
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.kind)
    }

    /// Describe a registered group type without instantiating it.
    pub fn describe(&self, kind: &str) -> Option<GroupDescription> {
        self.index.get(kind).map(|&i| (self.entries[i].describe)())
    }

    /// Construct the group named by `config` and bind its operations.
    pub(crate) fn instantiate(
        &self,
        config: &GroupConfig,
        policy: SettingsPolicy,
    ) -> Result<BoundOperations, LoadError> {
        let kind = config.kind();
        let &i = self.index.get(kind).ok_or_else(|| LoadError::UnknownGroup {
            group_id: config.group_id.clone(),
            kind: kind.to_string(),
        })?;
        (self.entries[i].factory)(config, policy)
    }
}

fn describe<G: ServiceGroup>() -> GroupDescription {
    GroupDescription {
        kind: G::KIND,
        description: G::DESCRIPTION,
        settings_schema: cached_schema_for_type::<G::Settings>(),
        operations: G::operations()
            .iter()
            .map(|op| op.metadata().clone())
            .collect(),
    }
}

/// Keys present in `settings` that the settings schema does not declare.
fn unknown_keys(settings: &JsonObject, schema: &JsonObject) -> Vec<String> {
    let known = schema.get("properties").and_then(|p| p.as_object());
    settings
        .keys()
        .filter(|key| known.is_none_or(|props| !props.contains_key(*key)))
        .cloned()
        .collect()
}

fn instantiate<G: ServiceGroup>(
    config: &GroupConfig,
    policy: SettingsPolicy,
) -> Result<BoundOperations, LoadError> {
    let group_id = &config.group_id;

    let unknown = unknown_keys(&config.config, &cached_schema_for_type::<G::Settings>());
    if !unknown.is_empty() {
        match policy {
            SettingsPolicy::Strict => {
                return Err(LoadError::configuration(
                    group_id,
                    format!("unknown settings: {}", unknown.join(", ")),
                ));
            }
            SettingsPolicy::Lenient => {
                warn!(group = %group_id, "Ignoring unknown settings: {}", unknown.join(", "));
            }
        }
    }

    let settings: G::Settings =
        serde_json::from_value(serde_json::Value::Object(config.config.clone()))
            .map_err(|e| LoadError::configuration(group_id, e.to_string()))?;

    let group = Arc::new(
        G::new(settings).map_err(|e| LoadError::configuration(group_id, format!("{:#}", e)))?,
    );

    let operations = G::operations();

    let mut seen: Vec<&str> = Vec::with_capacity(operations.len());
    for op in &operations {
        let name = op.metadata().name();
        if seen.contains(&name) {
            return Err(LoadError::duplicate(format!("{}.{}", group_id, name)));
        }
        seen.push(name);
    }

    if let Some(stray) = config.timeouts.keys().find(|k| !seen.contains(&k.as_str())) {
        return Err(LoadError::configuration(
            group_id,
            format!("timeout override for unknown operation '{}'", stray),
        ));
    }

    debug!(group = %group_id, kind = G::KIND, "Constructed group with {} operations", operations.len());

    Ok(operations
        .into_iter()
        .map(|op| op.bind(group.clone()))
        .collect())
}
