use std::{
    path::Path,
    sync::{Arc, OnceLock},
};

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{
    FactoryError, Pipeline, PipelineError, PipelineFactory, PipelineOptions,
    builtin::{Builtin, ProviderModule},
};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unknown pipeline: {name}. Available: {known:?}")]
    NotFound { name: String, known: Vec<String> },

    #[error("Pipeline '{name}' is not available. {reason}. Available pipelines: {available:?}")]
    Unavailable {
        name: String,
        reason: String,
        available: Vec<String>,
    },

    #[error(
        "Pipeline '{name}' is not available because an optional dependency is missing: {detail}. \
         Install the required dependency for '{name}', or switch provider to 'realtimex'/'lightrag'."
    )]
    MissingDependency { name: String, detail: String },

    #[error("Pipeline '{name}' failed to start: {source}")]
    Factory {
        name: String,
        #[source]
        source: PipelineError,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_hint: Option<String>,
}

#[derive(Clone)]
struct Entry {
    position: usize,
    descriptor: ProviderDescriptor,
    factory: Option<PipelineFactory>,
}

/// Provider id to pipeline factory.
///
/// The module table is loaded and probed on first use. Unknown ids and known
/// but unavailable ids fail with different errors.
pub struct PipelineRegistry {
    modules: Vec<Arc<dyn ProviderModule>>,
    entries: OnceLock<DashMap<String, Entry>>,
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::with_modules(
            Builtin::all()
                .into_iter()
                .map(|b| Arc::new(b) as Arc<dyn ProviderModule>)
                .collect(),
        )
    }

    pub fn with_modules(modules: Vec<Arc<dyn ProviderModule>>) -> Self {
        Self {
            modules,
            entries: OnceLock::new(),
        }
    }

    fn entries(&self) -> &DashMap<String, Entry> {
        self.entries.get_or_init(|| self.load())
    }

    #[instrument(level = "debug", skip(self))]
    fn load(&self) -> DashMap<String, Entry> {
        let entries = DashMap::new();
        for (position, module) in self.modules.iter().enumerate() {
            let (available, install_hint, factory) = match module.probe() {
                Ok(()) => {
                    debug!("{} pipeline registered", module.id());
                    (true, None, Some(module.factory()))
                }
                Err(hint) => {
                    debug!("{} not available: {}", module.id(), hint);
                    (false, Some(hint), None)
                }
            };
            entries.insert(
                module.id().to_string(),
                Entry {
                    position,
                    descriptor: ProviderDescriptor {
                        id: module.id().to_string(),
                        name: module.name().to_string(),
                        description: module.description().to_string(),
                        available,
                        install_hint,
                    },
                    factory,
                },
            );
        }
        entries
    }

    /// Load and probe the provider table now instead of on first lookup.
    pub fn warm_up(&self) -> usize {
        self.entries().len()
    }

    /// Build a pipeline instance for `name`.
    #[instrument(level = "debug", skip(self, options))]
    pub fn get(
        &self,
        name: &str,
        kb_base_dir: Option<&Path>,
        options: &PipelineOptions,
    ) -> RegistryResult<Arc<dyn Pipeline>> {
        // Clone out of the map so no shard lock is held while the factory runs.
        let entry = self.entries().get(name).map(|e| e.value().clone());
        let Some(entry) = entry else {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
                known: self.known_ids(),
            });
        };
        let Some(factory) = entry.factory else {
            let reason = match &entry.descriptor.install_hint {
                Some(hint) => format!("{} ({})", entry.descriptor.description, hint),
                None => entry.descriptor.description.clone(),
            };
            return Err(RegistryError::Unavailable {
                name: name.to_string(),
                reason,
                available: self.available_ids(),
            });
        };

        factory(kb_base_dir, options).map_err(|e| match e {
            FactoryError::MissingDependency(detail) => {
                warn!("Pipeline '{}' is missing a dependency: {}", name, detail);
                RegistryError::MissingDependency {
                    name: name.to_string(),
                    detail,
                }
            }
            FactoryError::Pipeline(source) => RegistryError::Factory {
                name: name.to_string(),
                source,
            },
        })
    }

    pub fn list(&self, include_unavailable: bool) -> Vec<ProviderDescriptor> {
        let mut entries: Vec<(usize, ProviderDescriptor)> = self
            .entries()
            .iter()
            .filter(|e| include_unavailable || e.factory.is_some())
            .map(|e| (e.position, e.descriptor.clone()))
            .collect();
        entries.sort_by_key(|(position, _)| *position);
        entries.into_iter().map(|(_, d)| d).collect()
    }

    /// Add or replace a provider. A replaced provider keeps its place in the
    /// listing and becomes available.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn(Option<&Path>, &PipelineOptions) -> Result<Arc<dyn Pipeline>, FactoryError>
            + Send
            + Sync
            + 'static,
    {
        let factory: PipelineFactory = Arc::new(factory);
        let entries = self.entries();
        let position = entries.len();
        entries
            .entry(name.to_string())
            .and_modify(|e| {
                e.descriptor.available = true;
                e.descriptor.install_hint = None;
                e.factory = Some(factory.clone());
            })
            .or_insert_with(|| Entry {
                position,
                descriptor: ProviderDescriptor {
                    id: name.to_string(),
                    name: name.to_string(),
                    description: "Custom pipeline".to_string(),
                    available: true,
                    install_hint: None,
                },
                factory: Some(factory.clone()),
            });
        info!("Registered pipeline '{}'", name);
    }

    /// True only when `name` can be instantiated.
    pub fn has(&self, name: &str) -> bool {
        self.entries()
            .get(name)
            .is_some_and(|e| e.factory.is_some())
    }

    /// Every id the registry knows, available or not, in listing order.
    pub fn known_ids(&self) -> Vec<String> {
        self.list(true).into_iter().map(|d| d.id).collect()
    }

    fn available_ids(&self) -> Vec<String> {
        self.list(false).into_iter().map(|d| d.id).collect()
    }

    #[deprecated(note = "use `get` instead")]
    pub fn get_plugin(&self, name: &str) -> RegistryResult<Arc<dyn Pipeline>> {
        warn!("get_plugin() is deprecated, use get() instead");
        self.get(name, None, &PipelineOptions::new())
    }

    #[deprecated(note = "use `list` instead")]
    pub fn list_plugins(&self) -> Vec<ProviderDescriptor> {
        warn!("list_plugins() is deprecated, use list() instead");
        self.list(false)
    }

    #[deprecated(note = "use `has` instead")]
    pub fn has_plugin(&self, name: &str) -> bool {
        warn!("has_plugin() is deprecated, use has() instead");
        self.has(name)
    }
}

impl std::fmt::Debug for PipelineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRegistry")
            .field("modules", &self.modules.len())
            .field("loaded", &self.entries.get().is_some())
            .finish()
    }
}
