//! Backend registry and class resolution.
//!
//! The registry maps `(backend, abstract kind)` pairs to concrete
//! [`Implementation`]s and tracks which backend is active. Entity
//! constructors call [`BackendRegistry::resolve`] for their own kind, so
//! activating a backend changes what later constructions produce without
//! any call-site change.
//!
//! # Lifecycle
//!
//! ```text
//! provide(plugin)          plugin becomes locatable by name
//!       │
//!       ▼
//! register_backend(name)   plugin.register() fills the class table
//!       │
//!       ▼
//! activate_backend(name)   resolve() now consults that table
//! ```
//!
//! With no active backend, or no entry for a kind, resolution falls back to
//! [`AbstractClass`], so the model is fully usable with zero backends.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::entity::{AbstractClass, Implementation, ImplementationRef};
use crate::error::{ModelError, Result};
use crate::ids::EntityKind;

pub type ImplementationTable = HashMap<EntityKind, ImplementationRef>;

/// Entry point a backend exposes to the registry.
pub trait BackendPlugin: Send + Sync {
    /// Unique backend name, e.g. `"abaqus"`.
    fn name(&self) -> &str;

    /// Produces the backend's full `kind -> concrete class` table.
    fn register(&self) -> std::result::Result<ImplementationTable, String>;
}

/// A backend whose table is fixed up front.
#[derive(Debug, Clone)]
pub struct StaticBackend {
    name: String,
    table: Vec<(EntityKind, ImplementationRef)>,
}

impl StaticBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Vec::new(),
        }
    }

    pub fn with(mut self, kind: EntityKind, implementation: impl Implementation) -> Self {
        self.table.push((kind, Arc::new(implementation)));
        self
    }
}

impl BackendPlugin for StaticBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self) -> std::result::Result<ImplementationTable, String> {
        Ok(self.table.iter().cloned().collect())
    }
}

#[derive(Default)]
struct RegistryState {
    available: HashMap<String, Arc<dyn BackendPlugin>>,
    backends: HashMap<String, ImplementationTable>,
    active: Option<String>,
}

/// Registry context. Every operation takes the same exclusive lock.
#[derive(Default)]
pub struct BackendRegistry {
    state: Mutex<RegistryState>,
}

static GLOBAL: LazyLock<BackendRegistry> = LazyLock::new(BackendRegistry::new);

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide default instance used by entity constructors.
    pub fn global() -> &'static BackendRegistry {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes a plugin locatable by [`BackendRegistry::register_backend`].
    pub fn provide(&self, plugin: impl BackendPlugin + 'static) {
        let name = plugin.name().to_string();
        debug!(backend = %name, "backend plugin provided");
        self.lock().available.insert(name, Arc::new(plugin));
    }

    /// Loads the named plugin's class table. Registering again replaces
    /// the previous table.
    pub fn register_backend(&self, name: &str) -> Result<()> {
        let plugin = self
            .lock()
            .available
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::BackendLoad {
                name: name.to_string(),
                reason: "backend plugin not found".to_string(),
            })?;

        // The plugin runs without the lock held so it may consult the
        // registry itself.
        let table = plugin.register().map_err(|reason| ModelError::BackendLoad {
            name: name.to_string(),
            reason,
        })?;

        info!(backend = %name, classes = table.len(), "backend registered");
        self.lock().backends.insert(name.to_string(), table);
        Ok(())
    }

    /// Sets the active backend. On failure the active backend is unchanged.
    pub fn activate_backend(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.backends.contains_key(name) {
            return Err(ModelError::UnknownBackend(name.to_string()));
        }
        let previous = state.active.replace(name.to_string());
        info!(backend = %name, previous = ?previous, "backend activated");
        Ok(())
    }

    /// Registers then activates `name`.
    pub fn use_backend(&self, name: &str) -> Result<()> {
        self.register_backend(name)?;
        self.activate_backend(name)
    }

    pub fn active_backend(&self) -> Option<String> {
        self.lock().active.clone()
    }

    /// Names of all registered backends, sorted.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names = self.lock().backends.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Concrete class for `kind` under the active backend, falling back to
    /// the abstract class.
    pub fn resolve(&self, kind: EntityKind) -> ImplementationRef {
        let state = self.lock();
        let resolved = state
            .active
            .as_ref()
            .and_then(|active| state.backends.get(active))
            .and_then(|table| table.get(&kind))
            .cloned();

        match resolved {
            Some(implementation) => implementation,
            None => {
                debug!(kind = %kind, backend = ?state.active, "no backend class, using abstract");
                Arc::new(AbstractClass(kind))
            }
        }
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        let mut available = state.available.keys().collect::<Vec<_>>();
        available.sort();
        let mut registered = state.backends.keys().collect::<Vec<_>>();
        registered.sort();
        f.debug_struct("BackendRegistry")
            .field("available", &available)
            .field("registered", &registered)
            .field("active", &state.active)
            .finish()
    }
}

/// Makes a plugin locatable by the global registry.
pub fn provide_backend(plugin: impl BackendPlugin + 'static) {
    BackendRegistry::global().provide(plugin);
}

pub fn register_backend(name: &str) -> Result<()> {
    BackendRegistry::global().register_backend(name)
}

pub fn activate_backend(name: &str) -> Result<()> {
    BackendRegistry::global().activate_backend(name)
}

pub fn use_backend(name: &str) -> Result<()> {
    BackendRegistry::global().use_backend(name)
}

pub fn active_backend() -> Option<String> {
    BackendRegistry::global().active_backend()
}

pub fn resolve(kind: EntityKind) -> ImplementationRef {
    BackendRegistry::global().resolve(kind)
}
