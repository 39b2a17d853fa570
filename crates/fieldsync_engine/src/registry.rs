//! Unit registry: name → typed storage adapter, resolved once at startup.

use crate::config::{Priority, SyncUnitConfig};
use crate::error::{SyncError, SyncResult};
use fieldsync_core::UnitStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered unit: its static config plus its storage adapter.
#[derive(Clone)]
pub struct UnitHandle {
    /// Static unit configuration.
    pub config: SyncUnitConfig,
    /// Storage adapter for this unit's records.
    pub store: Arc<dyn UnitStore>,
}

/// Registry of all syncable units.
///
/// Built once at process start; each unit name resolves to a typed adapter,
/// so the engine never dispatches on unit names. Configuration changes go
/// through the explicit [`refresh`](UnitRegistry::refresh) call rather than
/// being re-queried on every sync run.
pub struct UnitRegistry {
    units: RwLock<HashMap<String, UnitHandle>>,
}

impl UnitRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> UnitRegistryBuilder {
        UnitRegistryBuilder { units: Vec::new() }
    }

    /// Returns the config of every registered unit.
    pub fn all_units(&self) -> Vec<SyncUnitConfig> {
        self.units.read().values().map(|u| u.config.clone()).collect()
    }

    /// Returns the handles of every unit in the given tier.
    pub fn units_in(&self, priority: Priority) -> Vec<UnitHandle> {
        let mut handles: Vec<UnitHandle> = self
            .units
            .read()
            .values()
            .filter(|u| u.config.priority == priority)
            .cloned()
            .collect();
        // Deterministic dispatch order within a tier; completion order is
        // still unordered because units run concurrently.
        handles.sort_by(|a, b| a.config.name.cmp(&b.config.name));
        handles
    }

    /// Resolves one unit by name.
    pub fn get(&self, name: &str) -> SyncResult<UnitHandle> {
        self.units
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SyncError::UnknownUnit(name.to_string()))
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    /// Returns true if no units are registered.
    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    /// Applies updated configs to already-registered units.
    ///
    /// Idempotent: applying the same configs twice is a no-op. Adapters are
    /// untouched; configs for names not in the registry are ignored, and a
    /// registered unit absent from `configs` keeps its current config.
    pub fn refresh(&self, configs: &[SyncUnitConfig]) {
        let mut units = self.units.write();
        for config in configs {
            if let Some(handle) = units.get_mut(&config.name) {
                handle.config = config.clone();
            }
        }
    }
}

/// Builder for [`UnitRegistry`].
pub struct UnitRegistryBuilder {
    units: Vec<(SyncUnitConfig, Arc<dyn UnitStore>)>,
}

impl UnitRegistryBuilder {
    /// Registers a unit with its storage adapter.
    ///
    /// Registering the same name twice keeps the later registration.
    #[must_use]
    pub fn register(mut self, config: SyncUnitConfig, store: Arc<dyn UnitStore>) -> Self {
        self.units.push((config, store));
        self
    }

    /// Finalizes the registry.
    #[must_use]
    pub fn build(self) -> UnitRegistry {
        let mut units = HashMap::new();
        for (config, store) in self.units {
            units.insert(config.name.clone(), UnitHandle { config, store });
        }
        UnitRegistry {
            units: RwLock::new(units),
        }
    }
}
