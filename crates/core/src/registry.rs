//! Event metadata lookup.

use crate::{Category, EventInfo, MusicPlaylist};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Turns an event name into its static metadata.
pub trait EventResolver {
    /// Look up `name`; `None` when the event is unknown.
    fn resolve(&self, name: &str) -> Option<Arc<EventInfo>>;
}

/// Errors emitted while loading an event registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Wrap IO errors when reading the registry file.
    #[error("failed to read event registry: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse event registry: {0}")]
    Parse(#[from] serde_json::Error),
    /// An event definition without a name.
    #[error("event definition #{0} has no name")]
    Unnamed(usize),
    /// Two definitions share a name.
    #[error("event `{0}` is defined more than once")]
    Duplicate(String),
}

/// Name-keyed event metadata, usually loaded from a JSON list.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: HashMap<String, Arc<EventInfo>>,
    order: Vec<String>,
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from definitions, rejecting unnamed and duplicate entries.
    pub fn from_definitions(defs: Vec<EventInfo>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (index, def) in defs.into_iter().enumerate() {
            if def.name.trim().is_empty() {
                return Err(RegistryError::Unnamed(index));
            }
            if registry.events.contains_key(&def.name) {
                return Err(RegistryError::Duplicate(def.name));
            }
            registry.insert(def);
        }
        Ok(registry)
    }

    /// Parse a JSON array of event definitions.
    pub fn from_json_str(input: &str) -> Result<Self, RegistryError> {
        let defs: Vec<EventInfo> = serde_json::from_str(input)?;
        Self::from_definitions(defs)
    }

    /// Load a JSON array of event definitions from disk.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Add or replace a definition.
    pub fn insert(&mut self, info: EventInfo) {
        if !self.events.contains_key(&info.name) {
            self.order.push(info.name.clone());
        }
        self.events.insert(info.name.clone(), Arc::new(info));
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the registry has no definitions.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Music events in definition order.
    pub fn music_playlist(&self) -> MusicPlaylist {
        MusicPlaylist::new(
            self.order
                .iter()
                .filter(|name| {
                    self.events
                        .get(*name)
                        .is_some_and(|info| info.category == Category::Music)
                })
                .cloned()
                .collect(),
        )
    }
}

impl EventResolver for EventRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<EventInfo>> {
        self.events.get(name).cloned()
    }
}
