//! Platform registry.
//!
//! Process-wide mapping from platform id to descriptor; populated once at
//! startup, read-only afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::platform::Platform;
use crate::platforms::{FacebookPlatform, TikTokPlatform};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("platform must have an id")]
    MissingId,
    #[error("platform '{0}' is already registered")]
    Duplicate(String),
}

#[derive(Default)]
pub struct PlatformRegistry {
    platforms: HashMap<&'static str, Box<dyn Platform>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, platform: Box<dyn Platform>) -> Result<(), RegistryError> {
        let id = platform.id();
        if id.is_empty() {
            return Err(RegistryError::MissingId);
        }
        if self.platforms.contains_key(id) {
            return Err(RegistryError::Duplicate(id.to_string()));
        }
        self.platforms.insert(id, platform);
        Ok(())
    }

    /// Lookup by identifier. Absent ids yield `None`, never a panic.
    pub fn get(&self, id: &str) -> Option<&dyn Platform> {
        self.platforms.get(id).map(|platform| platform.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.platforms.contains_key(id)
    }

    /// Registered identifiers in stable order.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.platforms.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Registry holding the built-in platforms.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(FacebookPlatform))
            .expect("built-in platform ids are valid and unique");
        registry
            .register(Box::new(TikTokPlatform))
            .expect("built-in platform ids are valid and unique");
        registry
    }
}

/// Shared process-wide registry, initialized on first use.
pub fn global() -> &'static PlatformRegistry {
    static REGISTRY: OnceLock<PlatformRegistry> = OnceLock::new();
    REGISTRY.get_or_init(PlatformRegistry::builtin)
}
