//! Provider registry: name → provider lookup.
//!
//! The registry is an explicit value threaded through the engine and node
//! context. A process-wide instance is available via
//! [`ProviderRegistry::global`] for ergonomic use; all mutation is behind
//! a write lock, and registration is expected to complete before
//! concurrent workflow runs begin.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::LlmProvider;
use crate::error::PluginError;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn LlmProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry shared by engines built without an
    /// explicit one.
    pub fn global() -> Arc<ProviderRegistry> {
        static GLOBAL: OnceLock<Arc<ProviderRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(ProviderRegistry::new()))
            .clone()
    }

    /// Register a provider under a unique name. Fails if the name is taken.
    pub fn register(
        &self,
        name: &str,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<(), PluginError> {
        if name.is_empty() {
            return Err(PluginError::Registration(
                "provider name cannot be empty".into(),
            ));
        }
        let mut providers = self.providers.write();
        if providers.contains_key(name) {
            return Err(PluginError::Registration(format!(
                "provider '{name}' is already registered; use a different name \
                 or call unregister() first"
            )));
        }
        providers.insert(name.to_string(), provider);
        Ok(())
    }

    /// Look up a registered provider. The not-found error lists currently
    /// registered names.
    pub fn get(&self, name: &str) -> Result<Arc<dyn LlmProvider>, PluginError> {
        let providers = self.providers.read();
        providers
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::not_found(name, &sorted_names(&providers)))
    }

    /// All registered provider names, sorted.
    pub fn list(&self) -> Vec<String> {
        sorted_names(&self.providers.read())
    }

    /// Remove a registration. No-op if absent. Useful for test isolation.
    pub fn unregister(&self, name: &str) {
        self.providers.write().remove(name);
    }

    /// Remove all registrations. Useful for test isolation.
    pub fn clear(&self) {
        self.providers.write().clear();
    }
}

fn sorted_names(providers: &HashMap<String, Arc<dyn LlmProvider>>) -> Vec<String> {
    let mut names: Vec<String> = providers.keys().cloned().collect();
    names.sort_unstable();
    names
}
