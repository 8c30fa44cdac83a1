//! Provider id -> helper factory mapping.
//!
//! The registry holds factories, not helpers: every run resolves a brand new
//! helper, owns it exclusively, and drops it when the run ends.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{DefaultInfraHelper, InfraHelper, DEFAULT_PROVIDER};
use crate::error::OrchestratorError;
use crate::log_collector::LogCollector;
use crate::providers::{AwsInfraHelper, AzureInfraHelper, GcpInfraHelper};

/// Builds a helper for one run, wiring in that run's log collaborator.
pub type HelperFactory =
    Box<dyn Fn(Arc<LogCollector>) -> Box<dyn InfraHelper> + Send + Sync + 'static>;

#[derive(Default)]
pub struct HelperRegistry {
    factories: BTreeMap<String, HelperFactory>,
}

impl HelperRegistry {
    /// Empty registry with no providers.
    pub fn new() -> Self {
        HelperRegistry::default()
    }

    /// Registry with every provider shipped in this crate.
    pub fn with_builtin_providers() -> Self {
        let mut registry = HelperRegistry::new();
        registry.insert(crate::providers::azure::PROVIDER, |log| {
            Box::new(AzureInfraHelper::new(log))
        });
        registry.insert(crate::providers::aws::PROVIDER, |log| {
            Box::new(AwsInfraHelper::new(log))
        });
        registry.insert(crate::providers::gcp::PROVIDER, |log| {
            Box::new(GcpInfraHelper::new(log))
        });
        registry.insert(DEFAULT_PROVIDER, |_| Box::new(DefaultInfraHelper));
        registry
    }

    /// Register a provider. Ids are case-insensitive and must be unique.
    pub fn register<F>(&mut self, provider: &str, factory: F) -> Result<(), OrchestratorError>
    where
        F: Fn(Arc<LogCollector>) -> Box<dyn InfraHelper> + Send + Sync + 'static,
    {
        let key = normalize(provider);
        if self.factories.contains_key(&key) {
            return Err(OrchestratorError::DuplicateProvider(key));
        }
        log::debug!("[Registry] Registered provider '{}'", key);
        self.insert(&key, factory);
        Ok(())
    }

    fn insert<F>(&mut self, provider: &str, factory: F)
    where
        F: Fn(Arc<LogCollector>) -> Box<dyn InfraHelper> + Send + Sync + 'static,
    {
        self.factories.insert(normalize(provider), Box::new(factory));
    }

    /// Instantiate the helper for `provider`.
    pub fn resolve(
        &self,
        provider: &str,
        log: Arc<LogCollector>,
    ) -> Result<Box<dyn InfraHelper>, OrchestratorError> {
        let key = normalize(provider);
        let factory = self
            .factories
            .get(&key)
            .ok_or(OrchestratorError::NoHelperRegistered(key))?;
        Ok(factory(log))
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.factories.contains_key(&normalize(provider))
    }

    /// Whether two provider ids name the same registry entry.
    pub fn same_provider(a: &str, b: &str) -> bool {
        normalize(a) == normalize(b)
    }

    /// Registered provider ids, sorted.
    pub fn providers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

fn normalize(provider: &str) -> String {
    provider.trim().to_lowercase()
}
