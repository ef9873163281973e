pub mod mock;
pub mod reminder;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::consts::DEFAULT_ENTRY_POINT;
use crate::trigger::Trigger;

/// A startable unit of application logic that runs without a foreground UI.
#[async_trait]
pub trait EntryPoint: Send + Sync {
    fn name(&self) -> &str;

    /// Called once when an engine binds to this entry point. An error here
    /// aborts startup.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self, trigger: &Trigger) -> Result<String>;
}

/// Names the entry point an engine should bind to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPointRef {
    name: String,
}

impl EntryPointRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for EntryPointRef {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_POINT)
    }
}

/// Entry points known to the application, by name. Built once at startup.
pub struct EntryPointCatalog {
    entries: HashMap<String, Arc<dyn EntryPoint>>,
}

impl Default for EntryPointCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryPointCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A catalog holding the application's built-in entry points.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(reminder::ReminderCheck::default()));
        catalog
    }

    /// Add an entry point, replacing any previous one with the same name.
    pub fn register(&mut self, entry_point: Arc<dyn EntryPoint>) {
        self.entries
            .insert(entry_point.name().to_string(), entry_point);
    }

    pub fn resolve(&self, reference: &EntryPointRef) -> Option<Arc<dyn EntryPoint>> {
        self.entries.get(reference.name()).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::MockEntryPoint;

    #[test]
    fn default_ref_is_main() {
        assert_eq!(EntryPointRef::default().name(), "main");
    }

    #[test]
    fn builtins_include_default_entry_point() {
        let catalog = EntryPointCatalog::with_builtins();
        assert!(catalog.resolve(&EntryPointRef::default()).is_some());
        assert_eq!(catalog.names(), vec!["main"]);
    }

    #[test]
    fn resolve_unknown_is_none() {
        let catalog = EntryPointCatalog::with_builtins();
        assert!(catalog.resolve(&EntryPointRef::new("missing")).is_none());
    }

    #[test]
    fn register_replaces_same_name() {
        let mut catalog = EntryPointCatalog::new();
        catalog.register(Arc::new(MockEntryPoint::new("main")));
        catalog.register(Arc::new(MockEntryPoint::new("main").refusing()));
        assert_eq!(catalog.names().len(), 1);

        let entry = catalog.resolve(&EntryPointRef::default()).unwrap();
        assert!(entry.prepare().is_err());
    }
}
