// JobHarvest Site Adapters
// One module per job board; `builtin_registry` is what the daemon serves.

mod demo;

pub use demo::{DemoBoardAdapter, DEMO_DOCUMENT};

use jobharvest_core::application::AdapterRegistry;
use std::sync::Arc;

/// Registry of every adapter shipped with the worker
pub fn builtin_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(DemoBoardAdapter::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = builtin_registry();
        assert_eq!(registry.slugs().collect::<Vec<_>>(), vec!["demo-board"]);
        assert_eq!(
            registry.get("demo-board").unwrap().display_name(),
            "Demo Job Board"
        );
        assert!(registry.get("acme-careers").is_err());
    }
}
