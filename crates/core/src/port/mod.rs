// Port Layer - Interfaces for external collaborators

pub mod id_provider; // For deterministic testing
pub mod ingestion;
pub mod key_value_store;
pub mod maintenance;
pub mod rendering;
pub mod task_queue;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use ingestion::IngestionClient;
pub use key_value_store::KeyValueStore;
pub use maintenance::StoreMaintenance;
pub use rendering::{RenderingEngine, RenderingSession};
pub use task_queue::{TaskConsumer, TaskQueue};
pub use time_provider::TimeProvider;
