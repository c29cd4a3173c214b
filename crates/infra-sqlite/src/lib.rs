// JobHarvest Infrastructure - SQLite Adapter
// Implements: KeyValueStore, StoreMaintenance, TaskQueue, TaskConsumer

mod connection;
mod error;
mod key_value_store;
mod migration;
mod task_queue;

pub use connection::create_pool;
pub use key_value_store::SqliteStore;
pub use migration::run_migrations;
pub use task_queue::SqliteTaskQueue;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
