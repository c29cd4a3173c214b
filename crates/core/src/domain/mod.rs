// Domain Layer - Pure scrape/cadence entities

pub mod error;
pub mod job;
pub mod run;
pub mod schedule;
pub mod task;

// Re-exports
pub use error::DomainError;
pub use job::{JobMetadata, NormalizedJob};
pub use run::ScrapeRunResult;
pub use schedule::{
    DispatchRecord, DispatchSummary, DueState, ScrapeScheduleEntry, REASON_NOT_DUE,
};
pub use task::{QueuedTask, ScrapeTaskPayload, TaskId, TaskState};
