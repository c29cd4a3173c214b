// ID Provider Port
//
// Run ids double as the correlation key between the dispatcher, the task
// payload and the ingestion batch.

pub trait IdProvider: Send + Sync {
    /// Fresh run or task id, unique across processes
    fn generate_id(&self) -> String;
}

/// Random UUID v4 ids (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
