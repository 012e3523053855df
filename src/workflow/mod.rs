pub mod correction;
pub mod stats;
pub mod store;

pub use correction::CorrectionWorkflow;
pub use store::{AssessmentStore, InMemoryStore};
