pub mod generation_service;
pub mod grading_service;
pub mod recommendation;

pub use generation_service::GenerationService;
pub use grading_service::SimilarityGrader;
