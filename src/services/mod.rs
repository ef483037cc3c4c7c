pub mod aggregate_service;
pub mod ai_service;
pub mod feedback_service;
pub mod grading_service;
pub mod normalizer_service;
pub mod question_service;
pub mod result_service;
