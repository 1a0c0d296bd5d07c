pub mod attempt_service;
pub mod batch_service;
pub mod exam_service;
pub mod llm_service;
pub mod queue_service;
pub mod store_service;
pub mod study_service;
pub mod variant_service;
