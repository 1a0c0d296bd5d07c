pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::models::question::SeedQuestion;
use crate::services::{
    attempt_service::AttemptService, batch_service::BatchGenerator, exam_service::ExamAssembler,
    llm_service::GeminiService, store_service::PgQuestionStore, store_service::QuestionStore,
    study_service::StudyGuideService, variant_service::VariantGenerator,
};
use crate::utils::seed::load_seed_pool;
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: Arc<dyn QuestionStore>,
    pub exam_assembler: ExamAssembler,
    pub attempt_service: AttemptService,
    pub study_service: StudyGuideService,
    pub seed_pool: Arc<Vec<SeedQuestion>>,
}

impl AppState {
    pub fn new(pool: PgPool) -> error::Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(180))
            .build()?;

        let store: Arc<dyn QuestionStore> = Arc::new(PgQuestionStore::new(pool.clone()));

        let generation_llm = Arc::new(GeminiService::new(
            config.gemini_api_key.clone(),
            config.generation_model.clone(),
            http_client.clone(),
        ));
        let study_llm = Arc::new(GeminiService::new(
            config.gemini_api_key.clone(),
            config.study_model.clone(),
            http_client,
        ));

        let variant = VariantGenerator::new(generation_llm, config.generation_max_attempts);
        let batch = BatchGenerator::new(
            variant,
            config.generation_concurrency,
            Duration::from_secs(config.request_pacing_secs),
        );
        let exam_assembler = ExamAssembler::new(
            store.clone(),
            batch,
            config.cached_ratio,
            config.weak_topic_boost_ratio,
        );

        let attempt_service = AttemptService::new(store.clone());
        let study_service = StudyGuideService::new(study_llm);

        let seed_pool = Arc::new(load_seed_pool(&config.seed_data_path)?);

        Ok(Self {
            pool,
            store,
            exam_assembler,
            attempt_service,
            study_service,
            seed_pool,
        })
    }
}
