use crate::models::question::{GeneratedQuestion, SeedQuestion};
use crate::services::variant_service::VariantGenerator;
use crate::utils::validation::{is_valid_question, requires_missing_image};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Progress observer invoked after every completed generation task, success
/// or failure, with a non-decreasing fraction in `(0, 1]`.
pub type ProgressFn = dyn Fn(f64) + Send + Sync;

/// Runs the variant generator over a batch of seeds under a bounded worker
/// pool, filtering out questions that fail validation or reference a missing
/// image. Individual failures are logged and omitted, never raised.
#[derive(Clone)]
pub struct BatchGenerator {
    variant: VariantGenerator,
    concurrency: usize,
    /// Fixed delay after each completed task; trades throughput for staying
    /// under the generation service's rate limits.
    pacing: Duration,
}

impl BatchGenerator {
    pub fn new(variant: VariantGenerator, concurrency: usize, pacing: Duration) -> Self {
        Self {
            variant,
            concurrency: concurrency.max(1),
            pacing,
        }
    }

    pub async fn generate_batch(
        &self,
        seeds: &[SeedQuestion],
        start_idx: usize,
        on_progress: &ProgressFn,
    ) -> Vec<GeneratedQuestion> {
        if seeds.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(usize, Option<GeneratedQuestion>)> = JoinSet::new();

        for (idx, seed) in seeds.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let variant = self.variant.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (idx, None),
                };
                (idx, variant.generate(&seed).await)
            });
        }

        let total = seeds.len();
        let mut completed = 0usize;
        let mut results = Vec::new();

        // Results arrive in completion order, not submission order.
        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok((idx, Some(question))) => {
                    if requires_missing_image(&question) {
                        warn!(
                            seed = start_idx + idx + 1,
                            preview = %question.question.chars().take(60).collect::<String>(),
                            "Skipping question that references a missing image"
                        );
                    } else if !is_valid_question(&question) {
                        warn!(
                            seed = start_idx + idx + 1,
                            "Skipping question with an invalid answer shape"
                        );
                    } else {
                        info!(seed = start_idx + idx + 1, topic = %question.topic, "Question accepted");
                        results.push(question);
                    }
                }
                Ok((idx, None)) => {
                    warn!(seed = start_idx + idx + 1, "Generation exhausted its retries");
                }
                Err(e) => {
                    error!(error = %e, "Generation task aborted");
                }
            }

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            on_progress((start_idx + completed) as f64 / (start_idx + total) as f64);
        }

        results
    }
}
