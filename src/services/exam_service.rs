use crate::models::question::{GeneratedQuestion, SeedQuestion};
use crate::services::batch_service::{BatchGenerator, ProgressFn};
use crate::services::store_service::QuestionStore;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How many weak topics to consider when biasing seed selection.
const WEAK_TOPIC_LIMIT: i64 = 5;
/// Cache page size for the shortfall backfill pass.
const BACKFILL_LIMIT: i64 = 100;

/// Top-level exam assembly: blends cached questions with freshly generated
/// ones, biases generation toward the user's weak topics, deduplicates by
/// normalized question text, and shuffles down to the target count.
///
/// Assembly never fails outright; every shortfall degrades to a shorter exam
/// with a logged warning. The only empty result is an empty seed pool or a
/// world where nothing could be sourced at all.
#[derive(Clone)]
pub struct ExamAssembler {
    store: Arc<dyn QuestionStore>,
    batch: BatchGenerator,
    cached_ratio: f64,
    weak_topic_boost_ratio: f64,
}

impl ExamAssembler {
    pub fn new(
        store: Arc<dyn QuestionStore>,
        batch: BatchGenerator,
        cached_ratio: f64,
        weak_topic_boost_ratio: f64,
    ) -> Self {
        Self {
            store,
            batch,
            cached_ratio: cached_ratio.clamp(0.0, 1.0),
            weak_topic_boost_ratio: weak_topic_boost_ratio.clamp(0.0, 1.0),
        }
    }

    pub async fn assemble_exam(
        &self,
        seed_pool: &[SeedQuestion],
        target_count: usize,
        user_id: Option<&str>,
        on_progress: &ProgressFn,
    ) -> Vec<GeneratedQuestion> {
        if seed_pool.is_empty() {
            error!("Cannot assemble an exam without seed questions");
            return Vec::new();
        }

        let mut exam: Vec<GeneratedQuestion> = Vec::new();

        let target_cached = (target_count as f64 * self.cached_ratio) as usize;
        info!(
            target_count,
            target_cached,
            target_new = target_count - target_cached,
            "Planning exam"
        );

        if target_cached > 0 {
            match self.store.fetch_cached(target_cached as i64, true).await {
                Ok(cached) => {
                    info!(count = cached.len(), "Pulled cached questions");
                    exam.extend(cached);
                }
                Err(e) => warn!(error = %e, "Cache read failed, generating everything fresh"),
            }
        }

        let mut weak_topics: Vec<String> = Vec::new();
        if let Some(uid) = user_id {
            match self.store.weak_topics(uid, WEAK_TOPIC_LIMIT).await {
                Ok(stats) => {
                    weak_topics = stats.into_iter().map(|s| s.topic).collect();
                    if !weak_topics.is_empty() {
                        info!(user = uid, topics = ?weak_topics, "Biasing toward weak topics");
                    }
                }
                Err(e) => warn!(error = %e, "Weak-topic lookup failed"),
            }
        }

        let needed = target_count.saturating_sub(exam.len());
        if needed > 0 {
            let selected =
                select_seeds(seed_pool, needed, &weak_topics, self.weak_topic_boost_ratio);
            info!(count = selected.len(), "Generating new questions");

            let newly = self.batch.generate_batch(&selected, 0, on_progress).await;
            if !newly.is_empty() {
                // Persistence failures are logged only; the in-memory results
                // still serve this exam.
                match self.store.save_questions(&newly).await {
                    Ok(saved) => info!(saved, generated = newly.len(), "Persisted new questions"),
                    Err(e) => warn!(error = %e, "Could not persist generated questions"),
                }
                exam.extend(newly);
            }
        }

        if exam.len() < target_count {
            let missing = target_count - exam.len();
            warn!(missing, "Exam short after generation, backfilling from cache");
            match self.store.fetch_cached(BACKFILL_LIMIT, true).await {
                Ok(extra) => {
                    let mut seen: HashSet<String> =
                        exam.iter().map(|q| q.normalized_key()).collect();
                    for q in extra {
                        if exam.len() >= target_count {
                            break;
                        }
                        if seen.insert(q.normalized_key()) {
                            exam.push(q);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Backfill read failed"),
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        exam.retain(|q| seen.insert(q.normalized_key()));

        {
            let mut rng = rand::thread_rng();
            exam.shuffle(&mut rng);
        }
        exam.truncate(target_count);

        if exam.len() < target_count {
            warn!(
                assembled = exam.len(),
                target_count, "Returning a short exam, all sources exhausted"
            );
        } else {
            info!(count = exam.len(), "Exam assembled");
        }
        exam
    }
}

/// Picks `needed` seeds for generation. A reserved fraction goes to the
/// user's weak topics (drawn without replacement within each topic), the rest
/// rotates over shuffled topic buckets one pick per pass to maximize topic
/// diversity. Only once every bucket is drained does uniform with-replacement
/// padding kick in.
fn select_seeds(
    seed_pool: &[SeedQuestion],
    needed: usize,
    weak_topics: &[String],
    boost_ratio: f64,
) -> Vec<SeedQuestion> {
    let mut rng = rand::thread_rng();

    let mut buckets: HashMap<&str, Vec<&SeedQuestion>> = HashMap::new();
    for seed in seed_pool {
        buckets.entry(seed.topic.as_str()).or_default().push(seed);
    }
    for bucket in buckets.values_mut() {
        bucket.shuffle(&mut rng);
    }

    let mut selected: Vec<SeedQuestion> = Vec::new();

    // Weak-topic picks consume from the buckets so the diversity pass cannot
    // re-pick the same seed.
    let weak_count = (needed as f64 * boost_ratio) as usize;
    for topic in weak_topics {
        if selected.len() >= weak_count {
            break;
        }
        if let Some(bucket) = buckets.get_mut(topic.as_str()) {
            let take = (weak_count - selected.len()).min(bucket.len());
            selected.extend(bucket.drain(..take).cloned());
        }
    }

    let mut bucket_list: Vec<Vec<&SeedQuestion>> = buckets.into_values().collect();
    bucket_list.shuffle(&mut rng);

    while selected.len() < needed && bucket_list.iter().any(|b| !b.is_empty()) {
        for bucket in &mut bucket_list {
            if selected.len() >= needed {
                break;
            }
            if let Some(seed) = bucket.pop() {
                selected.push(seed.clone());
            }
        }
    }

    while selected.len() < needed {
        match seed_pool.choose(&mut rng) {
            Some(seed) => selected.push(seed.clone()),
            None => break,
        }
    }

    selected
}
