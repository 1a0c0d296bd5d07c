use async_trait::async_trait;
use mockexam_backend::models::question::{GeneratedQuestion, SeedQuestion, WeakTopicStat};
use mockexam_backend::services::batch_service::BatchGenerator;
use mockexam_backend::services::exam_service::ExamAssembler;
use mockexam_backend::services::llm_service::{
    GenerationParams, GenerativeTextService, LlmError,
};
use mockexam_backend::services::store_service::{question_hash, QuestionStore};
use mockexam_backend::services::variant_service::VariantGenerator;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers every prompt with a well-formed variant derived from the seed
/// content embedded in the prompt, wrapped in markdown fences so the
/// sanitization path is exercised too. Seeds listed in `fail_contents` get a
/// service error instead.
struct ScriptedLlm {
    fail_contents: HashSet<String>,
}

impl ScriptedLlm {
    fn always_ok() -> Self {
        Self {
            fail_contents: HashSet::new(),
        }
    }

    fn failing_on(contents: &[&str]) -> Self {
        Self {
            fail_contents: contents.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn seed_content(prompt: &str) -> &str {
        prompt
            .split("Reference question: \"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap_or("unknown")
    }
}

#[async_trait]
impl GenerativeTextService for ScriptedLlm {
    async fn submit(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> std::result::Result<String, LlmError> {
        let content = Self::seed_content(prompt);
        if self.fail_contents.contains(content) {
            return Err(LlmError::Service("scripted outage".to_string()));
        }
        Ok(format!(
            "```json\n{{\"question\": \"Variant of: {content}\", \
             \"options\": [\"A. 1\", \"B. 2\", \"C. 3\", \"D. 4\"], \
             \"step_by_step_thinking\": \"Step 1: compute.\", \
             \"correct_answer\": \"B. 2\", \
             \"explanation\": \"The result is 2.\"}}\n```"
        ))
    }
}

#[derive(Default)]
struct MemoryStore {
    cached: Mutex<Vec<GeneratedQuestion>>,
    saved: Mutex<Vec<GeneratedQuestion>>,
    wrong: Mutex<Vec<(String, String)>>,
    weak: Vec<WeakTopicStat>,
}

impl MemoryStore {
    fn with_cached(cached: Vec<GeneratedQuestion>) -> Self {
        Self {
            cached: Mutex::new(cached),
            ..Self::default()
        }
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn fetch_cached(
        &self,
        limit: i64,
        _randomize: bool,
    ) -> mockexam_backend::error::Result<Vec<GeneratedQuestion>> {
        let cached = self.cached.lock().unwrap();
        Ok(cached.iter().take(limit as usize).cloned().collect())
    }

    async fn save_questions(
        &self,
        questions: &[GeneratedQuestion],
    ) -> mockexam_backend::error::Result<u64> {
        let mut saved = self.saved.lock().unwrap();
        let mut hashes: HashSet<String> = saved.iter().map(question_hash).collect();
        let mut inserted = 0;
        for q in questions {
            if hashes.insert(question_hash(q)) {
                saved.push(q.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn record_wrong_answer(
        &self,
        user_id: &str,
        topic: &str,
        _question_type: &str,
    ) -> mockexam_backend::error::Result<()> {
        self.wrong
            .lock()
            .unwrap()
            .push((user_id.to_string(), topic.to_string()));
        Ok(())
    }

    async fn weak_topics(
        &self,
        _user_id: &str,
        limit: i64,
    ) -> mockexam_backend::error::Result<Vec<WeakTopicStat>> {
        Ok(self.weak.iter().take(limit as usize).cloned().collect())
    }
}

fn seed(topic: &str, content: &str) -> SeedQuestion {
    SeedQuestion {
        topic: topic.to_string(),
        content: content.to_string(),
        question_type: "math".to_string(),
        image_url: None,
    }
}

fn cached_question(text: &str) -> GeneratedQuestion {
    GeneratedQuestion {
        question: text.to_string(),
        options: vec!["A. 1".to_string(), "B. 2".to_string()],
        correct_answer: "A. 1".to_string(),
        explanation: None,
        step_by_step_thinking: None,
        topic: "Arithmetic".to_string(),
        question_type: "math".to_string(),
        image_url: None,
    }
}

fn progress_recorder() -> (Arc<Mutex<Vec<f64>>>, impl Fn(f64) + Send + Sync) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    (calls, move |fraction: f64| {
        sink.lock().unwrap().push(fraction)
    })
}

fn assert_non_decreasing(values: &[f64]) {
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {:?}", values);
    }
}

#[tokio::test]
async fn batch_yields_a_question_per_seed_with_full_progress() {
    let llm = Arc::new(ScriptedLlm::always_ok());
    let variant = VariantGenerator::new(llm, 3);
    let batch = BatchGenerator::new(variant, 2, Duration::ZERO);

    let seeds: Vec<SeedQuestion> = (1..=5)
        .map(|i| seed("Arithmetic", &format!("question {i}")))
        .collect();
    let (calls, on_progress) = progress_recorder();

    let results = batch.generate_batch(&seeds, 0, &on_progress).await;

    assert_eq!(results.len(), 5);
    let keys: HashSet<String> = results.iter().map(|q| q.normalized_key()).collect();
    assert_eq!(keys.len(), 5, "variants must be distinct");
    for q in &results {
        assert!(q.options.contains(&q.correct_answer));
        assert_eq!(q.topic, "Arithmetic");
    }

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 5, "one progress call per completed seed");
    assert_non_decreasing(&calls);
    assert_eq!(*calls.last().unwrap(), 1.0);
}

#[tokio::test]
async fn failed_seeds_are_skipped_but_progress_still_reaches_one() {
    let llm = Arc::new(ScriptedLlm::failing_on(&["broken 1", "broken 2"]));
    // Single attempt keeps the retry loop from sleeping between attempts.
    let variant = VariantGenerator::new(llm, 1);
    let batch = BatchGenerator::new(variant, 2, Duration::ZERO);

    let seeds = vec![
        seed("Arithmetic", "fine 1"),
        seed("Arithmetic", "broken 1"),
        seed("Logic", "fine 2"),
        seed("Logic", "broken 2"),
    ];
    let (calls, on_progress) = progress_recorder();

    let results = batch.generate_batch(&seeds, 0, &on_progress).await;

    assert_eq!(results.len(), 2);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 4, "failures still advance progress");
    assert_non_decreasing(&calls);
    assert_eq!(*calls.last().unwrap(), 1.0);
}

#[tokio::test]
async fn assembled_exam_never_repeats_a_question() {
    // Every seed carries identical content, so every generated variant shares
    // the same question text and must collapse to one entry.
    let seeds: Vec<SeedQuestion> =
        (0..4).map(|_| seed("Arithmetic", "same stem")).collect();
    let store = Arc::new(MemoryStore::with_cached(vec![
        cached_question("cached 1"),
        cached_question("cached 2"),
        cached_question("cached 3"),
    ]));

    let variant = VariantGenerator::new(Arc::new(ScriptedLlm::always_ok()), 1);
    let batch = BatchGenerator::new(variant, 2, Duration::ZERO);
    let assembler = ExamAssembler::new(store.clone(), batch, 0.5, 0.3);

    let (_, on_progress) = progress_recorder();
    let exam = assembler.assemble_exam(&seeds, 6, None, &on_progress).await;

    // 3 distinct cached + 1 surviving duplicate variant; no source can fill
    // the rest, so the exam comes back short rather than padded with repeats.
    assert_eq!(exam.len(), 4);
    let keys: HashSet<String> = exam.iter().map(|q| q.normalized_key()).collect();
    assert_eq!(keys.len(), exam.len());

    // Idempotent persistence: the identical variants collapse to one row.
    assert_eq!(store.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn small_exam_from_one_topic_is_exactly_target_sized() {
    let seeds: Vec<SeedQuestion> = (1..=5)
        .map(|i| seed("Arithmetic", &format!("stem {i}")))
        .collect();
    let store = Arc::new(MemoryStore::default());

    let variant = VariantGenerator::new(Arc::new(ScriptedLlm::always_ok()), 1);
    let batch = BatchGenerator::new(variant, 2, Duration::ZERO);
    let assembler = ExamAssembler::new(store, batch, 0.5, 0.3);

    let (_, on_progress) = progress_recorder();
    let exam = assembler.assemble_exam(&seeds, 3, None, &on_progress).await;

    assert_eq!(exam.len(), 3);
    let keys: HashSet<String> = exam.iter().map(|q| q.normalized_key()).collect();
    assert_eq!(keys.len(), 3);
    for q in &exam {
        assert!(q.options.contains(&q.correct_answer));
    }
}

#[tokio::test]
async fn exam_blends_generation_when_cache_is_empty() {
    let seeds = vec![
        seed("Arithmetic", "a"),
        seed("Fractions", "b"),
        seed("Logic", "c"),
        seed("Geometry", "d"),
    ];
    let store = Arc::new(MemoryStore::default());

    let variant = VariantGenerator::new(Arc::new(ScriptedLlm::always_ok()), 1);
    let batch = BatchGenerator::new(variant, 2, Duration::ZERO);
    let assembler = ExamAssembler::new(store.clone(), batch, 0.5, 0.3);

    let (calls, on_progress) = progress_recorder();
    let exam = assembler.assemble_exam(&seeds, 4, None, &on_progress).await;

    assert_eq!(exam.len(), 4);
    assert_eq!(store.saved.lock().unwrap().len(), 4);
    let calls = calls.lock().unwrap();
    assert_non_decreasing(&calls);
    assert_eq!(*calls.last().unwrap(), 1.0);
}

#[tokio::test]
async fn empty_seed_pool_yields_an_empty_exam() {
    let store = Arc::new(MemoryStore::default());
    let variant = VariantGenerator::new(Arc::new(ScriptedLlm::always_ok()), 1);
    let batch = BatchGenerator::new(variant, 2, Duration::ZERO);
    let assembler = ExamAssembler::new(store, batch, 0.5, 0.3);

    let (_, on_progress) = progress_recorder();
    let exam = assembler.assemble_exam(&[], 10, None, &on_progress).await;
    assert!(exam.is_empty());
}

#[tokio::test]
async fn scoring_records_wrong_answers_for_the_user() {
    let store = Arc::new(MemoryStore::default());
    let service =
        mockexam_backend::services::attempt_service::AttemptService::new(store.clone());

    let questions = vec![
        {
            let mut q = cached_question("q1");
            q.correct_answer = "A. 1".to_string();
            q
        },
        {
            let mut q = cached_question("q2");
            q.correct_answer = "B. 2".to_string();
            q
        },
    ];
    let answers = vec![Some("A. 1".to_string()), Some("A. 1".to_string())];

    let report = service
        .score_attempt(&questions, &answers, Some("user-7"))
        .await;

    assert_eq!(report.correct, 1);
    assert_eq!(report.wrong, 1);
    let wrong = store.wrong.lock().unwrap();
    assert_eq!(wrong.len(), 1);
    assert_eq!(wrong[0], ("user-7".to_string(), "Arithmetic".to_string()));
}
