use crate::models::question::GeneratedQuestion;
use regex::Regex;
use std::sync::OnceLock;

const VISUAL_KEYWORDS: &[&str] = &[
    "diagram", "figure", "chart", "graph", "image", "picture", "shape",
];

/// Tolerance, in absolute percent units, for the percent-increase check.
const PERCENT_TOLERANCE: f64 = 0.6;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("valid number regex"))
}

/// Structural and (narrowly) semantic sanity checks on a generated question.
///
/// Structural: at least two options, and the correct answer either equals one
/// option or shares its 1-2 character letter label with one. Semantic: only
/// for percent-increase word problems, the answer's number must agree with the
/// delta computed from the question's own figures. Anything else is accepted;
/// this is deliberately not general math verification.
pub fn is_valid_question(question: &GeneratedQuestion) -> bool {
    if question.options.len() < 2 {
        return false;
    }

    let correct = question.correct_answer.trim();
    if correct.is_empty() {
        return false;
    }

    let mut has_option_match = question.options.iter().any(|opt| opt == correct);
    if !has_option_match {
        let label: String = correct.chars().take(2).collect();
        has_option_match = question
            .options
            .iter()
            .any(|opt| opt.trim().starts_with(&label));
    }
    if !has_option_match {
        return false;
    }

    percent_answer_matches(question)
}

/// True when the question text references a figure or diagram but no image is
/// attached; such questions are unanswerable and must be dropped.
pub fn requires_missing_image(question: &GeneratedQuestion) -> bool {
    let text = question.question.to_lowercase();
    let mentions_visual = VISUAL_KEYWORDS.iter().any(|k| text.contains(k));
    let has_image = question
        .image_url
        .as_deref()
        .map_or(false, |url| !url.is_empty());
    mentions_visual && !has_image
}

fn is_percent_increase_question(text: &str) -> bool {
    let t = text.to_lowercase();
    t.contains("increas") && t.contains("from") && (t.contains(" to ") || t.contains(" by "))
}

/// Percent delta implied by the first two numerals in the question text,
/// rounded to two decimals. `None` when the text carries fewer than two
/// numbers or the base is zero.
fn expected_percent_delta(text: &str) -> Option<f64> {
    let mut numbers = number_re().find_iter(text);
    let old = parse_number(numbers.next()?.as_str())?;
    let new = parse_number(numbers.next()?.as_str())?;
    if old == 0.0 {
        return None;
    }
    let pct = (new - old) / old * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

fn first_number(value: &str) -> Option<f64> {
    parse_number(number_re().find(value)?.as_str())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse().ok()
}

fn percent_answer_matches(question: &GeneratedQuestion) -> bool {
    if !is_percent_increase_question(&question.question) {
        return true;
    }
    let Some(expected) = expected_percent_delta(&question.question) else {
        return true;
    };

    if let Some(num) = first_number(&question.correct_answer) {
        if (num - expected).abs() <= PERCENT_TOLERANCE {
            return true;
        }
    }
    question
        .options
        .iter()
        .filter_map(|opt| first_number(opt))
        .any(|num| (num - expected).abs() <= PERCENT_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, options: &[&str], correct: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            question: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.to_string(),
            explanation: None,
            step_by_step_thinking: None,
            topic: "Arithmetic".to_string(),
            question_type: "math".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn rejects_fewer_than_two_options() {
        let q = question("Pick one.", &["A. Only"], "A. Only");
        assert!(!is_valid_question(&q));
    }

    #[test]
    fn rejects_empty_correct_answer() {
        let q = question("Pick one.", &["A. 1", "B. 2"], "  ");
        assert!(!is_valid_question(&q));
    }

    #[test]
    fn accepts_letter_label_match() {
        let q = question("Pick one.", &["A. 1", "B. 2"], "B. two");
        assert!(is_valid_question(&q));
    }

    #[test]
    fn rejects_answer_matching_no_option() {
        let q = question("Pick one.", &["A. 1", "B. 2"], "C. 3");
        assert!(!is_valid_question(&q));
    }

    #[test]
    fn percent_increase_accepts_consistent_answer() {
        let q = question(
            "A price increased from 50 to 65. What was the percent increase?",
            &["A. 30%", "B. 15%", "C. 25%", "D. 40%"],
            "A. 30%",
        );
        assert!(is_valid_question(&q));
    }

    #[test]
    fn percent_increase_rejects_inconsistent_answer() {
        let q = question(
            "A price increased from 50 to 65. What was the percent increase?",
            &["A. 15%", "B. 20%"],
            "A. 15%",
        );
        assert!(!is_valid_question(&q));
    }

    #[test]
    fn non_percent_question_skips_semantic_check() {
        let q = question(
            "What is the capital of France?",
            &["A. Paris", "B. Rome"],
            "A. Paris",
        );
        assert!(is_valid_question(&q));
    }

    #[test]
    fn expected_delta_matches_hand_computation() {
        assert_eq!(
            expected_percent_delta("increased from 50 to 65"),
            Some(30.0)
        );
        assert_eq!(expected_percent_delta("increased from 0 to 65"), None);
        assert_eq!(expected_percent_delta("only 50 here"), None);
    }

    #[test]
    fn visual_question_without_image_is_flagged() {
        let mut q = question(
            "Which shape in the diagram comes next?",
            &["A. Circle", "B. Square"],
            "A. Circle",
        );
        assert!(requires_missing_image(&q));
        q.image_url = Some("https://example.com/pattern.png".to_string());
        assert!(!requires_missing_image(&q));
    }
}
