use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn option_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[A-D][.)]\s*").expect("valid option prefix regex"))
}

/// Strips a leading `"A. "` / `"a) "` style label from an option or answer.
pub fn strip_option_prefix(value: &str) -> String {
    option_prefix_re().replace(value.trim(), "").to_string()
}

/// Trims, drops blank entries and keeps the first occurrence of each option.
pub fn clean_options(options: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut cleaned = Vec::new();
    for opt in options {
        let trimmed = opt.trim();
        if !trimmed.is_empty() && seen.insert(trimmed.to_string()) {
            cleaned.push(trimmed.to_string());
        }
    }
    cleaned
}

/// Best-effort map of a model-reported correct answer onto one literal option.
///
/// Cascade, first hit wins:
/// 1. exact match after trimming
/// 2. letter prefix A-D
/// 3. content match after stripping the letter label
/// 4. similarity ratio against each option, accepted only at >= 0.8
///
/// `None` means the generation is unusable and must be discarded; callers must
/// never substitute a default option.
pub fn align_correct_answer(options: &[String], correct_answer: &str) -> Option<String> {
    let cleaned = clean_options(options);
    if cleaned.is_empty() {
        return None;
    }

    let correct = correct_answer.trim();
    if correct.is_empty() {
        return None;
    }

    if let Some(opt) = cleaned.iter().find(|opt| opt.as_str() == correct) {
        return Some(opt.clone());
    }

    if let Some(first) = correct.chars().next() {
        let letter = first.to_ascii_uppercase();
        if ('A'..='D').contains(&letter) {
            if let Some(opt) = cleaned
                .iter()
                .find(|opt| opt.to_uppercase().starts_with(letter))
            {
                return Some(opt.clone());
            }
        }
    }

    let normalized_correct = strip_option_prefix(correct).to_lowercase();
    if !normalized_correct.is_empty() {
        if let Some(opt) = cleaned
            .iter()
            .find(|opt| strip_option_prefix(opt).to_lowercase() == normalized_correct)
        {
            return Some(opt.clone());
        }
    }

    let mut best: Option<(&String, f64)> = None;
    for opt in &cleaned {
        let ratio = similarity_ratio(
            &strip_option_prefix(opt).to_lowercase(),
            &normalized_correct,
        );
        if best.map_or(true, |(_, r)| ratio > r) {
            best = Some((opt, ratio));
        }
    }
    match best {
        Some((opt, ratio)) if ratio >= 0.8 => Some(opt.clone()),
        _ => None,
    }
}

/// Normalized longest-matching-blocks similarity: `2*M / (|a| + |b|)` where
/// `M` sums the longest common substring and, recursively, the matches on
/// either side of it. Two empty strings compare as identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Longest common substring via rolling DP.
    let mut best_len = 0;
    let mut best_a = 0;
    let mut best_b = 0;
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                cur[j + 1] = prev[j] + 1;
                if cur[j + 1] > best_len {
                    best_len = cur[j + 1];
                    best_a = i + 1 - cur[j + 1];
                    best_b = j + 1 - cur[j + 1];
                }
            }
        }
        prev = cur;
    }

    if best_len == 0 {
        return 0;
    }
    best_len
        + matching_chars(&a[..best_a], &b[..best_b])
        + matching_chars(&a[best_a + best_len..], &b[best_b + best_len..])
}
