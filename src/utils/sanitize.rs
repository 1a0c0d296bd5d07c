use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"))
}

/// Strips markdown code fences and ASCII control characters (keeping
/// `\n`, `\r`, `\t`) from a raw model response.
pub fn sanitize_response_text(raw: &str) -> String {
    let without_fences = raw.replace("```json", "").replace("```", "");
    without_fences
        .chars()
        .filter(|c| !c.is_ascii_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Slice between the first `{` and the last `}`, dropping any prose the model
/// wrapped around the JSON object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Removes commas directly before a closing brace or bracket. A blunt repair
/// rule, but trailing commas are by far the most common malformation in
/// generated JSON.
pub fn strip_trailing_commas(text: &str) -> String {
    trailing_comma_re().replace_all(text, "$1").to_string()
}

/// Full sanitize-then-parse stage for a model response that is expected to be
/// a single JSON object. Repair failure is reported as the original parse
/// error, never a panic.
pub fn parse_llm_json(raw: &str) -> Result<JsonValue, serde_json::Error> {
    let sanitized = sanitize_response_text(raw);
    let candidate = extract_json_object(&sanitized).unwrap_or(&sanitized);

    match serde_json::from_str(candidate) {
        Ok(value) => Ok(value),
        Err(err) => {
            let repaired = strip_trailing_commas(candidate);
            serde_json::from_str(&repaired).map_err(|_| err)
        }
    }
}
