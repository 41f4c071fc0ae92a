//! Recovery of JSON objects from noisy model output

use regex::Regex;
use std::sync::OnceLock;

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // literal pattern
        Regex::new(r"```json|```").unwrap()
    })
}

/// Remove Markdown code-fence markers and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    fence_pattern().replace_all(text, "").trim().to_string()
}

/// Outermost brace-delimited span: first `{` through last `}`
///
/// Returns `None` when the text holds no such span. The span is not checked
/// for balance; the caller parses it strictly.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
