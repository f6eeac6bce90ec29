use regex::Regex;
use std::sync::OnceLock;

const FALLBACK_SLUG: &str = "unknown_novel";

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"))
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").expect("valid regex"))
}

/// Turn a translated title into a URL slug (`"The Hero's Return!"` -> `"the-heros-return"`).
///
/// Empty input, or input that reduces to nothing, yields `unknown_novel`.
pub fn slugify_english(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = non_word_regex().replace_all(&lowered, "");
    let joined = separator_regex().replace_all(&stripped, "-");
    let slug = joined.trim_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}
