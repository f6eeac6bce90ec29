//! Prompt construction and text hygiene for translation calls
use super::translator::TranslationRequest;
use crate::modules::novel::domain::{entities::ChapterImage, value_objects::Glossary};
use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on requested output tokens
pub const MAX_OUTPUT_TOKENS: usize = 64_000;
const MIN_OUTPUT_TOKENS: usize = 4_000;
const OUTPUT_TOKEN_HEADROOM: usize = 4_000;
const MIN_ESTIMATED_TOKENS: usize = 1_000;

pub const CORRUPTED_DATA_MARKER: &str = "[corrupted data removed]";

const SYSTEM_PROMPT: &str = "\
You are a professional Korean-to-English literary translator specializing in web novels.
Produce natural, fluent English that keeps the tone, personality and style of the original.

FORMATTING
1. Preserve every line break and blank line exactly as in the source.
2. Keep paragraph and sentence structure intact.
3. Output readable English only: no encoded strings, metadata, tags or notes.

CHARACTERS
- Use glossary names exactly as given and apply the stated pronouns consistently.
- Where pronouns are left to context, infer them from the narrative and stay consistent.
- Never alter names, ranks or titles.

STYLE
- Render honorifics and speech levels through tone rather than literal politeness markers.
- Romanize oppa, unnie, hyung, noona and sunbae; translate every other Korean term.
- The output must not contain any Hangul.
- Keep the intensity of profanity and insults; do not soften or embellish.
- Keep recurring system and skill terms consistent, including their capitalization.

OUTPUT
- Output only the translated text.
";

const USER_PROMPT_RULES: &str = "\
CRITICAL INSTRUCTIONS:
1. Preserve ALL line breaks and paragraph spacing EXACTLY as in the original
2. Keep the same number of blank lines between paragraphs
3. Preserve any [IMAGE_X] markers in their exact positions
4. IGNORE any encoded strings or metadata - only translate readable text
5. Output ONLY readable English text";

fn base64_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9+/]{40,}={0,2}").expect("valid base64 pattern"))
}

fn control_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\x9F]").expect("valid control pattern")
    })
}

fn hangul() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[가-힣]").expect("valid hangul pattern"))
}

fn kana() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[぀-ヿㇰ-ㇿ]").expect("valid kana pattern"))
}

fn detached_particle() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([가-힣])\s+(으로부터|에게서|에서|으로|까지|부터|에게|한테|보다|라도|라고|로서|처럼|같이|은|는|이|가|을|를|에|로|와|과|도|만|뿐|의)",
        )
        .expect("valid particle pattern")
    })
}

fn repeated_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"))
}

/// Output budget scaled to the input (about three characters per token).
pub fn max_output_tokens(text: &str) -> usize {
    let estimated = (text.chars().count() / 3).max(MIN_ESTIMATED_TOKENS);
    (estimated + OUTPUT_TOKEN_HEADROOM)
        .max(MIN_OUTPUT_TOKENS)
        .min(MAX_OUTPUT_TOKENS)
}

/// Strip embedded base64 blobs, HTML entities and control characters, and
/// collapse whitespace inside each line.
pub fn clean_source_text(text: &str) -> String {
    let without_blobs = base64_run().replace_all(text, "");
    let unescaped = unescape_entities(&without_blobs);

    let collapsed = unescaped
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n");

    control_chars().replace_all(&collapsed, "").into_owned()
}

/// Replace base64-looking runs that leaked into a model response
pub fn clean_translated_text(text: &str) -> String {
    base64_run()
        .replace_all(text, CORRUPTED_DATA_MARKER)
        .into_owned()
}

fn unescape_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Source language code for machine translation APIs
pub fn detect_source_language(text: &str, hint: Option<&str>) -> Option<&'static str> {
    if let Some(hint) = hint {
        let hint = hint.to_lowercase();
        if hint.contains("korean") || hint == "ko" {
            return Some("KO");
        }
        if hint.contains("japan") || hint == "ja" {
            return Some("JA");
        }
    }

    if hangul().is_match(text) {
        Some("KO")
    } else if kana().is_match(text) {
        Some("JA")
    } else {
        None
    }
}

/// Expand chat shorthand and collapse all whitespace runs
pub fn normalize_informal_korean(text: &str) -> String {
    let mut normalized = text.to_string();
    for (short, full) in [
        ("ㅇㅇㅋ", "응"),
        ("ㅇㄱㄹㅇ", "이거 레알"),
        ("ㅇㅇ", "응"),
        ("ㅇㅋ", "응"),
        ("ㅇㅈ", "인정"),
        ("ㄴㄴ", "아니"),
    ] {
        normalized = normalized.replace(short, full);
    }
    repeated_whitespace()
        .replace_all(&normalized, " ")
        .trim()
        .to_string()
}

/// Reattach particles separated from the preceding syllable
pub fn normalize_korean_spacing(text: &str) -> String {
    detached_particle().replace_all(text, "$1$2").into_owned()
}

pub fn build_system_prompt(custom_prompt_suffix: Option<&str>) -> String {
    match custom_prompt_suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) => format!("{}\n{}\n", SYSTEM_PROMPT, suffix),
        None => SYSTEM_PROMPT.to_string(),
    }
}

pub fn glossary_instructions(glossary: &Glossary) -> String {
    if glossary.is_empty() {
        return String::new();
    }

    let mut out = String::from("CHARACTER GLOSSARY - Use these EXACT translations:\n");
    for entry in glossary.entries() {
        out.push_str(&format!("\n- {} → {}", entry.korean_name, entry.english_name));
        if let Some(hint) = entry.gender {
            out.push_str(&format!(" ({})", hint.instruction()));
        }
    }
    out
}

pub fn image_context(images: &[ChapterImage]) -> String {
    if images.is_empty() {
        return String::new();
    }

    let mut out =
        String::from("Note: This chapter contains images at the following positions:\n");
    for image in images {
        out.push_str(&format!(
            "[IMAGE_{}] - {}\n",
            image.index,
            image.alt.as_deref().unwrap_or("Image")
        ));
    }
    out
}

/// User message for an already cleaned `text`
pub fn build_user_prompt(text: &str, request: &TranslationRequest) -> String {
    let glossary = request
        .glossary
        .as_ref()
        .map(glossary_instructions)
        .unwrap_or_default();

    format!(
        "{}\n\n{}\n\n{}\n\nKorean text:\n{}",
        USER_PROMPT_RULES,
        glossary,
        image_context(&request.images),
        text
    )
}
