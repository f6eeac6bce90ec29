use regex::Regex;
use std::sync::OnceLock;

fn viewer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/viewer/(\d+)").expect("valid regex"))
}

/// Extract the episode id embedded in a source URL (`.../viewer/12345`).
///
/// Returns `None` for missing URLs, URLs without a viewer segment and ids that
/// do not fit in an `i64`.
pub fn extract_episode_id(source_url: Option<&str>) -> Option<i64> {
    let url = source_url?;
    let captures = viewer_regex().captures(url)?;
    captures.get(1)?.as_str().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_viewer_id() {
        assert_eq!(
            extract_episode_id(Some("https://series.example.com/novel/55/viewer/12345")),
            Some(12345)
        );
    }

    #[test]
    fn test_first_viewer_segment_wins() {
        assert_eq!(
            extract_episode_id(Some("https://x.example/viewer/10?next=/viewer/20")),
            Some(10)
        );
    }

    #[test]
    fn test_missing_or_malformed_urls_yield_none() {
        assert_eq!(extract_episode_id(None), None);
        assert_eq!(extract_episode_id(Some("")), None);
        assert_eq!(extract_episode_id(Some("https://x.example/episode/12")), None);
        assert_eq!(extract_episode_id(Some("https://x.example/viewer/abc")), None);
        assert_eq!(extract_episode_id(Some("not a url at all")), None);
    }

    #[test]
    fn test_overflowing_id_yields_none() {
        assert_eq!(
            extract_episode_id(Some("/viewer/99999999999999999999999")),
            None
        );
    }
}
