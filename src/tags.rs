use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_CHARS: usize = 32;

lazy_static! {
    static ref TAG_SEPARATOR: Regex = Regex::new(r"[,\s]+").unwrap();
    static ref TAG_INVALID: Regex = Regex::new(r"[^a-z0-9_-]").unwrap();
}

/// Turns free-form input like `"#News, events  Cup-2025"` into
/// `["news", "events", "cup-2025"]`.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for piece in TAG_SEPARATOR.split(raw) {
        let lowered = piece.trim_start_matches('#').to_lowercase();
        // Only ASCII survives the filter, so a char cut is a byte cut
        let mut tag = TAG_INVALID.replace_all(&lowered, "").into_owned();
        tag.truncate(MAX_TAG_CHARS);
        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_strips_and_lowercases() {
        assert_eq!(
            normalize_tags("#News, events  Cup-2025"),
            vec!["news", "events", "cup-2025"]
        );
    }

    #[test]
    fn drops_duplicates_and_junk() {
        assert_eq!(normalize_tags("news,#news, !!!, NEWS, a_b"), vec!["news", "a_b"]);
        assert!(normalize_tags("   ").is_empty());
    }

    #[test]
    fn caps_tag_length() {
        let long = "x".repeat(1500);
        let tags = normalize_tags(&format!("{} short", long));
        assert_eq!(tags[0].len(), MAX_TAG_CHARS);
        assert_eq!(tags[1], "short");
    }

    #[test]
    fn caps_tag_count() {
        let raw = (0..20).map(|i| format!("t{}", i)).collect::<Vec<_>>().join(",");
        assert_eq!(normalize_tags(&raw).len(), MAX_TAGS);
    }
}
