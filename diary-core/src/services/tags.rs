//! Tag normalization
//!
//! Every tag list is normalized before it is saved on an entry or draft.

use crate::config::{MAX_TAGS, MAX_TAG_LENGTH, TAG_SENTINELS};
use std::collections::HashSet;

/// Normalize a tag list.
///
/// Tags are trimmed and cut to `MAX_TAG_LENGTH` characters. Blank tags and
/// the sentinels "other"/"none" are dropped, duplicates differing only by
/// case collapse to the first-seen casing, and at most `MAX_TAGS` survive.
/// Normalizing an already normalized list returns it unchanged.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();

    for tag in tags {
        let truncated: String = tag.as_ref().trim().chars().take(MAX_TAG_LENGTH).collect();
        let tag = truncated.trim_end();

        if tag.is_empty() || is_sentinel(tag) {
            continue;
        }

        if seen.insert(tag.to_lowercase()) {
            normalized.push(tag.to_string());
        }

        if normalized.len() == MAX_TAGS {
            break;
        }
    }

    normalized
}

fn is_sentinel(tag: &str) -> bool {
    TAG_SENTINELS.iter().any(|s| tag.eq_ignore_ascii_case(s))
}
