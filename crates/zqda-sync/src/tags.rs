//! Tag rewriting helpers
//!
//! Pure functions shared by the rename and cluster-tag operations of the
//! [`LibraryCache`](crate::LibraryCache).

use std::collections::HashSet;

use zqda_core::domain::Record;

/// Replace `from` with `to` inside every tag, keeping first occurrences
///
/// Tags that merely contain `from` are rewritten too, so renaming `method`
/// to `approach` turns `methods` into `approachs`. Returns `None` when no
/// tag changes.
pub fn rename_in_tags(tags: &[String], from: &str, to: &str) -> Option<Vec<String>> {
    if from.is_empty() || !tags.iter().any(|tag| tag.contains(from)) {
        return None;
    }

    let mut seen = HashSet::new();
    let renamed = tags
        .iter()
        .map(|tag| tag.replace(from, to))
        .filter(|tag| seen.insert(tag.clone()))
        .collect();
    Some(renamed)
}

/// Cluster tags are upper case and carry the library's prefix exactly once
pub fn normalize_cluster_tag(prefix: &str, target: &str) -> String {
    let bare = target
        .trim()
        .trim_start_matches(|c: char| prefix.contains(c));
    format!("{prefix}{}", bare.to_uppercase())
}

/// `tags` plus `target`, or `None` if it is already there
pub fn with_tag(tags: &[String], target: &str) -> Option<Vec<String>> {
    if tags.iter().any(|tag| tag == target) {
        return None;
    }
    let mut updated = tags.to_vec();
    updated.push(target.to_string());
    Some(updated)
}

/// Tags of annotations that have not been clustered yet
///
/// Only annotation records without any tag starting with `prefix` count.
/// The result keeps first-seen order and holds each tag once.
pub fn cluster_candidates<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    prefix: &str,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for record in records {
        if !record.is_annotation() || record.tags().iter().any(|t| t.starts_with(prefix)) {
            continue;
        }
        for tag in record.tags() {
            if seen.insert(tag.as_str()) {
                candidates.push(tag.clone());
            }
        }
    }
    candidates
}
