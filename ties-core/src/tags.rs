//! Tag index.
//!
//! Tags are never stored on their own; the set of known tags is derived from
//! the people on demand.

use crate::model::Person;
use std::collections::BTreeSet;

/// Distinct tags across all people, case-sensitive, in ascending order.
pub fn all_tags(people: &[Person]) -> BTreeSet<String> {
    people
        .iter()
        .flat_map(|p| p.tags.iter().cloned())
        .collect()
}

/// Known tags merged with the tags pending on the person being edited.
pub fn candidates(people: &[Person], pending: &[String]) -> BTreeSet<String> {
    let mut pool = all_tags(people);
    pool.extend(pending.iter().cloned());
    pool
}

/// Tags in `pool` containing `term` as a case-insensitive substring.
///
/// The term is trimmed first; an empty term matches everything. The result
/// keeps the pool's ascending order.
pub fn filter<'a>(pool: impl IntoIterator<Item = &'a String>, term: &str) -> Vec<String> {
    pool.into_iter()
        .filter(|tag| matches(tag, term))
        .cloned()
        .collect()
}

/// Case-insensitive substring match on the trimmed `term`. An empty term
/// matches anything.
pub fn matches(text: &str, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    needle.is_empty() || text.to_lowercase().contains(&needle)
}

/// Add `candidate` to `pending` unless it is blank or already present.
///
/// Returns whether the tag was added.
pub fn add_tag(pending: &mut Vec<String>, candidate: &str) -> bool {
    let tag = candidate.trim();
    if tag.is_empty() || pending.iter().any(|t| t == tag) {
        return false;
    }
    pending.push(tag.to_string());
    true
}

/// Remove `tag` from `pending` by exact match.
pub fn remove_tag(pending: &mut Vec<String>, tag: &str) -> bool {
    let before = pending.len();
    pending.retain(|t| t != tag);
    pending.len() != before
}
