//! Case-insensitive substring filter

/// Keep entries containing `term`, ignoring case, in their original order
pub fn filter_entries(entries: Vec<String>, term: &str) -> Vec<String> {
    let needle = term.to_lowercase();
    entries
        .into_iter()
        .filter(|entry| entry.to_lowercase().contains(&needle))
        .collect()
}
