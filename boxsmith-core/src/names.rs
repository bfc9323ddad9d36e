//! Grouping name normalization.

/// Characters Jellyfin cannot use in a collection folder name.
const INVALID_NAME_CHARS: &[char] = &[':', '<', '>', '"', '/', '\\', '|', '?', '*'];

/// Turn a canonical collection name into the name used on the server.
///
/// Invalid characters become spaces and runs of whitespace collapse to one.
pub fn grouping_name(canonical: &str) -> String {
    let replaced: String = canonical
        .chars()
        .map(|c| if INVALID_NAME_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key used to compare a canonical name with an existing grouping name:
/// exact equality after sanitizing and case folding, nothing fuzzier.
pub fn match_key(name: &str) -> String {
    grouping_name(name).to_lowercase()
}
