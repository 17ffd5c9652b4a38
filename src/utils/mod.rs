//! Utility functions and helpers.

pub mod http;

/// Build a filesystem-safe slug from a paper title.
///
/// Alphanumerics are kept lowercased, spaces/underscores/hyphens are kept,
/// everything else becomes an underscore, and spaces are then collapsed to
/// underscores.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else if c == ' ' || c == '_' || c == '-' {
            slug.push(c);
        } else {
            slug.push('_');
        }
    }
    slug.replace(' ', "_")
}

/// Extract a display name from an address.
///
/// An explicit `Name <addr>` display name wins; otherwise the local part of
/// the bare address is used, with dots and underscores spaced out and each
/// word title-cased.
pub fn display_name(address: &str) -> String {
    let trimmed = address.trim();
    if let Some(open) = trimmed.find('<') {
        let name = trimmed[..open].trim().trim_matches('"').trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    let bare = trimmed.trim_start_matches('<').trim_end_matches('>');
    let local = bare.split('@').next().unwrap_or(bare);
    title_case(&local.replace(['.', '_'], " "))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
