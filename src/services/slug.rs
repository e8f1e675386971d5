//! Slug generation for every collection with a `slug` field

/// Build a URL slug from a title.
///
/// Lowercases ASCII letters, keeps other alphanumerics (including non-ASCII
/// letters), and collapses every other run of characters into one hyphen.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.trim().chars() {
        let lowered: String = c.to_lowercase().filter(|l| l.is_alphanumeric()).collect();
        if !lowered.is_empty() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push_str(&lowered);
        } else if c == '\'' || c == '\u{2019}' {
            // "Hero's" -> "heros"
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Explicit slug when given, otherwise one generated from the title
pub fn slug_or_generate(explicit: Option<&str>, title: &str) -> String {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => generate_slug(slug),
        None => generate_slug(title),
    }
}
