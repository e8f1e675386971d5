//! Input checks shared by several services

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Font;

/// Stored `font_override` meaning "use the site font"
pub const DEFAULT_FONT_OVERRIDE: &str = "default";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9+.-]*:").expect("valid scheme regex"));

static HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(localhost|\[[0-9a-f:.]+\]|[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*)(:\d{1,5})?$")
        .expect("valid host regex")
});

/// Trimmed, lowercased email
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose shape check: something@something.tld without whitespace
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Validate an absolute http(s) URL, returning the editor-facing message
pub fn validate_url(url: &str) -> Result<(), &'static str> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is required.");
    }

    let lower = url.to_ascii_lowercase();
    let rest = if let Some(rest) = lower.strip_prefix("https://") {
        rest
    } else if let Some(rest) = lower.strip_prefix("http://") {
        rest
    } else if SCHEME_RE.is_match(&lower) {
        return Err("URL must start with http:// or https://");
    } else {
        return Err("Enter a valid URL.");
    };

    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.rsplit_once('@').map(|(_, h)| h).unwrap_or(host);
    if host.is_empty() || !HOST_RE.is_match(host) || url.chars().any(char::is_whitespace) {
        return Err("Enter a valid URL.");
    }
    Ok(())
}

/// Check a page or post font override; blank means the site font
pub fn normalize_font_override(value: Option<&str>) -> Result<String, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_FONT_OVERRIDE.to_string()),
        Some(DEFAULT_FONT_OVERRIDE) => Ok(DEFAULT_FONT_OVERRIDE.to_string()),
        Some(key) => Font::from_key(key)
            .map(|font| font.key().to_string())
            .ok_or_else(|| format!("Unknown font: {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("reader example@x.io"));
        assert!(!is_valid_email("@x.io"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_url_messages() {
        assert_eq!(validate_url("  "), Err("URL is required."));
        assert_eq!(
            validate_url("ftp://files.example.com"),
            Err("URL must start with http:// or https://")
        );
        assert_eq!(validate_url("instagram.com/hvy"), Err("Enter a valid URL."));
        assert_eq!(validate_url("https://"), Err("Enter a valid URL."));
        assert_eq!(validate_url("https://bad host.com"), Err("Enter a valid URL."));
        assert_eq!(validate_url("https://exa_mple.com"), Err("Enter a valid URL."));
        assert!(validate_url("https://www.instagram.com/hellversusyou").is_ok());
        assert!(validate_url("HTTP://localhost:3000/path?x=1").is_ok());
        assert!(validate_url("https://discord.gg/abc#top").is_ok());
    }

    #[test]
    fn test_font_override() {
        assert_eq!(normalize_font_override(None).unwrap(), "default");
        assert_eq!(normalize_font_override(Some(" ")).unwrap(), "default");
        assert_eq!(normalize_font_override(Some("lora")).unwrap(), "lora");
        assert_eq!(normalize_font_override(Some("sourceSans3")).unwrap(), "sourceSans3");
        assert!(normalize_font_override(Some("comicSans")).is_err());
    }

    proptest! {
        #[test]
        fn normalized_email_is_idempotent(email in "\\s{0,3}[A-Za-z0-9.]{1,12}@[A-Za-z]{1,8}\\.[A-Za-z]{2,4}\\s{0,3}") {
            let once = normalize_email(&email);
            prop_assert_eq!(normalize_email(&once), once.clone());
            prop_assert!(is_valid_email(&once));
            prop_assert_eq!(once.to_lowercase(), once.clone());
        }
    }
}
