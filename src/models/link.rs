//! Editable links used by heroes, call-to-action blocks and the
//! header/footer globals.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    Reference,
    Custom,
}

/// Collection an internal link points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRelation {
    Pages,
    Posts,
    Episodes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub relation_to: LinkRelation,
    pub slug: String,
}

/// Button styling hint for rendered links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAppearance {
    #[default]
    Inline,
    Default,
    Outline,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub label: Option<String>,
    pub new_tab: bool,
    pub reference: Option<LinkReference>,
    pub url: Option<String>,
    pub appearance: LinkAppearance,
}

static LOCALHOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^localhost(?::\d+)?(/.*)?$").expect("valid regex"));

impl Link {
    /// Resolved href, or `None` when the link has nowhere to go
    pub fn href(&self) -> Option<String> {
        let raw = match (self.link_type, &self.reference) {
            (LinkType::Reference, Some(reference)) if !reference.slug.trim().is_empty() => {
                let slug = reference.slug.trim();
                match reference.relation_to {
                    LinkRelation::Episodes => format!("/episode/{}/1", slug),
                    LinkRelation::Posts => format!("/posts/{}", slug),
                    LinkRelation::Pages if slug == "home" => "/".to_string(),
                    LinkRelation::Pages => format!("/{}", slug),
                }
            }
            _ => self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?.to_string(),
        };
        Some(normalize_href(&raw))
    }
}

/// Make a user-entered href safe to drop into an anchor
pub fn normalize_href(href: &str) -> String {
    const KEEP: [&str; 6] = ["/", "#", "http://", "https://", "mailto:", "tel:"];
    // "//host" would leave the site
    if href.starts_with("//") {
        format!("/{}", href.trim_start_matches('/'))
    } else if KEEP.iter().any(|prefix| href.starts_with(prefix)) {
        href.to_string()
    } else if LOCALHOST.is_match(href) {
        format!("http://{}", href)
    } else {
        format!("/{}", href.trim_start_matches('/'))
    }
}
