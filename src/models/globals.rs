//! Site-wide singleton documents: site settings, header and footer.
//!
//! Each global is stored as one JSON document in the `globals` table under
//! its [`GlobalDocument::NAME`]. Missing fields deserialize to the editor
//! defaults, so an empty table renders a complete site.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::link::Link;

pub const DEFAULT_SITE_TITLE: &str = "Hell Versus You";

/// Maximum number of navigation or legal links in a global
pub const MAX_NAV_ITEMS: usize = 6;

/// A singleton document kept in the `globals` table
pub trait GlobalDocument: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Storage key and URL segment, e.g. `site-settings`
    const NAME: &'static str;

    /// Cache tag revalidated when the document changes
    fn cache_tag() -> String {
        format!("global_{}", Self::NAME)
    }

    /// Editor-facing check run before saving
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn check_link_count(field: &str, links: &[Link]) -> Result<(), String> {
    if links.len() > MAX_NAV_ITEMS {
        return Err(format!("{} can have at most {} links", field, MAX_NAV_ITEMS));
    }
    Ok(())
}

/// Theme font choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Font {
    #[default]
    PatrickHand,
    Inter,
    Lora,
    Roboto,
    OpenSans,
    Lato,
    Montserrat,
    Oswald,
    #[serde(rename = "sourceSans3")]
    SourceSans3,
    Raleway,
    Poppins,
    Merriweather,
    Nunito,
    Spectral,
}

impl Font {
    pub const ALL: [Font; 14] = [
        Font::PatrickHand,
        Font::Inter,
        Font::Lora,
        Font::Roboto,
        Font::OpenSans,
        Font::Lato,
        Font::Montserrat,
        Font::Oswald,
        Font::SourceSans3,
        Font::Raleway,
        Font::Poppins,
        Font::Merriweather,
        Font::Nunito,
        Font::Spectral,
    ];

    /// Stored key, e.g. `patrickHand`
    pub fn key(&self) -> &'static str {
        match self {
            Font::PatrickHand => "patrickHand",
            Font::Inter => "inter",
            Font::Lora => "lora",
            Font::Roboto => "roboto",
            Font::OpenSans => "openSans",
            Font::Lato => "lato",
            Font::Montserrat => "montserrat",
            Font::Oswald => "oswald",
            Font::SourceSans3 => "sourceSans3",
            Font::Raleway => "raleway",
            Font::Poppins => "poppins",
            Font::Merriweather => "merriweather",
            Font::Nunito => "nunito",
            Font::Spectral => "spectral",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// CSS class applied to `<body>`, e.g. `font-theme-patrick-hand`
    pub fn class_name(&self) -> String {
        let mut kebab = String::new();
        for (i, c) in self.key().chars().enumerate() {
            if c.is_ascii_uppercase() || (c.is_ascii_digit() && i > 0) {
                kebab.push('-');
            }
            kebab.push(c.to_ascii_lowercase());
        }
        format!("font-theme-{}", kebab)
    }

    /// Font for a document override; `default` or unknown keys use the site font
    pub fn effective(site_font: Font, override_key: Option<&str>) -> Font {
        override_key.and_then(Font::from_key).unwrap_or(site_font)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteSettings {
    pub site_title: String,
    pub favicon_id: Option<i64>,
    pub default_font: Font,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_title: DEFAULT_SITE_TITLE.to_string(),
            favicon_id: None,
            default_font: Font::default(),
        }
    }
}

impl SiteSettings {
    /// Configured title, or the default when blank
    pub fn title(&self) -> &str {
        let title = self.site_title.trim();
        if title.is_empty() {
            DEFAULT_SITE_TITLE
        } else {
            title
        }
    }
}

impl GlobalDocument for SiteSettings {
    const NAME: &'static str = "site-settings";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderVariant {
    #[default]
    Default,
    Light,
    Dark,
    Glass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerWidth {
    #[default]
    Default,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavAlignment {
    #[default]
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarHeight {
    Compact,
    #[default]
    Default,
    Tall,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeaderBrand {
    pub logo_media_id: Option<i64>,
    pub logo_alt: Option<String>,
    pub show_title: bool,
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeaderStyle {
    pub variant: HeaderVariant,
    pub sticky: bool,
    pub show_bottom_border: bool,
    pub container_width: ContainerWidth,
    pub nav_alignment: NavAlignment,
    pub show_search: bool,
    pub height: BarHeight,
}

impl Default for HeaderStyle {
    fn default() -> Self {
        Self {
            variant: HeaderVariant::default(),
            sticky: false,
            show_bottom_border: false,
            container_width: ContainerWidth::default(),
            nav_alignment: NavAlignment::default(),
            show_search: true,
            height: BarHeight::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeaderColors {
    pub background: Option<String>,
    pub text: Option<String>,
    pub muted_text: Option<String>,
    pub link: Option<String>,
    pub search_icon: Option<String>,
    pub border: Option<String>,
    pub cta_background: Option<String>,
    pub cta_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CtaLink {
    pub enabled: bool,
    pub link: Link,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Header {
    pub brand: HeaderBrand,
    pub style: HeaderStyle,
    pub colors: HeaderColors,
    pub nav_items: Vec<Link>,
    pub cta_link: CtaLink,
}

impl GlobalDocument for Header {
    const NAME: &'static str = "header";

    fn validate(&self) -> Result<(), String> {
        check_link_count("Navigation", &self.nav_items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FooterVariant {
    #[default]
    Dark,
    Light,
    Minimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FooterBrand {
    pub logo_media_id: Option<i64>,
    pub logo_alt: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FooterStyle {
    pub variant: FooterVariant,
    pub show_theme_selector: bool,
    pub height: BarHeight,
}

impl Default for FooterStyle {
    fn default() -> Self {
        Self {
            variant: FooterVariant::default(),
            show_theme_selector: true,
            height: BarHeight::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FooterColors {
    pub background: Option<String>,
    pub text: Option<String>,
    pub muted_text: Option<String>,
    pub link: Option<String>,
    pub border: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FooterLegal {
    pub copyright: Option<String>,
    pub legal_links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Footer {
    pub brand: FooterBrand,
    pub style: FooterStyle,
    pub colors: FooterColors,
    pub background_media_id: Option<i64>,
    pub nav_items: Vec<Link>,
    pub social_heading: String,
    /// Social links to show; empty shows all of them
    pub social_link_ids: Vec<i64>,
    pub legal: FooterLegal,
}

impl Default for Footer {
    fn default() -> Self {
        Self {
            brand: FooterBrand::default(),
            style: FooterStyle::default(),
            colors: FooterColors::default(),
            background_media_id: None,
            nav_items: Vec::new(),
            social_heading: "Follow:".to_string(),
            social_link_ids: Vec::new(),
            legal: FooterLegal::default(),
        }
    }
}

impl GlobalDocument for Footer {
    const NAME: &'static str = "footer";

    fn validate(&self) -> Result<(), String> {
        check_link_count("Navigation", &self.nav_items)?;
        check_link_count("Legal links", &self.legal.legal_links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_class_names() {
        assert_eq!(Font::PatrickHand.class_name(), "font-theme-patrick-hand");
        assert_eq!(Font::OpenSans.class_name(), "font-theme-open-sans");
        assert_eq!(Font::SourceSans3.class_name(), "font-theme-source-sans-3");
        assert_eq!(Font::Inter.class_name(), "font-theme-inter");
    }

    #[test]
    fn test_font_keys_round_trip() {
        for font in Font::ALL {
            assert_eq!(Font::from_key(font.key()), Some(font));
            let json = serde_json::to_string(&font).unwrap();
            assert_eq!(json, format!("\"{}\"", font.key()));
        }
        assert_eq!(Font::from_key("default"), None);
    }

    #[test]
    fn test_effective_font() {
        assert_eq!(Font::effective(Font::Lora, Some("default")), Font::Lora);
        assert_eq!(Font::effective(Font::Lora, None), Font::Lora);
        assert_eq!(Font::effective(Font::Lora, Some("oswald")), Font::Oswald);
    }

    #[test]
    fn test_site_title_falls_back_when_blank() {
        let mut settings = SiteSettings::default();
        assert_eq!(settings.title(), "Hell Versus You");
        settings.site_title = "   ".to_string();
        assert_eq!(settings.title(), "Hell Versus You");
        settings.site_title = " HvY ".to_string();
        assert_eq!(settings.title(), "HvY");
    }

    #[test]
    fn test_empty_documents_use_defaults() {
        let header: Header = serde_json::from_str("{}").unwrap();
        assert!(header.style.show_search);
        assert!(!header.brand.show_title);

        let footer: Footer = serde_json::from_str("{}").unwrap();
        assert_eq!(footer.social_heading, "Follow:");
        assert!(footer.style.show_theme_selector);
        assert_eq!(footer.style.variant, FooterVariant::Dark);
    }

    #[test]
    fn test_cache_tags() {
        assert_eq!(SiteSettings::cache_tag(), "global_site-settings");
        assert_eq!(Header::cache_tag(), "global_header");
    }
}
