//! Theme engine
//!
//! Renders the public site with Tera. Templates are embedded in the binary
//! from `templates/` and loaded once at startup. Every page receives the
//! [`StandardTemplateVars`]: site title, tab title, font class, header and
//! footer globals, and the OpenGraph defaults.

use anyhow::Result;
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::models::{Footer, Header, Link, LinkAppearance};

mod error;
pub mod view;

pub use error::ThemeError;

/// Default OpenGraph description for every page
pub const DEFAULT_DESCRIPTION: &str = "Fantasy comic for ages 16+, built for readers interested in D&D, worldbuilding, and character-focused narratives.";

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Load the embedded templates
    pub fn new() -> Result<Self> {
        let mut templates = Vec::new();
        for name in EmbeddedTemplates::iter() {
            let file = EmbeddedTemplates::get(&name)
                .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|_| ThemeError::InvalidEncoding(name.to_string()))?;
            templates.push((name.to_string(), content));
        }
        Self::from_templates(templates)
    }

    /// Build an engine from `(name, source)` pairs
    pub fn from_templates(mut templates: Vec<(String, String)>) -> Result<Self> {
        // Base templates go first so children can extend them
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in &templates {
            tera.add_raw_template(name, content).map_err(|e| {
                ThemeError::TemplateError(format!("Failed to add template {}: {}", name, e))
            })?;
        }
        tera.build_inheritance_chains().map_err(|e| {
            ThemeError::TemplateError(format!("Failed to build template inheritance: {}", e))
        })?;

        tracing::debug!("Loaded {} templates", templates.len());
        Ok(Self { tera })
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Render a template; the error carries the whole cause chain
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut error_msg = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                error_msg.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::TemplateError(error_msg).into()
        })
    }

    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        standard_vars.insert_into(&mut full_context);
        self.render(template, &full_context)
    }

    /// Render a full page: `context` plus the standard variables
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> String {
        let mut full_context = context.clone();
        standard_vars.insert_into(&mut full_context);
        self.render_with_fallback(template, &full_context)
    }

    /// Render `template`, falling back to `error.html` and then to a
    /// built-in page. Never fails.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render template '{}': {}", template, e);

                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_title", "Something went wrong");
                error_context.insert("error_message", "This page could not be rendered.");

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(
                            "Failed to render error template: {}, returning simple HTML error page",
                            error_template_err
                        );
                        simple_error_page("Something went wrong", "This page could not be rendered.")
                    }
                }
            }
        }
    }
}

/// Last-resort page used when no template renders
pub fn simple_error_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/styles.css">
</head>
<body>
    <main class="container error-page">
        <h1>{title}</h1>
        <p>{message}</p>
        <p><a href="/">Back to home</a></p>
    </main>
</body>
</html>"#,
        title = tera::escape_html(title),
        message = tera::escape_html(message),
    )
}

/// OpenGraph tags for one page
#[derive(Debug, Clone, Serialize)]
pub struct OpenGraph {
    pub site_name: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub image: Option<String>,
}

/// A [`Link`] with its href resolved, ready for a template
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub new_tab: bool,
    pub appearance: LinkAppearance,
}

impl NavLink {
    /// `None` when the link has no destination
    pub fn from_link(link: &Link) -> Option<Self> {
        let href = link.href()?;
        let label = link
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| href.clone());
        Some(Self {
            label,
            href,
            new_tab: link.new_tab,
            appearance: link.appearance,
        })
    }

    pub fn from_links(links: &[Link]) -> Vec<Self> {
        links.iter().filter_map(Self::from_link).collect()
    }
}

/// Social link as shown in the footer
#[derive(Debug, Clone, Serialize)]
pub struct FooterSocialLink {
    pub label: String,
    pub platform: String,
    pub url: String,
}

/// Variables every page template receives
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site_title: String,
    pub tab_title: String,
    pub description: String,
    pub request_path: String,
    pub font_class: String,
    pub favicon_url: Option<String>,
    pub header: Header,
    pub header_logo_url: Option<String>,
    pub header_nav: Vec<NavLink>,
    pub header_cta: Option<NavLink>,
    pub footer: Footer,
    pub footer_nav: Vec<NavLink>,
    pub legal_links: Vec<NavLink>,
    pub footer_logo_url: Option<String>,
    pub footer_background_url: Option<String>,
    pub social_links: Vec<FooterSocialLink>,
    pub og: OpenGraph,
    /// For the copyright line
    pub year: i32,
}

impl StandardTemplateVars {
    pub fn new(site_title: impl Into<String>, request_path: impl Into<String>) -> Self {
        let site_title = site_title.into();
        Self {
            tab_title: site_title.clone(),
            description: DEFAULT_DESCRIPTION.to_string(),
            request_path: request_path.into(),
            font_class: String::new(),
            favicon_url: None,
            header: Header::default(),
            header_logo_url: None,
            header_nav: Vec::new(),
            header_cta: None,
            footer: Footer::default(),
            footer_nav: Vec::new(),
            legal_links: Vec::new(),
            footer_logo_url: None,
            footer_background_url: None,
            social_links: Vec::new(),
            og: OpenGraph {
                site_name: site_title.clone(),
                title: site_title.clone(),
                description: DEFAULT_DESCRIPTION.to_string(),
                url: String::new(),
                image: None,
            },
            year: chrono::Utc::now().year(),
            site_title,
        }
    }

    fn insert_into(&self, context: &mut TeraContext) {
        context.insert("site_title", &self.site_title);
        context.insert("tab_title", &self.tab_title);
        context.insert("description", &self.description);
        context.insert("request_path", &self.request_path);
        context.insert("font_class", &self.font_class);
        context.insert("favicon_url", &self.favicon_url);
        context.insert("header", &self.header);
        context.insert("header_logo_url", &self.header_logo_url);
        context.insert("header_nav", &self.header_nav);
        context.insert("header_cta", &self.header_cta);
        context.insert("footer", &self.footer);
        context.insert("footer_nav", &self.footer_nav);
        context.insert("legal_links", &self.legal_links);
        context.insert("footer_logo_url", &self.footer_logo_url);
        context.insert("footer_background_url", &self.footer_background_url);
        context.insert("social_links", &self.social_links);
        context.insert("og", &self.og);
        context.insert("year", &self.year);
    }
}
