//! Markdown rendering
//!
//! Rich text (post content, author notes, hero copy, captions, content
//! blocks) is stored as Markdown and rendered to HTML with pulldown-cmark.
//!
//! # Example
//!
//! ```
//! use comic_platform::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("Thanks for reading **episode 4**!");
//! assert!(html.contains("<strong>episode 4</strong>"));
//! ```

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Markdown to HTML renderer.
///
/// Supports headings, lists, links, images, blockquotes, code, emphasis,
/// strikethrough, tables and smart punctuation. Raw HTML in the source is
/// escaped rather than passed through, and `javascript:` links are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options
    }

    /// Render Markdown to an HTML fragment
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, Self::options()).map(sanitize_event);

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, parser);
        html_output
    }

    /// Render optional Markdown, `None` for blank input
    pub fn render_optional(&self, markdown: Option<&str>) -> Option<String> {
        markdown
            .filter(|m| !m.trim().is_empty())
            .map(|m| self.render(m))
    }

    /// Plain text for meta descriptions and search snippets
    pub fn to_plain_text(&self, markdown: &str) -> String {
        let mut text = String::new();
        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak
                | Event::HardBreak
                | Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::BlockQuote
                    | TagEnd::CodeBlock
                    | TagEnd::TableCell,
                ) => text.push(' '),
                _ => {}
            }
        }
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let lower = url.trim().to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("vbscript:") || lower.starts_with("data:text") {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// Escape text for interpolation into HTML (body or attribute)
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = MarkdownRenderer::new().render("# Notes\n\n- one\n- two\n\n~~old~~");
        assert!(html.contains("<h1>Notes</h1>"));
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = MarkdownRenderer::new().render("Hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_javascript_links_are_neutralized() {
        let html = MarkdownRenderer::new().render("[click](javascript:alert(1)) [ok](https://example.com)");
        assert!(html.contains(r##"<a href="#">click</a>"##));
        assert!(html.contains(r#"<a href="https://example.com">ok</a>"#));
    }

    #[test]
    fn test_render_optional_skips_blank() {
        let renderer = MarkdownRenderer::new();
        assert!(renderer.render_optional(None).is_none());
        assert!(renderer.render_optional(Some("   ")).is_none());
        assert!(renderer.render_optional(Some("text")).is_some());
    }

    #[test]
    fn test_plain_text() {
        let text = MarkdownRenderer::new().to_plain_text("# Title\n\nSome **bold** `code`.");
        assert_eq!(text, "Title Some bold code.");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }
}
