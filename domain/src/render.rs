//! Markdown to HTML rendering for post bodies.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use pulldown_cmark_escape::{escape_href, escape_html, FmtWriter};

/// Rendering options, built once from settings and passed to whoever renders.
#[derive(Debug, Clone)]
pub struct RenderContext {
    options: Options,
    enable_html: bool,
}

struct PendingImage {
    dest: String,
    title: String,
    alt: String,
}

impl RenderContext {
    /// `enable_html` passes raw HTML in the note through; otherwise it is escaped.
    pub fn new(enable_html: bool) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self {
            options,
            enable_html,
        }
    }

    pub fn render(&self, markdown: &str) -> String {
        let mut events: Vec<Event> = Vec::new();
        let mut image: Option<PendingImage> = None;

        for event in Parser::new_ext(markdown, self.options) {
            if let Some(pending) = image.as_mut() {
                match event {
                    Event::End(TagEnd::Image) => {
                        if let Some(done) = image.take() {
                            events.push(Event::InlineHtml(CowStr::from(image_tag(&done))));
                        }
                    }
                    Event::Text(text) | Event::Code(text) => pending.alt.push_str(&text),
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    image = Some(PendingImage {
                        dest: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                    });
                }
                Event::Html(raw) | Event::InlineHtml(raw) if !self.enable_html => {
                    events.push(Event::Text(raw));
                }
                other => events.push(other),
            }
        }

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        output
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Split `alt|300x200` or `alt|300` into alt text and size.
fn split_size(alt: &str) -> (&str, Option<&str>, Option<&str>) {
    if let Some((text, hint)) = alt.rsplit_once('|') {
        let (width, height) = match hint.split_once('x') {
            Some((w, h)) => (w, Some(h)),
            None => (hint, None),
        };
        let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if numeric(width) && height.map_or(true, numeric) {
            return (text, Some(width), height);
        }
    }
    (alt, None, None)
}

fn image_tag(image: &PendingImage) -> String {
    let (alt, width, height) = split_size(&image.alt);
    let mut tag = format!(
        "<img src=\"{}\" alt=\"{}\"",
        attr_href(&image.dest),
        attr_text(alt)
    );
    if !image.title.is_empty() {
        tag.push_str(&format!(" title=\"{}\"", attr_text(&image.title)));
    }
    if let Some(width) = width {
        tag.push_str(&format!(" width=\"{}\"", width));
    }
    if let Some(height) = height {
        tag.push_str(&format!(" height=\"{}\"", height));
    }
    tag.push_str(" />");
    tag
}

// Escaped the same way pulldown-cmark escapes the image tags it renders itself.
fn attr_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    match escape_html(FmtWriter(&mut out), value) {
        Ok(()) => out,
        Err(_) => String::new(),
    }
}

fn attr_href(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    match escape_href(FmtWriter(&mut out), value) {
        Ok(()) => out,
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let html = RenderContext::default().render("# Title\n\nSome *text*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn image_size_hint_becomes_attributes() {
        let html = RenderContext::default().render("![cat|300x200](https://img/cat.png)");
        assert!(html.contains(
            "<img src=\"https://img/cat.png\" alt=\"cat\" width=\"300\" height=\"200\" />"
        ));
    }

    #[test]
    fn width_only_hint() {
        let html = RenderContext::default().render("![cat|300](https://img/cat.png)");
        assert!(html.contains("width=\"300\""));
        assert!(!html.contains("height="));
    }

    #[test]
    fn non_numeric_hint_stays_in_alt() {
        let html = RenderContext::default().render("![a|b](https://img/cat.png)");
        assert!(html.contains("alt=\"a|b\""));
    }

    #[test]
    fn image_attributes_are_escaped() {
        let html = RenderContext::default()
            .render(r#"![x & y](https://img/cat.png?a=1&b=2 "say \"hi\"")"#);
        assert!(html.contains(r#"src="https://img/cat.png?a=1&amp;b=2""#));
        assert!(html.contains(r#"alt="x &amp; y""#));
        assert!(html.contains(r#"title="say &quot;hi&quot;""#));
    }

    #[test]
    fn raw_html_is_escaped_unless_enabled() {
        let markdown = "before <span>inline</span> after";
        let escaped = RenderContext::new(false).render(markdown);
        assert!(escaped.contains("&lt;span&gt;"));

        let passed = RenderContext::new(true).render(markdown);
        assert!(passed.contains("<span>inline</span>"));
    }
}
