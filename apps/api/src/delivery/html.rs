//! Markdown → standalone HTML document for the text delivery path.
//!
//! Covers the subset the generator produces: `#`/`##`/`###` headings,
//! `**bold**`, `*italic*` and `[text](url)` links. Internal links (paths
//! starting with `/`) are rendered red so editors can spot them.

use regex::{Captures, Regex};

const DOCUMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {
            font-family: 'Sarabun', 'Arial', sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            color: #333;
        }
        h1, h2, h3 { color: #2c3e50; margin-top: 30px; margin-bottom: 15px; }
        h1 { font-size: 28px; border-bottom: 3px solid #3498db; padding-bottom: 10px; }
        h2 { font-size: 24px; color: #2980b9; }
        h3 { font-size: 20px; color: #34495e; }
        p { margin-bottom: 15px; text-align: justify; }
        a:hover { opacity: 0.8; }
    </style>
</head>
<body>
{body}
</body>
</html>
"#;

pub struct MarkdownRenderer {
    heading: Regex,
    bold: Regex,
    italic: Regex,
    link: Regex,
    blank_line: Regex,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            heading: Regex::new(r"^(#{1,3}) (.+)$").expect("heading pattern"),
            bold: Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"),
            italic: Regex::new(r"\*(.+?)\*").expect("italic pattern"),
            link: Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern"),
            blank_line: Regex::new(r"\n[ \t]*\n").expect("blank line pattern"),
        }
    }

    /// Renders `markdown` as a full HTML document titled `title`.
    pub fn render_document(&self, title: &str, markdown: &str) -> String {
        DOCUMENT_TEMPLATE
            .replace("{title}", &escape_html(title))
            .replace("{body}", &self.render_body(markdown))
    }

    /// Block-level conversion: blank lines split paragraphs, heading lines
    /// stand alone, other single newlines become `<br>`.
    pub fn render_body(&self, markdown: &str) -> String {
        let normalized = markdown.replace("\r\n", "\n");
        let mut out = Vec::new();

        for block in self.blank_line.split(normalized.trim()) {
            let mut paragraph: Vec<String> = Vec::new();
            for line in block.lines() {
                let line = line.trim_end();
                if let Some(caps) = self.heading.captures(line) {
                    flush_paragraph(&mut paragraph, &mut out);
                    let level = caps[1].len();
                    out.push(format!(
                        "<h{level}>{}</h{level}>",
                        self.render_inline(&caps[2])
                    ));
                } else if !line.trim().is_empty() {
                    paragraph.push(self.render_inline(line));
                }
            }
            flush_paragraph(&mut paragraph, &mut out);
        }

        out.join("\n")
    }

    fn render_inline(&self, text: &str) -> String {
        let escaped = escape_html(text);
        let html = self.bold.replace_all(&escaped, "<strong>${1}</strong>");
        let html = self.italic.replace_all(&html, "<em>${1}</em>");
        self.link
            .replace_all(&html, |caps: &Captures| {
                let (text, url) = (&caps[1], &caps[2]);
                if url.starts_with('/') {
                    format!(
                        r#"<a href="{url}" style="color: red; text-decoration: underline;">{text}</a>"#
                    )
                } else {
                    format!(r#"<a href="{url}" target="_blank">{text}</a>"#)
                }
            })
            .into_owned()
    }
}

fn flush_paragraph(paragraph: &mut Vec<String>, out: &mut Vec<String>) {
    if !paragraph.is_empty() {
        out.push(format!("<p>{}</p>", paragraph.join("<br>")));
        paragraph.clear();
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_body("# Title\n\nFirst line\nsecond line\n\n## Section\nBody");
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>First line<br>second line</p>\n<h2>Section</h2>\n<p>Body</p>"
        );
    }

    #[test]
    fn test_inline_emphasis() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_body("**strong** and *soft*");
        assert_eq!(html, "<p><strong>strong</strong> and <em>soft</em></p>");
    }

    #[test]
    fn test_internal_links_are_red_external_open_new_tab() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_body("See [beans](/beans) or [docs](https://example.com).");
        assert!(html.contains(
            r#"<a href="/beans" style="color: red; text-decoration: underline;">beans</a>"#
        ));
        assert!(html.contains(r#"<a href="https://example.com" target="_blank">docs</a>"#));
    }

    #[test]
    fn test_markup_in_content_is_escaped() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_body("a <script> & b");
        assert_eq!(html, "<p>a &lt;script&gt; &amp; b</p>");
    }

    #[test]
    fn test_document_wraps_body() {
        let renderer = MarkdownRenderer::new();
        let doc = renderer.render_document("Pour <Over>", "# Hi");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Pour &lt;Over&gt;</title>"));
        assert!(doc.contains("<h1>Hi</h1>"));
    }
}
