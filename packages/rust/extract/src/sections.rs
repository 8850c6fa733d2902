//! Heading-delimited section extraction.
//!
//! One pass over the token stream. An `h1`-`h4` start tag closes the open
//! section and opens a new one; text inside the heading becomes the title
//! (the last text run wins) and text after it accumulates as content until
//! the next heading. Text before the first heading is dropped.

use tracing::{debug, instrument};

use rfdocs_shared::Section;

use crate::lexer::{Lexer, Token};

/// Extract sections from an HTML document, in document order.
#[instrument(skip_all, fields(html_len = html.len()))]
pub fn extract_sections(html: &str) -> Vec<Section> {
    let mut extractor = SectionExtractor::default();
    for token in Lexer::new(html) {
        extractor.feed(token);
    }
    let sections = extractor.finish();
    debug!(sections = sections.len(), "sections extracted");
    sections
}

#[derive(Default)]
struct SectionExtractor {
    sections: Vec<Section>,
    current: Option<Section>,
    fragments: Vec<String>,
    in_heading: bool,
}

impl SectionExtractor {
    fn feed(&mut self, token: Token<'_>) {
        match &token {
            Token::StartTag {
                name, self_closing, ..
            } => {
                if let Some(level) = heading_level(name) {
                    self.close_current();
                    self.current = Some(Section {
                        id: token.attr("id").unwrap_or_default().to_string(),
                        level,
                        title: String::new(),
                        content: String::new(),
                    });
                    self.in_heading = !self_closing;
                }
            }
            Token::EndTag { name } => {
                if heading_level(name).is_some() {
                    self.in_heading = false;
                }
            }
            Token::Text(text) => {
                let Some(section) = self.current.as_mut() else {
                    return;
                };
                let trimmed = text.trim();
                if self.in_heading {
                    section.title = trimmed.to_string();
                } else if !trimmed.is_empty() {
                    self.fragments.push(trimmed.to_string());
                }
            }
        }
    }

    fn close_current(&mut self) {
        if let Some(mut section) = self.current.take() {
            section.content = self.fragments.join(" ").trim().to_string();
            self.sections.push(section);
        }
        self.fragments.clear();
    }

    fn finish(mut self) -> Vec<Section> {
        self.close_current();
        self.sections
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_follow_document_order() {
        let html = r#"<html><body>
            <p>Preamble that belongs to no section.</p>
            <h1 id="intro">Introduction</h1>
            <p>Robot Framework is a generic automation framework.</p>
            <p>It is keyword driven.</p>
            <h2 id="install">Installation</h2>
            <p>Use pip.</p>
            <h3>Extras</h3>
            <h4 id="deep">Deep</h4>
            <p>Last words.</p>
        </body></html>"#;

        let sections = extract_sections(html);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Introduction", "Installation", "Extras", "Deep"]);

        assert_eq!(sections[0].id, "intro");
        assert_eq!(sections[0].level, 1);
        assert_eq!(
            sections[0].content,
            "Robot Framework is a generic automation framework. It is keyword driven."
        );
        assert_eq!(sections[1].content, "Use pip.");
        assert_eq!(sections[2].id, "");
        assert_eq!(sections[2].content, "");
        assert_eq!(sections[3].level, 4);
        assert_eq!(sections[3].content, "Last words.");
        assert!(!sections.iter().any(|s| s.content.contains("Preamble")));
    }

    #[test]
    fn document_without_headings_yields_nothing() {
        assert!(extract_sections("<p>just text</p>").is_empty());
        assert!(extract_sections("").is_empty());
    }

    #[test]
    fn last_text_run_inside_heading_wins() {
        let html = r##"<h2 id="s1"><a href="#s1">2.1</a> Creating test data</h2><p>x</p>"##;
        let sections = extract_sections(html);
        assert_eq!(sections[0].title, "Creating test data");
        assert_eq!(sections[0].content, "x");
    }

    #[test]
    fn h5_and_h6_are_content() {
        let html = "<h2>Top</h2><h5>Minor</h5><p>text</p>";
        let sections = extract_sections(html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "Minor text");
    }

    #[test]
    fn tolerates_unclosed_headings() {
        let html = "<h1 id=a>First<p>para one</p><h2 id=b>Second</h2>tail";
        let sections = extract_sections(html);
        assert_eq!(sections.len(), 2);
        // Still inside the unclosed h1, so the paragraph text replaces the title.
        assert_eq!(sections[0].title, "para one");
        assert_eq!(sections[0].content, "");
        assert_eq!(sections[1].title, "Second");
        assert_eq!(sections[1].content, "tail");
    }

    #[test]
    fn content_is_whitespace_joined_and_entity_decoded() {
        let html = "<h1>Syntax</h1>\n  <p>  A &amp; B  </p>\n\n<pre>Log    x</pre>";
        let sections = extract_sections(html);
        assert_eq!(sections[0].content, "A & B Log    x");
    }
}
