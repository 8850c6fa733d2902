//! Flat HTML token stream.
//!
//! Produces start tags, end tags and text runs in document order. No tree is
//! built and nesting is never checked, so unclosed or stray tags are simply
//! passed through. Comments, doctypes and processing instructions produce no
//! tokens. The bodies of `<script>` and `<style>` are delivered as one raw
//! text token.

use std::borrow::Cow;

use html_escape::decode_html_entities;

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// A lexical event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// `<name attr=value ...>` (name and attribute names lower-cased).
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    /// `</name>` (lower-cased).
    EndTag { name: String },
    /// Text between tags, with character references decoded.
    Text(Cow<'a, str>),
}

impl Token<'_> {
    /// Value of the last occurrence of `name` on a start tag.
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Token::StartTag { attrs, .. } => attrs
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

/// Iterator over the tokens of an HTML string.
pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Set while inside a raw text element.
    raw_text: Option<String>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text: None,
        }
    }

    /// Consume the body of a raw text element up to its end tag.
    fn raw_text_body(&mut self, element: &str) -> Option<Token<'a>> {
        let rest = &self.input[self.pos..];
        let closing = format!("</{element}");
        let end = find_ignore_ascii_case(rest, &closing).unwrap_or(rest.len());
        self.pos += end;
        (end > 0).then(|| Token::Text(Cow::Borrowed(&rest[..end])))
    }

    /// Consume a text run up to the next piece of markup.
    fn text(&mut self) -> Token<'a> {
        let start = self.pos;
        // A `<` at `start` failed to lex as markup, so it is text.
        let mut search_from = start
            + self.input[start..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
        let end = loop {
            match self.input[search_from..].find('<') {
                Some(offset) => {
                    let candidate = search_from + offset;
                    if starts_markup(&self.input[candidate..]) {
                        break candidate;
                    }
                    search_from = candidate + 1;
                }
                None => break self.input.len(),
            }
        };
        self.pos = end;
        Token::Text(decode_html_entities(&self.input[start..end]))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }

            if let Some(element) = self.raw_text.take() {
                match self.raw_text_body(&element) {
                    Some(token) => return Some(token),
                    None => continue,
                }
            }

            let rest = &self.input[self.pos..];
            if rest.starts_with('<') {
                if let Some((token, consumed)) = lex_markup(rest) {
                    self.pos += consumed;
                    match token {
                        Some(token) => {
                            if let Token::StartTag {
                                name, self_closing, ..
                            } = &token
                            {
                                if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                                    self.raw_text = Some(name.clone());
                                }
                            }
                            return Some(token);
                        }
                        None => continue,
                    }
                }
            }

            return Some(self.text());
        }
    }
}

/// Whether `s` begins with something the lexer treats as markup.
fn starts_markup(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes {
        [b'<', b'!', ..] | [b'<', b'?', ..] => true,
        [b'<', b'/', c, ..] => c.is_ascii_alphabetic(),
        [b'<', c, ..] => c.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Lex the markup at the start of `s`.
///
/// Returns the token (`None` for ignored constructs such as comments) and
/// the number of bytes consumed, or `None` when `s` does not start with
/// complete markup and should be read as text.
fn lex_markup(s: &str) -> Option<(Option<Token<'_>>, usize)> {
    if !starts_markup(s) {
        return None;
    }

    if let Some(body) = s.strip_prefix("<!--") {
        let consumed = body.find("-->").map_or(s.len(), |end| 4 + end + 3);
        return Some((None, consumed));
    }

    if s.starts_with("<!") || s.starts_with("<?") {
        let consumed = s.find('>').map_or(s.len(), |end| end + 1);
        return Some((None, consumed));
    }

    if let Some(body) = s.strip_prefix("</") {
        let end = body.find('>')?;
        let name: String = body[..end]
            .split(|c: char| c.is_ascii_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        return Some((Some(Token::EndTag { name }), 2 + end + 1));
    }

    lex_start_tag(s).map(|(token, consumed)| (Some(token), consumed))
}

/// Lex `<name attr="value" ...>` honoring quoted attribute values.
fn lex_start_tag(s: &str) -> Option<(Token<'static>, usize)> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 1;

    let name_start = i;
    while i < len && !is_space(bytes[i]) && bytes[i] != b'/' && bytes[i] != b'>' {
        i += 1;
    }
    let name = s[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < len && is_space(bytes[i]) {
            i += 1;
        }
        if i >= len {
            return None;
        }

        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                i += 1;
                if i < len && bytes[i] == b'>' {
                    self_closing = true;
                    i += 1;
                    break;
                }
            }
            _ => {
                let attr_start = i;
                while i < len
                    && !is_space(bytes[i])
                    && bytes[i] != b'='
                    && bytes[i] != b'>'
                    && bytes[i] != b'/'
                {
                    i += 1;
                }
                let attr_name = s[attr_start..i].to_ascii_lowercase();

                while i < len && is_space(bytes[i]) {
                    i += 1;
                }

                let mut value = String::new();
                if i < len && bytes[i] == b'=' {
                    i += 1;
                    while i < len && is_space(bytes[i]) {
                        i += 1;
                    }
                    if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                        let quote = bytes[i];
                        i += 1;
                        let value_start = i;
                        while i < len && bytes[i] != quote {
                            i += 1;
                        }
                        if i >= len {
                            return None;
                        }
                        value = decode_html_entities(&s[value_start..i]).into_owned();
                        i += 1;
                    } else {
                        let value_start = i;
                        while i < len && !is_space(bytes[i]) && bytes[i] != b'>' {
                            i += 1;
                        }
                        value = decode_html_entities(&s[value_start..i]).into_owned();
                    }
                }

                if !attr_name.is_empty() {
                    attrs.push((attr_name, value));
                }
            }
        }
    }

    Some((
        Token::StartTag {
            name,
            attrs,
            self_closing,
        },
        i,
    ))
}

fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace()
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
