//! Locating and decoding a JSON object literal embedded in a larger document.
//!
//! The anchor regex finds where the literal starts; a small brace/string/escape
//! scanner finds where it ends, which a regex cannot do once strings contain
//! braces of their own.

use std::ops::Range;

use regex::Regex;
use serde::de::DeserializeOwned;

use rfdocs_shared::ParseError;

/// Anchor regex for an assignment of the form `<name> = {`.
pub fn assignment_anchor(name: &str) -> Regex {
    let pattern = format!(r"{}\s*=\s*\{{", regex::escape(name));
    Regex::new(&pattern).expect("escaped identifier is a valid regex")
}

/// Byte span of the balanced object literal whose `{` is at `open`.
///
/// Characters after a backslash are skipped, double quotes toggle string
/// mode, and braces only count outside strings. The returned span includes
/// both braces. An `open` that is not a `{` in `text` is rejected as
/// unterminated.
pub fn literal_span(text: &str, open: usize) -> Result<Range<usize>, ParseError> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return Err(ParseError::UnterminatedLiteral { start: open });
    }

    let mut depth: usize = 1;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[open + 1..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + 1 + offset;
                    return Ok(open..close + 1);
                }
            }
            _ => {}
        }
    }

    Err(ParseError::UnterminatedLiteral { start: open })
}

/// Locate the literal following the first match of `anchor` and return its text.
pub fn find_embedded_literal<'a>(text: &'a str, anchor: &Regex) -> Result<&'a str, ParseError> {
    let not_found = || ParseError::AnchorNotFound {
        anchor: anchor.as_str().to_string(),
    };

    let m = anchor.find(text).ok_or_else(not_found)?;
    let open = if m.as_str().ends_with('{') {
        m.end() - 1
    } else {
        m.end() + text[m.end()..].find('{').ok_or_else(not_found)?
    };

    let span = literal_span(text, open)?;
    Ok(&text[span])
}

/// Locate, extract and decode the literal following `anchor`.
pub fn extract_embedded_json<T: DeserializeOwned>(
    text: &str,
    anchor: &Regex,
) -> Result<T, ParseError> {
    let literal = find_embedded_literal(text, anchor)?;
    serde_json::from_str(literal).map_err(|e| ParseError::Decode(e.to_string()))
}
