//! Plain-text cleanup for short keyword descriptions.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the cleanup pipeline on a raw `shortdoc` value.
pub(crate) fn plain_doc(raw: &str) -> String {
    let mut result = strip_tags(raw);
    result = unwrap_inline_literals(&result);
    result
}

/// Remove every `<...>` span.
fn strip_tags(text: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

    TAG_RE.replace_all(text, "").into_owned()
}

/// Replace double-backtick literals with their inner text.
fn unwrap_inline_literals(text: &str) -> String {
    static LITERAL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"``([^`]+)``").expect("valid regex"));

    LITERAL_RE.replace_all(text, "${1}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_html_tags() {
        assert_eq!(
            plain_doc("Logs the given <b>message</b> with the <a href=\"#x\">level</a>."),
            "Logs the given message with the level."
        );
    }

    #[test]
    fn unwraps_double_backtick_literals() {
        assert_eq!(
            plain_doc("Fails if ``first`` is not ``${NONE}``."),
            "Fails if first is not ${NONE}."
        );
    }

    #[test]
    fn leaves_single_backticks_and_empty_literals() {
        assert_eq!(plain_doc("a `b` ```` c"), "a `b` ```` c");
    }

    #[test]
    fn lone_angle_bracket_survives() {
        assert_eq!(plain_doc("x < y"), "x < y");
    }
}
