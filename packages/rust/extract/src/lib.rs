//! Linear-scan extraction from fetched documentation pages.
//!
//! This crate provides:
//! - [`extract_sections`]: heading-delimited sections of the user guide
//! - [`extract_embedded_json`]: a JSON literal assigned inside a script block
//! - [`parse_library_document`]: library keywords, normalized into records

mod cleanup;
mod embedded_json;
mod keywords;
mod lexer;
mod sections;

pub use embedded_json::{
    assignment_anchor, extract_embedded_json, find_embedded_literal, literal_span,
};
pub use keywords::{
    LibraryDoc, LibraryKeywords, RawArgument, RawKeyword, normalize_keywords,
    parse_library_document,
};
pub use sections::extract_sections;
