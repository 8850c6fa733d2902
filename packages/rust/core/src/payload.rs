//! Structured error results for the system boundary.

use serde::Serialize;

use rfdocs_shared::RfDocsError;

/// JSON shape every failed operation is reported as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_libraries: Option<Vec<String>>,
}

impl From<&RfDocsError> for ErrorPayload {
    fn from(err: &RfDocsError) -> Self {
        let mut payload = Self {
            error: err.to_string(),
            hint: None,
            available_libraries: None,
        };

        match err {
            RfDocsError::IndexMissing { .. } => {
                payload.hint = Some("Run `rfdocs rebuild` to download and index the docs".into());
            }
            RfDocsError::LibraryNotFound { available, .. } => {
                payload.available_libraries = Some(available.clone());
            }
            RfDocsError::InvalidPattern { .. } => {
                payload.hint =
                    Some("Patterns are case-insensitive regular expressions, e.g. `^should`".into());
            }
            RfDocsError::Fetch(_) => {
                payload.hint = Some("Check network access and the configured URLs".into());
            }
            RfDocsError::Parse(_) => {
                payload.hint =
                    Some("The document layout may have changed; try `rfdocs rebuild --force`".into());
            }
            _ => {}
        }

        payload
    }
}

impl From<RfDocsError> for ErrorPayload {
    fn from(err: RfDocsError) -> Self {
        Self::from(&err)
    }
}
