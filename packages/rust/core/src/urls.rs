//! Reference documentation URLs. Static data; no index involved.

use serde::Serialize;
use serde_json::{Map, Value};

use rfdocs_shared::IndexerConfig;

use crate::query::DEFAULT_LIBRARY;

/// Reply for a topic that is not one of the known keys.
pub const TOPIC_NOT_FOUND: &str = "Topic not found";

#[derive(Debug, Clone, Serialize)]
pub struct DocumentationUrls {
    pub version: String,
    /// `topic -> url` (or `name -> url` for `standard_libraries`). An
    /// unknown topic maps to [`TOPIC_NOT_FOUND`].
    pub urls: Map<String, Value>,
}

/// All reference URLs, or only the one named by `topic`.
pub fn documentation_urls(config: &IndexerConfig, topic: Option<&str>) -> DocumentationUrls {
    let mut urls = all_urls(config);

    if let Some(topic) = topic {
        let url = urls
            .remove(topic)
            .unwrap_or_else(|| TOPIC_NOT_FOUND.into());
        urls = Map::from_iter([(topic.to_string(), url)]);
    }

    DocumentationUrls {
        version: config.version.clone(),
        urls,
    }
}

fn all_urls(config: &IndexerConfig) -> Map<String, Value> {
    let builtin = config.library(DEFAULT_LIBRARY).map_or_else(
        || format!("{}{DEFAULT_LIBRARY}.html", config.all_libraries_url),
        |lib| lib.url.clone(),
    );

    let standard: Map<String, Value> = config
        .libraries
        .iter()
        .map(|lib| (lib.name.clone(), Value::String(lib.url.clone())))
        .collect();

    let mut urls = Map::new();
    urls.insert("user_guide".into(), config.user_guide_url.clone().into());
    urls.insert("builtin_library".into(), builtin.into());
    urls.insert("release_notes".into(), config.release_notes_url.clone().into());
    urls.insert("all_libraries".into(), config.all_libraries_url.clone().into());
    urls.insert("standard_libraries".into(), Value::Object(standard));
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfdocs_shared::AppConfig;

    fn config() -> IndexerConfig {
        IndexerConfig::from(&AppConfig::default())
    }

    #[test]
    fn lists_every_reference_url() {
        let response = documentation_urls(&config(), None);

        assert_eq!(response.version, "7.4.1");
        let urls = &response.urls;
        for key in [
            "user_guide",
            "builtin_library",
            "release_notes",
            "all_libraries",
            "standard_libraries",
        ] {
            assert!(urls.contains_key(key), "missing {key}");
        }
        assert_eq!(
            urls["builtin_library"],
            "https://robotframework.org/robotframework/7.4.1/libraries/BuiltIn.html"
        );
        assert_eq!(urls["standard_libraries"].as_object().unwrap().len(), 9);
    }

    #[test]
    fn topic_selects_single_entry() {
        let response = documentation_urls(&config(), Some("user_guide"));
        let urls = &response.urls;
        assert_eq!(urls.len(), 1);
        assert!(
            urls["user_guide"]
                .as_str()
                .unwrap()
                .ends_with("RobotFrameworkUserGuide.html")
        );
    }

    #[test]
    fn unknown_topic_is_a_negative_result() {
        let response = documentation_urls(&config(), Some("tutorials"));
        assert_eq!(response.urls.len(), 1);
        assert_eq!(response.urls["tutorials"], TOPIC_NOT_FOUND);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["urls"], serde_json::json!({ "tutorials": "Topic not found" }));
    }
}
