//! Mock documentation site and fixtures shared by the builder, query and
//! service tests.

use std::path::Path;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rfdocs_shared::{IndexerConfig, LibrarySource};

pub(crate) const USER_GUIDE_PATH: &str = "/RobotFrameworkUserGuide.html";

pub(crate) const USER_GUIDE: &str = r#"<!DOCTYPE html>
<html><head><title>Robot Framework User Guide</title>
<style>h1 { color: red; }</style></head>
<body>
<div class="contents">Table of contents</div>
<h1 id="introduction">Introduction</h1>
<p>Robot Framework is a generic open source automation framework.</p>
<h2 id="libraries">Libraries</h2>
<p>Keywords come from a test library or a resource file.</p>
<h2 id="using-the-library-keywords">Using the library keywords</h2>
</body></html>"#;

pub(crate) const BUILTIN_JSON: &str = r#"{
  "name": "BuiltIn",
  "keywords": [
    {"name": "Log", "args": [{"repr": "message"}, {"repr": "level=INFO"}],
     "shortdoc": "Logs the given message with the given level.", "source": "BuiltIn.py", "lineno": 3010},
    {"name": "Run Keyword", "args": [{"repr": "name"}, {"repr": "*args"}],
     "shortdoc": "Executes the given keyword with the given arguments.", "source": "BuiltIn.py", "lineno": 1920},
    {"name": "Should Be Equal", "args": [{"repr": "first"}, {"repr": "second"}],
     "shortdoc": "Fails if the given objects are unequal. Uses ``{}`` braces.", "source": "BuiltIn.py", "lineno": 612}
  ]
}"#;

pub(crate) const STRING_JSON: &str = r#"{
  "name": "String",
  "keywords": [
    {"name": "Convert To Lower Case", "args": [{"repr": "string"}],
     "shortdoc": "Converts string to lower case."},
    {"name": "Split String", "args": [{"repr": "string"}, {"repr": "separator=None"}],
     "shortdoc": "Splits the <code>string</code> using ``separator``."}
  ]
}"#;

/// Wrap library JSON the way generated library pages embed it.
pub(crate) fn library_page(json: &str) -> String {
    format!(
        "<html><head><script type=\"text/javascript\">\nlibdoc = {json};\n</script></head>\
         <body><div id=\"javascript-disabled\">Enable JavaScript</div></body></html>"
    )
}

fn library_path(name: &str) -> String {
    format!("/libraries/{name}.html")
}

pub(crate) struct Site {
    pub server: MockServer,
}

impl Site {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Config with the user guide and the BuiltIn and String libraries.
    pub fn config(&self, cache_dir: &Path) -> IndexerConfig {
        let uri = self.server.uri();
        IndexerConfig {
            version: "7.4.1".into(),
            cache_dir: cache_dir.to_path_buf(),
            user_guide_url: format!("{uri}{USER_GUIDE_PATH}"),
            libraries: ["BuiltIn", "String"]
                .into_iter()
                .map(|name| LibrarySource {
                    name: name.into(),
                    url: format!("{uri}{}", library_path(name)),
                })
                .collect(),
            all_libraries_url: format!("{uri}/libraries/"),
            release_notes_url: format!("{uri}/releasenotes.html"),
            user_agent: "rfdocs-test/1.0".into(),
            timeout_secs: 5,
            anchor: "libdoc".into(),
        }
    }

    pub async fn serve_user_guide(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path(USER_GUIDE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(USER_GUIDE))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn fail_user_guide(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(USER_GUIDE_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn serve_library(&self, name: &str, json: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(library_path(name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(library_page(json)))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn serve_raw_library(&self, name: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(library_path(name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(&self.server)
            .await;
    }

    pub async fn fail_library(&self, name: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(library_path(name)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Serve the user guide and both libraries, each exactly `times` times.
    pub async fn serve_all(&self, times: u64) {
        self.serve_user_guide(times).await;
        self.serve_library("BuiltIn", BUILTIN_JSON, times).await;
        self.serve_library("String", STRING_JSON, times).await;
    }
}
