//! Test fixture loader for rapport golden transcripts.
//!
//! Each transcript holds raw parser records plus the expected detection,
//! filtering, and alert outcome. Integration tests in any workspace crate
//! load them through the helpers below.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;

/// Subdirectory holding the golden transcripts.
pub const TRANSCRIPTS: &str = "transcripts";

/// Root directory of the test-fixtures folder.
fn fixtures_root() -> PathBuf {
    // Works from any crate in the workspace: walk up to find test-fixtures.
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let mut path = PathBuf::from(&manifest_dir);

    while !path.join("test-fixtures").join(TRANSCRIPTS).exists() {
        if !path.pop() {
            panic!(
                "Could not find test-fixtures directory from CARGO_MANIFEST_DIR={}",
                manifest_dir
            );
        }
    }
    path.join("test-fixtures")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Load a fixture file as raw JSON Value.
pub fn load_fixture_value(relative_path: &str) -> serde_json::Value {
    load_fixture(relative_path)
}

/// Check that a fixture file exists.
pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// Get the absolute path to a fixture file.
pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_root().join(relative_path)
}

/// List all JSON files in a fixture subdirectory, sorted by name.
pub fn list_fixtures(subdir: &str) -> Vec<PathBuf> {
    let dir = fixtures_root().join(subdir);
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("Failed to read directory {}: {}", dir.display(), e))
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

// ---------------------------------------------------------------------------
// Golden transcript shape
// ---------------------------------------------------------------------------

/// One parser record, as the external transcript parser hands it over.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptRecord {
    pub id: String,
    pub timestamp: String,
    pub sender: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedMatch {
    pub message_id: String,
    pub category: String,
    pub trigger_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedFiltered {
    pub message_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedAlert {
    pub pattern: String,
    pub severity: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptExpectation {
    pub message_count: usize,
    pub low_confidence: bool,
    /// Every match in the window, in message order.
    pub matches: Vec<ExpectedMatch>,
    #[serde(default)]
    pub filtered_out: Vec<ExpectedFiltered>,
    #[serde(default)]
    pub alerts: Vec<ExpectedAlert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoldenTranscript {
    pub description: String,
    pub participants: [String; 2],
    pub messages: Vec<TranscriptRecord>,
    pub expected: TranscriptExpectation,
}

/// Load every golden transcript, sorted by file name.
pub fn load_transcripts() -> Vec<(String, GoldenTranscript)> {
    list_fixtures(TRANSCRIPTS)
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let relative = format!("{TRANSCRIPTS}/{name}");
            (name, load_fixture(&relative))
        })
        .collect()
}
