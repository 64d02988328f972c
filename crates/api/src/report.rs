//! Crew report loading.

use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Read the JSON report at `path`. A missing, unreadable or malformed file
/// yields an empty object.
pub async fn load_report(path: &Path) -> Value {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Report not generated yet");
            return empty();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read report");
            return empty();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Report is not valid JSON");
        empty()
    })
}

/// Whether a loaded report has nothing to show.
pub fn is_empty(report: &Value) -> bool {
    match report {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn empty() -> Value {
    Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let report = load_report(&dir.path().join("crew_report.json")).await;
        assert_eq!(report, json!({}));
        assert!(is_empty(&report));
    }

    #[tokio::test]
    async fn test_reads_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crew_report.json");
        std::fs::write(&path, r#"{"report_text": "All vehicles nominal"}"#).unwrap();
        let report = load_report(&path).await;
        assert_eq!(report["report_text"], "All vehicles nominal");
        assert!(!is_empty(&report));
    }

    #[tokio::test]
    async fn test_malformed_report_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crew_report.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(is_empty(&load_report(&path).await));
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!(null)));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!({"tasks": []})));
    }
}
