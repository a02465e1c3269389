use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::Result;
use crate::types::{SENTINEL_TAG, SIDECAR_NAME};

/// The per-directory sidecar record (`metadata.json`).
///
/// Only `name`, `ext` and `tags` are owned by this system; every other field
/// is round-tripped untouched via the flattened `extra` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub ext: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sidecar {
    /// Read the sidecar record of a media directory
    pub fn load(dir: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(dir.join(SIDECAR_NAME))?;
        let sidecar = serde_json::from_str(&contents)?;
        Ok(sidecar)
    }

    /// Write the sidecar record back, preserving fields we do not own
    pub fn store(&self, dir: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(SIDECAR_NAME), contents)?;
        Ok(())
    }

    /// Whether the sentinel tag marks this record as already auto-tagged
    pub fn is_auto_tagged(&self) -> bool {
        self.tags.iter().any(|t| t == SENTINEL_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip_preserves_unknown_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SIDECAR_NAME),
            r#"{"name":"pic1","ext":"jpg","tags":["a"],"rating":5,"source":"scan"}"#,
        )
        .unwrap();

        let mut sidecar = Sidecar::load(dir.path()).unwrap();
        sidecar.tags.push("b".to_string());
        sidecar.store(dir.path()).unwrap();

        let reloaded = Sidecar::load(dir.path()).unwrap();
        assert_eq!(reloaded.name, "pic1");
        assert_eq!(reloaded.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(reloaded.extra.get("rating"), Some(&Value::from(5)));
        assert_eq!(reloaded.extra.get("source"), Some(&Value::from("scan")));
    }

    #[test]
    fn test_is_auto_tagged() {
        let sidecar: Sidecar =
            serde_json::from_str(r#"{"name":"v","ext":"mp4","tags":["已自动标注"]}"#).unwrap();
        assert!(sidecar.is_auto_tagged());

        let sidecar: Sidecar =
            serde_json::from_str(r#"{"name":"v","ext":"mp4","tags":["blue"]}"#).unwrap();
        assert!(!sidecar.is_auto_tagged());
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SIDECAR_NAME), "{not json").unwrap();
        assert!(Sidecar::load(dir.path()).is_err());
    }
}
