//! The translation dictionary: an immutable source-tag to localized-tag
//! mapping loaded once per run.
//!
//! A malformed row is a fatal configuration error, unlike per-item failures:
//! a run with a broken table would mistranslate every item it touches.

use log::warn;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    /// Load a two-column `source,localized` table. Keys are lowercased.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut entries = HashMap::new();

        for (index, line) in contents.lines().enumerate() {
            let line_num = index + 1;
            let line = line.trim();
            if line.is_empty() {
                warn!("Translation table line {} is empty", line_num);
                continue;
            }
            let (source, localized) = line.split_once(',').ok_or(Error::Translation {
                line: line_num,
                message: "missing comma separator".to_string(),
            })?;
            let source = source.trim();
            let localized = localized.trim();
            if source.is_empty() || localized.is_empty() {
                return Err(Error::Translation {
                    line: line_num,
                    message: "empty field".to_string(),
                });
            }
            entries.insert(source.to_lowercase(), localized.to_string());
        }

        Ok(Self { entries })
    }

    /// Build a dictionary from in-memory pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.into().to_lowercase(), v.into()))
            .collect();
        Self { entries }
    }

    /// Translate one token. Lookup is lowercased; a token containing any
    /// CJK character passes through untranslated, as does an unmapped one.
    pub fn translate(&self, token: &str) -> String {
        if contains_cjk(token) {
            return token.to_string();
        }
        self.entries
            .get(&token.to_lowercase())
            .cloned()
            .unwrap_or_else(|| token.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether the string contains a character in the CJK unified ideograph block
pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_and_translate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Tags-zh.csv");
        std::fs::write(&path, "red_hair,红发\n1girl,1个女孩\nBlue_Sky,蓝天\n").unwrap();

        let dict = Dictionary::load(&path).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.translate("red_hair"), "红发");
        // Lookup is lowercased on both sides.
        assert_eq!(dict.translate("BLUE_SKY"), "蓝天");
        // Unmapped tokens pass through.
        assert_eq!(dict.translate("green_eyes"), "green_eyes");
    }

    #[test]
    fn test_cjk_token_passes_through_even_when_mapped() {
        let dict = Dictionary::from_pairs([("红发", "never used")]);
        assert_eq!(dict.translate("红发"), "红发");
    }

    #[test]
    fn test_missing_comma_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Tags-zh.csv");
        std::fs::write(&path, "red_hair,红发\nbroken-line\n").unwrap();

        match Dictionary::load(&path) {
            Err(Error::Translation { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected Translation error, got {:?}", other.map(|d| d.len())),
        }
    }

    #[test]
    fn test_empty_field_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Tags-zh.csv");
        std::fs::write(&path, "red_hair,\n").unwrap();
        assert!(Dictionary::load(&path).is_err());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Tags-zh.csv");
        std::fs::write(&path, "red_hair,红发\n\nblue_sky,蓝天\n").unwrap();

        let dict = Dictionary::load(&path).unwrap();
        assert_eq!(dict.len(), 2);
    }
}
