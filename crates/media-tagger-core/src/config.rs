use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The three configurable tag-exclusion rules, applied in declaration order.
/// A fourth, non-configurable structural rule (`^\d+(?:boy|girl)s?$`) always
/// runs after these; see `normalize::filters`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Regex exclusion, matched case-insensitively anywhere in the tag
    pub regex_filter: Option<String>,

    /// Tags excluded by verbatim comparison
    pub exact_tags: Vec<String>,

    /// Gender-term exclusion regex, matched case-insensitively
    pub gender_regex: Option<String>,
}

/// Scene-segmentation tool parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Content-detection sensitivity threshold
    pub threshold: u32,

    /// Minimum scene length, in frames
    pub min_scene_len: u32,

    /// Larger-dimension clamp for exported frames, in pixels
    pub max_image_size: u32,

    /// Formats that skip the listing pass and go straight to content detection
    pub direct_detect_exts: Vec<String>,

    /// Listing passes with fewer scenes than this fall back to content detection
    pub min_scene_count: usize,

    /// A scene longer than this (seconds) also forces content detection
    pub max_scene_secs: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            min_scene_len: 3,
            max_image_size: 2048,
            direct_detect_exts: vec!["gif".to_string(), "webm".to_string()],
            min_scene_count: 7,
            max_scene_secs: 30.0,
        }
    }
}

/// Configuration for the auto-tagging pipeline.
///
/// Constructed once and passed by reference to every component; there is no
/// global configuration cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directories to scan when none are given on the command line
    pub search_roots: Vec<PathBuf>,

    /// Extension class for image items
    pub image_exts: Vec<String>,

    /// Extension class for video items
    pub video_exts: Vec<String>,

    /// Image classifier endpoint (multipart file upload)
    pub api_url: String,

    /// Worker-pool width for the image-dispatch stage
    pub threads: usize,

    /// HTTP timeout for one classifier upload, in seconds
    pub upload_timeout_secs: u64,

    /// Pass manifest file; its absence after a scan means "no eligible work"
    pub manifest_path: PathBuf,

    /// Completion ledger database directory
    pub ledger_path: PathBuf,

    /// Two-column translation table, `source,localized` per line
    pub dictionary_path: PathBuf,

    /// Scene-segmentation parameters
    pub segmentation: SegmentationConfig,

    /// Tag exclusion rules
    pub filters: FilterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_roots: Vec::new(),
            image_exts: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            video_exts: vec![
                "mp4".to_string(),
                "mov".to_string(),
                "mkv".to_string(),
                "webm".to_string(),
                "gif".to_string(),
            ],
            api_url: String::new(),
            threads: 10,
            upload_timeout_secs: 120,
            manifest_path: PathBuf::from("path.txt"),
            ledger_path: PathBuf::from("media-tagger-ledger"),
            dictionary_path: PathBuf::from("Tags-zh.csv"),
            segmentation: SegmentationConfig::default(),
            filters: FilterConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the configuration before any work is dispatched
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(Error::Configuration(
                "classifier endpoint (api_url) is not set".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(Error::Configuration(
                "worker-pool width (threads) must be at least 1".to_string(),
            ));
        }
        if self.image_exts.is_empty() {
            return Err(Error::Configuration(
                "image extension class is empty".to_string(),
            ));
        }
        Ok(())
    }
}
