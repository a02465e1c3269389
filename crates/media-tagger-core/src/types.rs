use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag appended to a sidecar record when an item has been auto-tagged.
/// Its presence makes the item ineligible for every later scan.
pub const SENTINEL_TAG: &str = "已自动标注";

/// Fixed-name marker file written next to the media. Written provisionally
/// when an item is claimed by a scan and finalized at commit time.
pub const SENTINEL_FILE: &str = "待标注为已标注.txt";

/// Name of the per-directory sidecar record.
pub const SIDECAR_NAME: &str = "metadata.json";

/// Media classes handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify an extension against the configured extension classes
    pub fn from_extension(ext: &str, image_exts: &[String], video_exts: &[String]) -> Option<Self> {
        let ext = ext.to_lowercase();
        if image_exts.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            Some(Self::Image)
        } else if video_exts.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// One media directory with its sidecar record: the unit of work
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Directory holding the sidecar and the media file
    pub dir: PathBuf,

    /// Media base name from the sidecar
    pub name: String,

    /// Media extension from the sidecar (lowercased)
    pub ext: String,

    /// Tags currently present in the sidecar
    pub tags: Vec<String>,

    /// Image or video, per the configured extension classes
    pub kind: MediaKind,
}

impl MediaItem {
    /// File name of the media file, `<name>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.ext)
    }

    /// Full path of the media file. This is the item's stable ledger key.
    pub fn media_path(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }
}

/// Outcome of one item's pass through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// Current ledger state for one item key. Last write wins per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub outcome: Outcome,

    /// Failure reason, empty on success
    pub detail: String,

    /// Local wall-clock time of the recording, `%Y-%m-%d %H:%M:%S`
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        let images = vec!["jpg".to_string(), "png".to_string()];
        let videos = vec!["mp4".to_string(), "webm".to_string()];

        assert_eq!(
            MediaKind::from_extension("JPG", &images, &videos),
            Some(MediaKind::Image)
        );
        assert_eq!(
            MediaKind::from_extension("mp4", &images, &videos),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_extension("txt", &images, &videos), None);
    }

    #[test]
    fn test_media_path() {
        let item = MediaItem {
            dir: PathBuf::from("/library/a"),
            name: "pic1".to_string(),
            ext: "jpg".to_string(),
            tags: vec![],
            kind: MediaKind::Image,
        };
        assert_eq!(item.media_path(), PathBuf::from("/library/a/pic1.jpg"));
    }
}
