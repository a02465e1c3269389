//! Item catalog: discovery of eligible work items from sidecar records.
//!
//! Two scan variants exist with different cardinality. The batch variant
//! collects every eligible image item in one pass. The single-item variant
//! returns at most one eligible video item per call, because segmentation
//! mutates the item's directory and must complete before a rescan.
//!
//! Selecting an item has a required side effect: the pending marker file is
//! written first, then the media path is appended to the pass manifest. The
//! marker write uses create-new semantics, so two coordinators racing over
//! the same directory cannot both select it.

pub mod sidecar;

use log::{debug, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::manifest::Manifest;
use crate::types::{MediaItem, MediaKind, SENTINEL_FILE, SENTINEL_TAG, SIDECAR_NAME};
use sidecar::Sidecar;

/// Batch variant: collect all eligible image items under the given roots.
///
/// Every scan is fresh; nothing is cached across calls. For each selected
/// item the pending marker is written and the manifest appended, in that
/// order.
pub fn find_images(
    roots: &[PathBuf],
    config: &Config,
    ledger: &Ledger,
    manifest: &Manifest,
) -> Result<Vec<MediaItem>> {
    let mut items = Vec::new();
    for root in roots {
        for dir in sidecar_directories(root) {
            if let Some(item) = eligible_item(&dir, config, ledger, MediaKind::Image)? {
                if claim(&dir)? {
                    // A marker without a manifest entry would be invisible
                    // to recovery, stranding the item forever.
                    if let Err(e) = manifest.append(&item.media_path()) {
                        release_claim(&dir);
                        return Err(e);
                    }
                    items.push(item);
                }
            }
        }
    }
    Ok(items)
}

/// Single-item variant: return the first eligible video item, or `None`.
///
/// On a match the manifest is replaced with that one media path; on no match
/// the manifest is removed. Its absence is the video loop's termination
/// signal.
pub fn find_next_video(
    roots: &[PathBuf],
    config: &Config,
    ledger: &Ledger,
    manifest: &Manifest,
) -> Result<Option<MediaItem>> {
    for root in roots {
        for dir in sidecar_directories(root) {
            if let Some(item) = eligible_item(&dir, config, ledger, MediaKind::Video)? {
                if claim(&dir)? {
                    if let Err(e) = manifest.replace(&[item.media_path()]) {
                        release_claim(&dir);
                        return Err(e);
                    }
                    return Ok(Some(item));
                }
            }
        }
    }
    manifest.remove()?;
    Ok(None)
}

/// Directories under `root` that contain a sidecar record
fn sidecar_directories(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path().to_path_buf())
        .filter(|dir| dir.join(SIDECAR_NAME).is_file())
}

/// Apply the eligibility invariant to one sidecar directory.
///
/// A malformed sidecar is logged and skipped without aborting the scan.
fn eligible_item(
    dir: &Path,
    config: &Config,
    ledger: &Ledger,
    wanted: MediaKind,
) -> Result<Option<MediaItem>> {
    let sidecar = match Sidecar::load(dir) {
        Ok(sidecar) => sidecar,
        Err(e) => {
            warn!("Skipping {}: unreadable sidecar: {}", dir.display(), e);
            return Ok(None);
        }
    };

    if sidecar.is_auto_tagged() {
        return Ok(None);
    }
    if sidecar.name.is_empty() || sidecar.ext.is_empty() {
        warn!(
            "Skipping {}: sidecar lacks a name or extension",
            dir.display()
        );
        return Ok(None);
    }

    let ext = sidecar.ext.trim().to_lowercase();
    match MediaKind::from_extension(&ext, &config.image_exts, &config.video_exts) {
        Some(kind) if kind == wanted => {}
        _ => return Ok(None),
    }

    // A present marker means another pass has already claimed this item.
    if dir.join(SENTINEL_FILE).exists() {
        debug!("Skipping {}: pending marker present", dir.display());
        return Ok(None);
    }

    let item = MediaItem {
        dir: dir.to_path_buf(),
        name: sidecar.name.clone(),
        ext,
        tags: sidecar.tags.clone(),
        kind: wanted,
    };

    // Replay skip: a current success entry is permanent.
    if ledger.is_done(&item.media_path())? {
        debug!(
            "Skipping {}: ledger holds a success entry",
            item.media_path().display()
        );
        return Ok(None);
    }

    Ok(Some(item))
}

/// Atomically claim a directory by creating its pending marker.
///
/// Returns false when the marker already exists, i.e. the race was lost to
/// another coordinator between eligibility check and claim.
fn claim(dir: &Path) -> Result<bool> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dir.join(SENTINEL_FILE))
    {
        Ok(mut file) => {
            file.write_all(SENTINEL_TAG.as_bytes())?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove a directory's pending marker, restoring its eligibility
pub fn release_claim(dir: &Path) {
    if let Err(e) = std::fs::remove_file(dir.join(SENTINEL_FILE)) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "Could not remove pending marker in {}: {}",
                dir.display(),
                e
            );
        }
    }
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_sidecar(dir: &Path, name: &str, ext: &str, tags: &[&str]) {
        std::fs::create_dir_all(dir).unwrap();
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let record = serde_json::json!({ "name": name, "ext": ext, "tags": tags });
        std::fs::write(dir.join(SIDECAR_NAME), record.to_string()).unwrap();
        std::fs::write(dir.join(format!("{}.{}", name, ext)), b"media").unwrap();
    }

    struct Fixture {
        _root: tempfile::TempDir,
        root: PathBuf,
        config: Config,
        ledger: Ledger,
        manifest: Manifest,
        _state: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let root_dir = tempdir().unwrap();
        let state = tempdir().unwrap();
        let config = Config::default();
        let ledger = Ledger::open(&state.path().join("ledger")).unwrap();
        let manifest = Manifest::new(state.path().join("path.txt"));
        Fixture {
            root: root_dir.path().to_path_buf(),
            _root: root_dir,
            config,
            ledger,
            manifest,
            _state: state,
        }
    }

    #[test]
    fn test_batch_scan_selects_eligible_images() {
        let f = fixture();
        write_sidecar(&f.root.join("a"), "pic1", "jpg", &[]);
        write_sidecar(&f.root.join("b"), "pic2", "png", &["existing"]);
        write_sidecar(&f.root.join("c"), "clip", "mp4", &[]);

        let items =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        let mut names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["pic1", "pic2"]);

        // Selection wrote the marker and the manifest, marker first.
        assert!(f.root.join("a").join(SENTINEL_FILE).exists());
        let listed = f.manifest.load().unwrap().unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn test_sentinel_tag_blocks_selection() {
        let f = fixture();
        write_sidecar(&f.root.join("a"), "pic1", "jpg", &[SENTINEL_TAG]);

        let items =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_malformed_sidecar_is_skipped_not_fatal() {
        let f = fixture();
        write_sidecar(&f.root.join("good"), "pic1", "jpg", &[]);
        let bad = f.root.join("bad");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join(SIDECAR_NAME), "{broken").unwrap();

        let items =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "pic1");
    }

    #[test]
    fn test_pending_marker_blocks_reselection() {
        let f = fixture();
        write_sidecar(&f.root.join("a"), "pic1", "jpg", &[]);

        let first =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert_eq!(first.len(), 1);

        let second =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert!(second.is_empty());

        // Releasing the claim restores eligibility.
        release_claim(&f.root.join("a"));
        let third =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_failed_manifest_write_releases_the_claim() {
        let f = fixture();
        write_sidecar(&f.root.join("a"), "pic1", "jpg", &[]);
        write_sidecar(&f.root.join("v"), "clip", "mp4", &[]);

        // A manifest in a nonexistent directory cannot be written.
        let broken = Manifest::new(f.root.join("no-such-dir").join("path.txt"));

        assert!(find_images(&[f.root.clone()], &f.config, &f.ledger, &broken).is_err());
        assert!(!f.root.join("a").join(SENTINEL_FILE).exists());

        assert!(find_next_video(&[f.root.clone()], &f.config, &f.ledger, &broken).is_err());
        assert!(!f.root.join("v").join(SENTINEL_FILE).exists());

        // Both items stay selectable once the manifest is writable again.
        let items =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert_eq!(items.len(), 1);
        let video = find_next_video(&[f.root.clone()], &f.config, &f.ledger, &f.manifest)
            .unwrap();
        assert!(video.is_some());
    }

    #[test]
    fn test_ledger_success_blocks_redispatch() {
        let f = fixture();
        write_sidecar(&f.root.join("a"), "pic1", "jpg", &[]);
        let key = f.root.join("a").join("pic1.jpg");
        f.ledger
            .record(&key, crate::types::Outcome::Success, "")
            .unwrap();

        let items =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_failure_entry_does_not_block() {
        let f = fixture();
        write_sidecar(&f.root.join("a"), "pic1", "jpg", &[]);
        let key = f.root.join("a").join("pic1.jpg");
        f.ledger
            .record(&key, crate::types::Outcome::Failure, "transport error")
            .unwrap();

        let items =
            find_images(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_video_scan_returns_at_most_one() {
        let f = fixture();
        write_sidecar(&f.root.join("v1"), "clip1", "mp4", &[]);
        write_sidecar(&f.root.join("v2"), "clip2", "mkv", &[]);

        let item = find_next_video(&[f.root.clone()], &f.config, &f.ledger, &f.manifest)
            .unwrap()
            .unwrap();
        assert_eq!(item.kind, MediaKind::Video);

        // The manifest holds exactly the one selected path.
        let listed = f.manifest.load().unwrap().unwrap();
        assert_eq!(listed, vec![item.media_path()]);
    }

    #[test]
    fn test_video_scan_without_match_removes_manifest() {
        let f = fixture();
        write_sidecar(&f.root.join("a"), "pic1", "jpg", &[]);
        f.manifest.replace(&[PathBuf::from("stale")]).unwrap();

        let item =
            find_next_video(&[f.root.clone()], &f.config, &f.ledger, &f.manifest).unwrap();
        assert!(item.is_none());
        assert!(f.manifest.load().unwrap().is_none());
    }
}
