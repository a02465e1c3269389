//! Per-directory aggregation: the commit step.
//!
//! Gathers every fragment file the adapters wrote into a directory, runs the
//! union of fragments and prior tags through the normalizer, writes the
//! merged set back into the sidecar, sweeps the intermediate files, and
//! finalizes the sentinel marker. Runs only on the coordinator thread, so no
//! sidecar is ever written concurrently.

use log::{debug, warn};
use std::collections::BTreeSet;
use std::path::Path;

use crate::catalog::sidecar::Sidecar;
use crate::error::Result;
use crate::normalize::{normalize, Dictionary, FilterStage};
use crate::types::{MediaItem, SENTINEL_FILE, SENTINEL_TAG};

pub struct Aggregator<'a> {
    stages: &'a [FilterStage],
    dict: &'a Dictionary,
}

impl<'a> Aggregator<'a> {
    pub fn new(stages: &'a [FilterStage], dict: &'a Dictionary) -> Self {
        Self { stages, dict }
    }

    /// Merge and commit one item's directory. Returns the final tag count.
    ///
    /// On error the sidecar is not advanced and the sentinel is not
    /// finalized, so the item stays eligible and is retried whole on a
    /// later pass.
    pub fn commit(&self, item: &MediaItem) -> Result<usize> {
        let dir = &item.dir;
        let fragments = gather_fragments(dir)?;
        let mut sidecar = Sidecar::load(dir)?;

        let mut merged: BTreeSet<String> = sidecar.tags.iter().cloned().collect();
        merged.extend(normalize(&fragments, self.stages, self.dict));
        merged.insert(SENTINEL_TAG.to_string());

        let count = merged.len();
        sidecar.tags = merged.into_iter().collect();
        sidecar.store(dir)?;

        // Committed. Sweep intermediates and finalize the marker; failures
        // past this point are logged but cannot un-commit the tags.
        sweep_intermediates(dir);
        if let Err(e) = std::fs::write(dir.join(SENTINEL_FILE), SENTINEL_TAG) {
            warn!(
                "Could not finalize sentinel in {}: {}",
                dir.display(),
                e
            );
        }

        debug!("Committed {} tags in {}", count, dir.display());
        Ok(count)
    }
}

/// Collect the contents of every fragment file in a directory.
///
/// The sentinel marker is skipped by name; an unreadable fragment is logged
/// and skipped.
fn gather_fragments(dir: &Path) -> Result<Vec<String>> {
    let mut fragments = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !path.is_file() || !name.ends_with(".txt") || name == SENTINEL_FILE {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let contents = contents.trim();
                if !contents.is_empty() {
                    fragments.push(contents.to_string());
                }
            }
            Err(e) => warn!("Unreadable fragment {}: {}", path.display(), e),
        }
    }
    Ok(fragments)
}

/// Delete fragment files, scene listings, and extracted frame images
fn sweep_intermediates(dir: &Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not sweep {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let is_fragment = name.ends_with(".txt") && name != SENTINEL_FILE;
        let is_listing = name.ends_with(".csv");
        let is_frame = name.contains("-Scene-");
        if path.is_file() && (is_fragment || is_listing || is_frame) {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Could not delete {}: {}", path.display(), e);
            }
        }
    }
}
