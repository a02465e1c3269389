//! Pass coordinator: image stage then video loop.
//!
//! Images are dispatched concurrently across a dedicated rayon pool;
//! analysis results flow back to this thread, which alone touches sidecars
//! and the ledger. Videos are handled strictly one at a time because scene
//! segmentation saturates the machine on its own.

pub mod aggregate;
pub mod progress;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use rayon::prelude::*;

use crate::analyze::image::ImageTagger;
use crate::analyze::video::SceneSegmenter;
use crate::analyze::{Analyzer, RawFragments};
use crate::catalog::{find_images, find_next_video, release_claim};
use crate::config::Config;
use crate::error::{AnalyzeError, Error, Result};
use crate::ledger::Ledger;
use crate::logging::log_item_error;
use crate::manifest::Manifest;
use crate::normalize::{build_stages, Dictionary, FilterStage};
use crate::types::{MediaItem, Outcome};

use aggregate::Aggregator;
use progress::ProgressTracker;

/// Counts for one full pass over the library.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassSummary {
    pub images_ok: usize,
    pub images_failed: usize,
    pub videos_ok: usize,
    pub videos_failed: usize,
}

pub struct MediaTagger {
    config: Config,
    ledger: Ledger,
    dict: Dictionary,
    stages: Vec<FilterStage>,
    manifest: Manifest,
    tagger: ImageTagger,
    segmenter: SceneSegmenter,
    pool: rayon::ThreadPool,
    shutdown: Arc<AtomicBool>,
}

impl MediaTagger {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let dict = Dictionary::load(&config.dictionary_path)?;
        info!("Loaded {} dictionary entries", dict.len());

        let stages = build_stages(&config.filters)?;
        let ledger = Ledger::open(&config.ledger_path)?;
        let manifest = Manifest::new(config.manifest_path.clone());
        let tagger = ImageTagger::new(&config)?;
        let segmenter = SceneSegmenter::new(&config.segmentation);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| Error::Configuration(format!("thread pool: {}", e)))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            info!("Interrupt received, finishing in-flight work");
        }) {
            // A second tagger in the same process cannot re-register the
            // handler; the pass still runs, it just cannot be interrupted
            // gracefully.
            warn!("Could not install interrupt handler: {}", e);
        }

        Ok(Self {
            config,
            ledger,
            dict,
            stages,
            manifest,
            tagger,
            segmenter,
            pool,
            shutdown,
        })
    }

    /// Run one complete pass: stale-pass recovery, then the image stage,
    /// then the video loop.
    pub fn run(&self, roots: &[PathBuf]) -> Result<PassSummary> {
        if roots.is_empty() {
            return Err(Error::Configuration(
                "no search roots were provided".into(),
            ));
        }

        self.recover_stale_pass()?;

        let mut summary = PassSummary::default();
        self.run_image_stage(roots, &mut summary)?;
        self.run_video_loop(roots, &mut summary)?;

        info!(
            "Pass complete: {} images tagged ({} failed), {} videos tagged ({} failed)",
            summary.images_ok, summary.images_failed, summary.videos_ok, summary.videos_failed
        );
        Ok(summary)
    }

    /// A manifest left over from a previous run means that pass died
    /// mid-flight. Release the pending markers of every listed item that
    /// never reached a successful ledger entry, so the scan can pick them
    /// up again, then clear the manifest.
    fn recover_stale_pass(&self) -> Result<()> {
        let Some(paths) = self.manifest.load()? else {
            return Ok(());
        };
        info!(
            "Recovering from an interrupted pass: {} manifest entries",
            paths.len()
        );
        for path in &paths {
            if self.ledger.is_done(path)? {
                continue;
            }
            if let Some(dir) = path.parent() {
                release_claim(dir);
            }
        }
        self.manifest.remove()
    }

    fn run_image_stage(&self, roots: &[PathBuf], summary: &mut PassSummary) -> Result<()> {
        let items = find_images(roots, &self.config, &self.ledger, &self.manifest)?;
        if items.is_empty() {
            info!("No images need tagging");
            self.manifest.remove()?;
            return Ok(());
        }
        info!("Classifying {} images", items.len());

        let tracker = ProgressTracker::new(items.len(), "Classifying images");
        let shutdown = &self.shutdown;
        let tagger = &self.tagger;

        let results: Vec<std::result::Result<RawFragments, AnalyzeError>> =
            self.pool.install(|| {
                items
                    .par_iter()
                    .map(|item| {
                        if shutdown.load(Ordering::SeqCst) {
                            return Err(AnalyzeError::Interrupted);
                        }
                        let result = tagger.analyze(item);
                        if let Err(ref e) = result {
                            log_item_error(&item.media_path(), "classify", e);
                        }
                        tracker.record(result.is_ok());
                        result
                    })
                    .collect()
            });
        tracker.finish();

        // Aggregation and ledger writes stay on the coordinator thread.
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(_) => match self.commit(item) {
                    Ok(_) => summary.images_ok += 1,
                    Err(e) => {
                        log_item_error(&item.media_path(), "commit", &e);
                        self.ledger
                            .record(&item.media_path(), Outcome::Failure, &e.to_string())?;
                        release_claim(&item.dir);
                        summary.images_failed += 1;
                    }
                },
                Err(AnalyzeError::Interrupted) => {
                    // Untouched item; no ledger entry, just undo the claim.
                    release_claim(&item.dir);
                }
                Err(e) => {
                    self.ledger
                        .record(&item.media_path(), Outcome::Failure, &e.to_string())?;
                    release_claim(&item.dir);
                    summary.images_failed += 1;
                }
            }
        }

        self.manifest.remove()
    }

    fn run_video_loop(&self, roots: &[PathBuf], summary: &mut PassSummary) -> Result<()> {
        // Claims of failed videos are held until the loop ends so the
        // single-item scan cannot keep re-selecting the same broken file.
        let mut failed_claims: Vec<PathBuf> = Vec::new();

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Interrupted before the next video; stopping");
                break;
            }
            let Some(item) =
                find_next_video(roots, &self.config, &self.ledger, &self.manifest)?
            else {
                break;
            };

            info!("Segmenting {}", item.media_path().display());
            match self.process_video(&item) {
                Ok(count) => {
                    summary.videos_ok += 1;
                    if summary.videos_ok % 10 == 0 {
                        info!("{} videos tagged so far", summary.videos_ok);
                    }
                    info!(
                        "Tagged {} with {} tags",
                        item.media_path().display(),
                        count
                    );
                }
                Err(e) => {
                    log_item_error(&item.media_path(), "segment", &e);
                    self.ledger
                        .record(&item.media_path(), Outcome::Failure, &e.to_string())?;
                    failed_claims.push(item.dir.clone());
                    summary.videos_failed += 1;
                }
            }
            self.manifest.remove()?;
        }

        for dir in failed_claims {
            release_claim(&dir);
        }
        Ok(())
    }

    /// Segment one video, classify the extracted frames, commit.
    fn process_video(&self, item: &MediaItem) -> Result<usize> {
        // Segmentation yields no fragments of its own; the extracted frames
        // are classified below.
        self.segmenter.analyze(item)?;

        let (tagged, failed) = self
            .tagger
            .tag_directory(&item.dir, &self.config.image_exts)?;
        if tagged == 0 && failed > 0 {
            return Err(Error::Analyze(AnalyzeError::FramesFailed { failed }));
        }

        let count = self.commit(item)?;
        Ok(count)
    }

    fn commit(&self, item: &MediaItem) -> Result<usize> {
        let aggregator = Aggregator::new(&self.stages, &self.dict);
        let count = aggregator.commit(item)?;
        self.ledger
            .record(&item.media_path(), Outcome::Success, "")?;
        Ok(count)
    }
}

impl std::fmt::Debug for MediaTagger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTagger")
            .field("threads", &self.config.threads)
            .field("api_url", &self.config.api_url)
            .finish()
    }
}
