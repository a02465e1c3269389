//! Video adapter: drives the external scene-segmentation tool.
//!
//! Segmentation runs in the item's own directory and exports per-scene
//! frame images there; those frames are then classified by the image
//! adapter. The tool's stdout/stderr are streamed through a
//! [`ProgressScanner`] so a long detection pass shows live progress.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::config::SegmentationConfig;
use crate::error::AnalyzeError;
use crate::types::MediaItem;

use super::progress::ProgressScanner;
use super::{Analyzer, RawFragments};

/// Detection strategy passed to the segmentation tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Content-based detection with configured sensitivity and minimum length
    Content,
    /// Adaptive detection with the tool's own defaults
    Adaptive,
}

/// Provisional scene statistics from a low-cost listing pass
#[derive(Debug, Clone)]
pub struct SceneStats {
    pub count: usize,
    pub durations: Vec<f64>,
}

/// The threshold rule: too few or too long scenes indicate the adaptive
/// detector would under-segment a mostly static video.
pub fn choose_strategy(stats: &SceneStats, config: &SegmentationConfig) -> Strategy {
    let too_few = stats.count < config.min_scene_count;
    let too_long = stats
        .durations
        .iter()
        .any(|secs| *secs > config.max_scene_secs);
    if too_few || too_long {
        Strategy::Content
    } else {
        Strategy::Adaptive
    }
}

/// Size clamp for exported frames: constrain whichever axis is larger when
/// it exceeds the configured maximum.
pub fn clamp_for_dimensions(
    width: u32,
    height: u32,
    max_image_size: u32,
) -> Option<(&'static str, u32)> {
    if width.max(height) <= max_image_size {
        return None;
    }
    if width > height {
        Some(("--image-width", max_image_size))
    } else {
        Some(("--image-height", max_image_size))
    }
}

/// Parse the tool's scene listing (`<stem>-Scenes.csv`): locate the header
/// row, then read the `Length (seconds)` column.
pub fn parse_scene_listing(contents: &str) -> Result<SceneStats, AnalyzeError> {
    let mut lines = contents.lines();

    let headers: Vec<&str> = loop {
        let line = lines
            .next()
            .ok_or_else(|| AnalyzeError::SceneList("no header row".to_string()))?;
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.first() == Some(&"Scene Number") {
            break cells;
        }
    };
    let length_index = headers
        .iter()
        .position(|h| *h == "Length (seconds)")
        .ok_or_else(|| AnalyzeError::SceneList("no Length (seconds) column".to_string()))?;

    let mut durations = Vec::new();
    for line in lines {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != headers.len() {
            continue;
        }
        let secs: f64 = cells[length_index].parse().map_err(|_| {
            AnalyzeError::SceneList(format!("bad duration value {:?}", cells[length_index]))
        })?;
        durations.push(secs);
    }

    Ok(SceneStats {
        count: durations.len(),
        durations,
    })
}

pub struct SceneSegmenter {
    config: SegmentationConfig,
}

impl SceneSegmenter {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Segment one video item, exporting per-scene frames into its directory
    pub fn segment(&self, item: &MediaItem) -> Result<(), AnalyzeError> {
        let file = item.file_name();
        let clamp = self.clamp_args(&item.media_path());

        let direct = self
            .config
            .direct_detect_exts
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&item.ext));
        let strategy = if direct {
            // Frame-sequence-like formats skip the listing pass entirely.
            Strategy::Content
        } else {
            self.list_scenes(&item.dir, &file)?;
            let listing = item.dir.join(format!("{}-Scenes.csv", item.name));
            let contents = std::fs::read_to_string(&listing)?;
            let stats = parse_scene_listing(&contents)?;
            debug!(
                "{}: {} scenes listed, longest {:.1}s",
                file,
                stats.count,
                stats.durations.iter().cloned().fold(0.0, f64::max)
            );
            choose_strategy(&stats, &self.config)
        };

        self.detect_and_save(&item.dir, &file, strategy, &clamp)
    }

    fn detector_args(&self, strategy: Strategy) -> Vec<String> {
        match strategy {
            Strategy::Content => vec![
                "detect-content".to_string(),
                "--threshold".to_string(),
                self.config.threshold.to_string(),
                "--min-scene-len".to_string(),
                self.config.min_scene_len.to_string(),
            ],
            Strategy::Adaptive => vec!["detect-adaptive".to_string()],
        }
    }

    /// Low-cost listing pass to obtain a provisional scene count
    fn list_scenes(&self, dir: &Path, file: &str) -> Result<(), AnalyzeError> {
        let output = Command::new("scenedetect")
            .arg("-i")
            .arg(file)
            .arg("list-scenes")
            .current_dir(dir)
            .output()?;
        if !output.status.success() {
            return Err(exit_error(output.status));
        }
        Ok(())
    }

    /// Run detection with frame export, streaming the tool's output for
    /// progress display
    fn detect_and_save(
        &self,
        dir: &Path,
        file: &str,
        strategy: Strategy,
        clamp: &[String],
    ) -> Result<(), AnalyzeError> {
        let mut cmd = Command::new("scenedetect");
        cmd.arg("-i")
            .arg(file)
            .args(self.detector_args(strategy))
            .args(["save-images", "--output", "."])
            .args(clamp)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let status = self.stream_progress(&mut child)?;
        if !status.success() {
            return Err(exit_error(status));
        }
        Ok(())
    }

    /// Merge the child's stdout and stderr through a channel and feed the
    /// chunks to the progress scanner.
    fn stream_progress(&self, child: &mut Child) -> Result<ExitStatus, AnalyzeError> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        drop(tx);

        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("Scene analysis [{bar:50}] {pos}%")
                .unwrap()
                .progress_chars("■■ "),
        );

        let mut scanner = ProgressScanner::new();
        while let Ok(chunk) = rx.recv() {
            if let Some(percent) = scanner.push(&chunk) {
                bar.set_position(u64::from(percent.min(100)));
            }
        }
        for handle in readers {
            let _ = handle.join();
        }
        bar.finish_and_clear();

        Ok(child.wait()?)
    }

    fn clamp_args(&self, media: &Path) -> Vec<String> {
        match probe_dimensions(media) {
            Ok((width, height)) => {
                match clamp_for_dimensions(width, height, self.config.max_image_size) {
                    Some((flag, size)) => vec![flag.to_string(), size.to_string()],
                    None => Vec::new(),
                }
            }
            Err(e) => {
                warn!(
                    "Could not probe dimensions of {}: {}; exporting frames unclamped",
                    media.display(),
                    e
                );
                Vec::new()
            }
        }
    }
}

impl Analyzer for SceneSegmenter {
    fn analyze(&self, item: &MediaItem) -> Result<RawFragments, AnalyzeError> {
        // Segmentation yields frames, not tags; the frames loop back through
        // the image adapter.
        self.segment(item)?;
        Ok(Vec::new())
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R, tx: Sender<Vec<u8>>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    })
}

/// Probe the video's pixel dimensions with ffprobe
pub fn probe_dimensions(media: &Path) -> Result<(u32, u32), AnalyzeError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0",
        ])
        .arg(media)
        .output()?;
    if !output.status.success() {
        return Err(exit_error(output.status));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let line = text.lines().next().unwrap_or("").trim();
    let mut parts = line.split(',');
    let width = parts
        .next()
        .and_then(|w| w.trim().parse().ok())
        .ok_or_else(|| AnalyzeError::Probe(format!("unexpected output {:?}", line)))?;
    let height = parts
        .next()
        .and_then(|h| h.trim().parse().ok())
        .ok_or_else(|| AnalyzeError::Probe(format!("unexpected output {:?}", line)))?;
    Ok((width, height))
}

fn exit_error(status: ExitStatus) -> AnalyzeError {
    match status.code() {
        Some(code) => AnalyzeError::ToolExit { code },
        None => AnalyzeError::ToolKilled,
    }
}

// -- Tests --
