//! Analyzer adapters: boundary components wrapping the external analyzers
//! behind a uniform contract.
//!
//! The image adapter uploads one file to the HTTP classifier; the video
//! adapter drives the CLI scene segmenter. Both recover at item granularity:
//! a failed item is logged, stays eligible, and never affects its siblings.

pub mod image;
pub mod progress;
pub mod video;

pub use image::ImageTagger;
pub use progress::ProgressScanner;
pub use video::SceneSegmenter;

use crate::error::AnalyzeError;
use crate::types::MediaItem;

/// Raw tag fragments produced for one item, before normalization
pub type RawFragments = Vec<String>;

/// Common adapter contract: analyze one item, yield raw tag fragments.
///
/// The video adapter yields no fragments itself; it extracts frame images
/// which are then fed back through the image adapter.
pub trait Analyzer {
    fn analyze(&self, item: &MediaItem) -> Result<RawFragments, AnalyzeError>;
}
