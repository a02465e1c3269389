use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the media-tagger library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar or config (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Completion ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] rocksdb::Error),

    /// Invalid exclusion pattern in the filter configuration
    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Malformed translation table row. Load-time fatal, unlike per-item failures.
    #[error("Malformed translation table at line {line}: {message}")]
    Translation { line: usize, message: String },

    /// The pass manifest exists but cannot be read. Fatal to the current pass.
    #[error("Work manifest unreadable: {0}")]
    Manifest(String),

    /// An analyzer failed for one item
    #[error("Analyzer error: {0}")]
    Analyze(#[from] AnalyzeError),
}

/// Per-item failures raised by the analyzer adapters. These are recovered at
/// item granularity: the item is logged and stays eligible for a later pass.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// HTTP transport failure talking to the image classifier
    #[error("classifier transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The classifier response held no quote-delimited tag payload
    #[error("no quoted tag payload in classifier response")]
    MalformedResponse,

    /// The segmentation tool exited with a non-zero code
    #[error("segmentation tool exited with code {code}")]
    ToolExit { code: i32 },

    /// The segmentation tool was terminated by a signal
    #[error("segmentation tool terminated by signal")]
    ToolKilled,

    /// The scene listing produced by the segmentation tool could not be parsed
    #[error("unusable scene listing: {0}")]
    SceneList(String),

    /// The video dimension probe produced no usable output
    #[error("could not probe video dimensions: {0}")]
    Probe(String),

    /// Every extracted frame failed classification, leaving nothing to merge
    #[error("all {failed} extracted frames failed classification")]
    FramesFailed { failed: usize },

    /// I/O failure while driving an external tool or persisting a fragment
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown was requested before this item was submitted
    #[error("interrupted before dispatch")]
    Interrupted,
}
