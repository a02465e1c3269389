//! Image adapter: multipart upload to the HTTP classifier endpoint.
//!
//! The classifier returns a plain string, not structured JSON; the tag
//! payload is everything between the first and the last quotation mark of
//! the response body. That permissive rule is part of the external service's
//! de-facto contract and is preserved deliberately.

use log::{debug, warn};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::error::AnalyzeError;
use crate::types::MediaItem;

use super::{Analyzer, RawFragments};

pub struct ImageTagger {
    client: Client,
    endpoint: String,
}

impl ImageTagger {
    pub fn new(config: &Config) -> Result<Self, AnalyzeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
        })
    }

    /// Upload one file and persist the returned payload as `<stem>.txt`
    /// next to the media. Returns the raw payload.
    pub fn tag_file(&self, media: &Path) -> Result<String, AnalyzeError> {
        let mime = mime_guess::from_path(media).first_or_octet_stream();
        let part = Part::file(media)?.mime_str(mime.essence_str())?;
        let form = Form::new().part("file", part);

        let body = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()?
            .text()?;

        let payload = extract_payload(&body).ok_or(AnalyzeError::MalformedResponse)?;

        // One fragment file per media file: a video item fans out into many
        // extracted frames, each independently classified.
        let fragment = media.with_extension("txt");
        std::fs::write(&fragment, &payload)?;
        debug!("Tagged {} -> {}", media.display(), fragment.display());

        Ok(payload)
    }

    /// Classify every image-class file in a directory (extracted frames).
    ///
    /// Per-file failures are logged and do not stop the remaining files.
    /// Returns (tagged, failed) counts.
    pub fn tag_directory(
        &self,
        dir: &Path,
        image_exts: &[String],
    ) -> Result<(usize, usize), AnalyzeError> {
        let mut tagged = 0;
        let mut failed = 0;

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| image_exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
                .unwrap_or(false);
            if !is_image {
                continue;
            }
            match self.tag_file(&path) {
                Ok(_) => tagged += 1,
                Err(e) => {
                    warn!("Frame classification failed for {}: {}", path.display(), e);
                    failed += 1;
                }
            }
        }

        Ok((tagged, failed))
    }
}

impl Analyzer for ImageTagger {
    fn analyze(&self, item: &MediaItem) -> Result<RawFragments, AnalyzeError> {
        let payload = self.tag_file(&item.media_path())?;
        Ok(vec![payload])
    }
}

/// Extract the tag payload from a classifier response body: the span between
/// the first and the last quotation mark, with full-width commas normalized.
pub fn extract_payload(body: &str) -> Option<String> {
    let start = body.find('"')?;
    let end = body.rfind('"')?;
    if end <= start {
        return None;
    }
    Some(body[start + 1..end].replace('，', ","))
}
