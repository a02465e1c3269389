//! Incremental progress extraction from the segmentation tool's output
//! stream.
//!
//! The tool reports completion percentages in two shapes, `Progress: NN%`
//! and `NN% Progress`, case-insensitively. Only the last match in the
//! buffered stream is used; after a match the buffer keeps its final 100
//! characters so a percent token split across two reads is still seen while
//! memory stays bounded.

use regex::{Regex, RegexBuilder};

const PERCENT_PATTERN: &str = r"Progress:\s+(\d{1,3})%|(\d{1,3})%\s+Progress";

pub struct ProgressScanner {
    pattern: Regex,
    buffer: String,
}

impl Default for ProgressScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressScanner {
    pub fn new() -> Self {
        let pattern = RegexBuilder::new(PERCENT_PATTERN)
            .case_insensitive(true)
            .build()
            .unwrap();
        Self {
            pattern,
            buffer: String::new(),
        }
    }

    /// Feed one chunk of raw tool output. Returns the updated percentage if
    /// the buffered stream now contains at least one progress token.
    ///
    /// The percent tokens are ASCII, so lossy decoding of a chunk that
    /// splits a multi-byte character cannot corrupt them.
    pub fn push(&mut self, chunk: &[u8]) -> Option<u32> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let last = self
            .pattern
            .captures_iter(&self.buffer)
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                let digits = caps.get(1).or_else(|| caps.get(2))?;
                let percent = digits.as_str().parse::<u32>().ok()?;
                Some((start, percent))
            })
            .last();

        let (start, percent) = last?;
        self.buffer = tail_chars(&self.buffer[start..], 100);
        Some(percent)
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    if count <= n {
        s.to_string()
    } else {
        s.chars().skip(count - n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_both_token_shapes() {
        let mut scanner = ProgressScanner::new();
        assert_eq!(scanner.push(b"Progress: 25%"), Some(25));
        assert_eq!(scanner.push(b"detecting... 60% progress"), Some(60));
    }

    #[test]
    fn test_is_case_insensitive() {
        let mut scanner = ProgressScanner::new();
        assert_eq!(scanner.push(b"PROGRESS: 10%"), Some(10));
    }

    #[test]
    fn test_last_match_in_chunk_wins() {
        let mut scanner = ProgressScanner::new();
        let chunk = b"Progress: 10% ... Progress: 40% ... Progress: 55%";
        assert_eq!(scanner.push(chunk), Some(55));
    }

    #[test]
    fn test_token_split_across_reads() {
        let mut scanner = ProgressScanner::new();
        assert_eq!(scanner.push(b"working... Progre"), None);
        assert_eq!(scanner.push(b"ss: 42%"), Some(42));
    }

    #[test]
    fn test_buffer_is_trimmed_after_match() {
        let mut scanner = ProgressScanner::new();
        let noise = "x".repeat(500);
        let chunk = format!("{}Progress: 30%{}", noise, noise);
        scanner.push(chunk.as_bytes());
        assert!(scanner.buffer.chars().count() <= 100);

        // A later token in fresh input is still picked up.
        assert_eq!(scanner.push(b" Progress: 31%"), Some(31));
    }

    #[test]
    fn test_no_token_yields_none() {
        let mut scanner = ProgressScanner::new();
        assert_eq!(scanner.push(b"frame 100 of 4000"), None);
    }
}
