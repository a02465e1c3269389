use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Progress tracker for the image-dispatch stage.
///
/// Shared by reference across pool workers; counters are atomic and the bar
/// itself is thread safe.
pub struct ProgressTracker {
    bar: ProgressBar,
    ok: AtomicUsize,
    failed: AtomicUsize,
    start: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{eta}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        bar.set_message(message.to_string());
        bar.tick();

        Self {
            bar,
            ok: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start: Instant::now(),
        }
    }

    /// Record one finished item and refresh the displayed rate
    pub fn record(&self, success: bool) {
        if success {
            self.ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.bar.inc(1);

        let done = self.bar.position();
        let elapsed = self.start.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            done as f64 / elapsed
        } else {
            0.0
        };
        self.bar.set_message(format!(
            "{:.1} items/sec | {} ok | {} failed",
            rate,
            self.ok.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        ));
    }

    /// Finish the bar and return the (ok, failed) totals
    pub fn finish(&self) -> (usize, usize) {
        let ok = self.ok.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        self.bar.finish_with_message(format!(
            "Done: {} ok, {} failed in {:.1}s",
            ok,
            failed,
            self.start.elapsed().as_secs_f64()
        ));
        (ok, failed)
    }
}
