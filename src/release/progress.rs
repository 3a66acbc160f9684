use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU8, Ordering};

/// Receives coarse build progress. This is a UX signal reported at fixed
/// milestones, not a precise percentage.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8);
}

/// Discards progress
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: u8) {}
}

/// Wraps a sink and enforces the monotonic non-decreasing guarantee:
/// a report lower than anything already reported is swallowed.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    last: AtomicU8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: AtomicU8::new(0),
        }
    }

    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent >= previous {
            self.sink.report(percent);
        }
    }
}

/// Terminal progress bar adapter
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(message: String) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:30}] {pos}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(message);
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, percent: u8) {
        self.bar.set_position(percent as u64);
    }
}
