//! Optional progress display for serial frame rendering
//!
//! The progress bar is a compile-time capability (cargo feature `progress`). When it
//! is missing and progress was requested, rendering goes on without it after a
//! single warning.

/// Progress reporting resolved once per save
pub enum Progress {
    Hidden,
    #[cfg(feature = "progress")]
    Bar(indicatif::ProgressBar),
}

impl Progress {
    /// Whether this build can draw a progress bar
    pub const fn available() -> bool {
        cfg!(feature = "progress")
    }

    /// Resolve the requested display for `total` frames
    pub fn new(requested: bool, total: usize) -> Self {
        if !requested {
            return Progress::Hidden;
        }
        Self::bar(total)
    }

    #[cfg(feature = "progress")]
    fn bar(total: usize) -> Self {
        let bar = indicatif::ProgressBar::new(total as u64);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Progress::Bar(bar)
    }

    #[cfg(not(feature = "progress"))]
    fn bar(_total: usize) -> Self {
        log::warn!("Can't show progress bar: built without the `progress` feature");
        Progress::Hidden
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, Progress::Hidden)
    }

    pub fn inc(&self) {
        #[cfg(feature = "progress")]
        if let Progress::Bar(bar) = self {
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        #[cfg(feature = "progress")]
        if let Progress::Bar(bar) = self {
            bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_unless_requested() {
        assert!(!Progress::new(false, 10).is_visible());
        assert_eq!(Progress::new(true, 10).is_visible(), Progress::available());
    }
}
