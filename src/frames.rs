//! Numbered frame files
//!
//! A [`FramePattern`] is a file name with a single printf-style integer placeholder,
//! e.g. `frame_%05d.png`. The same pattern is used to write frames, handed verbatim
//! to ffmpeg, and matched against directory entries for cleanup.

use crate::errors::{MovieError, Result};
use crate::figure::Figure;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default frame file pattern
pub const DEFAULT_FRAME_PATTERN: &str = "frame_%05d.png";

/// Parsed frame file pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    raw: String,
    prefix: String,
    width: usize,
    suffix: String,
}

impl FramePattern {
    /// Parse a pattern with exactly one `%d` or `%0Nd` placeholder
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |why: &str| {
            MovieError::InvalidConfig(format!("frame pattern '{pattern}' {why}"))
        };

        if pattern.contains('/') || pattern.contains('\\') {
            return Err(invalid("must be a file name, not a path"));
        }

        let start = pattern
            .find('%')
            .ok_or_else(|| invalid("has no integer placeholder like %05d"))?;
        let rest = &pattern[start + 1..];
        let digits_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let digits = &rest[..digits_len];
        if !rest[digits_len..].starts_with('d') {
            return Err(invalid("placeholder must be of the form %d or %0Nd"));
        }
        if !digits.is_empty() && !digits.starts_with('0') {
            return Err(invalid("placeholder width must be zero padded (%0Nd)"));
        }
        let width = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| invalid("has an unreadable placeholder width"))?
        };

        let suffix = &rest[digits_len + 1..];
        if suffix.contains('%') {
            return Err(invalid("must contain exactly one placeholder"));
        }

        Ok(Self {
            raw: pattern.to_string(),
            prefix: pattern[..start].to_string(),
            width,
            suffix: suffix.to_string(),
        })
    }

    /// File name for a frame index
    pub fn filename(&self, index: usize) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }

    /// Glob matching every frame written with this pattern
    pub fn glob(&self) -> String {
        format!("{}*{}", self.prefix, self.suffix)
    }

    /// Whether `name` is a frame file of this pattern
    pub fn matches(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_suffix(self.suffix.as_str()))
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for FramePattern {
    fn default() -> Self {
        FramePattern {
            raw: DEFAULT_FRAME_PATTERN.to_string(),
            prefix: "frame_".to_string(),
            width: 5,
            suffix: ".png".to_string(),
        }
    }
}

impl fmt::Display for FramePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Rasterize a figure to `odir/<pattern(frame)>` and release it.
///
/// The figure is consumed, so its buffer is freed whether or not the write succeeds.
pub fn frame_save(fig: Figure, frame: usize, odir: &Path, pattern: &FramePattern) -> Result<PathBuf> {
    let path = odir.join(pattern.filename(frame));
    let image = fig.to_rgb();
    drop(fig);
    image.save(&path)?;
    log::trace!("wrote frame {} to {}", frame, path.display());
    Ok(path)
}
