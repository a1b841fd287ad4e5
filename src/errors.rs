//! Centralized error handling for RuNeMovie
//!
//! Every fallible operation in the crate returns [`MovieError`]. Variants are grouped
//! the way callers need to react to them: configuration problems are raised before
//! any frame is rendered, encoder problems carry an actionable hint.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for RuNeMovie operations
#[derive(Debug, Error)]
pub enum MovieError {
    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Raster encoding errors while writing frames
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Variable not found in the file or dataset
    #[error("Variable '{var}' not found")]
    VariableNotFound { var: String },

    /// Frame (or slicing) dimension missing from the data
    #[error("Dimension '{dim}' not found in data with dimensions [{}]", available.join(", "))]
    DimensionNotFound { dim: String, available: Vec<String> },

    /// Input of a shape the movie cannot animate
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Bad constructor or save option
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Output artifact already present and overwriting was not requested
    #[error("File `{}` already exists. Set `overwrite_existing` to true to overwrite", path.display())]
    FileExists { path: PathBuf },

    /// Chunk layout not usable for parallel frame generation
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// Plotting callback or drawing backend failure
    #[error("Plot error: {0}")]
    PlotError(String),

    /// Encoder executable missing or not usable
    #[error("Could not find a usable `{program}` installation. Please install ffmpeg (e.g. `apt install ffmpeg` or `conda install ffmpeg -c conda-forge`)")]
    FfmpegNotFound { program: String },

    /// A shell command exited with a non-zero status
    #[error("Command `{command}` failed ({status})")]
    CommandFailed { command: String, status: String },

    /// The encoder ran but did not succeed
    #[error("Something has gone wrong running `{command}`. Use `verbose = true` to check if ffmpeg reports a problem")]
    EncoderFailed { command: String },

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

impl MovieError {
    /// True for errors raised before any rendering or encoding work started
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MovieError::VariableNotFound { .. }
                | MovieError::DimensionNotFound { .. }
                | MovieError::UnsupportedInput(_)
                | MovieError::InvalidConfig(_)
                | MovieError::FileExists { .. }
                | MovieError::ChunkingError(_)
        )
    }

    pub(crate) fn plot<E: std::fmt::Display>(error: E) -> Self {
        MovieError::PlotError(error.to_string())
    }
}

/// Result type alias for RuNeMovie operations
pub type Result<T> = std::result::Result<T, MovieError>;
