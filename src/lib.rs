//! RuNeMovie: movies from labeled N-dimensional arrays
//!
//! RuNeMovie renders one image per index along a chosen *frame dimension* of a
//! labeled array, writes the images as numbered PNG files, encodes them into a video
//! with the external `ffmpeg` tool and optionally converts the video into a looping GIF.
//!
//! ## Key Features
//!
//! - **Plot callbacks**: any [`plotfunc::PlotFunc`] draws a frame; the [`presets::Basic`]
//!   preset draws colour meshes, filled or outlined bands in a light or dark style
//! - **Parallel Processing**: frames of chunked data are rendered on a Rayon pool
//! - **Encoding**: movie and GIF output through `ffmpeg`, checked before any work starts
//! - **NetCDF input**: variables with their coordinates and CF time units
//!
//! ## Module Organization
//!
//! - [`dataset`]: labeled arrays and datasets
//! - [`figure`]: the raster drawing surface and render style
//! - [`plotfunc`]: the plot callback contract
//! - [`presets`] and [`colormap`]: built-in plotting
//! - [`frames`]: frame file naming and writing
//! - [`movie`]: the movie orchestrator
//! - [`ffmpeg`]: encoder invocation and GIF conversion
//! - [`netcdf_io`] and [`metadata`]: NetCDF input
//! - [`parallel`]: parallel processing configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ru_ne_movie::prelude::*;
//! use std::path::Path;
//!
//! let array = ru_ne_movie::read_dataarray(Path::new("data.nc"), "temperature").unwrap();
//! let config = MovieConfig::default().with_kwarg("cmap", "magma");
//! let movie = Movie::new(array, config).unwrap();
//! movie.save("temperature.mp4", &SaveOptions::default()).unwrap();
//! ```

pub mod cli;
pub mod colormap;
pub mod dataset;
pub mod errors;
pub mod ffmpeg;
pub mod figure;
pub mod frames;
pub mod metadata;
pub mod movie;
pub mod netcdf_io;
pub mod parallel;
pub mod plotfunc;
pub mod presets;
pub mod progress;

// Direct re-exports for the public API
pub use errors::*;
pub use metadata::{list_variables, print_variables, VariableMetadata};
pub use netcdf_io::{read_dataarray, read_dataset, write_dataarray};
pub use parallel::*;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::dataset::{AnimatedData, DataArray, Dataset};
    pub use crate::errors::{MovieError, Result};
    pub use crate::ffmpeg::Ffmpeg;
    pub use crate::figure::{Figure, PlotStyle};
    pub use crate::frames::FramePattern;
    pub use crate::movie::{Movie, MovieConfig, SaveOptions, SaveReport};
    pub use crate::parallel::{get_parallel_info, ParallelConfig};
    pub use crate::plotfunc::{PlotFn, PlotFunc, PlotKwargs, PlotOutput, UnknownKwargs};
    pub use crate::presets::{basic, Basic};
}
