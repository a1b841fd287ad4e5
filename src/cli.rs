//! Defines command-line interface options using `clap` for the RuNeMovie application.

use crate::ffmpeg::DEFAULT_FFMPEG_OPTIONS;
use crate::frames::DEFAULT_FRAME_PATTERN;
use crate::plotfunc::PlotKwargs;
use clap::Parser;
use std::path::PathBuf;

/// A CLI tool for animating NetCDF variables
#[derive(Parser, Debug)]
#[command(
    version = "1.1.0",
    name = "RuNeMovie",
    about = "Render one frame per step of a NetCDF variable and encode them into a movie or GIF"
)]
pub struct Args {
    /// Path to the NetCDF file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Variable to animate. Defaults to the first variable carrying the frame dimension
    #[arg(short = 'n', long)]
    pub variable: Option<String>,

    /// Output movie (e.g. movie.mp4) or GIF (movie.gif)
    #[arg(short, long, required_unless_present = "list_vars")]
    pub output: Option<PathBuf>,

    /// Dimension along which frames are taken
    #[arg(long, default_value = "time")]
    pub framedim: String,

    /// Frame width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    #[arg(long, default_value_t = 200)]
    pub dpi: u32,

    /// File name pattern of the frames, with one %d / %0Nd placeholder
    #[arg(long, default_value = DEFAULT_FRAME_PATTERN)]
    pub frame_pattern: String,

    /// Plot method: pcolormesh, contourf or contour
    #[arg(long)]
    pub plotmethod: Option<String>,

    /// Colour map: viridis, magma, gray or coolwarm
    #[arg(long)]
    pub cmap: Option<String>,

    /// Frame style: standard or dark
    #[arg(long)]
    pub style: Option<String>,

    /// Extra plot keyword arguments as a JSON object, e.g. '{"vmin": 0, "levels": 8}'
    #[arg(long, value_parser = parse_kwargs)]
    pub kwargs: Option<PlotKwargs>,

    /// Fail instead of warning when a keyword argument is not understood
    #[arg(long)]
    pub strict_kwargs: bool,

    /// TrueType/OpenType font used for titles and labels. Without it frames carry no text
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Font size in points
    #[arg(long, default_value_t = 12.0)]
    pub font_size: f64,

    /// Frames per second of the movie
    #[arg(long, default_value_t = 15)]
    pub framerate: u32,

    /// Options passed verbatim to ffmpeg
    #[arg(long, default_value = DEFAULT_FFMPEG_OPTIONS, allow_hyphen_values = true)]
    pub ffmpeg_options: String,

    /// ffmpeg executable to use
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: String,

    /// Use a generated palette for better GIF colours
    #[arg(long)]
    pub gif_palette: bool,

    /// GIF size relative to the frame size
    #[arg(long, default_value_t = 0.5)]
    pub gif_resolution_factor: f64,

    /// Frames per second of the GIF
    #[arg(long, default_value_t = 10)]
    pub gif_framerate: u32,

    /// Keep the frame images after encoding
    #[arg(long)]
    pub keep_frames: bool,

    /// Keep the intermediate movie after GIF conversion
    #[arg(long)]
    pub keep_movie: bool,

    /// Overwrite existing output files
    #[arg(long)]
    pub overwrite: bool,

    /// Show a progress bar while rendering frames
    #[arg(long)]
    pub progress: bool,

    /// Render frames in parallel, one frame per task
    #[arg(long)]
    pub parallel: bool,

    /// Number of threads to use for parallel rendering. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Enable verbose output (debug logging and ffmpeg output)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// List all variables in the NetCDF file
    #[arg(long)]
    pub list_vars: bool,
}

fn parse_kwargs(s: &str) -> Result<PlotKwargs, String> {
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err("Invalid format: Expected a JSON object, e.g. '{\"vmin\": 0}'".to_string()),
        Err(e) => Err(format!("Invalid JSON: {e}")),
    }
}
