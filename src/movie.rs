//! Movie orchestration
//!
//! A [`Movie`] binds the data, the frame dimension, the plot function and the
//! output geometry. It renders frames (serially or on a Rayon pool), hands them to
//! the encoder and optionally converts the result into a GIF.

use crate::dataset::AnimatedData;
use crate::errors::{MovieError, Result};
use crate::ffmpeg::{EncodeSettings, Ffmpeg, GifSettings, DEFAULT_FFMPEG_OPTIONS};
use crate::figure::{Figure, PlotStyle};
use crate::frames::{frame_save, FramePattern, DEFAULT_FRAME_PATTERN};
use crate::parallel::ParallelConfig;
use crate::plotfunc::{
    check_plotfunc_output, filter_kwargs, Axes, PlotFunc, PlotHandle, PlotKwargs, PlotOutput,
    SharedPlotFunc, UnknownKwargs,
};
use crate::presets::{get_plot_defaults, Basic};
use crate::progress::Progress;
use rayon::prelude::*;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Construction options of a [`Movie`]
#[derive(Clone)]
pub struct MovieConfig {
    pub framedim: String,
    pub pixelwidth: u32,
    pub pixelheight: u32,
    pub dpi: u32,
    pub frame_pattern: String,
    /// `None` uses the [`Basic`] preset
    pub plotfunc: Option<SharedPlotFunc>,
    /// Variable to animate when the input is a dataset
    pub fieldname: Option<String>,
    /// Reject dataset inputs unless `fieldname` selects a variable
    pub input_check: bool,
    pub kwargs: PlotKwargs,
    pub unknown_kwargs: UnknownKwargs,
    pub style: PlotStyle,
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            framedim: "time".to_string(),
            pixelwidth: 1920,
            pixelheight: 1080,
            dpi: 200,
            frame_pattern: DEFAULT_FRAME_PATTERN.to_string(),
            plotfunc: None,
            fieldname: None,
            input_check: true,
            kwargs: PlotKwargs::new(),
            unknown_kwargs: UnknownKwargs::default(),
            style: PlotStyle::default(),
        }
    }
}

impl fmt::Debug for MovieConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieConfig")
            .field("framedim", &self.framedim)
            .field("pixelwidth", &self.pixelwidth)
            .field("pixelheight", &self.pixelheight)
            .field("dpi", &self.dpi)
            .field("frame_pattern", &self.frame_pattern)
            .field("plotfunc", &self.plotfunc.as_ref().map(|p| p.name().to_string()))
            .field("fieldname", &self.fieldname)
            .field("input_check", &self.input_check)
            .field("kwargs", &self.kwargs)
            .field("unknown_kwargs", &self.unknown_kwargs)
            .field("style", &self.style)
            .finish()
    }
}

impl MovieConfig {
    pub fn with_framedim(mut self, framedim: impl Into<String>) -> Self {
        self.framedim = framedim.into();
        self
    }

    pub fn with_size(mut self, pixelwidth: u32, pixelheight: u32) -> Self {
        self.pixelwidth = pixelwidth;
        self.pixelheight = pixelheight;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_frame_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.frame_pattern = pattern.into();
        self
    }

    pub fn with_plotfunc(mut self, plotfunc: impl PlotFunc + 'static) -> Self {
        self.plotfunc = Some(Arc::new(plotfunc));
        self
    }

    pub fn with_fieldname(mut self, fieldname: impl Into<String>) -> Self {
        self.fieldname = Some(fieldname.into());
        self
    }

    pub fn with_input_check(mut self, input_check: bool) -> Self {
        self.input_check = input_check;
        self
    }

    /// Add one keyword argument for the plot function
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn with_kwargs(mut self, kwargs: PlotKwargs) -> Self {
        self.kwargs.extend(kwargs);
        self
    }

    pub fn with_unknown_kwargs(mut self, policy: UnknownKwargs) -> Self {
        self.unknown_kwargs = policy;
        self
    }

    pub fn with_style(mut self, style: PlotStyle) -> Self {
        self.style = style;
        self
    }
}

/// Options of [`Movie::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOptions {
    pub remove_frames: bool,
    /// Drop the intermediate movie after a GIF conversion
    pub remove_movie: bool,
    pub progress: bool,
    pub verbose: bool,
    pub overwrite_existing: bool,
    pub parallel: bool,
    pub parallel_config: ParallelConfig,
    pub framerate: u32,
    pub ffmpeg_options: String,
    pub gif_palette: bool,
    /// GIF size relative to the frame size
    pub gif_resolution_factor: f64,
    pub gif_framerate: u32,
    pub encoder: Ffmpeg,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            remove_frames: true,
            remove_movie: true,
            progress: false,
            verbose: false,
            overwrite_existing: false,
            parallel: false,
            parallel_config: ParallelConfig::default(),
            framerate: 15,
            ffmpeg_options: DEFAULT_FFMPEG_OPTIONS.to_string(),
            gif_palette: false,
            gif_resolution_factor: 0.5,
            gif_framerate: 10,
            encoder: Ffmpeg::default(),
        }
    }
}

impl SaveOptions {
    fn validate(&self) -> Result<()> {
        if self.framerate == 0 || self.gif_framerate == 0 {
            return Err(MovieError::InvalidConfig(
                "framerate and gif_framerate must be positive".to_string(),
            ));
        }
        if !(self.gif_resolution_factor.is_finite() && self.gif_resolution_factor > 0.0) {
            return Err(MovieError::InvalidConfig(format!(
                "gif_resolution_factor must be positive, got {}",
                self.gif_resolution_factor
            )));
        }
        Ok(())
    }
}

/// Artifacts produced by [`Movie::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub frames_written: usize,
    /// Frame files still on disk
    pub frame_files: Vec<PathBuf>,
    /// The encoded movie, unless it was removed after GIF conversion
    pub movie: Option<PathBuf>,
    pub gif: Option<PathBuf>,
}

/// An animation of one dimension of the data
pub struct Movie {
    data: AnimatedData,
    framedim: String,
    n_frames: usize,
    pixelwidth: u32,
    pixelheight: u32,
    dpi: u32,
    frame_pattern: FramePattern,
    plotfunc: SharedPlotFunc,
    kwargs: PlotKwargs,
    style: PlotStyle,
    output_count: usize,
}

impl fmt::Debug for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Movie")
            .field("framedim", &self.framedim)
            .field("n_frames", &self.n_frames)
            .field("pixelwidth", &self.pixelwidth)
            .field("pixelheight", &self.pixelheight)
            .field("dpi", &self.dpi)
            .field("frame_pattern", &self.frame_pattern)
            .field("plotfunc", &self.plotfunc.name())
            .field("kwargs", &self.kwargs)
            .field("output_count", &self.output_count)
            .finish_non_exhaustive()
    }
}

impl Movie {
    /// Validate the inputs and probe the plot function once on frame 0.
    ///
    /// Every configuration problem is reported here, before any frame is written.
    pub fn new(data: impl Into<AnimatedData>, config: MovieConfig) -> Result<Self> {
        let MovieConfig {
            framedim,
            pixelwidth,
            pixelheight,
            dpi,
            frame_pattern,
            plotfunc,
            fieldname,
            input_check,
            kwargs,
            unknown_kwargs,
            style,
        } = config;

        let data = select_input(data.into(), fieldname.as_deref(), input_check)?;

        if !data.dims().contains(&framedim) {
            return Err(MovieError::DimensionNotFound {
                dim: framedim,
                available: data.dims(),
            });
        }
        let n_frames = data.dim_len(&framedim)?;
        if n_frames == 0 {
            return Err(MovieError::InvalidConfig(format!(
                "frame dimension '{framedim}' is empty"
            )));
        }
        if pixelwidth == 0 || pixelheight == 0 || dpi == 0 {
            return Err(MovieError::InvalidConfig(format!(
                "frame size {pixelwidth}x{pixelheight} at {dpi} dpi is not drawable"
            )));
        }
        let frame_pattern = FramePattern::parse(&frame_pattern)?;

        let plotfunc: SharedPlotFunc = plotfunc.unwrap_or_else(|| Arc::new(Basic));
        let mut kwargs = filter_kwargs(plotfunc.as_ref(), kwargs, unknown_kwargs)?;

        // color limits over the whole series keep frames comparable
        let plot_variable = kwargs
            .get("plot_variable")
            .and_then(Value::as_str)
            .map(str::to_owned);
        for (key, value) in get_plot_defaults(&data, plot_variable.as_deref()) {
            if plotfunc.accepts(&key) && !kwargs.contains_key(&key) {
                kwargs.insert(key, value);
            }
        }

        let output_count =
            check_plotfunc_output(plotfunc.as_ref(), &data, &framedim, &kwargs, &style)?;
        match output_count {
            2 => {}
            0 => log::warn!(
                "Plot function `{}` returns no handles; automatic styling is disabled",
                plotfunc.name()
            ),
            n => log::warn!(
                "Plot function `{}` returned {} values instead of (axes, plot); using empty handles",
                plotfunc.name(),
                n
            ),
        }

        log::debug!(
            "movie over '{}' with {} frames using `{}`",
            framedim,
            n_frames,
            plotfunc.name()
        );

        Ok(Self {
            data,
            framedim,
            n_frames,
            pixelwidth,
            pixelheight,
            dpi,
            frame_pattern,
            plotfunc,
            kwargs,
            style,
            output_count,
        })
    }

    pub fn data(&self) -> &AnimatedData {
        &self.data
    }

    pub fn framedim(&self) -> &str {
        &self.framedim
    }

    /// Number of frames along the frame dimension
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    pub fn pixelwidth(&self) -> u32 {
        self.pixelwidth
    }

    pub fn pixelheight(&self) -> u32 {
        self.pixelheight
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn frame_pattern(&self) -> &FramePattern {
        &self.frame_pattern
    }

    /// Keyword arguments passed to the plot function, defaults included
    pub fn kwargs(&self) -> &PlotKwargs {
        &self.kwargs
    }

    /// Number of values the plot function produced when probed
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    fn new_figure(&self) -> Figure {
        Figure::new(self.pixelwidth, self.pixelheight, self.dpi, self.style.clone())
    }

    fn check_frame(&self, frame: usize) -> Result<()> {
        if frame >= self.n_frames {
            return Err(MovieError::InvalidConfig(format!(
                "frame {} is out of range for '{}' with {} frames",
                frame, self.framedim, self.n_frames
            )));
        }
        Ok(())
    }

    /// Draw `frame` onto `fig`, returning the axes/plot handles when available
    pub fn render_frame(
        &self,
        fig: &mut Figure,
        frame: usize,
    ) -> Result<(Option<Axes>, Option<PlotHandle>)> {
        self.check_frame(frame)?;
        let output = self
            .plotfunc
            .plot(&self.data, fig, frame, &self.framedim, &self.kwargs)?;
        Ok(match output {
            PlotOutput::Handles { axis, plot } => (Some(axis), Some(plot)),
            PlotOutput::NoHandles | PlotOutput::Unstructured(_) => (None, None),
        })
    }

    /// Render a single frame into a fresh figure
    pub fn preview(&self, frame: usize) -> Result<Figure> {
        let mut fig = self.new_figure();
        self.render_frame(&mut fig, frame)?;
        Ok(fig)
    }

    fn save_frame(&self, odir: &Path, frame: usize) -> Result<PathBuf> {
        let fig = self.preview(frame)?;
        frame_save(fig, frame, odir, &self.frame_pattern)
    }

    /// Write every frame in order
    pub fn save_frames_serial(&self, odir: &Path, progress: bool) -> Result<Vec<PathBuf>> {
        let progress = Progress::new(progress, self.n_frames);
        let mut written = Vec::with_capacity(self.n_frames);
        for frame in 0..self.n_frames {
            written.push(self.save_frame(odir, frame)?);
            progress.inc();
        }
        progress.finish();
        Ok(written)
    }

    /// Frame index of every chunk along the frame dimension
    fn frame_blocks(&self) -> Result<Vec<usize>> {
        let array = self.data.frame_array(&self.framedim)?;
        let chunks = array.chunks_along(&self.framedim)?.ok_or_else(|| {
            MovieError::ChunkingError(format!(
                "`parallel` requires chunked data. Chunk the input along '{0}' with size 1, e.g. `array.chunk(&[(\"{0}\", 1)])`",
                self.framedim
            ))
        })?;
        if chunks.iter().any(|&len| len != 1) {
            return Err(MovieError::ChunkingError(format!(
                "chunksize along '{}' must be 1 for parallel frame generation, found chunks {:?}",
                self.framedim, chunks
            )));
        }

        // each single-frame block finds its frame through its own coordinate
        array
            .blocks_along(&self.framedim)?
            .iter()
            .map(|block| {
                let position = block.coord(&self.framedim)?[0];
                array.nearest_index(&self.framedim, position)
            })
            .collect()
    }

    /// Write every frame on a Rayon pool, one chunk per task
    pub fn save_frames_parallel(
        &self,
        odir: &Path,
        parallel_config: &ParallelConfig,
    ) -> Result<Vec<PathBuf>> {
        let frames = self.frame_blocks()?;
        let pool = parallel_config.build_pool()?;
        log::debug!(
            "rendering {} frames on {} threads",
            frames.len(),
            pool.current_num_threads()
        );
        pool.install(|| {
            frames
                .par_iter()
                .map(|&frame| self.save_frame(odir, frame))
                .collect::<Result<Vec<_>>>()
        })
    }

    /// Write every frame into `odir`
    pub fn save_frames(
        &self,
        odir: &Path,
        parallel: bool,
        progress: bool,
        parallel_config: &ParallelConfig,
    ) -> Result<Vec<PathBuf>> {
        if parallel {
            if progress {
                log::warn!("Progress bar is only shown for serial frame generation");
            }
            self.save_frames_parallel(odir, parallel_config)
        } else {
            self.save_frames_serial(odir, progress)
        }
    }

    /// Render all frames and encode them into `path`.
    ///
    /// A `.gif` target is produced through an intermediate `.mp4` next to it. All
    /// output files and the encoder are checked before the first frame is drawn.
    pub fn save(&self, path: impl AsRef<Path>, opts: &SaveOptions) -> Result<SaveReport> {
        let path = path.as_ref();
        opts.validate()?;

        let dirname = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = path.file_name().ok_or_else(|| {
            MovieError::InvalidConfig(format!("`{}` does not name a file", path.display()))
        })?;
        let is_gif = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"));

        let (moviename, gifname) = if is_gif {
            let movie = Path::new(filename).with_extension("mp4");
            (movie.into_os_string(), Some(filename.to_os_string()))
        } else {
            (filename.to_os_string(), None)
        };
        let moviename = moviename.to_string_lossy().into_owned();
        let mpath = dirname.join(&moviename);
        let gpath = gifname.map(|name| dirname.join(name));

        if !opts.overwrite_existing {
            for artifact in std::iter::once(&mpath).chain(gpath.as_ref()) {
                if artifact.exists() {
                    return Err(MovieError::FileExists {
                        path: artifact.clone(),
                    });
                }
            }
        }

        let version = opts.encoder.require()?;
        log::info!("Using {} version {}", opts.encoder.program(), version);

        fs::create_dir_all(&dirname)?;
        log::info!("Writing {} frames to {}", self.n_frames, dirname.display());
        let frame_files = self.save_frames(
            &dirname,
            opts.parallel,
            opts.progress,
            &opts.parallel_config,
        )?;
        let frames_written = frame_files.len();

        log::info!("Encoding {}", mpath.display());
        let encode = EncodeSettings {
            framerate: opts.framerate,
            ffmpeg_options: opts.ffmpeg_options.clone(),
            remove_frames: opts.remove_frames,
            verbose: opts.verbose,
        };
        let mpath = opts
            .encoder
            .write_movie(&dirname, &moviename, &self.frame_pattern, &encode)?;

        let mut report = SaveReport {
            frames_written,
            frame_files: if opts.remove_frames {
                Vec::new()
            } else {
                frame_files
            },
            movie: Some(mpath.clone()),
            gif: None,
        };

        if let Some(gpath) = gpath {
            log::info!("Converting to {}", gpath.display());
            let gif = GifSettings {
                gif_palette: opts.gif_palette,
                resolution: (
                    scaled(self.pixelwidth, opts.gif_resolution_factor),
                    scaled(self.pixelheight, opts.gif_resolution_factor),
                ),
                gif_framerate: opts.gif_framerate,
                remove_movie: opts.remove_movie,
                verbose: opts.verbose,
            };
            report.gif = Some(opts.encoder.convert_gif(&mpath, &gpath, &gif)?);
            if mpath.exists() {
                report.movie = Some(mpath);
            } else {
                report.movie = None;
            }
        }

        Ok(report)
    }
}

fn scaled(pixels: u32, factor: f64) -> u32 {
    ((f64::from(pixels) * factor).round() as u32).max(1)
}

/// Narrow a dataset input to the array that will be animated
fn select_input(
    data: AnimatedData,
    fieldname: Option<&str>,
    input_check: bool,
) -> Result<AnimatedData> {
    match data {
        AnimatedData::Dataset(ds) => match fieldname {
            Some(name) => ds
                .get(name)
                .cloned()
                .map(|array| AnimatedData::Array(array.with_name(name)))
                .ok_or_else(|| MovieError::VariableNotFound {
                    var: name.to_string(),
                }),
            None if input_check => Err(MovieError::UnsupportedInput(format!(
                "a dataset with variables [{}] was given. Select one with `fieldname` or set `input_check` to false",
                ds.data_vars().join(", ")
            ))),
            None => Ok(AnimatedData::Dataset(ds)),
        },
        array => Ok(array),
    }
}
