//! Built-in plot functions
//!
//! [`Basic`] draws the frame slice of a 2-D field as a colour mesh (or filled /
//! outlined bands) with an optional colourbar, in a light or dark style.

use crate::colormap::Colormap;
use crate::dataset::{AnimatedData, DataArray};
use crate::errors::{MovieError, Result};
use crate::figure::{gray, Figure, FONT_FAMILY};
use crate::plotfunc::{Axes, PlotFunc, PlotHandle, PlotKwargs, PlotOutput};
use ndarray::Ix2;
use plotters::prelude::*;
use serde_json::{json, Value};

/// Keyword arguments understood by [`Basic`]
pub const BASIC_KWARGS: &[&str] = &[
    "plotmethod",
    "plot_variable",
    "cmap",
    "vmin",
    "vmax",
    "levels",
    "add_colorbar",
    "title",
    "style",
];

/// Colour scheme of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Standard,
    Dark,
}

impl Style {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "standard" => Ok(Style::Standard),
            "dark" => Ok(Style::Dark),
            other => Err(MovieError::InvalidConfig(format!(
                "style '{other}' not recognized (expected 'standard' or 'dark')"
            ))),
        }
    }

    /// Foreground and background colours
    pub fn colors(self) -> (RGBColor, RGBColor) {
        match self {
            Style::Standard => (BLACK, WHITE),
            Style::Dark => (gray(0.7), gray(0.1)),
        }
    }
}

/// How the 2-D field is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotMethod {
    #[default]
    Pcolormesh,
    Contourf,
    Contour,
}

impl PlotMethod {
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        match name {
            None | Some("pcolormesh") => Ok(PlotMethod::Pcolormesh),
            Some("contourf") => Ok(PlotMethod::Contourf),
            Some("contour") => Ok(PlotMethod::Contour),
            Some(other) => Err(MovieError::InvalidConfig(format!(
                "Input '{other}' not recognized as plotmethod"
            ))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PlotMethod::Pcolormesh => "pcolormesh",
            PlotMethod::Contourf => "contourf",
            PlotMethod::Contour => "contour",
        }
    }
}

fn kw_str(kwargs: &PlotKwargs, key: &str) -> Result<Option<String>> {
    match kwargs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(MovieError::InvalidConfig(format!(
            "keyword '{key}' must be a string, got {other}"
        ))),
    }
}

fn kw_f64(kwargs: &PlotKwargs, key: &str) -> Result<Option<f64>> {
    match kwargs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            MovieError::InvalidConfig(format!("keyword '{key}' must be a number, got {v}"))
        }),
    }
}

fn kw_bool(kwargs: &PlotKwargs, key: &str) -> Result<Option<bool>> {
    match kwargs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_bool().map(Some).ok_or_else(|| {
            MovieError::InvalidConfig(format!("keyword '{key}' must be a boolean, got {v}"))
        }),
    }
}

/// Parsed keyword arguments of the basic preset
#[derive(Debug, Clone, PartialEq)]
pub struct BasicOptions {
    pub plotmethod: PlotMethod,
    pub plot_variable: Option<String>,
    pub cmap: Colormap,
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
    pub levels: usize,
    pub add_colorbar: bool,
    pub title: Option<String>,
    pub style: Style,
}

impl BasicOptions {
    pub fn from_kwargs(kwargs: &PlotKwargs) -> Result<Self> {
        let levels = match kw_f64(kwargs, "levels")? {
            Some(l) if l >= 1.0 && l.fract() == 0.0 => l as usize,
            Some(l) => {
                return Err(MovieError::InvalidConfig(format!(
                    "keyword 'levels' must be a positive integer, got {l}"
                )))
            }
            None => 10,
        };

        Ok(Self {
            plotmethod: PlotMethod::from_name(kw_str(kwargs, "plotmethod")?.as_deref())?,
            plot_variable: kw_str(kwargs, "plot_variable")?,
            cmap: Colormap::from_name(&kw_str(kwargs, "cmap")?.unwrap_or_else(|| "viridis".into()))?,
            vmin: kw_f64(kwargs, "vmin")?,
            vmax: kw_f64(kwargs, "vmax")?,
            levels,
            add_colorbar: kw_bool(kwargs, "add_colorbar")?.unwrap_or(true),
            title: kw_str(kwargs, "title")?,
            style: kw_str(kwargs, "style")?
                .map(|s| Style::from_name(&s))
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Pick the array to plot from the input
pub fn check_input<'a>(data: &'a AnimatedData, fieldname: Option<&str>) -> Result<&'a DataArray> {
    match data {
        AnimatedData::Array(array) => Ok(array),
        AnimatedData::Dataset(ds) => match fieldname {
            Some(name) => ds.get(name).ok_or_else(|| MovieError::VariableNotFound {
                var: name.to_string(),
            }),
            None => {
                let (name, array) = ds.first().ok_or_else(|| {
                    MovieError::UnsupportedInput("dataset has no variables".to_string())
                })?;
                log::warn!("No plot_variable supplied. Defaults to `{name}`");
                Ok(array)
            }
        },
    }
}

/// Colour limits taken from the data, used when the caller supplied none.
///
/// For a dataset the limits come from `plot_variable` when it names a variable,
/// otherwise from the first variable.
pub fn get_plot_defaults(data: &AnimatedData, plot_variable: Option<&str>) -> PlotKwargs {
    let (vmin, vmax) = match (data, plot_variable) {
        (AnimatedData::Dataset(ds), Some(name)) => match ds.get(name) {
            Some(array) => (array.min(), array.max()),
            None => (data.min(), data.max()),
        },
        _ => (data.min(), data.max()),
    };
    let mut defaults = PlotKwargs::new();
    if let (Some(vmin), Some(vmax)) = (vmin, vmax) {
        defaults.insert("vmin".to_string(), json!(f64::from(vmin)));
        defaults.insert("vmax".to_string(), json!(f64::from(vmax)));
    }
    defaults
}

fn band(t: f64, levels: usize) -> usize {
    ((t.clamp(0.0, 1.0) * levels as f64).floor() as usize).min(levels - 1)
}

fn normalized(value: f32, vmin: f64, vmax: f64) -> f64 {
    (f64::from(value) - vmin) / (vmax - vmin)
}

fn coord_extent(coord: &[f64]) -> (f64, f64) {
    coord
        .iter()
        .filter(|c| c.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)))
}

fn format_tick(coord: &[f64], position: f64) -> String {
    let i = position.floor().max(0.0) as usize;
    match coord.get(i) {
        Some(v) if v.fract() == 0.0 => format!("{}", *v as i64),
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}

/// Draw a 2-D array onto the figure and return the axes/plot handles
pub fn core_plot(
    fig: &mut Figure,
    data: &DataArray,
    opts: &BasicOptions,
    title: &str,
) -> Result<(Axes, PlotHandle)> {
    if data.dims().len() != 2 {
        return Err(MovieError::UnsupportedInput(format!(
            "frame slice must be 2-D, got dimensions [{}]",
            data.dims().join(", ")
        )));
    }
    let y_dim = data.dims()[0].clone();
    let x_dim = data.dims()[1].clone();
    let x_coord = data.coord(&x_dim)?;
    let y_coord = data.coord(&y_dim)?;
    let grid = data.values().view().into_dimensionality::<Ix2>()?;
    let (ny, nx) = grid.dim();

    let vmin = opts.vmin.or_else(|| data.min().map(f64::from)).unwrap_or(0.0);
    let mut vmax = opts.vmax.or_else(|| data.max().map(f64::from)).unwrap_or(1.0);
    if vmax <= vmin {
        vmax = vmin + 1.0;
    }

    let (fg, bg) = opts.style.colors();
    fig.set_facecolor(bg);
    let font_px = fig.font_px();
    let has_font = fig.style().has_font();
    let width = fig.width();
    let fig_height = fig.height();
    let show_colorbar = opts.add_colorbar && opts.plotmethod != PlotMethod::Contour;
    let cmap = opts.cmap;
    let levels = opts.levels;
    let method = opts.plotmethod;

    let root = fig.drawing_area();
    let root = if has_font && !title.is_empty() {
        root.titled(title, (FONT_FAMILY, font_px).into_font().color(&fg))
            .map_err(MovieError::plot)?
    } else {
        root
    };
    let (main, colorbar) = if show_colorbar {
        let (main, colorbar) = root.split_horizontally((f64::from(width) * 0.85) as u32);
        (main, Some(colorbar))
    } else {
        (root, None)
    };

    let margin = (font_px.max(4.0) as u32).min(width.min(fig_height) / 8);
    let label_area = if has_font { (font_px * 3.0) as u32 } else { 0 };
    let mut chart = ChartBuilder::on(&main)
        .margin(margin)
        .x_label_area_size(label_area)
        .y_label_area_size(label_area)
        .build_cartesian_2d(0f64..nx as f64, 0f64..ny as f64)
        .map_err(MovieError::plot)?;

    let cell_color = |value: f32| -> Option<RGBColor> {
        if !value.is_finite() {
            return None;
        }
        match method {
            PlotMethod::Pcolormesh => cmap.map(value, vmin, vmax),
            PlotMethod::Contourf | PlotMethod::Contour => {
                let level = band(normalized(value, vmin, vmax), levels);
                Some(cmap.at((level as f64 + 0.5) / levels as f64))
            }
        }
    };

    let is_edge = |j: usize, i: usize| -> bool {
        let level = |v: f32| band(normalized(v, vmin, vmax), levels);
        let here = level(grid[[j, i]]);
        (i + 1 < nx && level(grid[[j, i + 1]]) != here)
            || (j + 1 < ny && level(grid[[j + 1, i]]) != here)
    };

    let cells = (0..ny)
        .flat_map(|j| (0..nx).map(move |i| (j, i)))
        .filter(|&(j, i)| method != PlotMethod::Contour || is_edge(j, i))
        .filter_map(|(j, i)| {
            cell_color(grid[[j, i]]).map(|color| {
                Rectangle::new(
                    [(i as f64, j as f64), ((i + 1) as f64, (j + 1) as f64)],
                    color.filled(),
                )
            })
        });
    chart.draw_series(cells).map_err(MovieError::plot)?;

    if has_font {
        chart
            .configure_mesh()
            .disable_mesh()
            .axis_style(fg.stroke_width(1))
            .x_desc(x_dim.as_str())
            .y_desc(y_dim.as_str())
            .label_style((FONT_FAMILY, font_px * 0.8).into_font().color(&fg))
            .x_label_formatter(&|v| format_tick(&x_coord, *v))
            .y_label_formatter(&|v| format_tick(&y_coord, *v))
            .draw()
            .map_err(MovieError::plot)?;
    }
    chart
        .plotting_area()
        .draw(&Rectangle::new(
            [(0.0, 0.0), (nx as f64, ny as f64)],
            fg.stroke_width(1),
        ))
        .map_err(MovieError::plot)?;

    let (x_pixels, y_pixels) = chart.plotting_area().get_pixel_range();

    if let Some(area) = colorbar {
        let bar_margin = margin.min((f64::from(width) * 0.15) as u32 / 4);
        let mut bar = ChartBuilder::on(&area)
            .margin(bar_margin)
            .set_label_area_size(LabelAreaPosition::Right, label_area)
            .build_cartesian_2d(0f64..1f64, vmin..vmax)
            .map_err(MovieError::plot)?;

        const STEPS: usize = 128;
        let span = vmax - vmin;
        let steps = (0..STEPS).map(|k| {
            let lo = vmin + span * k as f64 / STEPS as f64;
            let hi = vmin + span * (k + 1) as f64 / STEPS as f64;
            let mid = (lo + hi) / 2.0;
            let color = cell_color(mid as f32).unwrap_or(bg);
            Rectangle::new([(0.0, lo), (1.0, hi)], color.filled())
        });
        bar.draw_series(steps).map_err(MovieError::plot)?;

        if has_font {
            bar.configure_mesh()
                .disable_mesh()
                .disable_x_axis()
                .axis_style(fg.stroke_width(1))
                .y_labels(5)
                .label_style((FONT_FAMILY, font_px * 0.8).into_font().color(&fg))
                .draw()
                .map_err(MovieError::plot)?;
        }
        bar.plotting_area()
            .draw(&Rectangle::new([(0.0, vmin), (1.0, vmax)], fg.stroke_width(1)))
            .map_err(MovieError::plot)?;
    }

    let axis = Axes {
        bounds: (x_pixels.start, y_pixels.start, x_pixels.end, y_pixels.end),
        x_range: coord_extent(&x_coord),
        y_range: coord_extent(&y_coord),
        x_dim,
        y_dim,
    };
    let plot = PlotHandle {
        method: method.as_str().to_string(),
        cmap: format!("{cmap:?}").to_lowercase(),
        vmin,
        vmax,
        has_colorbar: show_colorbar,
    };
    Ok((axis, plot))
}

/// The default plot function: one 2-D colour plot per frame
#[derive(Debug, Clone, Copy, Default)]
pub struct Basic;

impl PlotFunc for Basic {
    fn name(&self) -> &str {
        "basic"
    }

    fn accepted_kwargs(&self) -> Option<&[&str]> {
        Some(BASIC_KWARGS)
    }

    fn plot(
        &self,
        data: &AnimatedData,
        fig: &mut Figure,
        frame: usize,
        framedim: &str,
        kwargs: &PlotKwargs,
    ) -> Result<PlotOutput> {
        let opts = BasicOptions::from_kwargs(kwargs)?;
        let array = check_input(data, opts.plot_variable.as_deref())?;
        let title = match &opts.title {
            Some(title) => title.clone(),
            None => format!("{framedim} = {}", array.coord_label(framedim, frame)?),
        };
        let frame_data = array.isel(framedim, frame)?;
        let (axis, plot) = core_plot(fig, &frame_data, &opts, &title)?;
        Ok(PlotOutput::Handles { axis, plot })
    }
}

/// The default plot function
pub fn basic() -> Basic {
    Basic
}
