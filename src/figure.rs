//! The drawing surface a frame is rendered onto
//!
//! A [`Figure`] owns an RGB raster of exactly the requested pixel size. Plot
//! callbacks draw into it through a `plotters` bitmap drawing area; the frame writer
//! turns it into an RGB image with the face colour baked in, which every
//! raster format the `image` crate writes can store.

use crate::errors::{MovieError, Result};
use image::{Rgb, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::path::Path;

/// Font family name fonts are registered under
pub const FONT_FAMILY: &str = "sans-serif";

/// Gray level in `[0, 1]`, as in `"0.7"` colour specs
pub fn gray(level: f64) -> RGBColor {
    let v = (level.clamp(0.0, 1.0) * 255.0).round() as u8;
    RGBColor(v, v, v)
}

/// Rendering configuration threaded through every frame
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    /// Font size in points
    pub font_size: f64,
    /// Family of a registered font; text is only drawn when set
    pub font_family: Option<String>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_family: None,
        }
    }
}

impl PlotStyle {
    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Register a TTF/OTF file for text rendering and enable it for this style.
    ///
    /// Registration is process wide; call it once at startup.
    pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
        register_font_file(path)?;
        self.font_family = Some(FONT_FAMILY.to_string());
        Ok(self)
    }

    pub fn has_font(&self) -> bool {
        self.font_family.is_some()
    }
}

/// Load a font file and register it for [`FONT_FAMILY`]
pub fn register_font_file(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)?;
    // plotters keeps a reference for the rest of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes).map_err(|_| {
        MovieError::InvalidConfig(format!("could not load font '{}'", path.display()))
    })?;
    log::debug!("registered font {}", path.display());
    Ok(())
}

/// An in-memory RGB canvas for one frame
pub struct Figure {
    width: u32,
    height: u32,
    dpi: u32,
    facecolor: RGBColor,
    style: PlotStyle,
    buffer: Vec<u8>,
}

impl Figure {
    /// Create a figure sized according to the pixel dimensions
    pub fn new(pixelwidth: u32, pixelheight: u32, dpi: u32, style: PlotStyle) -> Self {
        let facecolor = WHITE;
        let mut fig = Self {
            width: pixelwidth,
            height: pixelheight,
            dpi,
            facecolor,
            style,
            buffer: vec![0; pixelwidth as usize * pixelheight as usize * 3],
        };
        fig.paint_background();
        fig
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Physical size in inches (pixels / dpi)
    pub fn size_inches(&self) -> (f64, f64) {
        (
            f64::from(self.width) / f64::from(self.dpi),
            f64::from(self.height) / f64::from(self.dpi),
        )
    }

    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    /// Font size in pixels for this figure's resolution
    pub fn font_px(&self) -> f64 {
        self.style.font_size * f64::from(self.dpi) / 72.0
    }

    pub fn facecolor(&self) -> RGBColor {
        self.facecolor
    }

    /// Change the face colour. Repaints the whole canvas, so call it before drawing.
    pub fn set_facecolor(&mut self, color: RGBColor) {
        self.facecolor = color;
        self.paint_background();
    }

    fn paint_background(&mut self) {
        let RGBColor(r, g, b) = self.facecolor;
        for px in self.buffer.chunks_exact_mut(3) {
            px.copy_from_slice(&[r, g, b]);
        }
    }

    /// Root drawing area over the whole canvas, in pixel coordinates
    pub fn drawing_area(&mut self) -> DrawingArea<BitMapBackend<'_>, Shift> {
        BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height)).into_drawing_area()
    }

    /// Colour of a single pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<RGBColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some(RGBColor(self.buffer[i], self.buffer[i + 1], self.buffer[i + 2]))
    }

    /// RGB copy of the canvas
    pub fn to_rgb(&self) -> RgbImage {
        let width = self.width as usize;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let i = (y as usize * width + x as usize) * 3;
            Rgb([self.buffer[i], self.buffer[i + 1], self.buffer[i + 2]])
        })
    }
}

impl Drop for Figure {
    fn drop(&mut self) {
        log::trace!("closing {}x{} figure", self.width, self.height);
    }
}
