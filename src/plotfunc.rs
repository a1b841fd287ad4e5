//! Plotting callback contract
//!
//! A plot function draws one frame of the data onto a [`Figure`]. Callbacks report
//! what they drew through [`PlotOutput`]; the conventional result is a pair of
//! handles (the axes and the plotted object).

use crate::dataset::AnimatedData;
use crate::errors::{MovieError, Result};
use crate::figure::{Figure, PlotStyle};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Keyword arguments forwarded to the plot function
pub type PlotKwargs = Map<String, Value>;

/// Pixel box and data extent of the plotting area
#[derive(Debug, Clone, PartialEq)]
pub struct Axes {
    /// Left, top, right, bottom in figure pixels
    pub bounds: (i32, i32, i32, i32),
    pub x_dim: String,
    pub y_dim: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

/// Description of the plotted object
#[derive(Debug, Clone, PartialEq)]
pub struct PlotHandle {
    pub method: String,
    pub cmap: String,
    pub vmin: f64,
    pub vmax: f64,
    pub has_colorbar: bool,
}

/// What a plot function returns
#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutput {
    /// Nothing to hand back; automatic styling is not possible
    NoHandles,
    /// The axes/plot pair
    Handles { axis: Axes, plot: PlotHandle },
    /// A legacy callback that produced this many values instead of the pair
    Unstructured(usize),
}

impl PlotOutput {
    /// Number of values the callback produced
    pub fn len(&self) -> usize {
        match self {
            PlotOutput::NoHandles => 0,
            PlotOutput::Handles { .. } => 2,
            PlotOutput::Unstructured(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A routine that draws a single frame
pub trait PlotFunc: Send + Sync {
    fn name(&self) -> &str {
        "custom"
    }

    /// Keyword arguments this function understands; `None` accepts anything
    fn accepted_kwargs(&self) -> Option<&[&str]> {
        None
    }

    fn plot(
        &self,
        data: &AnimatedData,
        fig: &mut Figure,
        frame: usize,
        framedim: &str,
        kwargs: &PlotKwargs,
    ) -> Result<PlotOutput>;

    fn accepts(&self, key: &str) -> bool {
        self.accepted_kwargs()
            .map_or(true, |keys| keys.contains(&key))
    }
}

impl<F> PlotFunc for F
where
    F: Fn(&AnimatedData, &mut Figure, usize, &str, &PlotKwargs) -> Result<PlotOutput> + Send + Sync,
{
    fn plot(
        &self,
        data: &AnimatedData,
        fig: &mut Figure,
        frame: usize,
        framedim: &str,
        kwargs: &PlotKwargs,
    ) -> Result<PlotOutput> {
        self(data, fig, frame, framedim, kwargs)
    }
}

type PlotClosure =
    dyn Fn(&AnimatedData, &mut Figure, usize, &str, &PlotKwargs) -> Result<PlotOutput> + Send + Sync;

/// A closure with a name and a declared set of keyword arguments
pub struct PlotFn {
    name: String,
    accepted: Option<Vec<&'static str>>,
    func: Box<PlotClosure>,
}

impl PlotFn {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&AnimatedData, &mut Figure, usize, &str, &PlotKwargs) -> Result<PlotOutput>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            accepted: None,
            func: Box::new(func),
        }
    }

    /// Restrict the keyword arguments this function is declared to take
    pub fn accepting(mut self, keys: &[&'static str]) -> Self {
        self.accepted = Some(keys.to_vec());
        self
    }
}

impl fmt::Debug for PlotFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotFn")
            .field("name", &self.name)
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

impl PlotFunc for PlotFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepted_kwargs(&self) -> Option<&[&str]> {
        self.accepted.as_deref()
    }

    fn plot(
        &self,
        data: &AnimatedData,
        fig: &mut Figure,
        frame: usize,
        framedim: &str,
        kwargs: &PlotKwargs,
    ) -> Result<PlotOutput> {
        (self.func)(data, fig, frame, framedim, kwargs)
    }
}

/// Shared handle to a plot function
pub type SharedPlotFunc = Arc<dyn PlotFunc>;

/// What to do with keyword arguments a plot function does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKwargs {
    /// Drop them silently
    Ignore,
    /// Drop them and log a warning
    #[default]
    Warn,
    /// Refuse to build the movie
    Reject,
}

/// Split `kwargs` into what `func` accepts, applying the unknown-keyword policy
pub fn filter_kwargs(
    func: &dyn PlotFunc,
    kwargs: PlotKwargs,
    policy: UnknownKwargs,
) -> Result<PlotKwargs> {
    let (accepted, unknown): (PlotKwargs, PlotKwargs) =
        kwargs.into_iter().partition(|(key, _)| func.accepts(key));

    if !unknown.is_empty() {
        let keys: Vec<&str> = unknown.keys().map(String::as_str).collect();
        match policy {
            UnknownKwargs::Ignore => {}
            UnknownKwargs::Warn => log::warn!(
                "plot function `{}` does not take [{}]; they will not be passed",
                func.name(),
                keys.join(", ")
            ),
            UnknownKwargs::Reject => {
                return Err(MovieError::InvalidConfig(format!(
                    "plot function `{}` does not take keyword arguments [{}]",
                    func.name(),
                    keys.join(", ")
                )))
            }
        }
    }

    Ok(accepted)
}

/// Call `func` once on frame 0 of a scratch figure and count its outputs
pub fn check_plotfunc_output(
    func: &dyn PlotFunc,
    data: &AnimatedData,
    framedim: &str,
    kwargs: &PlotKwargs,
    style: &PlotStyle,
) -> Result<usize> {
    let mut fig = Figure::new(64, 48, 72, style.clone());
    let output = func.plot(data, &mut fig, 0, framedim, kwargs)?;
    Ok(output.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nothing(
        _: &AnimatedData,
        _: &mut Figure,
        _: usize,
        _: &str,
        _: &PlotKwargs,
    ) -> Result<PlotOutput> {
        Ok(PlotOutput::NoHandles)
    }

    #[test]
    fn closures_accept_everything() {
        assert!(nothing.accepts("anything"));
        let restricted = PlotFn::new("r", nothing).accepting(&["cmap"]);
        assert!(restricted.accepts("cmap"));
        assert!(!restricted.accepts("vmin"));
    }

    #[test]
    fn unknown_kwargs_policy() {
        let func = PlotFn::new("r", nothing).accepting(&["cmap"]);
        let mut kwargs = PlotKwargs::new();
        kwargs.insert("cmap".into(), json!("magma"));
        kwargs.insert("bogus".into(), json!(1));

        let kept = filter_kwargs(&func, kwargs.clone(), UnknownKwargs::Ignore).unwrap();
        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key("cmap"));

        let err = filter_kwargs(&func, kwargs, UnknownKwargs::Reject).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn output_counts() {
        assert_eq!(PlotOutput::NoHandles.len(), 0);
        assert_eq!(PlotOutput::Unstructured(3).len(), 3);
    }
}
