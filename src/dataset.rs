//! Labeled N-dimensional arrays handed to a movie
//!
//! [`DataArray`] couples an `ndarray::ArrayD<f32>` with dimension names, optional
//! 1-D coordinates, attributes and an optional chunk layout. [`Dataset`] is an
//! ordered record of named arrays; [`AnimatedData`] is whichever of the two the
//! caller supplied.

use crate::errors::{MovieError, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use ndarray::{ArrayD, Axis, Slice};
use std::collections::BTreeMap;
use std::ops::Range;

/// A labeled array of `f32` values
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    name: Option<String>,
    dims: Vec<String>,
    values: ArrayD<f32>,
    coords: BTreeMap<String, Vec<f64>>,
    coord_attrs: BTreeMap<String, BTreeMap<String, String>>,
    attrs: BTreeMap<String, String>,
    chunks: Option<Vec<Vec<usize>>>,
}

impl DataArray {
    /// Create a new array, one dimension name per axis
    pub fn new<S: AsRef<str>>(values: ArrayD<f32>, dims: &[S]) -> Result<Self> {
        if dims.len() != values.ndim() {
            return Err(MovieError::UnsupportedInput(format!(
                "{} dimension names given for an array with {} axes",
                dims.len(),
                values.ndim()
            )));
        }

        let dims: Vec<String> = dims.iter().map(|d| d.as_ref().to_string()).collect();
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(MovieError::InvalidConfig(format!(
                    "dimension '{dim}' appears more than once"
                )));
            }
        }

        Ok(Self {
            name: None,
            dims,
            values,
            coords: BTreeMap::new(),
            coord_attrs: BTreeMap::new(),
            attrs: BTreeMap::new(),
            chunks: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a 1-D coordinate to an existing dimension
    pub fn with_coord(mut self, dim: &str, values: Vec<f64>) -> Result<Self> {
        let len = self.dim_len(dim)?;
        if values.len() != len {
            return Err(MovieError::InvalidConfig(format!(
                "coordinate '{dim}' has {} values but the dimension has length {len}",
                values.len()
            )));
        }
        self.coords.insert(dim.to_string(), values);
        Ok(self)
    }

    /// Attach an attribute (e.g. CF `units`) to a coordinate
    pub fn with_coord_attr(mut self, dim: &str, key: &str, value: impl Into<String>) -> Self {
        self.coord_attrs
            .entry(dim.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn values(&self) -> &ArrayD<f32> {
        &self.values
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn coord_attr(&self, dim: &str, key: &str) -> Option<&str> {
        self.coord_attrs
            .get(dim)
            .and_then(|attrs| attrs.get(key))
            .map(String::as_str)
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    fn require_axis(&self, dim: &str) -> Result<usize> {
        self.axis_of(dim).ok_or_else(|| MovieError::DimensionNotFound {
            dim: dim.to_string(),
            available: self.dims.clone(),
        })
    }

    pub fn dim_len(&self, dim: &str) -> Result<usize> {
        let axis = self.require_axis(dim)?;
        Ok(self.values.len_of(Axis(axis)))
    }

    /// Whether an explicit coordinate is attached to `dim`
    pub fn has_coord(&self, dim: &str) -> bool {
        self.coords.contains_key(dim)
    }

    /// Coordinate values along `dim`; `0..n` when no coordinate was attached
    pub fn coord(&self, dim: &str) -> Result<Vec<f64>> {
        let len = self.dim_len(dim)?;
        Ok(self
            .coords
            .get(dim)
            .cloned()
            .unwrap_or_else(|| (0..len).map(|i| i as f64).collect()))
    }

    /// Select a single index along `dim`, dropping that dimension
    pub fn isel(&self, dim: &str, index: usize) -> Result<DataArray> {
        let axis = self.require_axis(dim)?;
        let len = self.values.len_of(Axis(axis));
        if index >= len {
            return Err(MovieError::InvalidConfig(format!(
                "index {index} is out of bounds for dimension '{dim}' of length {len}"
            )));
        }

        let mut dims = self.dims.clone();
        dims.remove(axis);
        let mut coords = self.coords.clone();
        coords.remove(dim);
        let chunks = self.chunks.as_ref().map(|chunks| {
            let mut chunks = chunks.clone();
            chunks.remove(axis);
            chunks
        });

        Ok(DataArray {
            name: self.name.clone(),
            dims,
            values: self.values.index_axis(Axis(axis), index).to_owned(),
            coords,
            coord_attrs: self.coord_attrs.clone(),
            attrs: self.attrs.clone(),
            chunks,
        })
    }

    /// Select a contiguous range along `dim`, keeping the dimension.
    ///
    /// The selection carries its coordinate along `dim`; without an explicit one
    /// the positions in `self` become the coordinate.
    pub fn isel_range(&self, dim: &str, range: Range<usize>) -> Result<DataArray> {
        let axis = self.require_axis(dim)?;
        let len = self.values.len_of(Axis(axis));
        if range.start >= range.end || range.end > len {
            return Err(MovieError::InvalidConfig(format!(
                "range {}..{} is not valid for dimension '{dim}' of length {len}",
                range.start, range.end
            )));
        }

        let mut coords = self.coords.clone();
        coords.insert(dim.to_string(), self.coord(dim)?[range.clone()].to_vec());
        let chunks = self.chunks.as_ref().map(|chunks| {
            let mut chunks = chunks.clone();
            chunks[axis] = intersect_chunks(&chunks[axis], &range);
            chunks
        });

        Ok(DataArray {
            name: self.name.clone(),
            dims: self.dims.clone(),
            values: self
                .values
                .slice_axis(Axis(axis), Slice::from(range))
                .to_owned(),
            coords,
            coord_attrs: self.coord_attrs.clone(),
            attrs: self.attrs.clone(),
            chunks,
        })
    }

    /// Minimum over all finite values
    pub fn min(&self) -> Option<f32> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f32::min)
    }

    /// Maximum over all finite values
    pub fn max(&self) -> Option<f32> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f32::max)
    }

    /// Chunk the array with a fixed chunk size per named dimension.
    ///
    /// Dimensions not listed form a single chunk.
    pub fn chunk(&self, sizes: &[(&str, usize)]) -> Result<DataArray> {
        for (dim, size) in sizes {
            self.require_axis(dim)?;
            if *size == 0 {
                return Err(MovieError::InvalidConfig(format!(
                    "chunk size for dimension '{dim}' must be positive"
                )));
            }
        }

        let chunks = self
            .dims
            .iter()
            .zip(self.values.shape())
            .map(|(dim, &len)| {
                let size = sizes
                    .iter()
                    .find(|(d, _)| d == dim)
                    .map(|(_, s)| *s)
                    .unwrap_or(len.max(1));
                split_len(len, size)
            })
            .collect();

        let mut chunked = self.clone();
        chunked.chunks = Some(chunks);
        Ok(chunked)
    }

    /// Set an explicit (possibly uneven) chunk layout
    pub fn with_chunks(mut self, chunks: Vec<Vec<usize>>) -> Result<Self> {
        if chunks.len() != self.dims.len() {
            return Err(MovieError::ChunkingError(format!(
                "chunk layout has {} entries for {} dimensions",
                chunks.len(),
                self.dims.len()
            )));
        }
        for ((dim, &len), dim_chunks) in self.dims.iter().zip(self.values.shape()).zip(&chunks) {
            if dim_chunks.iter().sum::<usize>() != len || dim_chunks.contains(&0) {
                return Err(MovieError::ChunkingError(format!(
                    "chunks {:?} do not partition dimension '{dim}' of length {len}",
                    dim_chunks
                )));
            }
        }
        self.chunks = Some(chunks);
        Ok(self)
    }

    pub fn chunks(&self) -> Option<&[Vec<usize>]> {
        self.chunks.as_deref()
    }

    /// Chunk lengths along `dim`, `None` when the array is not chunked
    pub fn chunks_along(&self, dim: &str) -> Result<Option<Vec<usize>>> {
        let axis = self.require_axis(dim)?;
        Ok(self.chunks.as_ref().map(|chunks| chunks[axis].clone()))
    }

    /// Split the array into its chunks along `dim`
    pub fn blocks_along(&self, dim: &str) -> Result<Vec<DataArray>> {
        let chunks = self.chunks_along(dim)?.ok_or_else(|| {
            MovieError::ChunkingError(format!("array is not chunked along '{dim}'"))
        })?;

        let mut offset = 0;
        let mut blocks = Vec::with_capacity(chunks.len());
        for len in chunks {
            blocks.push(self.isel_range(dim, offset..offset + len)?);
            offset += len;
        }
        Ok(blocks)
    }

    /// Position of the coordinate value closest to `value` along `dim`
    pub fn nearest_index(&self, dim: &str, value: f64) -> Result<usize> {
        let coord = self.coord(dim)?;
        coord
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_nan())
            .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
            .map(|(i, _)| i)
            .ok_or_else(|| {
                MovieError::InvalidConfig(format!("dimension '{dim}' has no usable coordinate"))
            })
    }

    /// Human readable label of a coordinate value, decoding CF time units
    pub fn coord_label(&self, dim: &str, index: usize) -> Result<String> {
        let coord = self.coord(dim)?;
        let value = *coord.get(index).ok_or_else(|| {
            MovieError::InvalidConfig(format!(
                "index {index} is out of bounds for dimension '{dim}'"
            ))
        })?;

        if let Some(label) = self
            .coord_attr(dim, "units")
            .and_then(|units| decode_cf_time(value, units))
        {
            return Ok(label);
        }

        if value.fract() == 0.0 && value.abs() < 1e15 {
            Ok(format!("{}", value as i64))
        } else {
            Ok(format!("{value:.3}"))
        }
    }
}

fn split_len(len: usize, size: usize) -> Vec<usize> {
    if len == 0 {
        return vec![0];
    }
    let mut chunks = vec![size; len / size];
    if len % size != 0 {
        chunks.push(len % size);
    }
    chunks
}

fn intersect_chunks(chunks: &[usize], range: &Range<usize>) -> Vec<usize> {
    let mut out = Vec::new();
    let mut start = 0;
    for &len in chunks {
        let end = start + len;
        let lo = start.max(range.start);
        let hi = end.min(range.end);
        if lo < hi {
            out.push(hi - lo);
        }
        start = end;
    }
    out
}

/// Decode a CF style "<unit> since <reference>" value into a timestamp string
fn decode_cf_time(value: f64, units: &str) -> Option<String> {
    let (unit, reference) = units.split_once(" since ")?;
    let millis_per_unit = match unit.trim().to_lowercase().as_str() {
        "days" | "day" | "d" => 86_400_000.0,
        "hours" | "hour" | "h" => 3_600_000.0,
        "minutes" | "minute" | "min" => 60_000.0,
        "seconds" | "second" | "s" => 1_000.0,
        _ => return None,
    };

    let reference = reference.trim();
    let start = NaiveDateTime::parse_from_str(reference, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(reference, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    let delta = TimeDelta::try_milliseconds((value * millis_per_unit).round() as i64)?;
    let stamp = start.checked_add_signed(delta)?;
    if stamp.time() == chrono::NaiveTime::MIN {
        Some(stamp.format("%Y-%m-%d").to_string())
    } else {
        Some(stamp.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// An ordered record of named arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    vars: Vec<(String, DataArray)>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a variable, keeping insertion order
    pub fn with_var(mut self, name: impl Into<String>, array: DataArray) -> Self {
        let name = name.into();
        let array = array.with_name(name.clone());
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = array,
            None => self.vars.push((name, array)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn first(&self) -> Option<(&str, &DataArray)> {
        self.vars.first().map(|(n, a)| (n.as_str(), a))
    }

    pub fn data_vars(&self) -> Vec<&str> {
        self.vars.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Union of all variable dimensions, in first-seen order
    pub fn dims(&self) -> Vec<String> {
        let mut dims: Vec<String> = Vec::new();
        for (_, array) in &self.vars {
            for dim in array.dims() {
                if !dims.contains(dim) {
                    dims.push(dim.clone());
                }
            }
        }
        dims
    }

    /// First variable that carries `dim`
    pub fn first_with_dim(&self, dim: &str) -> Option<&DataArray> {
        self.vars
            .iter()
            .map(|(_, a)| a)
            .find(|a| a.axis_of(dim).is_some())
    }

    pub fn dim_len(&self, dim: &str) -> Result<usize> {
        self.first_with_dim(dim)
            .ok_or_else(|| MovieError::DimensionNotFound {
                dim: dim.to_string(),
                available: self.dims(),
            })?
            .dim_len(dim)
    }
}

/// Data a movie animates: a single array or a record of arrays
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatedData {
    Array(DataArray),
    Dataset(Dataset),
}

impl AnimatedData {
    pub fn dims(&self) -> Vec<String> {
        match self {
            AnimatedData::Array(a) => a.dims().to_vec(),
            AnimatedData::Dataset(ds) => ds.dims(),
        }
    }

    pub fn dim_len(&self, dim: &str) -> Result<usize> {
        match self {
            AnimatedData::Array(a) => a.dim_len(dim),
            AnimatedData::Dataset(ds) => ds.dim_len(dim),
        }
    }

    /// The array that defines the frame dimension (the first carrying it)
    pub fn frame_array(&self, dim: &str) -> Result<&DataArray> {
        match self {
            AnimatedData::Array(a) => {
                a.dim_len(dim)?;
                Ok(a)
            }
            AnimatedData::Dataset(ds) => {
                ds.first_with_dim(dim)
                    .ok_or_else(|| MovieError::DimensionNotFound {
                        dim: dim.to_string(),
                        available: ds.dims(),
                    })
            }
        }
    }

    pub fn min(&self) -> Option<f32> {
        match self {
            AnimatedData::Array(a) => a.min(),
            AnimatedData::Dataset(ds) => ds.first().and_then(|(_, a)| a.min()),
        }
    }

    pub fn max(&self) -> Option<f32> {
        match self {
            AnimatedData::Array(a) => a.max(),
            AnimatedData::Dataset(ds) => ds.first().and_then(|(_, a)| a.max()),
        }
    }

    /// Chunk lengths along `dim` of the array carrying it
    pub fn chunks_along(&self, dim: &str) -> Result<Option<Vec<usize>>> {
        self.frame_array(dim)?.chunks_along(dim)
    }

    pub fn coord(&self, dim: &str) -> Result<Vec<f64>> {
        self.frame_array(dim)?.coord(dim)
    }

    pub fn as_array(&self) -> Option<&DataArray> {
        match self {
            AnimatedData::Array(a) => Some(a),
            AnimatedData::Dataset(_) => None,
        }
    }
}

impl From<DataArray> for AnimatedData {
    fn from(array: DataArray) -> Self {
        AnimatedData::Array(array)
    }
}

impl From<Dataset> for AnimatedData {
    fn from(dataset: Dataset) -> Self {
        AnimatedData::Dataset(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn sample() -> DataArray {
        let values = Array3::from_shape_fn((4, 5, 3), |(x, y, t)| (x + 10 * y + 100 * t) as f32);
        DataArray::new(values.into_dyn(), &["lon", "lat", "time"])
            .unwrap()
            .with_coord("time", vec![0.0, 30.0, 60.0])
            .unwrap()
    }

    #[test]
    fn split_len_keeps_remainder() {
        assert_eq!(split_len(5, 2), vec![2, 2, 1]);
        assert_eq!(split_len(4, 1), vec![1, 1, 1, 1]);
        assert_eq!(split_len(3, 10), vec![3]);
    }

    #[test]
    fn intersect_chunks_clips_to_range() {
        assert_eq!(intersect_chunks(&[2, 2, 1], &(1..4)), vec![1, 2]);
        assert_eq!(intersect_chunks(&[1, 1, 1], &(2..3)), vec![1]);
    }

    #[test]
    fn blocks_keep_their_position() {
        let values = Array3::<f32>::zeros((2, 2, 3)).into_dyn();
        let implicit = DataArray::new(values, &["y", "x", "time"])
            .unwrap()
            .chunk(&[("time", 1)])
            .unwrap();
        let blocks = implicit.blocks_along("time").unwrap();
        let positions: Vec<f64> = blocks.iter().map(|b| b.coord("time").unwrap()[0]).collect();
        assert_eq!(positions, vec![0.0, 1.0, 2.0]);

        let explicit = sample().isel_range("time", 1..3).unwrap();
        assert_eq!(explicit.coord("time").unwrap(), vec![30.0, 60.0]);
        assert!(sample().isel_range("time", 2..5).is_err());
    }

    #[test]
    fn dataset_finds_first_variable_with_dim() {
        let ds = Dataset::new()
            .with_var("flat", sample().isel("time", 0).unwrap())
            .with_var("series", sample());
        assert_eq!(ds.first_with_dim("time").unwrap().name(), Some("series"));
        assert!(ds.first_with_dim("level").is_none());

        let data = AnimatedData::from(ds);
        assert_eq!(data.frame_array("time").unwrap().name(), Some("series"));
        assert!(matches!(
            data.frame_array("level"),
            Err(MovieError::DimensionNotFound { .. })
        ));
    }

    #[test]
    fn isel_drops_dimension() {
        let a = sample();
        let frame = a.isel("time", 2).unwrap();
        assert_eq!(frame.dims(), &["lon".to_string(), "lat".to_string()]);
        assert_eq!(frame.shape(), &[4, 5]);
        assert_eq!(frame.values()[[1, 2]], 221.0);
        assert!(a.isel("time", 3).is_err());
    }

    #[test]
    fn nearest_index_matches_closest_coordinate() {
        let a = sample();
        assert_eq!(a.nearest_index("time", 29.0).unwrap(), 1);
        assert_eq!(a.nearest_index("time", 1000.0).unwrap(), 2);
        assert_eq!(a.nearest_index("lon", 2.2).unwrap(), 2);
    }

    #[test]
    fn cf_time_labels_are_decoded() {
        let a = sample().with_coord_attr("time", "units", "days since 2023-01-01");
        assert_eq!(a.coord_label("time", 1).unwrap(), "2023-01-31");
        assert_eq!(sample().coord_label("time", 2).unwrap(), "60");
        assert_eq!(
            decode_cf_time(1.5, "hours since 2000-01-01 00:00:00").as_deref(),
            Some("2000-01-01 01:30:00")
        );
        assert_eq!(decode_cf_time(1.0, "furlongs since 2000-01-01"), None);
    }

    #[test]
    fn min_max_skip_nan() {
        let values = ndarray::arr1(&[f32::NAN, 2.0, -1.0]).into_dyn();
        let a = DataArray::new(values, &["x"]).unwrap();
        assert_eq!(a.min(), Some(-1.0));
        assert_eq!(a.max(), Some(2.0));
    }
}
