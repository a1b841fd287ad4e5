//! NetCDF input and output of labeled arrays
//!
//! Variables are read as `f32` with `_FillValue` replaced by NaN. One-dimensional
//! variables named after a dimension are picked up as coordinates together with
//! their `units`, so CF time axes label the frames.

use crate::dataset::{DataArray, Dataset};
use crate::errors::{MovieError, Result};
use chrono::Utc;
use ndarray::{ArrayD, IxDyn};
use netcdf::{create, AttributeValue, File, Variable};
use std::{fs, path::Path};

fn fill_value(var: &Variable) -> Option<f32> {
    var.attribute("_FillValue")
        .and_then(|attr| match attr.value().ok()? {
            AttributeValue::Float(v) => Some(v),
            AttributeValue::Double(v) => Some(v as f32),
            AttributeValue::Short(v) => Some(f32::from(v)),
            AttributeValue::Int(v) => Some(v as f32),
            _ => None,
        })
}

fn string_attribute(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn read_coordinate(file: &File, dim: &str, len: usize) -> Result<Option<(Vec<f64>, Option<String>)>> {
    let Some(var) = file.variable(dim) else {
        return Ok(None);
    };
    let dims = var.dimensions();
    if dims.len() != 1 || dims[0].name() != dim || dims[0].len() != len {
        return Ok(None);
    }
    let values: Vec<f64> = var.get_values::<f64, _>(..)?;
    Ok(Some((values, string_attribute(&var, "units"))))
}

/// Read a variable of an open file as a labeled array
pub fn read_variable(file: &File, var_name: &str) -> Result<DataArray> {
    let var = file
        .variable(var_name)
        .ok_or_else(|| MovieError::VariableNotFound {
            var: var_name.to_string(),
        })?;

    let dims: Vec<String> = var
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let mut values: Vec<f32> = var.get_values::<f32, _>(..)?;
    if let Some(fv) = fill_value(&var) {
        for v in values.iter_mut().filter(|v| **v == fv) {
            *v = f32::NAN;
        }
    }
    let values = ArrayD::from_shape_vec(IxDyn(&shape), values)?;

    let mut array = DataArray::new(values, &dims)?.with_name(var_name);
    for (dim, &len) in dims.iter().zip(&shape) {
        if let Some((coord, units)) = read_coordinate(file, dim, len)? {
            array = array.with_coord(dim, coord)?;
            if let Some(units) = units {
                array = array.with_coord_attr(dim, "units", units);
            }
        }
    }

    for attr in var.attributes().filter(|a| a.name() != "_FillValue") {
        if let Ok(AttributeValue::Str(value)) = attr.value() {
            array = array.with_attr(attr.name(), value);
        }
    }

    log::debug!(
        "read '{}' with dimensions [{}] and shape {:?}",
        var_name,
        dims.join(", "),
        shape
    );
    Ok(array)
}

/// Open `path` and read one variable
pub fn read_dataarray(path: &Path, var_name: &str) -> Result<DataArray> {
    let file = netcdf::open(path)?;
    read_variable(&file, var_name)
}

/// Open `path` and read several variables into a dataset.
///
/// `None` reads every variable that is not a coordinate of a dimension.
pub fn read_dataset(path: &Path, var_names: Option<&[String]>) -> Result<Dataset> {
    let file = netcdf::open(path)?;
    let names: Vec<String> = match var_names {
        Some(names) => names.to_vec(),
        None => {
            let dims: Vec<String> = file.dimensions().map(|d| d.name()).collect();
            file.variables()
                .map(|v| v.name())
                .filter(|name| !dims.contains(name))
                .collect()
        }
    };

    let mut dataset = Dataset::new();
    for name in names {
        let array = read_variable(&file, &name)?;
        dataset = dataset.with_var(name, array);
    }
    Ok(dataset)
}

/// Write a labeled array (with its coordinates) to a new NetCDF file
pub fn write_dataarray(path: &Path, var_name: &str, array: &DataArray) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut file = create(path)?;

    for (dim, &len) in array.dims().iter().zip(array.shape()) {
        file.add_dimension(dim, len)?;
    }

    for dim in array.dims().iter().filter(|d| array.has_coord(d)) {
        let coord = array.coord(dim)?;
        let mut coord_var = file.add_variable::<f64>(dim, &[dim.as_str()])?;
        coord_var.put_values(&coord, ..)?;
        if let Some(units) = array.coord_attr(dim, "units") {
            coord_var.put_attribute("units", units)?;
        }
    }

    let dim_refs: Vec<&str> = array.dims().iter().map(|s| s.as_str()).collect();
    let mut var = file.add_variable::<f32>(var_name, &dim_refs)?;
    var.put_attribute("_FillValue", f32::NAN)?;
    var.put(array.values().view(), ..)?;
    for (key, value) in array.attrs() {
        var.put_attribute(key, value.as_str())?;
    }

    file.add_attribute(
        "history",
        format!("Created by RuNeMovie on {}", Utc::now().to_rfc3339()),
    )?;

    Ok(())
}
