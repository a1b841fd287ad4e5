//! NetCDF variable listing for choosing what to animate

use crate::errors::Result;
use netcdf::{AttributeValue, File, Variable};
use std::path::Path;

/// Structured metadata for a NetCDF variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMetadata {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<DimensionInfo>,
    pub units: Option<String>,
    pub long_name: Option<String>,
    /// True for 1-D variables that label their own dimension
    pub is_coordinate: bool,
}

/// Information about a dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

impl VariableMetadata {
    pub fn total_elements(&self) -> usize {
        self.dimensions.iter().map(|d| d.length).product()
    }

    /// Whether `dim` could serve as the frame dimension of this variable
    pub fn has_dimension(&self, dim: &str) -> bool {
        self.dimensions.iter().any(|d| d.name == dim)
    }
}

fn str_attribute(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn describe(var: &Variable) -> VariableMetadata {
    let dimensions: Vec<DimensionInfo> = var
        .dimensions()
        .iter()
        .map(|d| DimensionInfo {
            name: d.name().to_string(),
            length: d.len(),
            is_unlimited: d.is_unlimited(),
        })
        .collect();
    let name = var.name().to_string();
    let is_coordinate = dimensions.len() == 1 && dimensions[0].name == name;

    VariableMetadata {
        data_type: format!("{:?}", var.vartype()).to_lowercase(),
        units: str_attribute(var, "units"),
        long_name: str_attribute(var, "long_name"),
        dimensions,
        is_coordinate,
        name,
    }
}

/// Metadata of every variable in an open file, sorted by name
pub fn variables_of(file: &File) -> Vec<VariableMetadata> {
    let mut variables: Vec<VariableMetadata> = file.variables().map(|v| describe(&v)).collect();
    variables.sort_by(|a, b| a.name.cmp(&b.name));
    variables
}

/// Open `path` and list its variables
pub fn list_variables(path: &Path) -> Result<Vec<VariableMetadata>> {
    let file = netcdf::open(path)?;
    Ok(variables_of(&file))
}

/// Print variables in a clean, organized format
pub fn print_variables(variables: &[VariableMetadata]) {
    println!("\n Variables");
    println!("=============");

    if variables.is_empty() {
        println!("   (No variables found)");
        return;
    }

    for var in variables {
        let dims: Vec<&str> = var.dimensions.iter().map(|d| d.name.as_str()).collect();
        let shape: Vec<String> = var
            .dimensions
            .iter()
            .map(|d| {
                if d.is_unlimited {
                    format!("{} (unlimited)", d.length)
                } else {
                    d.length.to_string()
                }
            })
            .collect();

        if dims.is_empty() {
            println!("    {} ({}): scalar", var.name, var.data_type);
        } else {
            let role = if var.is_coordinate { " [coordinate]" } else { "" };
            println!(
                "    {} ({}): [{}] = ({}){}",
                var.name,
                var.data_type,
                dims.join(", "),
                shape.join(" × "),
                role
            );
        }

        let key_attrs: Vec<String> = [("units", &var.units), ("long_name", &var.long_name)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {v}")))
            .collect();
        if !key_attrs.is_empty() {
            println!("      └─ {}", key_attrs.join(", "));
        }
    }

    println!("\n💡 Tip: Use --variable <name> --framedim <dimension> to animate a variable");
}
