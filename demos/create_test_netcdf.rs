//! Creates a sample NetCDF file for trying out RuNeMovie.
//!
//! The file holds a travelling warm anomaly on a lat × lon grid over 24 daily
//! time steps, with CF time units so that frame titles show dates.

use ndarray::Array3;
use ru_ne_movie::dataset::DataArray;
use ru_ne_movie::write_dataarray;
use std::f32::consts::PI;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = Path::new("test_data.nc");

    println!("🔨 Creating test NetCDF file: {}", output_path.display());

    let (nt, nlat, nlon) = (24, 36, 72);
    let values = Array3::from_shape_fn((nt, nlat, nlon), |(t, j, i)| {
        let lat = -87.5 + 5.0 * j as f32;
        let lon = 2.5 + 5.0 * i as f32;
        let centre = 360.0 * t as f32 / nt as f32;
        let dlon = ((lon - centre + 540.0) % 360.0) - 180.0;
        let base = 300.0 - 40.0 * (lat * PI / 180.0).sin().powi(2);
        base + 15.0 * (-(dlon / 30.0).powi(2) - (lat / 20.0).powi(2)).exp()
    });

    let array = DataArray::new(values.into_dyn(), &["time", "lat", "lon"])?
        .with_coord("time", (0..nt).map(|t| t as f64).collect())?
        .with_coord_attr("time", "units", "days since 2023-01-01")
        .with_coord("lat", (0..nlat).map(|j| -87.5 + 5.0 * j as f64).collect())?
        .with_coord_attr("lat", "units", "degrees_north")
        .with_coord("lon", (0..nlon).map(|i| 2.5 + 5.0 * i as f64).collect())?
        .with_coord_attr("lon", "units", "degrees_east")
        .with_attr("units", "K")
        .with_attr("long_name", "air temperature");

    write_dataarray(output_path, "temperature", &array)?;

    println!("✅ Successfully created test NetCDF file with:");
    println!("   📏 Dimensions: time({nt}), lat({nlat}), lon({nlon})");
    println!("   📈 Variables: time, lat, lon, temperature");
    println!("\n🎬 Make a movie with:");
    println!("   cargo run -- -f test_data.nc -n temperature -o temperature.mp4");
    println!("   cargo run -- -f test_data.nc -o temperature.gif --style dark --parallel");

    Ok(())
}
