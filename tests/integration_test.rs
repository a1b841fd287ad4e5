//! End-to-end tests: building movies, writing frames, encoding and NetCDF input.
//!
//! Encoder paths run against small shell scripts standing in for ffmpeg (unix only);
//! tests with the real tool return early when it is not installed.

use ndarray::{Array3, ArrayD, IxDyn};
use ru_ne_movie::prelude::*;
use ru_ne_movie::{list_variables, read_dataarray, read_dataset, write_dataarray};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 100;

fn sample() -> DataArray {
    let values = Array3::from_shape_fn((4, 5, 2), |(x, y, t)| (x * y) as f32 + 10.0 * t as f32);
    DataArray::new(values.into_dyn(), &["x", "y", "time"])
        .unwrap()
        .with_coord("time", vec![0.0, 1.0])
        .unwrap()
        .with_coord_attr("time", "units", "days since 2000-01-01")
}

fn small_config() -> MovieConfig {
    MovieConfig::default().with_size(WIDTH, HEIGHT).with_dpi(72)
}

fn png_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_movie_defaults_and_accessors() {
    let movie = Movie::new(sample(), small_config()).unwrap();
    assert_eq!(movie.framedim(), "time");
    assert_eq!(movie.n_frames(), 2);
    assert_eq!(movie.pixelwidth(), WIDTH);
    assert_eq!(movie.pixelheight(), HEIGHT);
    assert_eq!(movie.frame_pattern().as_str(), "frame_%05d.png");
    assert_eq!(movie.output_count(), 2);

    // limits over the whole series
    assert_eq!(movie.kwargs()["vmin"], json!(0.0));
    assert_eq!(movie.kwargs()["vmax"], json!(22.0));

    let config = MovieConfig::default();
    assert_eq!((config.pixelwidth, config.pixelheight, config.dpi), (1920, 1080, 200));
    assert!(config.input_check);
}

#[test]
fn test_wrong_framedim_is_rejected() {
    let err = Movie::new(sample(), small_config().with_framedim("wrong")).unwrap_err();
    assert!(matches!(err, MovieError::DimensionNotFound { .. }));
    assert!(err.is_configuration_error());
}

#[test]
fn test_bad_plotmethod_is_rejected_at_construction() {
    let err = Movie::new(sample(), small_config().with_kwarg("plotmethod", "imshow")).unwrap_err();
    assert!(err.to_string().contains("not recognized as plotmethod"));
}

#[test]
fn test_caller_limits_are_kept() {
    let movie = Movie::new(sample(), small_config().with_kwarg("vmin", -5.0)).unwrap();
    assert_eq!(movie.kwargs()["vmin"], json!(-5.0));
    assert_eq!(movie.kwargs()["vmax"], json!(22.0));
}

#[test]
fn test_limits_not_injected_into_functions_that_do_not_take_them() {
    let func = PlotFn::new("blank", |_data, _fig, _frame, _dim, _kw| Ok(PlotOutput::NoHandles))
        .accepting(&["cmap"]);
    let movie = Movie::new(sample(), small_config().with_plotfunc(func)).unwrap();
    assert!(movie.kwargs().is_empty());
}

#[test]
fn test_dataset_input_check() {
    let ds = Dataset::new()
        .with_var("a", sample())
        .with_var("b", sample());

    let err = Movie::new(ds.clone(), small_config()).unwrap_err();
    assert!(matches!(err, MovieError::UnsupportedInput(_)));

    let movie = Movie::new(ds.clone(), small_config().with_fieldname("b")).unwrap();
    assert!(movie.data().as_array().is_some());

    let err = Movie::new(ds.clone(), small_config().with_fieldname("c")).unwrap_err();
    assert!(matches!(err, MovieError::VariableNotFound { .. }));

    let movie = Movie::new(
        ds,
        small_config()
            .with_input_check(false)
            .with_kwarg("plot_variable", "b"),
    )
    .unwrap();
    assert!(movie.data().as_array().is_none());
}

#[test]
fn test_callback_output_counts() {
    let none = PlotFn::new("none", |_data, _fig, _frame, _dim, _kw| Ok(PlotOutput::NoHandles));
    let movie = Movie::new(sample(), small_config().with_plotfunc(none)).unwrap();
    assert_eq!(movie.output_count(), 0);
    let mut fig = Figure::new(WIDTH, HEIGHT, 72, PlotStyle::default());
    assert_eq!(movie.render_frame(&mut fig, 1).unwrap(), (None, None));

    let legacy = PlotFn::new("legacy", |_data, _fig, _frame, _dim, _kw| {
        Ok(PlotOutput::Unstructured(3))
    });
    let movie = Movie::new(sample(), small_config().with_plotfunc(legacy)).unwrap();
    assert_eq!(movie.output_count(), 3);
    assert_eq!(movie.render_frame(&mut fig, 0).unwrap(), (None, None));

    let movie = Movie::new(sample(), small_config()).unwrap();
    let (axis, plot) = movie.render_frame(&mut fig, 0).unwrap();
    assert_eq!(axis.unwrap().x_dim, "y");
    assert_eq!(plot.unwrap().method, "pcolormesh");
    assert!(movie.render_frame(&mut fig, 2).is_err());
}

#[test]
fn test_preview_has_frame_size() {
    let movie = Movie::new(sample(), small_config().with_kwarg("style", "dark")).unwrap();
    let fig = movie.preview(1).unwrap();
    assert_eq!((fig.width(), fig.height()), (WIDTH, HEIGHT));
    assert_eq!(fig.pixel(0, 0), Some(ru_ne_movie::figure::gray(0.1)));
}

#[test]
fn test_save_frames_for_patterns() {
    for pattern in ["frame_%05d.png", "test%05d.png"] {
        let dir = tempdir().expect("Failed to create temp dir");
        let movie = Movie::new(sample(), small_config().with_frame_pattern(pattern)).unwrap();
        let written = movie.save_frames_serial(dir.path(), false).unwrap();
        assert_eq!(written.len(), 2);

        let files = png_files(dir.path());
        let expected: Vec<PathBuf> = (0..2)
            .map(|i| dir.path().join(movie.frame_pattern().filename(i)))
            .collect();
        assert_eq!(files, expected);

        for file in files {
            let img = image::open(&file).unwrap();
            assert_eq!((img.width(), img.height()), (WIDTH, HEIGHT));
        }
    }
}

#[test]
fn test_jpeg_frames_are_written() {
    let dir = tempdir().unwrap();
    let movie = Movie::new(sample(), small_config().with_frame_pattern("frame_%05d.jpg")).unwrap();
    let written = movie.save_frames_serial(dir.path(), false).unwrap();
    assert_eq!(written, vec![dir.path().join("frame_00000.jpg"), dir.path().join("frame_00001.jpg")]);

    let img = image::open(&written[1]).unwrap();
    assert_eq!((img.width(), img.height()), (WIDTH, HEIGHT));
}

#[test]
fn test_parallel_frames_match_serial() {
    let serial_dir = tempdir().unwrap();
    let parallel_dir = tempdir().unwrap();

    let serial = Movie::new(sample(), small_config()).unwrap();
    serial.save_frames_serial(serial_dir.path(), true).unwrap();

    let chunked = sample().chunk(&[("time", 1)]).unwrap();
    let parallel = Movie::new(chunked, small_config()).unwrap();
    parallel
        .save_frames_parallel(parallel_dir.path(), &ParallelConfig::with_threads(2))
        .unwrap();

    let a = png_files(serial_dir.path());
    let b = png_files(parallel_dir.path());
    assert_eq!(a.len(), 2);
    assert_eq!(
        a.iter().map(|p| p.file_name().unwrap().to_owned()).collect::<Vec<_>>(),
        b.iter().map(|p| p.file_name().unwrap().to_owned()).collect::<Vec<_>>()
    );
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(fs::read(x).unwrap(), fs::read(y).unwrap());
    }
}

#[test]
fn test_parallel_frames_without_coordinate() {
    let dir = tempdir().unwrap();
    let values = Array3::from_shape_fn((4, 5, 3), |(x, y, t)| (x + y * t) as f32);
    let array = DataArray::new(values.into_dyn(), &["x", "y", "time"])
        .unwrap()
        .chunk(&[("time", 1)])
        .unwrap();
    let movie = Movie::new(array, small_config()).unwrap();
    let written = movie
        .save_frames_parallel(dir.path(), &ParallelConfig::with_threads(3))
        .unwrap();
    let expected: Vec<PathBuf> = (0..3)
        .map(|i| dir.path().join(format!("frame_{i:05}.png")))
        .collect();
    assert_eq!(written, expected);
}

#[test]
fn test_parallel_requires_unit_chunks() {
    let dir = tempdir().unwrap();
    let config = ParallelConfig::default();

    let unchunked = Movie::new(sample(), small_config()).unwrap();
    assert!(matches!(
        unchunked.save_frames_parallel(dir.path(), &config),
        Err(MovieError::ChunkingError(_))
    ));

    let wide = Movie::new(sample().chunk(&[("time", 2)]).unwrap(), small_config()).unwrap();
    let err = wide.save_frames_parallel(dir.path(), &config).unwrap_err();
    assert!(err.to_string().contains("chunksize"));
    assert!(png_files(dir.path()).is_empty());
}

#[test]
fn test_netcdf_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("sample.nc");
    let array = sample().with_attr("units", "K");
    write_dataarray(&path, "temperature", &array).unwrap();

    let read = read_dataarray(&path, "temperature").unwrap();
    assert_eq!(read.name(), Some("temperature"));
    assert_eq!(read.dims(), array.dims());
    assert_eq!(read.values(), array.values());
    assert_eq!(read.coord("time").unwrap(), vec![0.0, 1.0]);
    assert_eq!(read.coord_label("time", 1).unwrap(), "2000-01-02");
    assert_eq!(read.attrs().get("units").map(String::as_str), Some("K"));

    let ds = read_dataset(&path, None).unwrap();
    assert_eq!(ds.data_vars(), vec!["temperature"]);

    let vars = list_variables(&path).unwrap();
    let time = vars.iter().find(|v| v.name == "time").unwrap();
    assert!(time.is_coordinate);
    let temp = vars.iter().find(|v| v.name == "temperature").unwrap();
    assert!(temp.has_dimension("time"));
    assert_eq!(temp.total_elements(), 40);

    assert!(matches!(
        read_dataarray(&path, "missing"),
        Err(MovieError::VariableNotFound { .. })
    ));
}

#[test]
fn test_fill_values_become_nan() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("fill.nc");
    {
        let mut file = netcdf::create(&path).expect("Failed to create NetCDF file");
        file.add_dimension("y", 2).unwrap();
        file.add_dimension("x", 2).unwrap();
        let mut var = file.add_variable::<f32>("field", &["y", "x"]).unwrap();
        var.put_attribute("_FillValue", -999.0f32).unwrap();
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0f32, -999.0, 3.0, 4.0]).unwrap();
        var.put(data.view(), ..).unwrap();
    }

    let read = read_dataarray(&path, "field").unwrap();
    assert!(read.values()[IxDyn(&[0, 1])].is_nan());
    assert_eq!(read.min(), Some(1.0));
}

#[cfg(unix)]
mod encoder {
    use super::*;

    /// A stand-in for ffmpeg that reports a version and truncates its output file
    const WORKING: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 9.9-test Copyright (c) 2000-2099"
  exit 0
fi
for last; do :; done
: > "$last"
"#;

    const FAILING: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 9.9-test Copyright (c) 2000-2099"
  exit 0
fi
echo "Unknown encoder" >&2
exit 1
"#;

    const NO_VERSION: &str = "#!/bin/sh\necho 'hello'\n";

    /// Run through `sh` so the script never has to be executable
    fn fake_encoder(dir: &Path, script: &str) -> Ffmpeg {
        let path = dir.join("fake-ffmpeg");
        fs::write(&path, script).unwrap();
        Ffmpeg::new(format!("sh {}", path.display()))
    }

    fn options(encoder: Ffmpeg) -> SaveOptions {
        SaveOptions {
            encoder,
            ..SaveOptions::default()
        }
    }

    #[test]
    fn test_save_movie_removes_frames() {
        let bin = tempdir().unwrap();
        let out = tempdir().unwrap();
        let movie = Movie::new(sample(), small_config()).unwrap();
        let opts = options(fake_encoder(bin.path(), WORKING));

        let report = movie.save(out.path().join("movie.mp4"), &opts).unwrap();
        assert_eq!(report.frames_written, 2);
        assert_eq!(report.movie, Some(out.path().join("movie.mp4")));
        assert!(out.path().join("movie.mp4").exists());
        assert!(png_files(out.path()).is_empty());
        assert!(report.frame_files.is_empty());
    }

    #[test]
    fn test_save_keeps_frames_on_request() {
        let bin = tempdir().unwrap();
        let out = tempdir().unwrap();
        let movie = Movie::new(sample(), small_config()).unwrap();
        let opts = SaveOptions {
            remove_frames: false,
            ..options(fake_encoder(bin.path(), WORKING))
        };

        let report = movie.save(out.path().join("movie.mp4"), &opts).unwrap();
        assert_eq!(png_files(out.path()).len(), 2);
        assert_eq!(report.frame_files.len(), 2);
    }

    #[test]
    fn test_save_gif_goes_through_movie() {
        let bin = tempdir().unwrap();
        let out = tempdir().unwrap();
        let movie = Movie::new(sample(), small_config()).unwrap();

        let opts = options(fake_encoder(bin.path(), WORKING));
        let report = movie.save(out.path().join("anim.gif"), &opts).unwrap();
        assert_eq!(report.gif, Some(out.path().join("anim.gif")));
        assert!(out.path().join("anim.gif").exists());
        assert!(!out.path().join("anim.mp4").exists());
        assert_eq!(report.movie, None);

        let keep = SaveOptions {
            remove_movie: false,
            overwrite_existing: true,
            ..opts
        };
        let report = movie.save(out.path().join("anim.gif"), &keep).unwrap();
        assert_eq!(report.movie, Some(out.path().join("anim.mp4")));
    }

    #[test]
    fn test_existing_output_is_refused_before_rendering() {
        let bin = tempdir().unwrap();
        let out = tempdir().unwrap();
        let movie = Movie::new(sample(), small_config()).unwrap();
        let opts = options(fake_encoder(bin.path(), WORKING));

        for name in ["movie.mp4", "anim.gif"] {
            let target = out.path().join(name);
            fs::write(&target, b"old").unwrap();
            let err = movie.save(&target, &opts).unwrap_err();
            assert!(matches!(err, MovieError::FileExists { .. }));
            assert!(png_files(out.path()).is_empty());
            assert_eq!(fs::read(&target).unwrap(), b"old");
        }

        let overwrite = SaveOptions {
            overwrite_existing: true,
            ..opts
        };
        movie.save(out.path().join("movie.mp4"), &overwrite).unwrap();
        assert!(fs::read(out.path().join("movie.mp4")).unwrap().is_empty());
    }

    #[test]
    fn test_missing_encoder_fails_before_frames() {
        let bin = tempdir().unwrap();
        let out = tempdir().unwrap();
        let movie = Movie::new(sample(), small_config()).unwrap();

        let err = movie
            .save(out.path().join("movie.mp4"), &options(fake_encoder(bin.path(), NO_VERSION)))
            .unwrap_err();
        assert!(matches!(err, MovieError::FfmpegNotFound { .. }));
        assert!(png_files(out.path()).is_empty());

        let err = movie
            .save(
                out.path().join("movie.mp4"),
                &options(Ffmpeg::new("/nonexistent/ffmpeg")),
            )
            .unwrap_err();
        assert!(matches!(err, MovieError::FfmpegNotFound { .. }));
    }

    #[test]
    fn test_failing_encoder_suggests_verbose() {
        let bin = tempdir().unwrap();
        let out = tempdir().unwrap();
        let movie = Movie::new(sample(), small_config()).unwrap();

        let err = movie
            .save(out.path().join("movie.mp4"), &options(fake_encoder(bin.path(), FAILING)))
            .unwrap_err();
        assert!(matches!(err, MovieError::EncoderFailed { .. }));
        assert!(err.to_string().contains("verbose"));
        // frames are only removed after a successful encode
        assert_eq!(png_files(out.path()).len(), 2);
    }
}

fn real_ffmpeg() -> Option<Ffmpeg> {
    let ffmpeg = Ffmpeg::default();
    ffmpeg.check_ffmpeg_version().map(|_| ffmpeg)
}

/// One video stream entry from ffprobe, or `None` when ffprobe is unavailable
fn ffprobe_entry(path: &Path, entry: &str, count_frames: bool) -> Option<String> {
    let mut cmd = std::process::Command::new("ffprobe");
    cmd.args(["-v", "error", "-select_streams", "v:0"]);
    if count_frames {
        cmd.arg("-count_frames");
    }
    let output = cmd
        .args(["-show_entries", &format!("stream={entry}")])
        .args(["-of", "default=nokey=1:noprint_wrappers=1"])
        .arg(path)
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn series(n: usize) -> DataArray {
    let values = Array3::from_shape_fn((4, 5, n), |(x, y, t)| (x * y + t) as f32);
    DataArray::new(values.into_dyn(), &["x", "y", "time"])
        .unwrap()
        .with_coord("time", (0..n).map(|t| t as f64).collect())
        .unwrap()
}

#[test]
fn test_real_ffmpeg_movie_and_gif() {
    use image::AnimationDecoder;

    let Some(ffmpeg) = real_ffmpeg() else {
        eprintln!("ffmpeg not installed, skipping");
        return;
    };
    let out = tempdir().unwrap();
    let movie = Movie::new(series(12), small_config()).unwrap();
    let opts = SaveOptions {
        encoder: ffmpeg,
        ffmpeg_options: "-pix_fmt yuv420p".to_string(),
        framerate: 12,
        gif_framerate: 4,
        remove_movie: false,
        ..SaveOptions::default()
    };

    let report = movie.save(out.path().join("movie.mp4"), &opts).unwrap();
    let mpath = report.movie.unwrap();
    assert!(fs::metadata(&mpath).unwrap().len() > 0);
    assert!(png_files(out.path()).is_empty());

    // every frame lands in the movie at the requested rate
    if let Some(rate) = ffprobe_entry(&mpath, "r_frame_rate", false) {
        assert_eq!(rate, "12/1");
        assert_eq!(ffprobe_entry(&mpath, "nb_read_frames", true).as_deref(), Some("12"));
    }

    let report = movie
        .save(
            out.path().join("movie.gif"),
            &SaveOptions {
                overwrite_existing: true,
                gif_palette: true,
                ..opts
            },
        )
        .unwrap();
    let gpath = report.gif.unwrap();
    let gif = image::open(&gpath).unwrap();
    assert_eq!((gif.width(), gif.height()), (WIDTH / 2, HEIGHT / 2));

    // one second of movie resampled to 4 frames of a quarter second each
    let file = std::io::BufReader::new(fs::File::open(&gpath).unwrap());
    let frames = image::codecs::gif::GifDecoder::new(file)
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert!((3..=5).contains(&frames.len()), "{} gif frames", frames.len());
    let (numer, denom) = frames[0].delay().numer_denom_ms();
    let delay_ms = numer as f64 / denom as f64;
    assert!((delay_ms - 250.0).abs() <= 10.0, "gif frame delay {delay_ms} ms");
}
