//! Entry point for the RuNeMovie application.
//! Handles CLI parsing, file loading, and turns one NetCDF variable into a movie.

use clap::Parser;
use ru_ne_movie::cli::Args;
use ru_ne_movie::prelude::*;
use ru_ne_movie::{list_variables, print_variables, read_dataarray};
use serde_json::json;
use std::path::Path;

fn pick_variable(file: &Path, framedim: &str) -> Result<String> {
    let candidate = list_variables(file)?
        .into_iter()
        .find(|v| !v.is_coordinate && v.has_dimension(framedim))
        .ok_or_else(|| MovieError::VariableNotFound {
            var: format!("<any variable with dimension '{framedim}'>"),
        })?;
    log::warn!("No variable supplied. Defaults to `{}`", candidate.name);
    Ok(candidate.name)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    println!(
        r#"
------------------------------------------------------------------
      ______      _   _      ___  ___           _
      | ___ \    | \ | |     |  \/  |          (_)
      | |_/ /   _|  \| | ___ | .  . | _____   ___  ___
      |    / | | | . ` |/ _ \| |\/| |/ _ \ \ / / |/ _ \
      | |\ \ |_| | |\  |  __/| |  | | (_) \ V /| |  __/
      \_| \_\__,_\_| \_/\___|\_|  |_/\___/ \_/ |_|\___|
                 Rust-based NetCDF movie maker
------------------------------------------------------------------
"#
    );

    if args.list_vars {
        print_variables(&list_variables(&args.file)?);
        return Ok(());
    }

    let Some(output) = args.output.as_deref() else {
        return Err("--output is required".into());
    };

    let variable = match &args.variable {
        Some(name) => name.clone(),
        None => pick_variable(&args.file, &args.framedim)?,
    };
    let mut array = read_dataarray(&args.file, &variable)?;
    println!(
        "Successfully loaded '{}' from {} with dimensions [{}]",
        variable,
        args.file.display(),
        array.dims().join(", ")
    );

    let parallel_config = ParallelConfig::new(args.threads);
    let parallel = args.parallel || args.threads.is_some();
    if parallel {
        get_parallel_info().print_info();
        array = array.chunk(&[(args.framedim.as_str(), 1)])?;
    }

    let mut style = PlotStyle::default().with_font_size(args.font_size);
    if let Some(font) = &args.font {
        style = style.with_font_file(font)?;
    }

    let mut kwargs = args.kwargs.clone().unwrap_or_default();
    for (key, value) in [
        ("plotmethod", &args.plotmethod),
        ("cmap", &args.cmap),
        ("style", &args.style),
    ] {
        if let Some(value) = value {
            kwargs.insert(key.to_string(), json!(value));
        }
    }

    let config = MovieConfig::default()
        .with_framedim(args.framedim.as_str())
        .with_size(args.width, args.height)
        .with_dpi(args.dpi)
        .with_frame_pattern(args.frame_pattern.as_str())
        .with_kwargs(kwargs)
        .with_unknown_kwargs(if args.strict_kwargs {
            UnknownKwargs::Reject
        } else {
            UnknownKwargs::Warn
        })
        .with_style(style);
    let movie = Movie::new(array, config)?;

    let opts = SaveOptions {
        remove_frames: !args.keep_frames,
        remove_movie: !args.keep_movie,
        progress: args.progress,
        verbose: args.verbose,
        overwrite_existing: args.overwrite,
        parallel,
        parallel_config,
        framerate: args.framerate,
        ffmpeg_options: args.ffmpeg_options.clone(),
        gif_palette: args.gif_palette,
        gif_resolution_factor: args.gif_resolution_factor,
        gif_framerate: args.gif_framerate,
        encoder: Ffmpeg::new(args.ffmpeg.as_str()),
    };

    let report = movie.save(output, &opts)?;
    println!("✅ Rendered {} frames", report.frames_written);
    if let Some(movie) = &report.movie {
        println!("✅ Saved movie to {}", movie.display());
    }
    if let Some(gif) = &report.gif {
        println!("✅ Saved GIF to {}", gif.display());
    }
    if !report.frame_files.is_empty() {
        println!("   {} frame files kept", report.frame_files.len());
    }

    Ok(())
}
