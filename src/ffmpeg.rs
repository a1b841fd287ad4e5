//! Encoding frames with the external `ffmpeg` tool
//!
//! Commands are assembled as single shell lines so that the option string can be
//! passed through verbatim, then run through the platform shell. Before anything
//! is executed the tool must report a parseable version; a missing encoder is a
//! hard error, never a silent skip.

use crate::errors::{MovieError, Result};
use crate::frames::FramePattern;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default codec/quality flags for video output
pub const DEFAULT_FFMPEG_OPTIONS: &str = "-c:v libx264 -preset veryslow -crf 10 -pix_fmt yuv420p";

/// Two-pass palette filter for higher quality GIFs
pub const GIF_PALETTE_FILTER: &str =
    r#"-filter_complex "[0:v] split [a][b];[a] palettegen [p];[b][p] paletteuse""#;

/// Output of a finished shell command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub command: String,
    /// Combined stdout and stderr
    pub output: String,
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(format!("{command} 2>&1"));
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(format!("({command}) 2>&1"));
        cmd
    }
}

/// Run `command` through the shell, failing on a non-zero exit status.
///
/// With `verbose` the output is echoed line by line while the command runs.
pub fn execute_command(command: &str, verbose: bool) -> Result<CommandOutput> {
    log::debug!("executing: {command}");
    let mut child = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut output = String::new();
    let read = match child.stdout.take() {
        Some(stdout) => collect_output(stdout, verbose, &mut output),
        None => Ok(()),
    };
    // the child is reaped even when its output could not be read
    let status = child.wait()?;
    if let Err(e) = read {
        log::warn!("Could not read output of '{command}': {e}");
    }

    if !status.success() {
        log::debug!("output of failed command:\n{output}");
        return Err(MovieError::CommandFailed {
            command: command.to_string(),
            status: status.to_string(),
        });
    }

    Ok(CommandOutput {
        command: command.to_string(),
        output,
    })
}

/// Read output line by line until EOF, replacing invalid UTF-8.
fn collect_output(stdout: impl Read, verbose: bool, output: &mut String) -> std::io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        if verbose {
            println!("{line}");
        }
        output.push_str(line);
        output.push('\n');
    }
}

/// Settings for [`Ffmpeg::write_movie`], filled in from `SaveOptions`
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub framerate: u32,
    pub ffmpeg_options: String,
    pub remove_frames: bool,
    pub verbose: bool,
}

/// Settings for [`Ffmpeg::convert_gif`]
#[derive(Debug, Clone, PartialEq)]
pub struct GifSettings {
    pub gif_palette: bool,
    pub resolution: (u32, u32),
    pub gif_framerate: u32,
    pub remove_movie: bool,
    pub verbose: bool,
}

/// Handle on the ffmpeg executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ffmpeg {
    program: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }
}

impl Ffmpeg {
    /// Use a specific executable (name on PATH, full path or shell prefix)
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Version string reported by `<program> -version`, `None` if not usable.
    ///
    /// Runs through the shell like every encoder command, so `program` may carry
    /// a launcher prefix.
    pub fn check_ffmpeg_version(&self) -> Option<String> {
        let output = shell(&format!("{} -version", self.program))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_version(&String::from_utf8_lossy(&output.stdout))
    }

    /// Shell line that encodes `sourcefolder/<pattern>` into `sourcefolder/moviename`
    pub fn combine_ffmpeg_command(
        &self,
        sourcefolder: &Path,
        moviename: &str,
        frame_pattern: &FramePattern,
        framerate: u32,
        ffmpeg_options: &str,
    ) -> String {
        // -y: existing files are checked by the caller before any work starts
        format!(
            r#"{} -r {} -i "{}" -y {} -r {} "{}""#,
            self.program,
            framerate,
            sourcefolder.join(frame_pattern.as_str()).display(),
            ffmpeg_options,
            framerate,
            sourcefolder.join(moviename).display()
        )
    }

    /// Shell line that converts a movie into a looping GIF
    pub fn combine_gif_command(&self, mpath: &Path, gpath: &Path, settings: &GifSettings) -> String {
        let palette_filter = if settings.gif_palette {
            GIF_PALETTE_FILTER
        } else {
            ""
        };
        format!(
            r#"{} -y -i "{}" {} -r {} -s {}x{} "{}""#,
            self.program,
            mpath.display(),
            palette_filter,
            settings.gif_framerate,
            settings.resolution.0,
            settings.resolution.1,
            gpath.display()
        )
    }

    /// Fail unless the encoder is installed and reports its version
    pub fn require(&self) -> Result<String> {
        self.check_ffmpeg_version()
            .ok_or_else(|| MovieError::FfmpegNotFound {
                program: self.program.clone(),
            })
    }

    /// Run an encoder command, with an actionable error when it fails
    pub fn check_ffmpeg_execute(&self, command: &str, verbose: bool) -> Result<CommandOutput> {
        let version = self.require()?;
        log::debug!("using {} version {}", self.program, version);
        execute_command(command, verbose).map_err(|e| match e {
            MovieError::CommandFailed { command, .. } => MovieError::EncoderFailed { command },
            other => other,
        })
    }

    /// Encode the numbered frames in `sourcefolder` into `sourcefolder/moviename`
    pub fn write_movie(
        &self,
        sourcefolder: &Path,
        moviename: &str,
        frame_pattern: &FramePattern,
        settings: &EncodeSettings,
    ) -> Result<PathBuf> {
        let command = self.combine_ffmpeg_command(
            sourcefolder,
            moviename,
            frame_pattern,
            settings.framerate,
            &settings.ffmpeg_options,
        );
        self.check_ffmpeg_execute(&command, settings.verbose)?;

        let path = sourcefolder.join(moviename);
        log::info!("Movie created at {}", path.display());

        if settings.remove_frames {
            remove_frames(sourcefolder, frame_pattern)?;
        }
        Ok(path)
    }

    /// Convert a movie into a looping GIF at `gpath`
    pub fn convert_gif(&self, mpath: &Path, gpath: &Path, settings: &GifSettings) -> Result<PathBuf> {
        let command = self.combine_gif_command(mpath, gpath, settings);
        self.check_ffmpeg_execute(&command, settings.verbose)?;
        log::info!("GIF created at {}", gpath.display());

        if settings.remove_movie && mpath.exists() {
            if let Err(e) = fs::remove_file(mpath) {
                log::warn!("Could not remove movie {}: {}", mpath.display(), e);
            }
        }
        Ok(gpath.to_path_buf())
    }
}

fn parse_version(output: &str) -> Option<String> {
    let start = output.find("version ")? + "version ".len();
    let rest = &output[start..];
    let end = rest.find(" Copyright")?;
    let version = rest[..end].trim();
    (!version.is_empty()).then(|| version.to_string())
}

/// Delete every frame file in `sourcefolder` written with `frame_pattern`.
///
/// Returns how many files were removed; failures to delete are only warned about.
pub fn remove_frames(sourcefolder: &Path, frame_pattern: &FramePattern) -> Result<usize> {
    log::debug!(
        "removing {} from {}",
        frame_pattern.glob(),
        sourcefolder.display()
    );
    let entries = match fs::read_dir(sourcefolder) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Could not list frames in {}: {}", sourcefolder.display(), e);
            return Ok(0);
        }
    };
    let mut removed = 0;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                log::warn!("Could not read frame entry: {e}");
                continue;
            }
        };
        let is_frame = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| frame_pattern.matches(name));
        if !is_frame {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("Could not remove frame {}: {}", path.display(), e),
        }
    }
    log::debug!("removed {removed} frame files");
    Ok(removed)
}
