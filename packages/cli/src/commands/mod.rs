pub mod inspect;
pub mod normalize;
pub mod sanitize;

pub use inspect::{inspect, InspectArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use sanitize::{sanitize, SanitizeArgs};

use crate::config::Config;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("No markup files found under {0}")]
    NoFiles(PathBuf),

    #[error("{0} file(s) would change")]
    CheckFailed(usize),
}

/// Resolve the input argument (or the configured source directory) to the
/// list of markup files to process, sorted for stable output.
pub fn collect_inputs(path: Option<&str>, config: &Config, cwd: &Path) -> Result<Vec<PathBuf>, CliError> {
    let root = match path {
        Some(path) => cwd.join(path),
        None => config.get_src_dir(cwd),
    };

    if root.is_file() {
        return Ok(vec![root]);
    }
    if !root.exists() {
        return Err(CliError::MissingPath(root));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && config.matches_extension(path))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(CliError::NoFiles(root));
    }
    tracing::debug!(count = files.len(), root = %root.display(), "Collected inputs");
    Ok(files)
}

/// Where the rewritten version of `input` should be written
pub fn output_path(input: &Path, base: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(out) => {
            let relative = input
                .strip_prefix(base)
                .ok()
                .filter(|rel| !rel.as_os_str().is_empty())
                .or_else(|| input.file_name().map(Path::new))
                .unwrap_or(input);
            out.join(relative)
        }
        None => input.to_path_buf(),
    }
}

pub fn write_output(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Directory that relative output paths are computed from
pub fn input_base(path: Option<&str>, config: &Config, cwd: &Path) -> PathBuf {
    let root = match path {
        Some(path) => cwd.join(path),
        None => config.get_src_dir(cwd),
    };
    if root.is_file() {
        root.parent().map(Path::to_path_buf).unwrap_or(root)
    } else {
        root
    }
}

pub fn display_path(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd).unwrap_or(path).display().to_string()
}
