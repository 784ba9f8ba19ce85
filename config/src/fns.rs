use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{EC_DIR, SUBCLASS_DIR, THRESHOLDS};

const FASTA_EXTENSIONS: [&str; 4] = ["fa", "fasta", "faa", "fas"];

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new(length);

    match ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
    {
        Ok(style) => progress_bar.set_style(style),
        Err(e) => log::warn!("Falling back to default progress style: {}", e),
    }

    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write rows to a file, or to stdout when no path is given
pub fn write_rows<T: AsRef<str>>(rows: &[T], output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => {
            log::info!("Rows in {:?}: {}. Writing...", path, rows.len());
            let f = File::create(path)?;
            let mut writer = BufWriter::new(f);
            emit(rows, &mut writer)
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            emit(rows, &mut writer)
        }
    }
}

fn emit<T: AsRef<str>, W: Write>(rows: &[T], writer: &mut W) -> Result<(), CliError> {
    for row in rows {
        writeln!(writer, "{}", row.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}

/// argument checker for the prediction entry point
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        validate(self.get_input())?;
        validate_library(self.get_library())?;

        if self.needs_features() {
            match self.get_features() {
                Some(dir) => validate_dir(dir)?,
                None => {
                    let err = "--features is required for blast, pepstats and weighted runs";
                    return Err(CliError::InvalidInput(err.to_string()));
                }
            }
        } else if self.get_features().is_some() {
            log::warn!("Feature directory provided but not used by this method. Skipping...");
        }

        Ok(())
    }

    fn get_input(&self) -> &PathBuf;
    fn get_library(&self) -> &PathBuf;
    fn get_features(&self) -> Option<&PathBuf>;
    fn needs_features(&self) -> bool;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation for the input FASTA file
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    match arg.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if FASTA_EXTENSIONS.contains(&ext) => (),
        _ => {
            return Err(CliError::InvalidInput(format!(
                "ERROR: file {:?} is not a FASTA file",
                arg
            )))
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

pub fn validate_dir(arg: &Path) -> Result<(), CliError> {
    if !arg.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a directory",
            arg
        )));
    }
    Ok(())
}

/// a model library needs the EC tree and the shared threshold table
pub fn validate_library(arg: &Path) -> Result<(), CliError> {
    validate_dir(arg)?;
    validate_dir(&arg.join(EC_DIR))?;

    let thresholds = arg.join(SUBCLASS_DIR).join(THRESHOLDS);
    if !thresholds.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: threshold table {:?} is missing",
            thresholds
        )));
    }

    Ok(())
}
