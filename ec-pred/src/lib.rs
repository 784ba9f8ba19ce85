//! Core module for EC number prediction
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module predicts the enzymatic function of protein sequences by
//! walking the Enzyme Commission hierarchy with pre-trained kernel
//! classifiers. Every protein is first scored against the six main
//! classes; proteins that land confidently on one of them descend into
//! its subclasses, one level at a time, until a level has no confident
//! candidate or the hierarchy ends.
//!
//! Scores come from up to three feature pipelines (spmap, blast and
//! pepstats). Each raw kernel score is calibrated against reference
//! score distributions of the class, and in weighted mode the three
//! calibrated scores are fused with fixed per-class weights before any
//! threshold is applied. Work is spread over three worker pools (protein,
//! method and class level) sharing read-only model, profile and sequence
//! caches.

use anyhow::Result;
use clap::Parser;
use thiserror::Error;

use std::path::PathBuf;
use std::sync::Arc;

use ec_spmap::SpmapError;
use ec_svm::SvmError;

pub mod calibrate;
pub mod cli;
pub mod core;
pub mod features;
pub mod library;
pub mod pipeline;
pub mod scheduler;
pub mod scorer;
pub mod types;
pub mod utils;

pub use types::{ClassId, Decision, Lookup, Method, Mode, PredictionRecord};

/// error handling for the prediction pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No threshold registered for class {0}")]
    MissingThreshold(ClassId),
    #[error("Cannot read threshold table {path:?}: {source}")]
    ThresholdTable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path:?}, line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("Malformed model: {0}")]
    Model(#[from] Arc<SvmError>),
    #[error(transparent)]
    Svm(#[from] SvmError),
    #[error(transparent)]
    Spmap(#[from] SpmapError),
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn lib_ecpred(args: Vec<String>) -> Result<()> {
    let args = cli::Args::try_parse_from(args)?;
    crate::core::predict_enzymes(args)
}
