//! Core module for profile-based feature extraction
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module turns protein sequences into fixed-length feature vectors
//! by sliding a short window across the sequence and scoring every window
//! against each cluster of a learned positional profile. The best window
//! per cluster is kept, filtered by a significance threshold and mapped
//! to a bounded range before it is handed to the kernel evaluator.
//!
//! Parsed FASTA dictionaries and parsed profiles are cached per file and
//! per class so that thousands of per-protein requests share one parse.

use thiserror::Error;

use std::path::PathBuf;

pub mod core;
pub mod fasta;
pub mod profile;

pub use crate::core::ProfileExtractor;
pub use fasta::{FastaCache, FastaStore, SequenceStore};
pub use profile::{residue_index, Profile, ProfileCache, AMINO_ACIDS};

/// error handling for profile and sequence files
#[derive(Debug, Error)]
pub enum SpmapError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path:?}, line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("{0:?} holds no FASTA records")]
    EmptyFasta(PathBuf),
}
