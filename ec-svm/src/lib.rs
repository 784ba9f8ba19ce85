//! Core module for in-process SVM inference
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module scores sparse feature vectors against pre-trained
//! SVMlight models without spawning `svm_classify`. Models are parsed
//! once, validated line by line and cached for the lifetime of the run;
//! every worker evaluates against the same immutable model.
//!
//! Kernels (linear, polynomial, RBF and sigmoid) work directly on sparse
//! vectors with ascending indices through a single two-pointer merge,
//! which keeps evaluation linear in the number of non-zero features.

use thiserror::Error;

use std::path::PathBuf;

pub mod cache;
pub mod kernel;
pub mod model;
pub mod scale;
pub mod vector;

pub use cache::ModelCache;
pub use kernel::Kernel;
pub use model::{SupportVector, SvmModel};
pub use scale::RangeScaler;
pub use vector::{parse_vector_line, FeatureLine, SparseVector, VectorError};

/// error handling for model, vector and range files
#[derive(Debug, Error)]
pub enum SvmError {
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
    #[error("{path:?}: unexpected end of file at line {line}, expected {expected}")]
    Truncated {
        path: PathBuf,
        line: usize,
        expected: &'static str,
    },
    #[error("{path:?}: unknown kernel type {kind}")]
    UnknownKernel { path: PathBuf, kind: i64 },
    #[error("{path:?}: header declares {declared} support vectors but {read} were read")]
    CountMismatch {
        path: PathBuf,
        declared: usize,
        read: usize,
    },
}
