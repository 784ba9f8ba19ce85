//! Shared configuration for ecpred-rs
//!
//! Universal constants, library file names, argument checks and the
//! concurrent caches used by every crate in the workspace.

pub mod cache;
pub mod fns;

pub use cache::SharedCache;
pub use fns::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const MIN_THREADS: usize = 1;
pub const METHOD_LEVEL_THREADS: usize = 3; // blast, spmap, pepstats
pub const NON_ENZYME_THRESHOLD: f64 = 0.4;
pub const MIN_PROTEIN_LENGTH: usize = 40;
pub const MAX_ID_LENGTH: usize = 80;
pub const MAX_CASCADE_DEPTH: usize = 3;

// spmap
pub const SUBSEQUENCE_LENGTH: usize = 5;
pub const SIGNIFICANCE_THRESHOLD: f64 = -15.0;
pub const MIN_SUBSEQUENCE_COUNT: usize = 6;

// hierarchy roots
pub const MAIN_CLASSES: [&str; 6] = [
    "1.-.-.-", "2.-.-.-", "3.-.-.-", "4.-.-.-", "5.-.-.-", "6.-.-.-",
];

// library layout
pub const EC_DIR: &str = "EC";
pub const SUBCLASS_DIR: &str = "subclasses";
pub const THRESHOLDS: &str = "thresholds.txt";
pub const MODEL: &str = "model.svm";
pub const POSITIVE_REFS: &str = "ppreds.txt";
pub const NEGATIVE_REFS: &str = "npreds.txt";
pub const PROFILE: &str = "profile.txt";
pub const RANGE_FILE: &str = "rangefile";
pub const WEIGHTS: &str = "weights.txt";
pub const VECTOR_EXT: &str = "vec";

// report
pub const REPORT_HEADER: &str = "Protein ID\tEC Number\tConfidence Score(max 1.0)";
pub const NON_ENZYME_LABEL: &str = "non Enzyme";
pub const NO_PREDICTION_LABEL: &str = "no Prediction";
