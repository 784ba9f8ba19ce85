//! Raw score to confidence mapping.
//!
//! A raw kernel score `s` is placed inside the reference score
//! distributions recorded for the class: `a` is the fraction of negative
//! references below `s` and `b` the fraction of positive references above
//! it. The confidence is `a / (a + b)`; one-sided references fall back to
//! `1 - b` or `a`, and a class without references falls back to a
//! logistic curve.

use config::SharedCache;
use log::debug;

use std::path::Path;
use std::sync::Arc;

use crate::library::{read_optional, Library};
use crate::types::{ClassId, Lookup, Method};
use crate::PipelineError;

/// Sorted positive and negative reference scores of one class model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceScores {
    positives: Vec<f64>,
    negatives: Vec<f64>,
}

impl ReferenceScores {
    pub fn new(mut positives: Vec<f64>, mut negatives: Vec<f64>) -> Self {
        positives.sort_by(f64::total_cmp);
        negatives.sort_by(f64::total_cmp);
        Self {
            positives,
            negatives,
        }
    }

    /// Both files absent is `Missing`; present but without any score is
    /// `Empty`. A single absent file leaves that side empty.
    pub fn load<P: AsRef<Path>>(
        positives: P,
        negatives: P,
    ) -> Result<Lookup<ReferenceScores>, PipelineError> {
        let pos = read_optional(positives.as_ref())?;
        let neg = read_optional(negatives.as_ref())?;

        if pos.is_none() && neg.is_none() {
            return Ok(Lookup::Missing);
        }

        let positives = match pos {
            Some(contents) => parse_scores(&contents, positives.as_ref())?,
            None => Vec::new(),
        };
        let negatives = match neg {
            Some(contents) => parse_scores(&contents, negatives.as_ref())?,
            None => Vec::new(),
        };

        if positives.is_empty() && negatives.is_empty() {
            return Ok(Lookup::Empty);
        }

        Ok(Lookup::Found(Self::new(positives, negatives)))
    }

    pub fn confidence(&self, score: f64) -> f64 {
        calibrate(score, &self.positives, &self.negatives)
    }

    pub fn positives(&self) -> &[f64] {
        &self.positives
    }

    pub fn negatives(&self) -> &[f64] {
        &self.negatives
    }
}

fn parse_scores(contents: &str, path: &Path) -> Result<Vec<f64>, PipelineError> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            line.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PipelineError::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("cannot parse reference score {:?}", line),
                })
        })
        .collect()
}

/// Confidence of `score` against ascending reference lists
pub fn calibrate(score: f64, positives: &[f64], negatives: &[f64]) -> f64 {
    let beaten = |refs: &[f64]| refs.partition_point(|&n| n < score) as f64 / refs.len() as f64;
    let above = |refs: &[f64]| {
        (refs.len() - refs.partition_point(|&p| p <= score)) as f64 / refs.len() as f64
    };

    match (positives.is_empty(), negatives.is_empty()) {
        (false, false) => {
            let a = beaten(negatives);
            let b = above(positives);
            if a + b == 0.0 {
                0.5
            } else {
                a / (a + b)
            }
        }
        (false, true) => 1.0 - above(positives),
        (true, false) => beaten(negatives),
        (true, true) => 1.0 / (1.0 + (-score).exp()),
    }
}

pub type CachedReferences = Result<Lookup<Arc<ReferenceScores>>, Arc<PipelineError>>;

/// Reference scores keyed by class and method, loaded at most once
#[derive(Default)]
pub struct ReferenceCache {
    references: SharedCache<(ClassId, Method), CachedReferences>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, library: &Library, class: &ClassId, method: Method) -> CachedReferences {
        self.references
            .get_or_load(&(class.clone(), method), || {
                let refs = ReferenceScores::load(
                    library.positive_refs(class, method),
                    library.negative_refs(class, method),
                )
                .map_err(Arc::new)?;

                if let Lookup::Found(ref scores) = refs {
                    debug!(
                        "{} {} references: {} positive, {} negative",
                        class,
                        method,
                        scores.positives.len(),
                        scores.negatives.len()
                    );
                }

                Ok(refs.map(Arc::new))
            })
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}
