use ec_svm::ModelCache;
use log::warn;

use std::sync::Arc;

use crate::calibrate::{ReferenceCache, ReferenceScores};
use crate::features::FeatureProducer;
use crate::library::Library;
use crate::types::{ClassId, Lookup, Method};
use crate::PipelineError;

/// Calibrated confidences of one method for a batch of proteins
pub trait MethodScorer: Send + Sync {
    fn method(&self) -> Method;

    /// One entry per protein, `None` where this method has no score.
    /// Only configuration errors are returned; per-class gaps are
    /// logged and come back as `None`.
    fn score(&self, class: &ClassId, proteins: &[String]) -> Result<Vec<Option<f64>>, PipelineError>;
}

/// Scores features with the class SVM model and calibrates them
pub struct SvmScorer {
    producer: Box<dyn FeatureProducer>,
    library: Library,
    models: Arc<ModelCache>,
    references: Arc<ReferenceCache>,
}

impl SvmScorer {
    pub fn new(
        producer: Box<dyn FeatureProducer>,
        library: Library,
        models: Arc<ModelCache>,
        references: Arc<ReferenceCache>,
    ) -> Self {
        Self {
            producer,
            library,
            models,
            references,
        }
    }
}

impl MethodScorer for SvmScorer {
    fn method(&self) -> Method {
        self.producer.method()
    }

    fn score(&self, class: &ClassId, proteins: &[String]) -> Result<Vec<Option<f64>>, PipelineError> {
        let method = self.method();
        let skipped = || vec![None; proteins.len()];

        let model = match self.models.get(self.library.model(class, method))? {
            Some(model) => model,
            None => {
                warn!("No {} model for {}, skipping class", method, class);
                return Ok(skipped());
            }
        };

        let references = match self.references.get(&self.library, class, method) {
            Ok(Lookup::Found(references)) => references,
            Ok(Lookup::Empty) => {
                warn!(
                    "Empty {} references for {}, using logistic confidence",
                    method, class
                );
                Arc::new(ReferenceScores::default())
            }
            Ok(Lookup::Missing) => {
                warn!("No {} references for {}, skipping class", method, class);
                return Ok(skipped());
            }
            Err(e) => {
                warn!("Unusable {} references for {}: {}. Skipping...", method, class, e);
                return Ok(skipped());
            }
        };

        let vectors = match self.producer.produce(class, proteins) {
            Ok(Lookup::Found(vectors)) => vectors,
            Ok(Lookup::Empty) => {
                warn!("Empty {} features for {}, skipping class", method, class);
                return Ok(skipped());
            }
            Ok(Lookup::Missing) => {
                warn!("No {} features for {}, skipping class", method, class);
                return Ok(skipped());
            }
            Err(e @ PipelineError::Malformed { .. }) => {
                warn!("{}. Skipping {} for {}...", e, method, class);
                return Ok(skipped());
            }
            Err(e) => return Err(e),
        };

        Ok(vectors
            .iter()
            .map(|v| v.as_ref().map(|x| references.confidence(model.decision(x))))
            .collect())
    }
}
