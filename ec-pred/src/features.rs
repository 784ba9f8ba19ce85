use config::{SharedCache, VECTOR_EXT};
use ec_spmap::{ProfileCache, ProfileExtractor, SequenceStore};
use ec_svm::{parse_vector_line, FeatureLine, RangeScaler, SparseVector, SvmError};
use hashbrown::HashMap;
use log::warn;

use std::path::PathBuf;
use std::sync::Arc;

use crate::library::{read_optional, Library};
use crate::types::{ClassId, Lookup, Method};
use crate::PipelineError;

pub type Batch = Vec<Option<SparseVector>>;

/// Feature vectors for a batch of proteins under one class
pub trait FeatureProducer: Send + Sync {
    fn method(&self) -> Method;

    /// One entry per protein, `None` where the protein got no vector.
    /// `Missing` when the class has no input for this method, `Empty`
    /// when it has one but no protein produced a vector.
    fn produce(&self, class: &ClassId, proteins: &[String]) -> Result<Lookup<Batch>, PipelineError>;
}

/// In-process spmap vectors from class profiles
pub struct ProfileProducer {
    library: Library,
    sequences: Arc<dyn SequenceStore>,
    profiles: ProfileCache,
    extractor: ProfileExtractor,
}

impl ProfileProducer {
    pub fn new(library: Library, sequences: Arc<dyn SequenceStore>) -> Self {
        Self {
            library,
            sequences,
            profiles: ProfileCache::new(),
            extractor: ProfileExtractor::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: ProfileExtractor) -> Self {
        self.extractor = extractor;
        self
    }
}

impl FeatureProducer for ProfileProducer {
    fn method(&self) -> Method {
        Method::Spmap
    }

    fn produce(&self, class: &ClassId, proteins: &[String]) -> Result<Lookup<Batch>, PipelineError> {
        let profile = match self.profiles.get(
            class.as_str(),
            self.library.profile(class),
            self.extractor.window,
        )? {
            Some(profile) => profile,
            None => return Ok(Lookup::Missing),
        };

        let vectors = proteins
            .iter()
            .map(|id| {
                self.sequences
                    .sequence(id)
                    .and_then(|seq| self.extractor.extract(seq, &profile))
            })
            .collect::<Batch>();

        Ok(non_empty(vectors))
    }
}

/// Vectors written by an external tool to `<features>/<class>/<method>.vec`
pub struct VectorFileProducer {
    method: Method,
    features: PathBuf,
    library: Library,
    scalers: SharedCache<ClassId, Option<Arc<RangeScaler>>>,
}

impl VectorFileProducer {
    pub fn new(method: Method, features: PathBuf, library: Library) -> Self {
        Self {
            method,
            features,
            library,
            scalers: SharedCache::new(),
        }
    }

    pub fn vector_file(&self, class: &ClassId) -> PathBuf {
        self.features
            .join(class.as_str())
            .join(format!("{}.{}", self.method.as_str(), VECTOR_EXT))
    }

    /// pepstats vectors are scaled when the class ships a range file
    fn scaler(&self, class: &ClassId) -> Result<Option<Arc<RangeScaler>>, PipelineError> {
        if self.method != Method::Pepstats {
            return Ok(None);
        }

        self.scalers.try_get_or_insert_with(class, || {
            match RangeScaler::from_file(self.library.range_file(class)) {
                Ok(scaler) => Ok(Some(Arc::new(scaler))),
                Err(SvmError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    Ok(None)
                }
                Err(e) => Err(PipelineError::Svm(e)),
            }
        })
    }
}

impl FeatureProducer for VectorFileProducer {
    fn method(&self) -> Method {
        self.method
    }

    fn produce(&self, class: &ClassId, proteins: &[String]) -> Result<Lookup<Batch>, PipelineError> {
        let path = self.vector_file(class);
        let contents = match read_optional(&path)? {
            Some(contents) => contents,
            None => return Ok(Lookup::Missing),
        };

        let mut lines = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            match parse_vector_line(line) {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => continue,
                Err(e) => {
                    return Err(PipelineError::Malformed {
                        path,
                        line: idx + 1,
                        reason: e.to_string(),
                    })
                }
            }
        }

        if lines.is_empty() {
            return Ok(Lookup::Empty);
        }

        // INFO: untagged files are only trusted when they line up with the batch
        let mut vectors = if lines.iter().any(|l| l.tag.is_some()) {
            by_tag(lines, proteins)
        } else if lines.len() == proteins.len() {
            lines.into_iter().map(|l| Some(l.vector)).collect::<Batch>()
        } else {
            warn!(
                "{:?} holds {} untagged vectors for {} proteins, skipping class {}",
                path,
                lines.len(),
                proteins.len(),
                class
            );
            return Ok(Lookup::Missing);
        };

        if let Some(scaler) = self.scaler(class)? {
            vectors
                .iter_mut()
                .flatten()
                .for_each(|v| *v = scaler.scale(v));
        }

        Ok(non_empty(vectors))
    }
}

fn by_tag(lines: Vec<FeatureLine>, proteins: &[String]) -> Batch {
    let mut tagged: HashMap<String, SparseVector> = HashMap::with_capacity(lines.len());
    for line in lines {
        match line.tag {
            Some(tag) => {
                tagged.entry(tag).or_insert(line.vector);
            }
            None => warn!("Untagged vector in a tagged feature file, skipping"),
        }
    }

    proteins.iter().map(|id| tagged.remove(id)).collect()
}

fn non_empty(vectors: Batch) -> Lookup<Batch> {
    if vectors.iter().all(Option::is_none) {
        Lookup::Empty
    } else {
        Lookup::Found(vectors)
    }
}
