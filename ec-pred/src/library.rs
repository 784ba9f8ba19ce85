use config::{
    SharedCache, EC_DIR, MODEL, NEGATIVE_REFS, POSITIVE_REFS, PROFILE, RANGE_FILE, SUBCLASS_DIR,
    THRESHOLDS, WEIGHTS,
};
use hashbrown::HashMap;
use log::{debug, info};

use std::path::{Path, PathBuf};

use crate::types::{ClassId, Lookup, Method};
use crate::PipelineError;

/// Paths inside a pre-trained model library
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn class_dir(&self, class: &ClassId) -> PathBuf {
        self.root.join(EC_DIR).join(class.as_str())
    }

    pub fn method_dir(&self, class: &ClassId, method: Method) -> PathBuf {
        self.class_dir(class).join(method.as_str())
    }

    pub fn model(&self, class: &ClassId, method: Method) -> PathBuf {
        self.method_dir(class, method).join(MODEL)
    }

    pub fn positive_refs(&self, class: &ClassId, method: Method) -> PathBuf {
        self.method_dir(class, method).join(POSITIVE_REFS)
    }

    pub fn negative_refs(&self, class: &ClassId, method: Method) -> PathBuf {
        self.method_dir(class, method).join(NEGATIVE_REFS)
    }

    pub fn profile(&self, class: &ClassId) -> PathBuf {
        self.method_dir(class, Method::Spmap).join(PROFILE)
    }

    pub fn range_file(&self, class: &ClassId) -> PathBuf {
        self.method_dir(class, Method::Pepstats).join(RANGE_FILE)
    }

    pub fn weights(&self, class: &ClassId) -> PathBuf {
        self.class_dir(class).join(WEIGHTS)
    }

    pub fn thresholds(&self) -> PathBuf {
        self.root.join(SUBCLASS_DIR).join(THRESHOLDS)
    }

    pub fn children(&self, class: &ClassId) -> PathBuf {
        self.root
            .join(SUBCLASS_DIR)
            .join(format!("{}.txt", class.as_str()))
    }
}

/// Read a file that may legitimately be absent
pub fn read_optional(path: &Path) -> Result<Option<String>, PipelineError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Per-class decision thresholds, `classId<TAB>value` per line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
    values: HashMap<ClassId, f64>,
}

impl Thresholds {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| PipelineError::ThresholdTable {
                path: path.to_path_buf(),
                source,
            })?;

        let thresholds = Self::parse(&contents, path)?;
        info!("{} class thresholds read from {:?}", thresholds.len(), path);

        Ok(thresholds)
    }

    pub fn parse(contents: &str, path: &Path) -> Result<Self, PipelineError> {
        let mut values = HashMap::new();

        for (idx, line) in contents.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let class = match fields.next() {
                Some(class) => class,
                None => continue,
            };

            let value = fields
                .next()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .ok_or_else(|| PipelineError::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("expected a threshold for {}", class),
                })?;

            values.insert(ClassId::new(class), value);
        }

        Ok(Self { values })
    }

    pub fn insert(&mut self, class: ClassId, value: f64) {
        self.values.insert(class, value);
    }

    pub fn get(&self, class: &ClassId) -> Option<f64> {
        self.values.get(class).copied()
    }

    pub fn require(&self, class: &ClassId) -> Result<f64, PipelineError> {
        self.get(class)
            .ok_or_else(|| PipelineError::MissingThreshold(class.clone()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fusion weights of one class in `Method::FUSION_ORDER`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights([f64; 3]);

impl FusionWeights {
    pub fn new(weights: [f64; 3]) -> Self {
        Self(weights)
    }

    /// First three non-blank lines, one float each
    pub fn parse(contents: &str, path: &Path) -> Result<Self, PipelineError> {
        let mut weights = [0.0; 3];
        let mut lines = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        for (slot, method) in weights.iter_mut().zip(Method::FUSION_ORDER) {
            let (idx, line) = lines.next().ok_or_else(|| PipelineError::Malformed {
                path: path.to_path_buf(),
                line: contents.lines().count() + 1,
                reason: format!("missing {} weight", method),
            })?;

            *slot = line
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|w| w.is_finite())
                .ok_or_else(|| PipelineError::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("cannot parse {} weight from {:?}", method, line),
                })?;
        }

        Ok(Self(weights))
    }

    pub fn weight(&self, method: Method) -> f64 {
        match method {
            Method::Spmap => self.0[0],
            Method::Blast => self.0[1],
            Method::Pepstats => self.0[2],
        }
    }

    /// Linear combination of the method scores; `None` unless every
    /// method produced a score.
    pub fn fuse<F>(&self, score: F) -> Option<f64>
    where
        F: Fn(Method) -> Option<f64>,
    {
        Method::FUSION_ORDER
            .iter()
            .map(|method| score(*method).map(|s| s * self.weight(*method)))
            .sum()
    }
}

/// Read-only class tables the pipeline consults
pub trait ClassTables: Send + Sync {
    fn threshold(&self, class: &ClassId) -> Result<f64, PipelineError>;
    fn weights(&self, class: &ClassId) -> Result<Lookup<FusionWeights>, PipelineError>;
    fn children(&self, class: &ClassId) -> Result<Lookup<Vec<ClassId>>, PipelineError>;
}

/// Class tables backed by a library directory; weights and child lists
/// are read on first use and kept for the whole run.
pub struct LibraryTables {
    library: Library,
    thresholds: Thresholds,
    weights: SharedCache<ClassId, Lookup<FusionWeights>>,
    children: SharedCache<ClassId, Lookup<Vec<ClassId>>>,
}

impl LibraryTables {
    pub fn new(library: Library, thresholds: Thresholds) -> Self {
        Self {
            library,
            thresholds,
            weights: SharedCache::new(),
            children: SharedCache::new(),
        }
    }

    /// a missing or unreadable threshold table is fatal
    pub fn load(library: Library) -> Result<Self, PipelineError> {
        let thresholds = Thresholds::load(library.thresholds())?;
        Ok(Self::new(library, thresholds))
    }

    pub fn library(&self) -> &Library {
        &self.library
    }
}

impl ClassTables for LibraryTables {
    fn threshold(&self, class: &ClassId) -> Result<f64, PipelineError> {
        self.thresholds.require(class)
    }

    fn weights(&self, class: &ClassId) -> Result<Lookup<FusionWeights>, PipelineError> {
        self.weights.try_get_or_insert_with(class, || {
            let path = self.library.weights(class);
            match read_optional(&path)? {
                None => Ok(Lookup::Missing),
                Some(contents) if contents.trim().is_empty() => Ok(Lookup::Empty),
                Some(contents) => FusionWeights::parse(&contents, &path).map(Lookup::Found),
            }
        })
    }

    fn children(&self, class: &ClassId) -> Result<Lookup<Vec<ClassId>>, PipelineError> {
        self.children.try_get_or_insert_with(class, || {
            let path = self.library.children(class);
            let contents = match read_optional(&path)? {
                Some(contents) => contents,
                None => {
                    debug!("No subclass list for {} at {:?}", class, path);
                    return Ok(Lookup::Missing);
                }
            };

            let children = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ClassId::new)
                .collect::<Vec<_>>();

            if children.is_empty() {
                Ok(Lookup::Empty)
            } else {
                Ok(Lookup::Found(children))
            }
        })
    }
}
