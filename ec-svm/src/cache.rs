use config::SharedCache;
use log::info;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::SvmModel;
use crate::SvmError;

pub type CachedModel = Result<Option<Arc<SvmModel>>, Arc<SvmError>>;

/// Process-wide model cache keyed by model path.
///
/// Each path is loaded at most once; concurrent requests for a path
/// that is still loading wait for that load. A missing file is cached
/// as `None`, a malformed one as the parse error.
#[derive(Default)]
pub struct ModelCache {
    models: SharedCache<PathBuf, CachedModel>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<P: AsRef<Path>>(&self, path: P) -> CachedModel {
        let path = path.as_ref().to_path_buf();
        self.models.get_or_load(&path, || load(&path))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn load(path: &Path) -> CachedModel {
    match SvmModel::from_file(path) {
        Ok(model) => {
            info!("Model {:?} loaded with {} support vectors", path, model.len());
            Ok(Some(Arc::new(model)))
        }
        Err(SvmError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(None)
        }
        Err(e) => Err(Arc::new(e)),
    }
}
