use config::{SharedCache, MAX_ID_LENGTH};
use hashbrown::HashMap;
use log::{info, warn};
use memchr::{memchr, memchr_iter};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::SpmapError;

const FA_NEEDLE: u8 = b'>';

/// Residue lookup by protein id
pub trait SequenceStore: Send + Sync {
    fn sequence(&self, id: &str) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq)]
struct FastaRecord {
    id: String,
    header: String,
    sequence: String,
}

/// An ordered FASTA dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FastaStore {
    records: Vec<FastaRecord>,
    index: HashMap<String, usize>,
}

impl FastaStore {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SpmapError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| SpmapError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::parse(&data);
        if store.is_empty() {
            return Err(SpmapError::EmptyFasta(path.to_path_buf()));
        }

        info!("{} sequences read from {:?}", store.len(), path);
        Ok(store)
    }

    /// Records start at a `>` opening a line; anything before the first
    /// header is ignored. Duplicate ids keep their first sequence.
    pub fn parse(data: &[u8]) -> Self {
        let headers: Vec<usize> = memchr_iter(FA_NEEDLE, data)
            .filter(|&pos| pos == 0 || data[pos - 1] == b'\n')
            .collect();

        let mut store = Self::default();
        for (i, &start) in headers.iter().enumerate() {
            let end = headers.get(i + 1).copied().unwrap_or(data.len());
            let record = &data[start + 1..end];

            let (header, body) = match memchr(b'\n', record) {
                Some(nl) => (&record[..nl], &record[nl + 1..]),
                None => (record, &record[record.len()..]),
            };

            let header = String::from_utf8_lossy(header);
            let id = normalize_id(&header);
            if store.index.contains_key(&id) {
                warn!("Duplicate protein id {}, keeping the first record", id);
                continue;
            }

            let sequence = body
                .iter()
                .filter(|b| !b.is_ascii_whitespace())
                .map(|&b| b as char)
                .collect::<String>();

            store.index.insert(id.clone(), store.records.len());
            store.records.push(FastaRecord {
                id,
                header: header.trim_end().chars().take(MAX_ID_LENGTH).collect(),
                sequence,
            });
        }

        store
    }

    /// ids in file order
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.id.as_str())
    }

    /// header line as written, without `>` and cut to `MAX_ID_LENGTH` characters
    pub fn header(&self, id: &str) -> Option<&str> {
        self.index
            .get(id)
            .map(|&idx| self.records[idx].header.as_str())
    }

    /// ids in file order whose sequence has at least `min_length` residues
    pub fn included_ids(&self, min_length: usize) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.sequence.len() >= min_length)
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SequenceStore for FastaStore {
    fn sequence(&self, id: &str) -> Option<&str> {
        self.index
            .get(id)
            .map(|&idx| self.records[idx].sequence.as_str())
    }
}

/// header text without `/` or whitespace, at most `MAX_ID_LENGTH` characters
pub fn normalize_id(header: &str) -> String {
    header
        .chars()
        .filter(|c| *c != '/' && !c.is_whitespace())
        .take(MAX_ID_LENGTH)
        .collect()
}

/// Parsed FASTA files keyed by path, populated first-writer-wins
#[derive(Default)]
pub struct FastaCache {
    stores: SharedCache<PathBuf, Arc<FastaStore>>,
}

impl FastaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<P: AsRef<Path>>(&self, path: P) -> Result<Arc<FastaStore>, SpmapError> {
        let path = path.as_ref().to_path_buf();
        self.stores
            .try_get_or_insert_with(&path, || FastaStore::from_file(&path).map(Arc::new))
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
