use config::SharedCache;
use log::debug;

use std::path::Path;
use std::sync::Arc;

use crate::SpmapError;

pub const AMINO_ACIDS: &[u8; 20] = b"ARNDCQEGHILKMFPSTWYV";
const NO_RESIDUE: u8 = u8::MAX;

const RESIDUE_TABLE: [u8; 256] = build_residue_table();

const fn build_residue_table() -> [u8; 256] {
    let mut table = [NO_RESIDUE; 256];
    let mut i = 0;
    while i < AMINO_ACIDS.len() {
        let upper = AMINO_ACIDS[i];
        table[upper as usize] = i as u8;
        table[upper.to_ascii_lowercase() as usize] = i as u8;
        i += 1;
    }
    table
}

/// position of a residue in the 20-letter alphabet, case-insensitive
#[inline(always)]
pub fn residue_index(residue: u8) -> Option<usize> {
    match RESIDUE_TABLE[residue as usize] {
        NO_RESIDUE => None,
        idx => Some(idx as usize),
    }
}

/// Positional scoring table: cluster x position x amino acid
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    window: usize,
    clusters: usize,
    weights: Vec<f64>,
}

impl Profile {
    pub fn new(window: usize, clusters: usize, weights: Vec<f64>) -> Option<Self> {
        if window == 0 || clusters == 0 || weights.len() != clusters * window * AMINO_ACIDS.len() {
            return None;
        }
        Some(Self {
            window,
            clusters,
            weights,
        })
    }

    /// Parse a profile: `window` consecutive lines per cluster, each line's
    /// last tab-separated field is an `AA,weight,AA,weight,...` list.
    /// Returns `None` when the file holds no complete cluster.
    pub fn parse(contents: &str, window: usize) -> Option<Self> {
        if window == 0 {
            return None;
        }

        let lines: Vec<&str> = contents.lines().collect();
        let clusters = lines.len() / window;
        if clusters == 0 {
            return None;
        }

        let mut weights = vec![0.0; clusters * window * AMINO_ACIDS.len()];
        for (row, line) in lines.iter().take(clusters * window).enumerate() {
            let field = match line.split('\t').filter(|f| !f.trim().is_empty()).last() {
                Some(field) => field,
                None => continue,
            };

            let tokens: Vec<&str> = field.split(',').map(str::trim).collect();
            for pair in tokens.chunks_exact(2) {
                let aa = match pair[0].bytes().next().and_then(residue_index) {
                    Some(aa) => aa,
                    None => continue,
                };
                // WARN: unparsable weights read as zero
                weights[row * AMINO_ACIDS.len() + aa] = pair[1].parse::<f64>().unwrap_or(0.0);
            }
        }

        Self::new(window, clusters, weights)
    }

    /// `Ok(None)` when the profile file is absent or empty
    pub fn from_file<P: AsRef<Path>>(path: P, window: usize) -> Result<Option<Self>, SpmapError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents, window)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SpmapError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn clusters(&self) -> usize {
        self.clusters
    }

    pub fn weight(&self, cluster: usize, position: usize, residue: usize) -> f64 {
        self.cluster(cluster)[position * AMINO_ACIDS.len() + residue]
    }

    /// flat `window x 20` weights of one cluster
    #[inline(always)]
    pub fn cluster(&self, cluster: usize) -> &[f64] {
        let stride = self.window * AMINO_ACIDS.len();
        &self.weights[cluster * stride..(cluster + 1) * stride]
    }
}

/// Profiles keyed by class id, populated first-writer-wins
#[derive(Default)]
pub struct ProfileCache {
    profiles: SharedCache<String, Option<Arc<Profile>>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<P: AsRef<Path>>(
        &self,
        key: &str,
        path: P,
        window: usize,
    ) -> Result<Option<Arc<Profile>>, SpmapError> {
        self.profiles
            .try_get_or_insert_with(&key.to_string(), || {
                let profile = Profile::from_file(path.as_ref(), window)?.map(Arc::new);
                debug!(
                    "Profile for {}: {} clusters",
                    key,
                    profile.as_ref().map_or(0, |p| p.clusters())
                );
                Ok(profile)
            })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residue_index() {
        assert_eq!(residue_index(b'A'), Some(0));
        assert_eq!(residue_index(b'v'), Some(19));
        assert_eq!(residue_index(b'W'), Some(17));
        assert_eq!(residue_index(b'X'), None);
        assert_eq!(residue_index(b'*'), None);
    }

    #[test]
    fn test_parse_profile() {
        let contents = "c1\tp1\tA,1.5,R,-2\nc1\tp2\tW,0.5,X,9,G\nc2\tp1\tV,3\nc2\tp2\tC,oops\nextra";
        let profile = Profile::parse(contents, 2).unwrap();

        assert_eq!(profile.clusters(), 2);
        assert_eq!(profile.window(), 2);
        assert_eq!(profile.weight(0, 0, 0), 1.5);
        assert_eq!(profile.weight(0, 0, 1), -2.0);
        assert_eq!(profile.weight(0, 1, 17), 0.5);
        assert_eq!(profile.weight(1, 0, 19), 3.0);
        assert_eq!(profile.weight(1, 1, 4), 0.0);
        assert_eq!(profile.cluster(1).len(), 40);
    }

    #[test]
    fn test_empty_profile_is_none() {
        assert_eq!(Profile::parse("", 5), None);
        assert_eq!(Profile::parse("A,1\nA,1\n", 5), None);
    }

    #[test]
    fn test_profile_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.txt");
        std::fs::write(&path, "A,1\nR,2\n").unwrap();

        let cache = ProfileCache::new();
        let first = cache.get("1.-.-.-", &path, 2).unwrap().unwrap();
        let second = cache.get("1.-.-.-", &path, 2).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let missing = cache.get("2.-.-.-", dir.path().join("absent.txt"), 2).unwrap();
        assert!(missing.is_none());
        assert_eq!(cache.len(), 2);
    }
}
