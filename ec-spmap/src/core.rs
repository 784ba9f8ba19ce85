use config::{MIN_SUBSEQUENCE_COUNT, SIGNIFICANCE_THRESHOLD, SUBSEQUENCE_LENGTH};
use ec_svm::SparseVector;

use crate::profile::{residue_index, Profile, AMINO_ACIDS};

/// Sliding-window extractor over a positional profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileExtractor {
    pub window: usize,
    pub significance: f64,
    pub min_length: usize,
}

impl Default for ProfileExtractor {
    fn default() -> Self {
        Self {
            window: SUBSEQUENCE_LENGTH,
            significance: SIGNIFICANCE_THRESHOLD,
            min_length: MIN_SUBSEQUENCE_COUNT,
        }
    }
}

impl ProfileExtractor {
    pub fn new(window: usize, significance: f64, min_length: usize) -> Self {
        Self {
            window,
            significance,
            min_length,
        }
    }

    /// Best window score per cluster. Windows holding a residue outside
    /// the alphabet are skipped; clusters never updated stay at -inf.
    /// `None` when the sequence is too short or has no valid window.
    pub fn best_window_scores(&self, sequence: &str, profile: &Profile) -> Option<Vec<f64>> {
        let seq = sequence.as_bytes();
        let k = profile.window();
        if k != self.window || seq.len() < k || seq.len() < self.min_length {
            return None;
        }

        let mut best = vec![f64::NEG_INFINITY; profile.clusters()];
        let mut residues = vec![0usize; k];
        let mut seen = false;

        'windows: for start in 0..=seq.len() - k {
            for (offset, slot) in residues.iter_mut().enumerate() {
                match residue_index(seq[start + offset]) {
                    Some(idx) => *slot = idx,
                    None => continue 'windows,
                }
            }
            seen = true;

            for (cluster, score) in best.iter_mut().enumerate() {
                let weights = profile.cluster(cluster);
                let sum = residues
                    .iter()
                    .enumerate()
                    .map(|(pos, &aa)| weights[pos * AMINO_ACIDS.len() + aa])
                    .sum::<f64>();

                if sum > *score {
                    *score = sum;
                }
            }
        }

        seen.then_some(best)
    }

    /// Feature vector for one sequence: indices are 1-based cluster
    /// numbers, insignificant clusters are zero and omitted, the rest
    /// map to `exp(score / k)`.
    pub fn extract(&self, sequence: &str, profile: &Profile) -> Option<SparseVector> {
        let best = self.best_window_scores(sequence, profile)?;
        let k = self.window as f64;

        let pairs = best
            .into_iter()
            .enumerate()
            .filter(|(_, score)| score.is_finite() && *score >= self.significance)
            .map(|(cluster, score)| ((cluster + 1) as u32, (score / k).exp()));

        SparseVector::from_pairs(pairs).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // cluster 1 rewards A, cluster 2 rewards W and punishes A
    fn profile() -> Profile {
        let mut contents = String::new();
        for _ in 0..5 {
            contents.push_str("c1\tA,1.0,W,-10\n");
        }
        for _ in 0..5 {
            contents.push_str("c2\tW,2.0,A,-4\n");
        }
        Profile::parse(&contents, 5).unwrap()
    }

    #[test]
    fn test_best_window_is_max_pooled() {
        let extractor = ProfileExtractor::default();
        let scores = extractor
            .best_window_scores("AAAAAWWWWW", &profile())
            .unwrap();

        // best A window scores 5, best W window scores 10
        assert_eq!(scores, vec![5.0, 10.0]);
    }

    #[test]
    fn test_invalid_windows_are_skipped() {
        let extractor = ProfileExtractor::default();
        let scores = extractor
            .best_window_scores("AAAAXAAAAXAAAAA", &profile())
            .unwrap();
        assert_eq!(scores[0], 5.0);

        assert_eq!(extractor.best_window_scores("AAAAXAAAAX", &profile()), None);
    }

    #[test]
    fn test_short_sequences_yield_nothing() {
        let extractor = ProfileExtractor::default();
        assert_eq!(extractor.extract("AAAA", &profile()), None);
        // window fits but below the informative length
        assert_eq!(extractor.extract("AAAAA", &profile()), None);
        assert!(extractor.extract("AAAAAA", &profile()).is_some());
    }

    #[test]
    fn test_extract_thresholds_and_transforms() {
        let extractor = ProfileExtractor::default();

        let v = extractor.extract(&"A".repeat(50), &profile()).unwrap();
        // cluster 2 scores -20 on poly-A and drops out
        assert_eq!(v.indices(), &[1]);
        assert!((v.values()[0] - 1.0f64.exp()).abs() < 1e-12);

        let v = extractor.extract(&"w".repeat(50), &profile()).unwrap();
        assert_eq!(v.indices(), &[2]);
        assert!((v.values()[0] - 2.0f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_all_insignificant_is_empty_vector() {
        let contents = "W,-10\n".repeat(5);
        let profile = Profile::parse(&contents, 5).unwrap();
        let v = ProfileExtractor::default()
            .extract(&"W".repeat(50), &profile)
            .unwrap();

        assert!(v.is_empty());
    }
}
