use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VectorError {
    #[error("{indices} indices but {values} values")]
    LengthMismatch { indices: usize, values: usize },
    #[error("index {index} at position {position} does not follow {previous}")]
    Unordered {
        position: usize,
        previous: u32,
        index: u32,
    },
    #[error("cannot parse feature token {0:?}")]
    BadToken(String),
    #[error("non-finite value in feature token {0:?}")]
    NonFinite(String),
    #[error("missing label token")]
    MissingLabel,
}

/// Sparse vector with strictly ascending indices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f64>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f64>) -> Result<Self, VectorError> {
        if indices.len() != values.len() {
            return Err(VectorError::LengthMismatch {
                indices: indices.len(),
                values: values.len(),
            });
        }

        for (position, pair) in indices.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(VectorError::Unordered {
                    position: position + 1,
                    previous: pair[0],
                    index: pair[1],
                });
            }
        }

        Ok(Self { indices, values })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, VectorError>
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        let (indices, values) = pairs.into_iter().unzip();
        Self::new(indices, values)
    }

    /// caller guarantees strictly ascending indices
    pub(crate) fn from_sorted(indices: Vec<u32>, values: Vec<f64>) -> Self {
        debug_assert_eq!(indices.len(), values.len());
        debug_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
        Self { indices, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn max_index(&self) -> Option<u32> {
        self.indices.last().copied()
    }

    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    /// merge-based dot product, O(n1 + n2)
    #[inline(always)]
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (a_idx, a_val) = (&self.indices, &self.values);
        let (b_idx, b_val) = (&other.indices, &other.values);

        let mut sum = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < a_idx.len() && j < b_idx.len() {
            match a_idx[i].cmp(&b_idx[j]) {
                std::cmp::Ordering::Equal => {
                    sum += a_val[i] * b_val[j];
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }

        sum
    }

    /// merge-based squared euclidean distance, O(n1 + n2)
    #[inline(always)]
    pub fn squared_distance(&self, other: &SparseVector) -> f64 {
        let (a_idx, a_val) = (&self.indices, &self.values);
        let (b_idx, b_val) = (&other.indices, &other.values);

        let mut dist = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < a_idx.len() && j < b_idx.len() {
            match a_idx[i].cmp(&b_idx[j]) {
                std::cmp::Ordering::Equal => {
                    let diff = a_val[i] - b_val[j];
                    dist += diff * diff;
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    dist += a_val[i] * a_val[i];
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    dist += b_val[j] * b_val[j];
                    j += 1;
                }
            }
        }

        // INFO: tails only present in one vector
        dist += a_val[i..].iter().map(|v| v * v).sum::<f64>();
        dist += b_val[j..].iter().map(|v| v * v).sum::<f64>();

        dist
    }
}

/// parse `idx:val` tokens into a sparse vector
pub fn parse_features<'a, I>(tokens: I) -> Result<SparseVector, VectorError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut indices = Vec::new();
    let mut values = Vec::new();

    for token in tokens {
        let (index, value) = token
            .split_once(':')
            .ok_or_else(|| VectorError::BadToken(token.to_string()))?;

        let index = index
            .parse::<u32>()
            .map_err(|_| VectorError::BadToken(token.to_string()))?;
        let value = value
            .parse::<f64>()
            .map_err(|_| VectorError::BadToken(token.to_string()))?;

        if !value.is_finite() {
            return Err(VectorError::NonFinite(token.to_string()));
        }

        indices.push(index);
        values.push(value);
    }

    SparseVector::new(indices, values)
}

/// One line of a feature-vector file: `label idx:val ... [# tag]`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLine {
    pub label: String,
    pub vector: SparseVector,
    pub tag: Option<String>,
}

/// Parse a feature-vector line; blank lines yield `None`.
pub fn parse_vector_line(line: &str) -> Result<Option<FeatureLine>, VectorError> {
    let (body, tag) = match line.split_once('#') {
        Some((body, comment)) => {
            let comment = comment.trim();
            (body, (!comment.is_empty()).then(|| comment.to_string()))
        }
        None => (line, None),
    };

    let mut tokens = body.split_whitespace();
    let label = match tokens.next() {
        Some(label) => label.to_string(),
        None if tag.is_none() => return Ok(None),
        None => return Err(VectorError::MissingLabel),
    };

    let vector = parse_features(tokens)?;

    Ok(Some(FeatureLine { label, vector, tag }))
}
