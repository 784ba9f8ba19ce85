//! libsvm `svm-scale -r` replacement for pepstats vectors.

use hashbrown::HashMap;

use std::path::Path;

use crate::vector::SparseVector;
use crate::SvmError;

/// Feature scaling parameters read from a libsvm range file
#[derive(Debug, Clone, PartialEq)]
pub struct RangeScaler {
    lower: f64,
    upper: f64,
    ranges: Vec<(u32, f64, f64)>,
}

impl RangeScaler {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SvmError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SvmError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents, path)
    }

    pub fn parse(contents: &str, path: &Path) -> Result<Self, SvmError> {
        let malformed = |line: usize, reason: &str| SvmError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: reason.to_string(),
        };

        let mut lines = contents
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (mut line_no, mut section) = lines.next().ok_or_else(|| SvmError::Truncated {
            path: path.to_path_buf(),
            line: 1,
            expected: "range section header",
        })?;

        // INFO: target scaling section is not used for classification
        if section == "y" {
            for _ in 0..2 {
                lines.next();
            }
            (line_no, section) = lines.next().ok_or_else(|| SvmError::Truncated {
                path: path.to_path_buf(),
                line: line_no + 3,
                expected: "x section",
            })?;
        }

        if section != "x" {
            return Err(malformed(line_no, "expected 'x' section header"));
        }

        let (bounds_line, bounds) = lines.next().ok_or_else(|| SvmError::Truncated {
            path: path.to_path_buf(),
            line: line_no + 1,
            expected: "scaling bounds",
        })?;

        let (lower, upper) = parse_pair(bounds)
            .ok_or_else(|| malformed(bounds_line, "cannot parse scaling bounds"))?;

        let mut ranges = HashMap::new();
        for (line_no, line) in lines {
            let mut fields = line.split_whitespace();
            let index = fields.next().and_then(|f| f.parse::<u32>().ok());
            let min = fields.next().and_then(|f| f.parse::<f64>().ok());
            let max = fields.next().and_then(|f| f.parse::<f64>().ok());

            match (index, min, max) {
                (Some(index), Some(min), Some(max)) => {
                    ranges.insert(index, (min, max));
                }
                _ => return Err(malformed(line_no, "expected 'index min max'")),
            }
        }

        let mut ranges = ranges
            .into_iter()
            .map(|(index, (min, max))| (index, min, max))
            .collect::<Vec<_>>();
        ranges.sort_unstable_by_key(|&(index, _, _)| index);

        Ok(Self {
            lower,
            upper,
            ranges,
        })
    }

    /// Scale a vector the way `svm-scale -r` does: every listed index is
    /// emitted (absent features scale as 0), exact min/max map to the
    /// bounds, anything else is extrapolated linearly. Features without
    /// spread or without a range are dropped and zero results are omitted.
    pub fn scale(&self, vector: &SparseVector) -> SparseVector {
        let mut indices = Vec::with_capacity(self.ranges.len());
        let mut values = Vec::with_capacity(self.ranges.len());
        let mut input = vector.iter().peekable();

        for &(index, min, max) in &self.ranges {
            while input.next_if(|&(i, _)| i < index).is_some() {}
            let value = input.next_if(|&(i, _)| i == index).map_or(0.0, |(_, v)| v);

            if min == max {
                continue;
            }

            let scaled = if value == min {
                self.lower
            } else if value == max {
                self.upper
            } else {
                self.lower + (self.upper - self.lower) * (value - min) / (max - min)
            };

            if scaled != 0.0 {
                indices.push(index);
                values.push(scaled);
            }
        }

        SparseVector::from_sorted(indices, values)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let mut fields = line.split_whitespace();
    let a = fields.next()?.parse::<f64>().ok()?;
    let b = fields.next()?.parse::<f64>().ok()?;
    Some((a, b))
}
