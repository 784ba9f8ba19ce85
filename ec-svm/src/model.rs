use log::debug;

use std::iter::Enumerate;
use std::path::{Path, PathBuf};
use std::str::{FromStr, Lines};

use crate::kernel::Kernel;
use crate::vector::{parse_features, SparseVector};
use crate::SvmError;

/// A support vector with its `label * alpha` coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct SupportVector {
    pub coefficient: f64,
    pub features: SparseVector,
}

/// An immutable, pre-trained SVMlight model
#[derive(Debug, Clone, PartialEq)]
pub struct SvmModel {
    kernel: Kernel,
    threshold: f64,
    max_feature_index: u32,
    support_vectors: Vec<SupportVector>,
}

impl SvmModel {
    pub fn new(kernel: Kernel, threshold: f64, support_vectors: Vec<SupportVector>) -> Self {
        let max_feature_index = support_vectors
            .iter()
            .filter_map(|sv| sv.features.max_index())
            .max()
            .unwrap_or(0);

        Self {
            kernel,
            threshold,
            max_feature_index,
            support_vectors,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SvmError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SvmError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let model = Self::parse(&contents, path)?;
        debug!(
            "Loaded {:?}: {:?} kernel, {} support vectors",
            path,
            model.kernel,
            model.len()
        );

        Ok(model)
    }

    /// Parse an SVMlight model. Header lines are read up to their `#`
    /// comment; every support vector line must be well formed.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, SvmError> {
        let mut header = Header {
            lines: contents.lines().enumerate(),
            path,
            line: 0,
        };

        header.skip("version line")?;
        let code: i64 = header.value("kernel type")?;
        let degree: i32 = header.value("polynomial degree")?;
        let gamma = header.finite("gamma")?;
        header.skip("parameter -s")?;
        let coef0 = header.finite("coef0")?;
        header.skip("parameter -u")?;
        let max_feature_index: u32 = header.value("highest feature index")?;
        header.skip("number of training documents")?;
        // WARN: SVMlight stores the number of support vectors plus one
        let declared = header.value::<usize>("number of support vectors")?;
        let threshold = header.finite("threshold")?;

        let kernel =
            Kernel::from_code(code, degree, gamma, coef0).ok_or_else(|| SvmError::UnknownKernel {
                path: path.to_path_buf(),
                kind: code,
            })?;

        let declared = declared.saturating_sub(1);
        let mut support_vectors = Vec::with_capacity(declared);

        for (idx, line) in header.lines {
            let body = strip_comment(line).trim();
            if body.is_empty() {
                continue;
            }

            let malformed = |reason: String| SvmError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                reason,
            };

            let mut tokens = body.split_whitespace();
            let coefficient = tokens
                .next()
                .and_then(|alpha| alpha.parse::<f64>().ok())
                .filter(|alpha| alpha.is_finite())
                .ok_or_else(|| malformed("cannot parse support vector coefficient".into()))?;

            let features = parse_features(tokens).map_err(|e| malformed(e.to_string()))?;

            support_vectors.push(SupportVector {
                coefficient,
                features,
            });
        }

        if support_vectors.len() != declared {
            return Err(SvmError::CountMismatch {
                path: path.to_path_buf(),
                declared,
                read: support_vectors.len(),
            });
        }

        Ok(Self {
            kernel,
            threshold,
            max_feature_index,
            support_vectors,
        })
    }

    /// Σ coefficient * K(sv, x) - b
    #[inline(always)]
    pub fn decision(&self, x: &SparseVector) -> f64 {
        let mut sum = 0.0;
        for sv in &self.support_vectors {
            sum += sv.coefficient * self.kernel.eval(&sv.features, x);
        }
        sum - self.threshold
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_feature_index(&self) -> u32 {
        self.max_feature_index
    }

    pub fn support_vectors(&self) -> &[SupportVector] {
        &self.support_vectors
    }

    pub fn len(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.support_vectors.is_empty()
    }
}

struct Header<'a> {
    lines: Enumerate<Lines<'a>>,
    path: &'a Path,
    line: usize,
}

impl<'a> Header<'a> {
    fn field(&mut self, expected: &'static str) -> Result<(usize, &'a str), SvmError> {
        let (idx, line) = self.lines.next().ok_or_else(|| SvmError::Truncated {
            path: self.path.to_path_buf(),
            line: self.line + 1,
            expected,
        })?;

        self.line = idx + 1;
        Ok((self.line, strip_comment(line).trim()))
    }

    fn skip(&mut self, expected: &'static str) -> Result<(), SvmError> {
        self.field(expected).map(|_| ())
    }

    fn value<T: FromStr>(&mut self, expected: &'static str) -> Result<T, SvmError> {
        let (line, field) = self.field(expected)?;
        field.parse::<T>().map_err(|_| SvmError::Malformed {
            path: self.path_buf(),
            line,
            reason: format!("cannot parse {} from {:?}", expected, field),
        })
    }

    fn finite(&mut self, expected: &'static str) -> Result<f64, SvmError> {
        let value: f64 = self.value(expected)?;
        if !value.is_finite() {
            return Err(SvmError::Malformed {
                path: self.path_buf(),
                line: self.line,
                reason: format!("{} is not a finite number", expected),
            });
        }
        Ok(value)
    }

    fn path_buf(&self) -> PathBuf {
        self.path.to_path_buf()
    }
}

#[inline(always)]
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINEAR: &str = "SVM-light Version V6.02
0 # kernel type
3 # kernel parameter -d
1 # kernel parameter -g
1 # kernel parameter -s
1 # kernel parameter -r
empty# kernel parameter -u
4 # highest feature index
10 # number of training documents
3 # number of support vectors plus 1
0.5 # threshold b, each following line is a SV (starting with alpha*y)
1 1:1 3:2 #
-0.5 2:1 4:1 #
";

    fn model_text(kernel: &str, svs: &str, count: usize) -> String {
        LINEAR
            .replacen("0 # kernel type", &format!("{} # kernel type", kernel), 1)
            .replacen(
                "3 # number of support vectors plus 1",
                &format!("{} # number of support vectors plus 1", count),
                1,
            )
            .split("1 1:1 3:2 #")
            .next()
            .unwrap()
            .to_string()
            + svs
    }

    #[test]
    fn test_parse_linear_model() {
        let model = SvmModel::parse(LINEAR, Path::new("model.svm")).unwrap();

        assert_eq!(model.kernel(), Kernel::Linear);
        assert_eq!(model.threshold(), 0.5);
        assert_eq!(model.max_feature_index(), 4);
        assert_eq!(model.len(), 2);
        assert_eq!(model.support_vectors()[1].coefficient, -0.5);

        let x = SparseVector::from_pairs([(1, 1.0), (2, 2.0)]).unwrap();
        // 1 * 1 + (-0.5) * 2 - 0.5
        assert_eq!(model.decision(&x), -0.5);
    }

    #[test]
    fn test_unknown_kernel_is_rejected() {
        let text = model_text("7", "1 1:1 #\n-0.5 2:1 #\n", 3);
        assert!(matches!(
            SvmModel::parse(&text, Path::new("m.svm")),
            Err(SvmError::UnknownKernel { kind: 7, .. })
        ));
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let text = model_text("0", "1 1:1 #\n", 3);
        assert!(matches!(
            SvmModel::parse(&text, Path::new("m.svm")),
            Err(SvmError::CountMismatch {
                declared: 2,
                read: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_line_names_line_number() {
        let text = model_text("0", "1 1:1 #\n-0.5 4:1 2:1 #\n", 3);
        match SvmModel::parse(&text, Path::new("m.svm")) {
            Err(SvmError::Malformed { line, .. }) => assert_eq!(line, 13),
            other => panic!("expected malformed error, got {:?}", other),
        }

        let text = model_text("0", "1 1:1 #\nalpha 2:1 #\n", 3);
        assert!(matches!(
            SvmModel::parse(&text, Path::new("m.svm")),
            Err(SvmError::Malformed { line: 13, .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let text = "SVM-light Version V6.02\n2 # kernel type\n";
        assert!(matches!(
            SvmModel::parse(text, Path::new("m.svm")),
            Err(SvmError::Truncated { line: 3, .. })
        ));

        let bad_gamma = LINEAR.replacen("1 # kernel parameter -g", "inf # kernel parameter -g", 1);
        assert!(matches!(
            SvmModel::parse(&bad_gamma, Path::new("m.svm")),
            Err(SvmError::Malformed { line: 4, .. })
        ));
    }

    #[test]
    fn test_reload_is_bit_identical() {
        let text = model_text("2", "0.7 1:0.25 2:1.5 #\n-1.3 2:0.5 3:2 #\n", 3);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();

        let first = SvmModel::from_file(file.path()).unwrap();
        let second = SvmModel::from_file(file.path()).unwrap();

        let x = SparseVector::from_pairs([(1, 0.3), (3, 1.1)]).unwrap();
        assert_eq!(first.decision(&x).to_bits(), second.decision(&x).to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            SvmModel::from_file("/nonexistent/model.svm"),
            Err(SvmError::Io { .. })
        ));
    }
}
