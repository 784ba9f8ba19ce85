use crate::vector::SparseVector;

/// Kernel functions supported by SVMlight models
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Linear,
    Polynomial { degree: i32, gamma: f64, coef0: f64 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    /// map the SVMlight `-t` code and its parameters to a kernel
    pub fn from_code(code: i64, degree: i32, gamma: f64, coef0: f64) -> Option<Self> {
        match code {
            0 => Some(Kernel::Linear),
            1 => Some(Kernel::Polynomial {
                degree,
                gamma,
                coef0,
            }),
            2 => Some(Kernel::Rbf { gamma }),
            3 => Some(Kernel::Sigmoid { gamma, coef0 }),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Kernel::Linear => 0,
            Kernel::Polynomial { .. } => 1,
            Kernel::Rbf { .. } => 2,
            Kernel::Sigmoid { .. } => 3,
        }
    }

    #[inline(always)]
    pub fn eval(&self, a: &SparseVector, b: &SparseVector) -> f64 {
        match *self {
            Kernel::Linear => a.dot(b),
            Kernel::Polynomial {
                degree,
                gamma,
                coef0,
            } => (gamma * a.dot(b) + coef0).powi(degree),
            Kernel::Rbf { gamma } => (-gamma * a.squared_distance(b)).exp(),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * a.dot(b) + coef0).tanh(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn vector(pairs: &[(u32, f64)]) -> SparseVector {
        SparseVector::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_rbf_bounds() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let gamma = rng.gen_range(0.001..2.0);
            let kernel = Kernel::Rbf { gamma };

            let a = vector(&[(1, rng.gen_range(-3.0..3.0)), (5, rng.gen_range(-3.0..3.0))]);
            let b = vector(&[(2, rng.gen_range(-3.0..3.0)), (5, rng.gen_range(-3.0..3.0))]);

            let value = kernel.eval(&a, &b);
            assert!(value > 0.0 && value <= 1.0);
            assert_eq!(kernel.eval(&a, &a), 1.0);
        }
    }

    #[test]
    fn test_kernel_values() {
        let a = vector(&[(1, 1.0), (3, 2.0)]);
        let b = vector(&[(1, 0.5), (2, 4.0), (3, 1.0)]);
        // dot = 0.5 + 2.0
        assert_eq!(Kernel::Linear.eval(&a, &b), 2.5);

        let poly = Kernel::Polynomial {
            degree: 2,
            gamma: 2.0,
            coef0: 1.0,
        };
        assert_eq!(poly.eval(&a, &b), 36.0);

        let sigmoid = Kernel::Sigmoid {
            gamma: 0.0,
            coef0: 0.0,
        };
        assert_eq!(sigmoid.eval(&a, &b), 0.0);

        // dist = 0.25 + 16 + 1
        let rbf = Kernel::Rbf { gamma: 0.1 };
        assert!((rbf.eval(&a, &b) - (-1.725f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_codes() {
        for code in 0..4 {
            let kernel = Kernel::from_code(code, 3, 0.5, 1.0).unwrap();
            assert_eq!(kernel.code(), code);
        }
        assert_eq!(Kernel::from_code(4, 3, 0.5, 1.0), None);
        assert_eq!(Kernel::from_code(-1, 3, 0.5, 1.0), None);
    }
}
