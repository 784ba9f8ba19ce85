use clap::ValueEnum;

use std::fmt;

use config::MAIN_CLASSES;

/// An EC class code such as `3.-.-.-` or `3.4.21.-`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(String);

impl ClassId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// top-level classes in their fixed order
    pub fn main_classes() -> Vec<ClassId> {
        MAIN_CLASSES.iter().map(|c| ClassId::new(*c)).collect()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Feature pipeline feeding one family of models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Spmap,
    Blast,
    Pepstats,
}

impl Method {
    /// line order of a class `weights.txt`
    pub const FUSION_ORDER: [Method; 3] = [Method::Spmap, Method::Blast, Method::Pepstats];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Spmap => "spmap",
            Method::Blast => "blast",
            Method::Pepstats => "pepstats",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Blast,
    Spmap,
    Pepstats,
    Weighted,
}

impl Mode {
    pub fn methods(&self) -> Vec<Method> {
        match self {
            Mode::Blast => vec![Method::Blast],
            Mode::Spmap => vec![Method::Spmap],
            Mode::Pepstats => vec![Method::Pepstats],
            Mode::Weighted => Method::FUSION_ORDER.to_vec(),
        }
    }

    pub fn is_fused(&self) -> bool {
        matches!(self, Mode::Weighted)
    }

    /// blast and pepstats vectors come from external tools
    pub fn needs_features(&self) -> bool {
        self.methods().iter().any(|m| *m != Method::Spmap)
    }
}

/// Outcome of one hierarchy level for one protein
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    NonEnzyme { confidence: f64 },
    NoPrediction,
    Classified { class: ClassId, confidence: f64 },
}

impl Decision {
    pub fn is_classified(&self) -> bool {
        matches!(self, Decision::Classified { .. })
    }

    pub fn class(&self) -> Option<&ClassId> {
        match self {
            Decision::Classified { class, .. } => Some(class),
            _ => None,
        }
    }
}

/// Per-protein decisions, main class first, then one per subclass level
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    decisions: Vec<Decision>,
}

impl PredictionRecord {
    pub fn new(main: Decision) -> Self {
        Self {
            decisions: vec![main],
        }
    }

    pub fn push(&mut self, decision: Decision) {
        self.decisions.push(decision);
    }

    pub fn main(&self) -> &Decision {
        &self.decisions[0]
    }

    pub fn last(&self) -> &Decision {
        self.decisions.last().unwrap_or(self.main())
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// subclass levels attempted so far
    pub fn depth(&self) -> usize {
        self.decisions.len() - 1
    }

    /// The reported decision: the main one unless it is a class, else the
    /// deepest class reached before the first non-class level.
    pub fn final_decision(&self) -> &Decision {
        if !self.main().is_classified() {
            return self.main();
        }

        self.decisions
            .iter()
            .take_while(|d| d.is_classified())
            .last()
            .unwrap_or(self.main())
    }
}

/// Result of reading an optional per-class resource
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Empty,
    Missing,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Empty => Lookup::Empty,
            Lookup::Missing => Lookup::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(class: &str, confidence: f64) -> Decision {
        Decision::Classified {
            class: ClassId::from(class),
            confidence,
        }
    }

    #[test]
    fn test_final_decision_is_deepest_class() {
        let mut record = PredictionRecord::new(classified("2.-.-.-", 0.8));
        record.push(classified("2.7.-.-", 0.7));
        record.push(Decision::NoPrediction);

        assert_eq!(record.depth(), 2);
        assert_eq!(record.final_decision(), &classified("2.7.-.-", 0.7));
    }

    #[test]
    fn test_final_decision_of_unclassified_main() {
        let record = PredictionRecord::new(Decision::NonEnzyme { confidence: 0.9 });
        assert_eq!(
            record.final_decision(),
            &Decision::NonEnzyme { confidence: 0.9 }
        );

        let record = PredictionRecord::new(Decision::NoPrediction);
        assert_eq!(record.final_decision(), &Decision::NoPrediction);
    }

    #[test]
    fn test_mode_methods() {
        assert_eq!(Mode::Weighted.methods(), Method::FUSION_ORDER.to_vec());
        assert!(Mode::Weighted.is_fused());
        assert!(!Mode::Spmap.needs_features());
        assert!(Mode::Pepstats.needs_features());
        assert_eq!(ClassId::main_classes()[2].as_str(), "3.-.-.-");
    }
}
