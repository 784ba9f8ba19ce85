use config::{get_progress_bar, MAX_CASCADE_DEPTH, NON_ENZYME_THRESHOLD};
use dashmap::DashMap;
use log::{error, info, warn};

use crate::library::ClassTables;
use crate::scheduler::{Scheduler, Tier};
use crate::scorer::MethodScorer;
use crate::types::{ClassId, Decision, Lookup, PredictionRecord};
use crate::PipelineError;

/// Scores of one class, one entry per protein
pub type ClassScores = Vec<Option<f64>>;

/// Hierarchical cascade over the EC tree
pub struct Pipeline {
    scheduler: Scheduler,
    tables: Box<dyn ClassTables>,
    scorers: Vec<Box<dyn MethodScorer>>,
    fused: bool,
}

impl Pipeline {
    pub fn new(
        scheduler: Scheduler,
        tables: Box<dyn ClassTables>,
        scorers: Vec<Box<dyn MethodScorer>>,
        fused: bool,
    ) -> Self {
        Self {
            scheduler,
            tables,
            scorers,
            fused,
        }
    }

    /// Predict every protein: a main-class batch over all proteins, then
    /// one isolated cascade job per confidently classified protein.
    /// Records come back in input order.
    pub fn run(&self, proteins: &[String]) -> Result<Vec<(String, PredictionRecord)>, PipelineError> {
        info!("Predicting main classes of {} proteins...", proteins.len());

        let classes = ClassId::main_classes();
        let scores = self.score_classes(&classes, proteins)?;

        let records: DashMap<String, PredictionRecord> = DashMap::with_capacity(proteins.len());
        for (idx, protein) in proteins.iter().enumerate() {
            let column = column(&scores, idx);
            let main = select_main(&classes, &column, |class| self.tables.threshold(class))?;
            records.insert(protein.clone(), PredictionRecord::new(main));
        }

        let pending = proteins
            .iter()
            .filter(|p| records.get(*p).is_some_and(|r| r.main().is_classified()))
            .cloned()
            .collect::<Vec<_>>();

        info!("Predicting subclasses of {} proteins...", pending.len());
        let pb = get_progress_bar(pending.len() as u64, "Predicting subclasses...");

        let outcomes = self.scheduler.map_isolated(Tier::Protein, &pending, |protein| {
            pb.inc(1);
            let main = match records.get(protein) {
                Some(record) => record.main().clone(),
                None => return,
            };

            // INFO: every decision lands in the shared map as soon as it is made
            let outcome = self.cascade(protein, &main, |decision| {
                if let Some(mut record) = records.get_mut(protein) {
                    record.push(decision);
                }
            });

            if let Err(e) = outcome {
                error!("Subclass prediction failed for {}: {}", protein, e);
            }
        });

        pb.finish_and_clear();

        for (protein, outcome) in pending.iter().zip(outcomes) {
            if let Err(msg) = outcome {
                error!("Subclass prediction panicked for {}: {}", protein, msg);
            }
        }

        Ok(proteins
            .iter()
            .filter_map(|protein| records.remove(protein))
            .collect())
    }

    /// Descend from a main-class decision, one level per iteration, until
    /// a level has no confident candidate or the depth limit. Each level's
    /// decision is handed to `push` before the next level starts.
    pub fn cascade<F>(&self, protein: &str, main: &Decision, mut push: F) -> Result<(), PipelineError>
    where
        F: FnMut(Decision),
    {
        let proteins = [protein.to_string()];
        let mut parent = match main.class() {
            Some(class) => class.clone(),
            None => return Ok(()),
        };

        for _ in 0..MAX_CASCADE_DEPTH {
            let candidates = match self.tables.children(&parent)? {
                Lookup::Found(candidates) => candidates,
                Lookup::Empty | Lookup::Missing => {
                    push(Decision::NoPrediction);
                    break;
                }
            };

            let scores = self.score_classes(&candidates, &proteins)?;
            let decision = select_level(&candidates, &column(&scores, 0), |class| {
                self.tables.threshold(class)
            })?;

            let next = decision.class().cloned();
            push(decision);
            match next {
                Some(class) => parent = class,
                None => break,
            }
        }

        Ok(())
    }

    /// One score column per class: classes fan out over the class pool,
    /// each class fans its methods out over the method pool.
    pub fn score_classes(
        &self,
        classes: &[ClassId],
        proteins: &[String],
    ) -> Result<Vec<ClassScores>, PipelineError> {
        self.scheduler
            .map(Tier::Class, classes, |class| self.score_class(class, proteins))
            .into_iter()
            .collect()
    }

    fn score_class(&self, class: &ClassId, proteins: &[String]) -> Result<ClassScores, PipelineError> {
        let per_method = self
            .scheduler
            .map(Tier::Method, &self.scorers, |scorer| scorer.score(class, proteins))
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        if !self.fused {
            return Ok(per_method
                .into_iter()
                .next()
                .unwrap_or_else(|| vec![None; proteins.len()]));
        }

        let weights = match self.tables.weights(class)? {
            Lookup::Found(weights) => weights,
            Lookup::Empty | Lookup::Missing => {
                warn!("No fusion weights for {}, skipping class", class);
                return Ok(vec![None; proteins.len()]);
            }
        };

        Ok((0..proteins.len())
            .map(|idx| {
                weights.fuse(|method| {
                    self.scorers
                        .iter()
                        .position(|s| s.method() == method)
                        .and_then(|k| per_method[k][idx])
                })
            })
            .collect())
    }
}

fn column(scores: &[ClassScores], idx: usize) -> Vec<Option<f64>> {
    scores
        .iter()
        .map(|class| class.get(idx).copied().flatten())
        .collect()
}

/// Main-class decision for one protein. The first class reaching the
/// running maximum wins; below the non-enzyme cutoff the protein is a
/// non-enzyme, otherwise the winner must meet its own threshold.
pub fn select_main<F>(
    classes: &[ClassId],
    scores: &[Option<f64>],
    threshold: F,
) -> Result<Decision, PipelineError>
where
    F: Fn(&ClassId) -> Result<f64, PipelineError>,
{
    let mut best: Option<&ClassId> = None;
    let mut max = 0.0;
    let mut scored = false;

    for (class, score) in classes.iter().zip(scores) {
        if let Some(score) = *score {
            scored = true;
            if score > max {
                max = score;
                best = Some(class);
            }
        }
    }

    if !scored {
        return Ok(Decision::NoPrediction);
    }

    if max < NON_ENZYME_THRESHOLD {
        return Ok(Decision::NonEnzyme {
            confidence: 1.0 - max,
        });
    }

    let class = match best {
        Some(class) => class,
        None => return Ok(Decision::NoPrediction),
    };

    if max >= threshold(class)? {
        Ok(Decision::Classified {
            class: class.clone(),
            confidence: max,
        })
    } else {
        Ok(Decision::NoPrediction)
    }
}

/// Subclass decision for one level: a candidate qualifies when it meets
/// its threshold and beats every earlier qualifier.
pub fn select_level<F>(
    candidates: &[ClassId],
    scores: &[Option<f64>],
    threshold: F,
) -> Result<Decision, PipelineError>
where
    F: Fn(&ClassId) -> Result<f64, PipelineError>,
{
    let mut best: Option<&ClassId> = None;
    let mut max = 0.0;

    for (class, score) in candidates.iter().zip(scores) {
        let score = match score {
            Some(score) => *score,
            None => continue,
        };

        if score >= threshold(class)? && score > max {
            max = score;
            best = Some(class);
        }
    }

    Ok(match best {
        Some(class) => Decision::Classified {
            class: class.clone(),
            confidence: max,
        },
        None => Decision::NoPrediction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{FusionWeights, Thresholds};
    use crate::types::Method;
    use hashbrown::HashMap;

    struct FakeTables {
        thresholds: Thresholds,
        weights: HashMap<ClassId, FusionWeights>,
        children: HashMap<ClassId, Vec<ClassId>>,
    }

    impl FakeTables {
        fn new(thresholds: &[(&str, f64)]) -> Self {
            let mut table = Thresholds::default();
            for (class, value) in thresholds {
                table.insert(ClassId::from(*class), *value);
            }
            Self {
                thresholds: table,
                weights: HashMap::new(),
                children: HashMap::new(),
            }
        }

        fn child(mut self, parent: &str, children: &[&str]) -> Self {
            self.children.insert(
                ClassId::from(parent),
                children.iter().map(|c| ClassId::from(*c)).collect(),
            );
            self
        }
    }

    impl ClassTables for FakeTables {
        fn threshold(&self, class: &ClassId) -> Result<f64, PipelineError> {
            self.thresholds.require(class)
        }

        fn weights(&self, class: &ClassId) -> Result<Lookup<FusionWeights>, PipelineError> {
            Ok(self
                .weights
                .get(class)
                .map_or(Lookup::Missing, |w| Lookup::Found(*w)))
        }

        fn children(&self, class: &ClassId) -> Result<Lookup<Vec<ClassId>>, PipelineError> {
            Ok(match self.children.get(class) {
                Some(children) if children.is_empty() => Lookup::Empty,
                Some(children) => Lookup::Found(children.clone()),
                None => Lookup::Missing,
            })
        }
    }

    /// Fixed confidences keyed by (class, protein)
    struct FixedScorer {
        method: Method,
        scores: HashMap<(String, String), f64>,
    }

    impl FixedScorer {
        fn new(method: Method, scores: &[(&str, &str, f64)]) -> Self {
            Self {
                method,
                scores: scores
                    .iter()
                    .map(|(c, p, s)| ((c.to_string(), p.to_string()), *s))
                    .collect(),
            }
        }
    }

    impl MethodScorer for FixedScorer {
        fn method(&self) -> Method {
            self.method
        }

        fn score(&self, class: &ClassId, proteins: &[String]) -> Result<Vec<Option<f64>>, PipelineError> {
            // cascade batches of "boom" fail on the first class it has no score for
            if proteins.len() == 1
                && proteins[0] == "boom"
                && !self
                    .scores
                    .contains_key(&(class.as_str().to_string(), proteins[0].clone()))
            {
                panic!("scorer exploded");
            }

            Ok(proteins
                .iter()
                .map(|p| {
                    self.scores
                        .get(&(class.as_str().to_string(), p.clone()))
                        .copied()
                })
                .collect())
        }
    }

    fn classes(ids: &[&str]) -> Vec<ClassId> {
        ids.iter().map(|c| ClassId::from(*c)).collect()
    }

    fn no_threshold(class: &ClassId) -> Result<f64, PipelineError> {
        Err(PipelineError::MissingThreshold(class.clone()))
    }

    #[test]
    fn test_low_scores_are_non_enzyme() {
        let scores = [Some(0.1), Some(0.05), Some(0.02), Some(0.01), Some(0.0), Some(0.0)];
        let decision = select_main(&ClassId::main_classes(), &scores, no_threshold).unwrap();

        match decision {
            Decision::NonEnzyme { confidence } => assert!((confidence - 0.9).abs() < 1e-12),
            other => panic!("expected non enzyme, got {:?}", other),
        }
    }

    #[test]
    fn test_below_class_threshold_is_no_prediction() {
        let tables = FakeTables::new(&[("1.-.-.-", 0.6)]);
        let scores = [Some(0.55), Some(0.1), None, None, None, None];
        let decision =
            select_main(&ClassId::main_classes(), &scores, |c| tables.threshold(c)).unwrap();

        assert_eq!(decision, Decision::NoPrediction);
    }

    #[test]
    fn test_cutoff_compares_unrounded_scores() {
        let scores = [Some(0.399), None, None, None, None, None];
        let decision = select_main(&ClassId::main_classes(), &scores, no_threshold).unwrap();
        assert!(matches!(decision, Decision::NonEnzyme { .. }));
    }

    #[test]
    fn test_unscored_protein_is_no_prediction() {
        let decision = select_main(&ClassId::main_classes(), &[None; 6], no_threshold).unwrap();
        assert_eq!(decision, Decision::NoPrediction);
    }

    #[test]
    fn test_main_class_ties_keep_first() {
        let tables = FakeTables::new(&[("2.-.-.-", 0.5), ("4.-.-.-", 0.5)]);
        let scores = [None, Some(0.7), None, Some(0.7), None, None];
        let decision =
            select_main(&ClassId::main_classes(), &scores, |c| tables.threshold(c)).unwrap();

        assert_eq!(decision.class(), Some(&ClassId::from("2.-.-.-")));
    }

    #[test]
    fn test_missing_threshold_is_an_error() {
        let scores = [Some(0.9), None, None, None, None, None];
        assert!(matches!(
            select_main(&ClassId::main_classes(), &scores, no_threshold),
            Err(PipelineError::MissingThreshold(_))
        ));
    }

    #[test]
    fn test_level_selection() {
        let tables = FakeTables::new(&[("1.1.-.-", 0.5), ("1.2.-.-", 0.9), ("1.3.-.-", 0.5)]);
        let candidates = classes(&["1.1.-.-", "1.2.-.-", "1.3.-.-"]);

        // 1.2 is the largest but misses its threshold, 1.1 and 1.3 tie
        let scores = [Some(0.6), Some(0.8), Some(0.6)];
        let decision = select_level(&candidates, &scores, |c| tables.threshold(c)).unwrap();
        assert_eq!(
            decision,
            Decision::Classified {
                class: ClassId::from("1.1.-.-"),
                confidence: 0.6
            }
        );

        let scores = [Some(0.4), None, Some(0.2)];
        let decision = select_level(&candidates, &scores, |c| tables.threshold(c)).unwrap();
        assert_eq!(decision, Decision::NoPrediction);
    }

    #[test]
    fn test_fused_scores_enter_cascade() {
        let mut tables = FakeTables::new(&[("3.-.-.-", 0.5)]).child("3.-.-.-", &[]);
        tables
            .weights
            .insert(ClassId::from("3.-.-.-"), FusionWeights::new([0.5, 0.3, 0.2]));

        let scorers: Vec<Box<dyn MethodScorer>> = vec![
            Box::new(FixedScorer::new(Method::Spmap, &[("3.-.-.-", "p", 0.7)])),
            Box::new(FixedScorer::new(Method::Blast, &[("3.-.-.-", "p", 0.5)])),
            Box::new(FixedScorer::new(Method::Pepstats, &[("3.-.-.-", "p", 0.6)])),
        ];

        let pipeline = Pipeline::new(Scheduler::inline(), Box::new(tables), scorers, true);
        let records = pipeline.run(&["p".to_string()]).unwrap();

        let record = &records[0].1;
        match record.main() {
            Decision::Classified { class, confidence } => {
                assert_eq!(class.as_str(), "3.-.-.-");
                assert!((confidence - 0.62).abs() < 1e-12);
            }
            other => panic!("expected a class, got {:?}", other),
        }
        // empty candidate list stops the cascade at the first level
        assert_eq!(record.decisions()[1], Decision::NoPrediction);
        assert_eq!(record.depth(), 1);
    }

    #[test]
    fn test_cascade_depth_is_bounded() {
        let tables = FakeTables::new(&[
            ("1.-.-.-", 0.5),
            ("1.1.-.-", 0.5),
            ("1.1.1.-", 0.5),
            ("1.1.1.1", 0.5),
            ("1.1.1.2", 0.5),
        ])
        .child("1.-.-.-", &["1.1.-.-"])
        .child("1.1.-.-", &["1.1.1.-"])
        .child("1.1.1.-", &["1.1.1.1", "1.1.1.2"])
        .child("1.1.1.1", &["1.1.1.1"]);

        let scorer = FixedScorer::new(
            Method::Spmap,
            &[
                ("1.-.-.-", "p", 0.9),
                ("1.1.-.-", "p", 0.8),
                ("1.1.1.-", "p", 0.7),
                ("1.1.1.1", "p", 0.6),
                ("1.1.1.2", "p", 0.65),
            ],
        );

        let pipeline = Pipeline::new(
            Scheduler::new(2).unwrap(),
            Box::new(tables),
            vec![Box::new(scorer)],
            false,
        );
        let records = pipeline.run(&["p".to_string()]).unwrap();
        let record = &records[0].1;

        assert_eq!(record.depth(), 3);
        assert_eq!(
            record.final_decision(),
            &Decision::Classified {
                class: ClassId::from("1.1.1.2"),
                confidence: 0.65
            }
        );
    }

    #[test]
    fn test_failed_cascade_keeps_main_decision() {
        let tables = FakeTables::new(&[("1.-.-.-", 0.5), ("1.1.-.-", 0.5)])
            .child("1.-.-.-", &["1.1.-.-"]);
        let scorer = FixedScorer::new(
            Method::Spmap,
            &[
                ("1.-.-.-", "boom", 0.9),
                ("1.-.-.-", "ok", 0.9),
                ("1.1.-.-", "ok", 0.3),
                ("5.-.-.-", "low", 0.2),
            ],
        );

        let pipeline = Pipeline::new(
            Scheduler::new(2).unwrap(),
            Box::new(tables),
            vec![Box::new(scorer)],
            false,
        );
        let proteins: Vec<String> = ["low", "boom", "ok"].iter().map(|s| s.to_string()).collect();
        let records = pipeline.run(&proteins).unwrap();

        let ids: Vec<&str> = records.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["low", "boom", "ok"]);

        assert!(matches!(records[0].1.main(), Decision::NonEnzyme { .. }));
        assert_eq!(records[1].1.depth(), 0);
        assert!(records[1].1.main().is_classified());
        assert_eq!(records[2].1.decisions()[1], Decision::NoPrediction);
    }

    #[test]
    fn test_panic_keeps_levels_reached_before_it() {
        let tables = FakeTables::new(&[("1.-.-.-", 0.5), ("1.1.-.-", 0.5), ("1.1.1.-", 0.5)])
            .child("1.-.-.-", &["1.1.-.-"])
            .child("1.1.-.-", &["1.1.1.-"]);
        let scorer = FixedScorer::new(
            Method::Spmap,
            &[
                ("1.-.-.-", "boom", 0.9),
                ("1.1.-.-", "boom", 0.8),
                ("1.-.-.-", "ok", 0.9),
                ("1.1.-.-", "ok", 0.8),
                ("1.1.1.-", "ok", 0.7),
            ],
        );

        let pipeline = Pipeline::new(
            Scheduler::new(2).unwrap(),
            Box::new(tables),
            vec![Box::new(scorer)],
            false,
        );
        let proteins: Vec<String> = ["boom", "ok"].iter().map(|s| s.to_string()).collect();
        let records = pipeline.run(&proteins).unwrap();

        assert_eq!(records[0].0, "boom");
        assert_eq!(records[0].1.depth(), 1);
        assert_eq!(records[0].1.final_decision().class(), Some(&ClassId::from("1.1.-.-")));
        assert_eq!(records[1].1.final_decision().class(), Some(&ClassId::from("1.1.1.-")));
    }
}
