use crate::libs::classify::Verdict;
use crate::libs::error::{LocError, Result};
use crate::libs::protein::ProteinSet;

/// Verdicts of one class, aligned with the query ID list.
#[derive(Debug, Clone)]
pub struct ClassOutcome {
    pub class_name: String,
    pub verdicts: Vec<Verdict>,
}

/// `None` + `Chromatin` => `Chromatin.`; `Nucleolus.` + `Chromatin` => `Nucleolus. Chromatin.`
pub fn append_token(current: Option<&str>, token: &str) -> String {
    match current {
        Some(text) if !text.trim().is_empty() => format!("{} {}.", text, token),
        _ => format!("{}.", token),
    }
}

/// Folds per-class verdicts into the cumulative per-protein strings.
///
/// Classes must be folded in parameter-table order, the resulting text keeps
/// that order.
pub struct ResultAggregator<'a> {
    proteins: &'a mut ProteinSet,
    query_ids: &'a [String],
    with_reliability: bool,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(proteins: &'a mut ProteinSet, query_ids: &'a [String], with_reliability: bool) -> Self {
        Self {
            proteins,
            query_ids,
            with_reliability,
        }
    }

    /// Returns the number of proteins predicted into the class.
    pub fn fold(&mut self, outcome: &ClassOutcome) -> Result<usize> {
        if outcome.verdicts.len() != self.query_ids.len() {
            return Err(LocError::classifier(format!(
                "{} verdicts for class {} but {} query proteins",
                outcome.verdicts.len(),
                outcome.class_name,
                self.query_ids.len()
            )));
        }

        let display_name = outcome.class_name.replace('_', " ");
        let mut positives = 0;
        for (id, verdict) in self.query_ids.iter().zip(outcome.verdicts.iter()) {
            if !verdict.positive {
                continue;
            }
            let protein = self.proteins.get_mut(id).ok_or_else(|| {
                LocError::setup(format!("verdict for unknown query protein {}", id))
            })?;

            protein.localization = Some(append_token(protein.localization.as_deref(), &display_name));
            if self.with_reliability {
                if let Some(ri) = verdict.reliability {
                    protein.reliability =
                        Some(append_token(protein.reliability.as_deref(), &ri.to_string()));
                }
            }
            protein.has_prediction = true;
            positives += 1;

            log::debug!("{} is predicted as {}", id, display_name);
        }

        Ok(positives)
    }

    pub fn fold_all(&mut self, outcomes: &[ClassOutcome]) -> Result<()> {
        for outcome in outcomes {
            let positives = self.fold(outcome)?;
            log::info!(
                "{}: {} of {} query proteins predicted",
                outcome.class_name,
                positives,
                self.query_ids.len()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::protein::Protein;
    use std::path::PathBuf;

    fn proteins(ids: &[&str]) -> ProteinSet {
        ids.iter()
            .map(|id| (id.to_string(), Protein::new(id, PathBuf::from(format!("{}.fasta", id)))))
            .collect()
    }

    fn outcome(name: &str, verdicts: &[(bool, Option<u32>)]) -> ClassOutcome {
        ClassOutcome {
            class_name: name.to_string(),
            verdicts: verdicts
                .iter()
                .map(|&(positive, reliability)| Verdict {
                    positive,
                    reliability,
                })
                .collect(),
        }
    }

    #[test]
    fn test_append_token() {
        assert_eq!(append_token(None, "Chromatin"), "Chromatin.");
        assert_eq!(append_token(Some("  "), "Chromatin"), "Chromatin.");
        assert_eq!(append_token(Some("Nucleolus."), "Chromatin"), "Nucleolus. Chromatin.");
    }

    #[test]
    fn test_order_follows_table() {
        let mut set = proteins(&["P1"]);
        let ids = vec!["P1".to_string()];
        let mut agg = ResultAggregator::new(&mut set, &ids, false);
        agg.fold_all(&[
            outcome("Nucleolus", &[(false, None)]),
            outcome("Chromatin", &[(true, None)]),
        ])
        .unwrap();
        assert_eq!(set["P1"].localization.as_deref(), Some("Chromatin."));
        assert!(set["P1"].has_prediction);
    }

    #[test]
    fn test_reliability_aligned() {
        let mut set = proteins(&["P1", "P2", "P3"]);
        let ids = vec!["P1".to_string(), "P2".to_string(), "P3".to_string()];
        let mut agg = ResultAggregator::new(&mut set, &ids, true);
        agg.fold_all(&[
            outcome("PML_body", &[(true, Some(87)), (false, None), (false, None)]),
            outcome("Nucleolus", &[(true, Some(61)), (true, Some(99)), (false, None)]),
        ])
        .unwrap();

        assert_eq!(set["P1"].localization.as_deref(), Some("PML body. Nucleolus."));
        assert_eq!(set["P1"].reliability.as_deref(), Some("87. 61."));
        assert_eq!(set["P2"].localization.as_deref(), Some("Nucleolus."));
        assert_eq!(set["P2"].reliability.as_deref(), Some("99."));
        assert_eq!(set["P3"].localization, None);
        assert!(!set["P3"].has_prediction);
        assert_eq!(set["P3"].source_tag(), "NA");
    }

    #[test]
    fn test_untouched_proteins_keep_state() {
        let mut set = proteins(&["P1", "P2"]);
        set["P1"].has_homology_hit = true;
        set["P1"].has_prediction = true;
        set["P1"].localization = Some("Nucleolus.".to_string());
        let ids = vec!["P2".to_string()];
        let mut agg = ResultAggregator::new(&mut set, &ids, false);
        agg.fold(&outcome("Chromatin", &[(true, None)])).unwrap();

        assert_eq!(set["P1"].localization.as_deref(), Some("Nucleolus."));
        assert_eq!(set["P2"].localization.as_deref(), Some("Chromatin."));
    }

    #[test]
    fn test_length_mismatch() {
        let mut set = proteins(&["P1"]);
        let ids = vec!["P1".to_string()];
        let mut agg = ResultAggregator::new(&mut set, &ids, false);
        assert!(agg.fold(&outcome("Chromatin", &[])).is_err());
    }
}
