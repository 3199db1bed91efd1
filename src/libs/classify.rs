use crate::libs::error::{LocError, Result};
use crate::libs::params::{ClassParameters, ClassWeight};
use crate::libs::svm::{self, Sigmoid, SvmModel};
use nalgebra::DMatrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOptions {
    pub c: f64,
    pub tol: f64,
    pub class_weight: ClassWeight,
    /// Fit the probability model needed for reliability indices
    pub probability: bool,
}

impl ClassifierOptions {
    pub fn from_params(params: &ClassParameters, probability: bool) -> Self {
        Self {
            c: params.c,
            tol: params.tol,
            class_weight: params.class_weight,
            probability,
        }
    }
}

/// Outcome for one (protein, class) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub positive: bool,
    /// 0..=100, only ever present on positive verdicts
    pub reliability: Option<u32>,
}

/// Ties at exactly zero are not members. A negative verdict never carries a
/// reliability, whatever the posterior says. Halves round to even.
///
/// ```
/// use locnuc::libs::classify::verdict;
/// assert!(!verdict(0.0, None).positive);
/// assert_eq!(verdict(-0.1, Some(0.93)).reliability, None);
/// assert_eq!(verdict(0.4, Some(0.876)).reliability, Some(88));
/// ```
pub fn verdict(decision: f64, probability: Option<f64>) -> Verdict {
    let positive = decision > 0.0;
    let reliability = match probability {
        Some(p) if positive => Some((p * 100.0).round_ties_even().clamp(0.0, 100.0) as u32),
        _ => None,
    };

    Verdict {
        positive,
        reliability,
    }
}

/// Per-sample box bounds. Balanced weighting scales C by
/// `n / (2 * n_class)` so both classes carry the same total cost.
pub fn sample_costs(members: &[bool], c: f64, class_weight: ClassWeight) -> Vec<f64> {
    let n = members.len() as f64;
    let positives = members.iter().filter(|&&m| m).count() as f64;
    let negatives = n - positives;

    let (w_pos, w_neg) = match class_weight {
        ClassWeight::Balanced if positives > 0.0 && negatives > 0.0 => {
            (n / (2.0 * positives), n / (2.0 * negatives))
        }
        _ => (1.0, 1.0),
    };

    members
        .iter()
        .map(|&m| c * if m { w_pos } else { w_neg })
        .collect()
}

/// A trained one-class-vs-rest SVM over a precomputed kernel.
#[derive(Debug, Clone)]
pub struct ClassClassifier {
    model: SvmModel,
    sigmoid: Option<Sigmoid>,
}

impl ClassClassifier {
    /// `gram` is the N x N training kernel, `members[i]` tells whether
    /// training item `i` belongs to the class.
    pub fn train(gram: &DMatrix<f64>, members: &[bool], options: &ClassifierOptions) -> Result<Self> {
        let n = members.len();
        if gram.nrows() != gram.ncols() || gram.nrows() != n {
            return Err(LocError::classifier(format!(
                "gram matrix is {} x {} but there are {} labels",
                gram.nrows(),
                gram.ncols(),
                n
            )));
        }
        if !(options.c > 0.0) || !(options.tol > 0.0) {
            return Err(LocError::classifier(format!(
                "C ({}) and tolerance ({}) must be positive",
                options.c, options.tol
            )));
        }
        if gram.iter().any(|v| !v.is_finite()) {
            return Err(LocError::classifier("gram matrix holds non-finite values"));
        }

        let positives = members.iter().filter(|&&m| m).count();
        let negatives = n - positives;
        if positives == 0 || negatives == 0 {
            return Err(LocError::classifier(format!(
                "need both classes to train, got {} positives and {} negatives",
                positives, negatives
            )));
        }

        let costs = sample_costs(members, options.c, options.class_weight);

        let model = svm::train(gram, members, &costs, options.tol)?;
        log::debug!(
            "Trained on {} positives and {} negatives, {} support vectors",
            positives,
            negatives,
            model.n_support()
        );

        let sigmoid = if options.probability {
            let decisions = svm::cross_validated_decisions(gram, members, &costs, options.tol)?;
            Some(Sigmoid::fit(&decisions, members))
        } else {
            None
        };

        Ok(Self { model, sigmoid })
    }

    pub fn decision_function(&self, query: &DMatrix<f64>) -> Result<Vec<f64>> {
        self.model.decision_values(query)
    }

    /// Posterior probability of membership for each decision value.
    pub fn predict_proba(&self, decisions: &[f64]) -> Result<Vec<f64>> {
        let sigmoid = self.sigmoid.ok_or_else(|| {
            LocError::classifier("classifier was trained without the probability model")
        })?;
        Ok(decisions.iter().map(|&d| sigmoid.probability(d)).collect())
    }

    /// One verdict per row of the normalized query matrix.
    pub fn score(&self, query: &DMatrix<f64>, with_reliability: bool) -> Result<Vec<Verdict>> {
        let decisions = self.decision_function(query)?;
        self.verdicts(&decisions, with_reliability)
    }

    /// Verdicts for decision values already computed by `decision_function`.
    pub fn verdicts(&self, decisions: &[f64], with_reliability: bool) -> Result<Vec<Verdict>> {
        let probabilities = if with_reliability {
            self.predict_proba(decisions)?.into_iter().map(Some).collect()
        } else {
            vec![None; decisions.len()]
        };

        Ok(decisions
            .iter()
            .zip(probabilities)
            .map(|(&d, p)| verdict(d, p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(c: f64, probability: bool) -> ClassifierOptions {
        ClassifierOptions {
            c,
            tol: 1e-3,
            class_weight: ClassWeight::None,
            probability,
        }
    }

    #[test]
    fn test_tie_is_negative() {
        let v = verdict(0.0, Some(0.99));
        assert!(!v.positive);
        assert_eq!(v.reliability, None);
        assert!(verdict(f64::MIN_POSITIVE, None).positive);
    }

    #[test]
    fn test_reliability_suppressed_on_negative() {
        let v = verdict(-1e-9, Some(0.75));
        assert_eq!(
            v,
            Verdict {
                positive: false,
                reliability: None
            }
        );
        assert_eq!(verdict(1.0, Some(0.5)).reliability, Some(50));
        assert_eq!(verdict(1.0, Some(1.0)).reliability, Some(100));
    }

    #[test]
    fn test_reliability_half_to_even() {
        assert_eq!(verdict(1.0, Some(0.625)).reliability, Some(62));
        assert_eq!(verdict(1.0, Some(0.875)).reliability, Some(88));
        assert_eq!(verdict(1.0, Some(0.6251)).reliability, Some(63));
    }

    #[test]
    fn test_end_to_end_scenario() {
        // normalized "2 2 / 10 3 / 3 10" and query "4 2 10"
        let gram = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let query = DMatrix::from_row_slice(1, 2, &[0.4, 0.2]);
        let clf = ClassClassifier::train(&gram, &[true, false], &options(100.0, false)).unwrap();

        let train_dec = clf.decision_function(&gram).unwrap();
        assert!(train_dec[0] > 0.0);
        assert!(train_dec[1] < 0.0);

        let verdicts = clf.score(&query, false).unwrap();
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].positive);
        assert_eq!(verdicts[0].reliability, None);
    }

    #[test]
    fn test_score_with_reliability() {
        let xs = [-3.0, -2.2, -1.7, -1.0, -0.4, 0.3, 0.9, 1.5, 2.1, 2.8];
        let members: Vec<bool> = xs.iter().map(|&x| x > 0.0).collect();
        let gram = DMatrix::from_fn(10, 10, |r, c| xs[r] * xs[c] + 1.0);
        let clf = ClassClassifier::train(&gram, &members, &options(1.0, true)).unwrap();

        let queries = [-2.5, 2.5];
        let rows = DMatrix::from_fn(2, 10, |r, c| queries[r] * xs[c] + 1.0);
        let verdicts = clf.score(&rows, true).unwrap();
        assert!(!verdicts[0].positive);
        assert_eq!(verdicts[0].reliability, None);
        assert!(verdicts[1].positive);
        assert!(verdicts[1].reliability.unwrap() > 50);

        let decisions = clf.decision_function(&rows).unwrap();
        assert_eq!(clf.verdicts(&decisions, true).unwrap(), verdicts);
        let proba = clf.predict_proba(&decisions).unwrap();
        assert!(proba[0] < 0.5 && proba[1] > 0.5);

        let again = ClassClassifier::train(&gram, &members, &options(1.0, true))
            .unwrap()
            .score(&rows, true)
            .unwrap();
        assert_eq!(verdicts, again);
    }

    #[test]
    fn test_balanced_costs() {
        let members = [true, false, false, false];
        assert_eq!(sample_costs(&members, 2.0, ClassWeight::None), vec![2.0; 4]);

        let costs = sample_costs(&members, 2.0, ClassWeight::Balanced);
        assert_eq!(costs[0], 4.0);
        assert!((costs[1] - 4.0 / 3.0).abs() < 1e-12);
        // both classes carry the same total cost
        let pos: f64 = costs[..1].iter().sum();
        let neg: f64 = costs[1..].iter().sum();
        assert!((pos - neg).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_rejected() {
        let gram = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let err = ClassClassifier::train(&gram, &[false, false], &options(1.0, false)).unwrap_err();
        assert!(matches!(err, LocError::Classifier(_)));
    }

    #[test]
    fn test_label_count_mismatch() {
        let gram = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let err = ClassClassifier::train(&gram, &[true], &options(1.0, false)).unwrap_err();
        assert!(matches!(err, LocError::Classifier(_)));
    }

    #[test]
    fn test_probability_required() {
        let gram = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let clf = ClassClassifier::train(&gram, &[true, false], &options(1.0, false)).unwrap();
        assert!(clf.score(&gram, true).is_err());
    }
}
