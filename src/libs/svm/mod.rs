//! Binary support vector classification from a precomputed gram matrix.
//!
//! # Key Components
//!
//! - `SmoSolver`: dual solver for C-SVC with per-sample box bounds
//! - `SvmModel`: dual coefficients and offset, scores kernel rows
//! - `Sigmoid`: Platt scaling of decision values
//!
//! Training items are labelled `true` (member of the class) or `false`;
//! a positive decision value means membership.

pub mod platt;
pub mod smo;

pub use platt::Sigmoid;
pub use smo::{SmoSolver, Solution, SolverOptions};

use crate::libs::error::{LocError, Result};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Folds used to collect out-of-sample decision values for Platt scaling
pub const PROBABILITY_FOLDS: usize = 5;

/// Seed of the fold shuffle, fixed so that reliabilities are reproducible
pub const PROBABILITY_SEED: u64 = 0;

#[derive(Debug, Clone)]
pub struct SvmModel {
    /// alpha[i] * y[i] for every training item
    pub coef: Vec<f64>,
    pub rho: f64,
}

impl SvmModel {
    pub fn n_support(&self) -> usize {
        self.coef.iter().filter(|&&c| c != 0.0).count()
    }

    /// Decision value of every row of `rows` (query x train similarities).
    pub fn decision_values(&self, rows: &DMatrix<f64>) -> Result<Vec<f64>> {
        if rows.ncols() != self.coef.len() {
            return Err(LocError::classifier(format!(
                "query matrix has {} columns, model was trained on {} items",
                rows.ncols(),
                self.coef.len()
            )));
        }

        let values = (0..rows.nrows())
            .map(|r| {
                self.coef
                    .iter()
                    .enumerate()
                    .filter(|(_, &c)| c != 0.0)
                    .map(|(j, &c)| c * rows[(r, j)])
                    .sum::<f64>()
                    - self.rho
            })
            .collect();

        Ok(values)
    }
}

/// Train on a square gram matrix with per-sample costs `c`.
pub fn train(gram: &DMatrix<f64>, members: &[bool], c: &[f64], eps: f64) -> Result<SvmModel> {
    let y: Vec<f64> = members.iter().map(|&m| if m { 1.0 } else { -1.0 }).collect();
    let options = SolverOptions::new(eps, y.len());
    let solution = SmoSolver::new(gram, &y, c, &options).solve()?;

    let coef = solution
        .alpha
        .iter()
        .zip(y.iter())
        .map(|(a, y)| a * y)
        .collect();

    Ok(SvmModel {
        coef,
        rho: solution.rho,
    })
}

/// Out-of-fold decision values, each item scored by a model that never saw it.
///
/// Folds whose training part holds a single class score their held-out items
/// with +1 or -1.
pub fn cross_validated_decisions(
    gram: &DMatrix<f64>,
    members: &[bool],
    c: &[f64],
    eps: f64,
) -> Result<Vec<f64>> {
    let l = members.len();
    let mut perm: Vec<usize> = (0..l).collect();
    let mut rng = StdRng::seed_from_u64(PROBABILITY_SEED);
    perm.shuffle(&mut rng);

    let mut decisions = vec![0.0; l];
    for fold in 0..PROBABILITY_FOLDS {
        let begin = fold * l / PROBABILITY_FOLDS;
        let end = (fold + 1) * l / PROBABILITY_FOLDS;
        let held_out = &perm[begin..end];
        if held_out.is_empty() {
            continue;
        }
        let kept: Vec<usize> = perm[..begin].iter().chain(perm[end..].iter()).copied().collect();

        let positives = kept.iter().filter(|&&i| members[i]).count();
        let negatives = kept.len() - positives;
        let fixed = match (positives, negatives) {
            (0, 0) => Some(0.0),
            (_, 0) => Some(1.0),
            (0, _) => Some(-1.0),
            _ => None,
        };

        if let Some(value) = fixed {
            for &i in held_out {
                decisions[i] = value;
            }
            continue;
        }

        let sub_gram = DMatrix::from_fn(kept.len(), kept.len(), |r, s| gram[(kept[r], kept[s])]);
        let sub_members: Vec<bool> = kept.iter().map(|&i| members[i]).collect();
        let sub_c: Vec<f64> = kept.iter().map(|&i| c[i]).collect();
        let model = train(&sub_gram, &sub_members, &sub_c, eps)?;

        let rows = DMatrix::from_fn(held_out.len(), kept.len(), |r, s| gram[(held_out[r], kept[s])]);
        for (&i, value) in held_out.iter().zip(model.decision_values(&rows)?) {
            decisions[i] = value;
        }
    }

    Ok(decisions)
}
