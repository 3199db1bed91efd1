//! Sequential minimal optimization for C-SVC over a precomputed kernel.
//!
//! Solves
//! min_a 0.5 * a'Qa - e'a, subject to y'a = 0 and 0 <= a[i] <= C[i],
//! where Q[i][j] = y[i] * y[j] * K[i][j]. Working pairs are picked with the
//! second-order rule of Fan, Chen and Lin (2005), as libsvm does.

use crate::libs::error::{LocError, Result};
use nalgebra::DMatrix;

/// Substitute for non-positive curvature
const TAU: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Stopping tolerance on the maximal violating pair
    pub eps: f64,
    pub max_iter: usize,
}

impl SolverOptions {
    pub fn new(eps: f64, l: usize) -> Self {
        Self {
            eps,
            max_iter: usize::max(10_000_000, l.saturating_mul(100)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub alpha: Vec<f64>,
    pub rho: f64,
}

pub struct SmoSolver<'a> {
    kernel: &'a DMatrix<f64>,
    y: &'a [f64],
    c: &'a [f64],
    options: &'a SolverOptions,
    alpha: Vec<f64>,
    grad: Vec<f64>,
    qd: Vec<f64>,
}

impl<'a> SmoSolver<'a> {
    /// `y` holds +1/-1 labels, `c` the per-sample upper bounds.
    pub fn new(kernel: &'a DMatrix<f64>, y: &'a [f64], c: &'a [f64], options: &'a SolverOptions) -> Self {
        let l = y.len();
        let qd = (0..l).map(|i| kernel[(i, i)]).collect();
        Self {
            kernel,
            y,
            c,
            options,
            alpha: vec![0.0; l],
            grad: vec![-1.0; l],
            qd,
        }
    }

    #[inline]
    fn q(&self, i: usize, j: usize) -> f64 {
        self.y[i] * self.y[j] * self.kernel[(i, j)]
    }

    #[inline]
    fn is_upper(&self, i: usize) -> bool {
        self.alpha[i] >= self.c[i]
    }

    #[inline]
    fn is_lower(&self, i: usize) -> bool {
        self.alpha[i] <= 0.0
    }

    pub fn solve(mut self) -> Result<Solution> {
        let l = self.y.len();
        let mut iter = 0;

        while let Some((i, j)) = self.select_working_set() {
            if iter >= self.options.max_iter {
                return Err(LocError::classifier(format!(
                    "SMO did not converge within {} iterations",
                    self.options.max_iter
                )));
            }
            iter += 1;

            let old_ai = self.alpha[i];
            let old_aj = self.alpha[j];
            self.update_pair(i, j);

            let dai = self.alpha[i] - old_ai;
            let daj = self.alpha[j] - old_aj;
            for k in 0..l {
                self.grad[k] += self.q(i, k) * dai + self.q(j, k) * daj;
            }
        }

        let rho = self.calculate_rho();
        let objective = (0..l)
            .map(|i| self.alpha[i] * (self.grad[i] - 1.0))
            .sum::<f64>()
            / 2.0;
        log::debug!("optimization finished, #iter = {}, obj = {:.6}, rho = {:.6}", iter, objective, rho);

        if !rho.is_finite() || self.alpha.iter().any(|a| !a.is_finite()) {
            return Err(LocError::classifier("SMO produced a non-finite solution"));
        }

        Ok(Solution {
            alpha: self.alpha,
            rho,
        })
    }

    /// Returns `None` once the KKT conditions hold within `eps`.
    fn select_working_set(&self) -> Option<(usize, usize)> {
        let l = self.y.len();
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax2 = f64::NEG_INFINITY;
        let mut gmax_idx = None;

        for t in 0..l {
            if self.y[t] > 0.0 {
                if !self.is_upper(t) && -self.grad[t] >= gmax {
                    gmax = -self.grad[t];
                    gmax_idx = Some(t);
                }
            } else if !self.is_lower(t) && self.grad[t] >= gmax {
                gmax = self.grad[t];
                gmax_idx = Some(t);
            }
        }
        let i = gmax_idx?;

        let mut gmin_idx = None;
        let mut obj_diff_min = f64::INFINITY;
        for j in 0..l {
            let grad_diff = if self.y[j] > 0.0 {
                if self.is_lower(j) {
                    continue;
                }
                gmax2 = gmax2.max(self.grad[j]);
                gmax + self.grad[j]
            } else {
                if self.is_upper(j) {
                    continue;
                }
                gmax2 = gmax2.max(-self.grad[j]);
                gmax - self.grad[j]
            };

            if grad_diff > 0.0 {
                // K[i][i] + K[j][j] - 2 K[i][j] for either sign of y[j]
                let mut quad_coef = self.qd[i] + self.qd[j] - 2.0 * self.y[i] * self.y[j] * self.q(i, j);
                if quad_coef <= 0.0 {
                    quad_coef = TAU;
                }
                let obj_diff = -(grad_diff * grad_diff) / quad_coef;
                if obj_diff <= obj_diff_min {
                    gmin_idx = Some(j);
                    obj_diff_min = obj_diff;
                }
            }
        }

        if gmax + gmax2 < self.options.eps {
            return None;
        }
        gmin_idx.map(|j| (i, j))
    }

    fn update_pair(&mut self, i: usize, j: usize) {
        let ci = self.c[i];
        let cj = self.c[j];
        let qij = self.q(i, j);

        if self.y[i] != self.y[j] {
            let mut quad_coef = self.qd[i] + self.qd[j] + 2.0 * qij;
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (-self.grad[i] - self.grad[j]) / quad_coef;
            let diff = self.alpha[i] - self.alpha[j];
            self.alpha[i] += delta;
            self.alpha[j] += delta;

            if diff > 0.0 {
                if self.alpha[j] < 0.0 {
                    self.alpha[j] = 0.0;
                    self.alpha[i] = diff;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = -diff;
            }
            if diff > ci - cj {
                if self.alpha[i] > ci {
                    self.alpha[i] = ci;
                    self.alpha[j] = ci - diff;
                }
            } else if self.alpha[j] > cj {
                self.alpha[j] = cj;
                self.alpha[i] = cj + diff;
            }
        } else {
            let mut quad_coef = self.qd[i] + self.qd[j] - 2.0 * qij;
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (self.grad[i] - self.grad[j]) / quad_coef;
            let sum = self.alpha[i] + self.alpha[j];
            self.alpha[i] -= delta;
            self.alpha[j] += delta;

            if sum > ci {
                if self.alpha[i] > ci {
                    self.alpha[i] = ci;
                    self.alpha[j] = sum - ci;
                }
            } else if self.alpha[j] < 0.0 {
                self.alpha[j] = 0.0;
                self.alpha[i] = sum;
            }
            if sum > cj {
                if self.alpha[j] > cj {
                    self.alpha[j] = cj;
                    self.alpha[i] = sum - cj;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = sum;
            }
        }
    }

    fn calculate_rho(&self) -> f64 {
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut nr_free = 0;
        let mut sum_free = 0.0;

        for i in 0..self.y.len() {
            let yg = self.y[i] * self.grad[i];
            if self.is_upper(i) {
                if self.y[i] < 0.0 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            } else if self.is_lower(i) {
                if self.y[i] > 0.0 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            } else {
                nr_free += 1;
                sum_free += yg;
            }
        }

        if nr_free > 0 {
            sum_free / nr_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_two_points_hard_margin() {
        let k = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let y = [1.0, -1.0];
        let c = [100.0, 100.0];
        let opts = SolverOptions::new(1e-6, 2);
        let sol = SmoSolver::new(&k, &y, &c, &opts).solve().unwrap();

        // a = 1 / (1 - 0.3), rho = 0
        assert_relative_eq!(sol.alpha[0], 1.0 / 0.7, epsilon = 1e-6);
        assert_relative_eq!(sol.alpha[1], 1.0 / 0.7, epsilon = 1e-6);
        assert_relative_eq!(sol.rho, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_box_constraint() {
        let k = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let y = [1.0, -1.0];
        let c = [0.5, 0.5];
        let opts = SolverOptions::new(1e-6, 2);
        let sol = SmoSolver::new(&k, &y, &c, &opts).solve().unwrap();

        assert_relative_eq!(sol.alpha[0], 0.5);
        assert_relative_eq!(sol.alpha[1], 0.5);
        assert_relative_eq!(sol.rho, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_equality_constraint_holds() {
        // linear kernel of 1-d points
        let xs = [-2.0, -1.5, -0.5, 0.4, 1.0, 2.5];
        let y = [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
        let k = DMatrix::from_fn(6, 6, |r, c| xs[r] * xs[c] + 1.0);
        let c = [10.0; 6];
        let opts = SolverOptions::new(1e-8, 6);
        let sol = SmoSolver::new(&k, &y, &c, &opts).solve().unwrap();

        let balance: f64 = sol.alpha.iter().zip(y.iter()).map(|(a, y)| a * y).sum();
        assert_relative_eq!(balance, 0.0, epsilon = 1e-9);
        for (i, &x) in xs.iter().enumerate() {
            let f: f64 = (0..6).map(|j| sol.alpha[j] * y[j] * (x * xs[j] + 1.0)).sum::<f64>() - sol.rho;
            assert_eq!(f > 0.0, y[i] > 0.0, "point {} misclassified", x);
        }
    }
}
