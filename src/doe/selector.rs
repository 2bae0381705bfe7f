//! doe::selector — the DoE entry point used by the controller.
//!
//! Purpose
//! -------
//! Pick the QoI that drives the next batch and dispatch to the configured
//! strategy.
//!
//! Key behaviors
//! -------------
//! - The dimension of interest is `argmax_j Σ_i e2[i,j] / var(y_j)` over the
//!   cross-validation rows; a QoI with zero variance contributes 0.
//! - Candidate and integration pools default to `min(200·x_dim, 2000)` rows
//!   drawn uniformly inside the bounds.
//! - The proposal has at most `batch` rows.
//!
//! Invariants & assumptions
//! ------------------------
//! - The bank is fitted and its CV matches its current models.
use crate::doe::{
    errors::{DoeError, DoeResult},
    pareto::{argmax, select_pareto},
    strategy::DoeStrategy,
    variance::{select_imse, select_mmse},
};
use crate::gp::bank::{CrossValidation, SurrogateBank};
use crate::gp::calibration::population_variance;
use crate::samples::design::{latin_hypercube, uniform};
use ndarray::{s, Array1, Array2};
use rand::Rng;
use tracing::debug;

const POOL_PER_DIM: usize = 200;
const MAX_POOL: usize = 2000;

/// Default candidate/integration pool size for `x_dim` inputs.
pub fn default_pool_size(x_dim: usize) -> usize {
    (POOL_PER_DIM * x_dim.max(1)).min(MAX_POOL)
}

/// The QoI with the largest variance-normalized CV error.
pub fn dimension_of_interest(cv: &CrossValidation) -> usize {
    let scores = (0..cv.y_true.ncols()).map(|j| {
        let var = population_variance(cv.y_true.column(j));
        if var > 0.0 {
            cv.e2.column(j).sum() / var
        } else {
            0.0
        }
    });
    argmax(scores)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoeProposal {
    pub points: Array2<f64>,
    /// Acquisition value at each picked point (strategy-specific).
    pub scores: Array1<f64>,
    /// QoI that drove the selection.
    pub qoi: usize,
    pub strategy: DoeStrategy,
}

impl DoeProposal {
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoeSelector {
    strategy: DoeStrategy,
    lower: Array1<f64>,
    upper: Array1<f64>,
    n_candidates: usize,
    n_integration: usize,
}

impl DoeSelector {
    pub fn new(strategy: DoeStrategy, lower: Array1<f64>, upper: Array1<f64>) -> Self {
        let pool = default_pool_size(lower.len());
        Self { strategy, lower, upper, n_candidates: pool, n_integration: pool }
    }

    pub fn with_pool_sizes(mut self, n_candidates: usize, n_integration: usize) -> Self {
        self.n_candidates = n_candidates;
        self.n_integration = n_integration;
        self
    }

    pub fn strategy(&self) -> DoeStrategy {
        self.strategy
    }

    /// Propose up to `batch` new inputs.
    ///
    /// Errors
    /// ------
    /// - `EmptyPool` for a zero batch or pool size.
    /// - `NoModels` when the bank is not fitted (random excepted).
    /// - Model and sampling errors from the strategies.
    pub fn select<R: Rng + ?Sized>(
        &self, bank: &SurrogateBank, cv: &CrossValidation, batch: usize, rng: &mut R,
    ) -> DoeResult<DoeProposal> {
        if batch == 0 {
            return Err(DoeError::EmptyPool { what: "batch size" });
        }
        if self.n_candidates == 0 || self.n_integration == 0 {
            return Err(DoeError::EmptyPool { what: "candidate pool" });
        }
        let (points, scores, qoi) = match self.strategy {
            DoeStrategy::Random => {
                let pool = self.n_candidates.max(batch);
                let design = latin_hypercube(pool, &self.lower, &self.upper, rng)?;
                (design.slice(s![..batch, ..]).to_owned(), Array1::zeros(batch), 0)
            }
            DoeStrategy::Pareto => {
                let qoi = dimension_of_interest(cv);
                let model = bank.model(qoi).ok_or(DoeError::NoModels)?;
                let xc = uniform(self.n_candidates, &self.lower, &self.upper, rng)?;
                let xq = uniform(self.n_integration, &self.lower, &self.upper, rng)?;
                let ranges = &self.upper - &self.lower;
                let (points, scores) = select_pareto(
                    model,
                    xc.view(),
                    xq.view(),
                    cv.x.view(),
                    cv.e2.column(qoi),
                    cv.y_pred_var.column(qoi),
                    &ranges,
                    batch,
                )?;
                (points, scores, qoi)
            }
            DoeStrategy::Imse => {
                let qoi = dimension_of_interest(cv);
                let model = bank.model(qoi).ok_or(DoeError::NoModels)?;
                let (points, scores) = select_imse(
                    model,
                    cv.x.view(),
                    cv.e2.column(qoi),
                    &self.lower,
                    &self.upper,
                    self.n_candidates,
                    self.n_integration,
                    batch,
                    rng,
                )?;
                (points, scores, qoi)
            }
            DoeStrategy::Mmse => {
                let qoi = dimension_of_interest(cv);
                let model = bank.model(qoi).ok_or(DoeError::NoModels)?;
                let (points, scores) = select_mmse(
                    model,
                    cv.x.view(),
                    cv.e2.column(qoi),
                    &self.lower,
                    &self.upper,
                    self.n_candidates,
                    batch,
                    rng,
                )?;
                (points, scores, qoi)
            }
        };
        debug!(strategy = self.strategy.label(), qoi, picked = points.nrows(), "doe proposal");
        Ok(DoeProposal { points, scores, qoi, strategy: self.strategy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::bank::{FidelityCase, ModelSettings};
    use crate::samples::SampleSet;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Pool sizing and the dimension of interest.
    // - End-to-end proposals for every strategy on a fitted bank.
    // -------------------------------------------------------------------------

    fn fitted_bank() -> (SurrogateBank, CrossValidation) {
        let x = Array2::from_shape_fn((6, 1), |(i, _)| i as f64 / 5.0);
        let y = Array2::from_shape_fn((6, 2), |(i, j)| {
            let v = x[[i, 0]];
            if j == 0 {
                (6.0 * v).sin()
            } else {
                0.1 * v
            }
        });
        let samples = SampleSet::new(x, y).expect("samples");
        let mut bank =
            SurrogateBank::new(FidelityCase::SingleFidelity, ModelSettings::default(), array![1.0]);
        bank.fit(&samples).expect("fit");
        let cv = bank.cross_validate().expect("cv");
        (bank, cv)
    }

    #[test]
    // Purpose
    // -------
    // Pool sizes scale with dimension and saturate at 2000.
    //
    // Given
    // -----
    // - x_dim of 1, 3 and 20.
    //
    // Expect
    // ------
    // - 200, 600 and 2000.
    fn pool_size_scales_and_saturates() {
        assert_eq!(default_pool_size(1), 200);
        assert_eq!(default_pool_size(3), 600);
        assert_eq!(default_pool_size(20), 2000);
    }

    #[test]
    // Purpose
    // -------
    // The QoI with the largest normalized error is chosen; constant QoIs
    // never win.
    //
    // Given
    // -----
    // - A hand-built CV where QoI 0 has the larger e2/var and QoI 2 is
    //   constant with a huge e2.
    //
    // Expect
    // ------
    // - Dimension 0.
    fn dimension_of_interest_normalizes_by_variance() {
        let n = 3;
        let cv = CrossValidation {
            x: array![[0.0], [0.5], [1.0]],
            y_true: array![[0.0, 0.0, 5.0], [1.0, 10.0, 5.0], [2.0, 20.0, 5.0]],
            y_pred: Array2::zeros((n, 3)),
            y_pred_var: Array2::ones((n, 3)),
            e2: array![[0.1, 1.0, 100.0], [0.1, 1.0, 100.0], [0.1, 1.0, 100.0]],
            latent_mean: Array2::zeros((n, 3)),
            latent_var: Array2::ones((n, 3)),
        };
        // QoI 0: 0.3 / (2/3) = 0.45; QoI 1: 3 / (200/3) = 0.045.
        assert_eq!(dimension_of_interest(&cv), 0);
    }

    #[test]
    // Purpose
    // -------
    // Every strategy returns `batch` in-bounds points.
    //
    // Given
    // -----
    // - A fitted two-QoI bank, pools of 40, batch of 2.
    //
    // Expect
    // ------
    // - Two rows in [0, 1] per strategy; zero batch is rejected.
    fn every_strategy_returns_a_batch() {
        // Arrange
        let (bank, cv) = fitted_bank();
        let mut rng = ChaCha8Rng::seed_from_u64(21);

        for strategy in [DoeStrategy::Pareto, DoeStrategy::Imse, DoeStrategy::Mmse, DoeStrategy::Random]
        {
            // Act
            let selector =
                DoeSelector::new(strategy, array![0.0], array![1.0]).with_pool_sizes(40, 40);
            let proposal = selector.select(&bank, &cv, 2, &mut rng).expect("proposal");

            // Assert
            assert_eq!(proposal.len(), 2, "{strategy:?}");
            assert!(proposal.points.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
        let selector = DoeSelector::new(DoeStrategy::Pareto, array![0.0], array![1.0]);
        assert_eq!(
            selector.select(&bank, &cv, 0, &mut rng),
            Err(DoeError::EmptyPool { what: "batch size" })
        );
    }
}
