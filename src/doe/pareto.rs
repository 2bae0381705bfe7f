//! doe::pareto — two-objective Pareto selection of candidate points.
//!
//! Purpose
//! -------
//! Rank a candidate pool on two criteria and pick a batch from the
//! non-dominated front:
//!
//! - `score1 = var(x)·VOI(x)`, the predictive variance weighted by how much
//!   of the integration pool the candidate's prior correlation covers;
//! - `score2 = Σ_i e2_i/σ²_i · w_i(x)`, the cross-validation error of nearby
//!   training points with normalized `exp(−d²)` weights.
//!
//! Key behaviors
//! -------------
//! - Both scores are min-max normalized and log-transformed before ranking.
//! - `rank(i)` counts the candidates at least as good as `i` on both axes,
//!   itself included, so the non-dominated front has rank 1.
//! - When the front is larger than the batch, picks are greedy on
//!   `score1·score2`; after each pick the point is pseudo-added and `score1`
//!   is recomputed from the updated variance.
//! - When the front is smaller than the batch, the whole front is taken and
//!   the remainder is filled by increasing rank, ties broken by the larger
//!   `score1·score2`.
//!
//! Invariants & assumptions
//! ------------------------
//! - A dominated candidate is never picked while a rank-1 candidate remains.
//! - Degenerate (constant) scores normalize to 1.
use crate::doe::errors::DoeResult;
use crate::gp::bank::SurrogateModel;
use crate::samples::design::weights_node;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::debug;

/// Prior-correlation coverage of each candidate over the integration pool.
///
/// `VOI(x) = mean_q k(x, xq)² / k(x, x)² · Π range`
pub fn value_of_information(
    model: &SurrogateModel, xc: ArrayView2<f64>, xq: ArrayView2<f64>, ranges: &Array1<f64>,
) -> Array1<f64> {
    let volume: f64 = ranges.iter().map(|&r| if r > 0.0 { r } else { 1.0 }).product();
    let values: Vec<f64> = (0..xc.nrows())
        .into_par_iter()
        .map(|i| {
            let xi = xc.slice(s![i..i + 1, ..]);
            let k_self = model.prior_covariance(xi, xi)[[0, 0]];
            if !(k_self > 0.0) {
                return 0.0;
            }
            let k_q = model.prior_covariance(xi, xq);
            let mean_sq = k_q.iter().map(|k| k * k).sum::<f64>() / xq.nrows().max(1) as f64;
            mean_sq / (k_self * k_self) * volume
        })
        .collect();
    Array1::from(values)
}

/// Cross-validation error of the training nodes, weighted toward each
/// candidate.
pub fn weighted_cv_error(
    xc: ArrayView2<f64>, nodes: ArrayView2<f64>, e2: ArrayView1<f64>, pred_var: ArrayView1<f64>,
    ranges: &Array1<f64>,
) -> Array1<f64> {
    let ratio = Array1::from_iter(
        e2.iter().zip(pred_var.iter()).map(|(&e, &v)| e / v.max(f64::MIN_POSITIVE)),
    );
    let values: Vec<f64> = (0..xc.nrows())
        .into_par_iter()
        .map(|i| weights_node(xc.row(i), nodes, ranges).dot(&ratio))
        .collect();
    Array1::from(values)
}

/// `(s − min)/(max − min)`; all ones when the scores are constant.
pub fn min_max_normalize(scores: &Array1<f64>) -> Array1<f64> {
    let min = scores.fold(f64::INFINITY, |a, &b| a.min(b));
    let max = scores.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let span = max - min;
    if span > 0.0 && span.is_finite() {
        scores.mapv(|s| (s - min) / span)
    } else {
        Array1::ones(scores.len())
    }
}

/// One plus the number of candidates that strictly dominate each candidate:
/// at least as good on both axes and better on one. Ties share rank 1.
pub fn pareto_ranks(log1: &Array1<f64>, log2: &Array1<f64>) -> Vec<usize> {
    let dominates = |j: usize, i: usize| {
        let (a, b) = (log1[j], log2[j]);
        a >= log1[i] && b >= log2[i] && (a > log1[i] || b > log2[i])
    };
    (0..log1.len())
        .map(|i| 1 + (0..log1.len()).filter(|&j| j != i && dominates(j, i)).count())
        .collect()
}

/// Pick up to `batch` candidate rows from `xc`.
///
/// Returns the chosen rows of `xc` and their `score1·score2` values.
///
/// Errors
/// ------
/// - Model errors from prediction or pseudo-point updates.
#[allow(clippy::too_many_arguments)]
pub fn select_pareto(
    model: &SurrogateModel, xc: ArrayView2<f64>, xq: ArrayView2<f64>, nodes: ArrayView2<f64>,
    e2: ArrayView1<f64>, pred_var: ArrayView1<f64>, ranges: &Array1<f64>, batch: usize,
) -> DoeResult<(Array2<f64>, Array1<f64>)> {
    let voi = value_of_information(model, xc, xq, ranges);
    let var = model.predict(xc)?.variance;
    let cri1 = min_max_normalize(&(&var * &voi));
    let cri2 = min_max_normalize(&weighted_cv_error(xc, nodes, e2, pred_var, ranges));
    let ranks = pareto_ranks(&cri1.mapv(f64::ln), &cri2.mapv(f64::ln));
    let score = &cri1 * &cri2;

    let front: Vec<usize> = (0..ranks.len()).filter(|&i| ranks[i] == 1).collect();
    debug!(candidates = xc.nrows(), front = front.len(), batch, "pareto front");

    let picks = if front.len() >= batch {
        greedy_front(model, xc, &voi, &cri2, &score, front, batch)?
    } else {
        let mut rest: Vec<usize> = (0..ranks.len()).filter(|&i| ranks[i] != 1).collect();
        rest.sort_by(|&a, &b| ranks[a].cmp(&ranks[b]).then(score[b].total_cmp(&score[a])));
        front.into_iter().chain(rest).take(batch).collect()
    };

    let values = Array1::from_iter(picks.iter().map(|&i| score[i]));
    Ok((xc.select(Axis(0), &picks), values))
}

fn greedy_front(
    model: &SurrogateModel, xc: ArrayView2<f64>, voi: &Array1<f64>, cri2: &Array1<f64>,
    score: &Array1<f64>, mut open: Vec<usize>, batch: usize,
) -> DoeResult<Vec<usize>> {
    let mut picks = Vec::with_capacity(batch);
    let mut stack = model.clone();
    let mut local = argmax(open.iter().map(|&i| score[i]));
    while picks.len() < batch {
        let chosen = open.remove(local);
        picks.push(chosen);
        if picks.len() == batch || open.is_empty() {
            break;
        }
        let point = xc.select(Axis(0), &[chosen]);
        stack = stack.with_pseudo_points(point.view())?;
        let remaining = xc.select(Axis(0), &open);
        let var = stack.predict(remaining.view())?.variance;
        let voi_open = Array1::from_iter(open.iter().map(|&i| voi[i]));
        let cri1 = min_max_normalize(&(&var * &voi_open));
        local = argmax(open.iter().zip(cri1.iter()).map(|(&i, &c)| c * cri2[i]));
    }
    Ok(picks)
}

/// Position of the largest value; the first one on ties.
pub(crate) fn argmax<I: IntoIterator<Item = f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_v = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_v {
            best_v = v;
            best = i;
        }
    }
    best
}

/// Position of the smallest value; the first one on ties.
pub(crate) fn argmin<I: IntoIterator<Item = f64>>(values: I) -> usize {
    argmax(values.into_iter().map(|v| -v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::{kernel::KernelParams, kernel::KernelType, regression::GpRegression};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Pareto ranks and min-max normalization.
    // - Selection order: the rank-1 front before any dominated candidate.
    // -------------------------------------------------------------------------

    fn model_1d() -> SurrogateModel {
        let x = array![[0.0], [0.5], [1.0]];
        let y = array![0.0, 0.25, 1.0];
        let mut kernel = KernelParams::new(KernelType::Matern52, 1);
        kernel.lengthscales = array![0.3];
        SurrogateModel::Single(GpRegression::fit(x, y, kernel, 1e-6).expect("fit"))
    }

    #[test]
    // Purpose
    // -------
    // Ranks count the candidates that strictly dominate a point.
    //
    // Given
    // -----
    // - Four points: (1,1), (2,0) and (0,2) each dominate (0,0) and trade
    //   off against one another.
    //
    // Expect
    // ------
    // - (1,1), (2,0), (0,2) have rank 1; (0,0) has rank 4.
    fn pareto_ranks_count_dominating_points() {
        let a = array![1.0, 0.0, 2.0, 0.0];
        let b = array![1.0, 0.0, 0.0, 2.0];
        assert_eq!(pareto_ranks(&a, &b), vec![1, 4, 1, 1]);
    }

    #[test]
    // Purpose
    // -------
    // Tied candidates do not dominate each other.
    //
    // Given
    // -----
    // - Three identical scores; then two copies of (1,1) above (0,0).
    //
    // Expect
    // ------
    // - [1, 1, 1]; then [1, 1, 3].
    fn tied_candidates_share_the_front() {
        let zeros = array![0.0, 0.0, 0.0];
        assert_eq!(pareto_ranks(&zeros, &zeros), vec![1, 1, 1]);

        let a = array![1.0, 1.0, 0.0];
        assert_eq!(pareto_ranks(&a, &a), vec![1, 1, 3]);
    }

    #[test]
    // Purpose
    // -------
    // Min-max normalization maps onto [0, 1] and handles constants.
    //
    // Given
    // -----
    // - [2, 4, 6] and a constant vector.
    //
    // Expect
    // ------
    // - [0, 0.5, 1] and all ones.
    fn min_max_normalize_handles_constants() {
        let n = min_max_normalize(&array![2.0, 4.0, 6.0]);
        assert_abs_diff_eq!(n[1], 0.5, epsilon = 1e-12);
        assert_eq!(min_max_normalize(&array![3.0, 3.0]), array![1.0, 1.0]);
    }

    #[test]
    // Purpose
    // -------
    // Dominated candidates are picked only after the whole front.
    //
    // Given
    // -----
    // - A 1-D model trained on {0, 0.5, 1}; candidates at the training
    //   points (near-zero variance) and in the gaps; uniform CV error.
    //
    // Expect
    // ------
    // - Every pick ranked after the first non-front pick is itself off the
    //   front, and the batch size is respected.
    fn front_is_exhausted_before_dominated_points() {
        // Arrange
        let model = model_1d();
        let xc = array![[0.0], [0.25], [0.5], [0.75], [1.0], [0.1]];
        let xq = Array2::from_shape_fn((21, 1), |(i, _)| i as f64 / 20.0);
        let nodes = array![[0.0], [0.5], [1.0]];
        let e2 = array![0.1, 0.4, 0.2];
        let pred_var = array![1.0, 1.0, 1.0];
        let ranges = array![1.0];

        // Act
        let voi = value_of_information(&model, xc.view(), xq.view(), &ranges);
        let var = model.predict(xc.view()).expect("predict").variance;
        let c1 = min_max_normalize(&(&var * &voi));
        let c2 = min_max_normalize(&weighted_cv_error(
            xc.view(),
            nodes.view(),
            e2.view(),
            pred_var.view(),
            &ranges,
        ));
        let ranks = pareto_ranks(&c1.mapv(f64::ln), &c2.mapv(f64::ln));
        let n_front = ranks.iter().filter(|&&r| r == 1).count();
        let (picked, scores) = select_pareto(
            &model,
            xc.view(),
            xq.view(),
            nodes.view(),
            e2.view(),
            pred_var.view(),
            &ranges,
            4,
        )
        .expect("select");

        // Assert
        assert_eq!(picked.nrows(), 4);
        assert_eq!(scores.len(), 4);
        let picked_ranks: Vec<usize> = picked
            .rows()
            .into_iter()
            .map(|row| {
                let i = xc.rows().into_iter().position(|r| r == row).expect("picked from pool");
                ranks[i]
            })
            .collect();
        let first_dominated = picked_ranks.iter().position(|&r| r != 1).unwrap_or(4);
        assert!(first_dominated >= n_front.min(4));
        assert!(picked_ranks[first_dominated..].iter().all(|&r| r != 1));
    }
}
