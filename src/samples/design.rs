//! samples::design — space-filling designs and distance helpers.
//!
//! Purpose
//! -------
//! Generate Latin-hypercube and uniform designs inside box bounds, and
//! provide the range-scaled distance helpers shared by the DoE strategies.
//!
//! Key behaviors
//! -------------
//! - [`latin_hypercube`] stratifies every dimension into `n` equal cells and
//!   places exactly one point per cell, jittered uniformly inside it.
//! - [`closest_node`] and [`weights_node`] measure distance after dividing
//!   each coordinate by the variable range; a zero range counts as 1.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lower.len() == upper.len()` and every bound is finite with
//!   `lower < upper`; otherwise `SampleError::InvalidBounds`.
//! - All randomness flows through the caller's RNG, so seeded runs repeat.
use crate::samples::errors::{SampleError, SampleResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{seq::SliceRandom, Rng};

fn check_bounds(lower: &Array1<f64>, upper: &Array1<f64>) -> SampleResult<()> {
    if lower.len() != upper.len() {
        return Err(SampleError::ShapeMismatch {
            what: "bounds",
            expected: lower.len(),
            found: upper.len(),
        });
    }
    for (index, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(SampleError::InvalidBounds { index, lower: lo, upper: hi });
        }
    }
    Ok(())
}

/// `n × d` Latin-hypercube design inside `[lower, upper]`.
pub fn latin_hypercube<R: Rng + ?Sized>(
    n: usize, lower: &Array1<f64>, upper: &Array1<f64>, rng: &mut R,
) -> SampleResult<Array2<f64>> {
    check_bounds(lower, upper)?;
    let d = lower.len();
    let mut design = Array2::<f64>::zeros((n, d));
    let mut cells: Vec<usize> = (0..n).collect();
    for j in 0..d {
        cells.shuffle(rng);
        let width = upper[j] - lower[j];
        for (i, &cell) in cells.iter().enumerate() {
            let u: f64 = rng.gen();
            design[[i, j]] = lower[j] + (cell as f64 + u) / n as f64 * width;
        }
    }
    Ok(design)
}

/// `n × d` design of independent uniform draws inside `[lower, upper]`.
pub fn uniform<R: Rng + ?Sized>(
    n: usize, lower: &Array1<f64>, upper: &Array1<f64>, rng: &mut R,
) -> SampleResult<Array2<f64>> {
    check_bounds(lower, upper)?;
    let d = lower.len();
    let mut design = Array2::<f64>::zeros((n, d));
    for i in 0..n {
        for j in 0..d {
            design[[i, j]] = rng.gen_range(lower[j]..upper[j]);
        }
    }
    Ok(design)
}

/// Column-wise `max − min` of `x` (zeros for an empty matrix).
pub fn input_range(x: ArrayView2<f64>) -> Array1<f64> {
    if x.nrows() == 0 {
        return Array1::zeros(x.ncols());
    }
    let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&a, &b| a.max(b));
    let min = x.fold_axis(Axis(0), f64::INFINITY, |&a, &b| a.min(b));
    max - min
}

fn scaled_sq_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, range: &Array1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .zip(range.iter())
        .map(|((&ai, &bi), &r)| {
            let s = if r > 0.0 { r } else { 1.0 };
            let d = (ai - bi) / s;
            d * d
        })
        .sum()
}

/// Index of the row of `nodes` closest to `x` in range-scaled distance.
pub fn closest_node(x: ArrayView1<f64>, nodes: ArrayView2<f64>, range: &Array1<f64>) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, node) in nodes.rows().into_iter().enumerate() {
        let d = scaled_sq_distance(x, node, range);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Normalized `exp(−d²)` weights of `x` against every row of `nodes`.
///
/// Falls back to uniform weights when every kernel value underflows.
pub fn weights_node(x: ArrayView1<f64>, nodes: ArrayView2<f64>, range: &Array1<f64>) -> Array1<f64> {
    let n = nodes.nrows();
    let raw = Array1::from_iter(nodes.rows().into_iter().map(|node| {
        (-scaled_sq_distance(x, node, range)).exp()
    }));
    let total = raw.sum();
    if total > 0.0 && total.is_finite() {
        raw / total
    } else {
        Array1::from_elem(n, 1.0 / n.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - LHS stratification and bounds.
    // - Range-scaled nearest node and weights.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Every LHS stratum of every dimension holds exactly one point.
    //
    // Given
    // -----
    // - n = 10 on [−1, 1] × [0, 5].
    //
    // Expect
    // ------
    // - Each column visits the 10 cells once and stays inside the bounds.
    fn latin_hypercube_is_stratified() {
        // Arrange
        let lower = array![-1.0, 0.0];
        let upper = array![1.0, 5.0];
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        // Act
        let x = latin_hypercube(10, &lower, &upper, &mut rng).expect("lhs");

        // Assert
        for j in 0..2 {
            let mut seen = [false; 10];
            for i in 0..10 {
                let u = (x[[i, j]] - lower[j]) / (upper[j] - lower[j]);
                assert!((0.0..1.0).contains(&u));
                seen[(u * 10.0).floor() as usize] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    // Purpose
    // -------
    // Degenerate bounds are rejected.
    //
    // Given
    // -----
    // - lower = upper = 2 in the second dimension.
    //
    // Expect
    // ------
    // - `InvalidBounds { index: 1, .. }` from both generators.
    fn designs_reject_zero_width_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let lower = array![0.0, 2.0];
        let upper = array![1.0, 2.0];
        assert!(matches!(
            latin_hypercube(4, &lower, &upper, &mut rng),
            Err(SampleError::InvalidBounds { index: 1, .. })
        ));
        assert!(matches!(
            uniform(4, &lower, &upper, &mut rng),
            Err(SampleError::InvalidBounds { index: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Distances are measured relative to the variable ranges.
    //
    // Given
    // -----
    // - Nodes (0, 0) and (10, 0.5), query (4, 0.5), ranges (100, 1).
    //
    // Expect
    // ------
    // - Node 1 is closest after scaling, and weights sum to one with node 1
    //   carrying more mass.
    fn closest_node_uses_scaled_distance() {
        // Arrange
        let nodes = array![[0.0, 0.0], [10.0, 0.5]];
        let q = array![4.0, 0.5];
        let range = array![100.0, 1.0];

        // Act
        let idx = closest_node(q.view(), nodes.view(), &range);
        let w = weights_node(q.view(), nodes.view(), &range);

        // Assert
        assert_eq!(idx, 1);
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
        assert!(w[1] > w[0]);
        assert_eq!(input_range(nodes.view()), array![10.0, 0.5]);
    }
}
