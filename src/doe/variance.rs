//! doe::variance — error-weighted variance criteria (IMSEw and MMSEw).
//!
//! Both strategies pick one point at a time and pseudo-add it before the
//! next pick, so a batch spreads out instead of clustering at the single
//! most uncertain spot. The weight `φ` of a location is the CV error of the
//! training node closest to it.
//!
//! - IMSEw: for each candidate, pseudo-add it and average `φ(xq)·var⁺(xq)`
//!   over the integration pool; pick the minimum. Candidates are scored on
//!   the rayon pool. Both pools are redrawn for every pick.
//! - MMSEw: pick the maximum of `φ(x)·var(x)` over one candidate pool.
use crate::doe::{
    errors::DoeResult,
    pareto::{argmax, argmin},
};
use crate::gp::bank::SurrogateModel;
use crate::samples::design::{closest_node, uniform};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

/// CV error of the closest node for every row of `points`.
pub fn node_weights(
    points: ArrayView2<f64>, nodes: ArrayView2<f64>, e2: ArrayView1<f64>, ranges: &Array1<f64>,
) -> Array1<f64> {
    Array1::from_iter(points.rows().into_iter().map(|p| e2[closest_node(p, nodes, ranges)]))
}

/// Integrated weighted variance over `xq` after pseudo-adding `candidate`.
pub fn integrated_mse(
    model: &SurrogateModel, candidate: ArrayView2<f64>, xq: ArrayView2<f64>,
    phi: &Array1<f64>,
) -> DoeResult<f64> {
    let updated = model.with_pseudo_points(candidate)?;
    let var = updated.predict(xq)?.variance;
    Ok(phi.dot(&var) / xq.nrows().max(1) as f64)
}

/// IMSEw batch: `batch` greedy picks, each scored over fresh pools.
///
/// Returns the picked points and the criterion value at each pick.
#[allow(clippy::too_many_arguments)]
pub fn select_imse<R: Rng + ?Sized>(
    model: &SurrogateModel, nodes: ArrayView2<f64>, e2: ArrayView1<f64>, lower: &Array1<f64>,
    upper: &Array1<f64>, n_candidates: usize, n_integration: usize, batch: usize, rng: &mut R,
) -> DoeResult<(Array2<f64>, Array1<f64>)> {
    let ranges = upper - lower;
    let mut stack = model.clone();
    let mut points = Array2::<f64>::zeros((batch, lower.len()));
    let mut values = Array1::<f64>::zeros(batch);
    for pick in 0..batch {
        let xc = uniform(n_candidates, lower, upper, rng)?;
        let xq = uniform(n_integration, lower, upper, rng)?;
        let phi = node_weights(xq.view(), nodes, e2, &ranges);
        let scores = (0..xc.nrows())
            .into_par_iter()
            .map(|i| integrated_mse(&stack, xc.slice(s![i..i + 1, ..]), xq.view(), &phi))
            .collect::<DoeResult<Vec<f64>>>()?;
        let best = argmin(scores.iter().copied());
        let point = xc.select(Axis(0), &[best]);
        stack = stack.with_pseudo_points(point.view())?;
        points.row_mut(pick).assign(&point.row(0));
        values[pick] = scores[best];
        debug!(pick, imse = scores[best], "imsew pick");
    }
    Ok((points, values))
}

/// MMSEw batch: `batch` greedy picks from one candidate pool.
pub fn select_mmse<R: Rng + ?Sized>(
    model: &SurrogateModel, nodes: ArrayView2<f64>, e2: ArrayView1<f64>, lower: &Array1<f64>,
    upper: &Array1<f64>, n_candidates: usize, batch: usize, rng: &mut R,
) -> DoeResult<(Array2<f64>, Array1<f64>)> {
    let ranges = upper - lower;
    let xc = uniform(n_candidates, lower, upper, rng)?;
    let phi = node_weights(xc.view(), nodes, e2, &ranges);
    let mut stack = model.clone();
    let mut points = Array2::<f64>::zeros((batch, lower.len()));
    let mut values = Array1::<f64>::zeros(batch);
    for pick in 0..batch {
        let var = stack.predict(xc.view())?.variance;
        let scores = &var * &phi;
        let best = argmax(scores.iter().copied());
        let point = xc.select(Axis(0), &[best]);
        stack = stack.with_pseudo_points(point.view())?;
        points.row_mut(pick).assign(&point.row(0));
        values[pick] = scores[best];
    }
    Ok((points, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::{kernel::KernelParams, kernel::KernelType, regression::GpRegression};
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Nearest-node error weights.
    // - IMSEw/MMSEw batches: size, bounds and the effect of pseudo-adding.
    // -------------------------------------------------------------------------

    fn model_1d() -> SurrogateModel {
        let x = array![[0.0], [0.4], [1.0]];
        let y = array![1.0, 0.0, 2.0];
        let mut kernel = KernelParams::new(KernelType::Matern52, 1);
        kernel.lengthscales = array![0.2];
        SurrogateModel::Single(GpRegression::fit(x, y, kernel, 1e-6).expect("fit"))
    }

    #[test]
    // Purpose
    // -------
    // Each point takes the error of its closest training node.
    //
    // Given
    // -----
    // - Nodes {0, 1} with errors {1, 5}; points 0.2 and 0.9.
    //
    // Expect
    // ------
    // - Weights [1, 5].
    fn node_weights_use_closest_node() {
        let w = node_weights(
            array![[0.2], [0.9]].view(),
            array![[0.0], [1.0]].view(),
            array![1.0, 5.0].view(),
            &array![1.0],
        );
        assert_eq!(w, array![1.0, 5.0]);
    }

    #[test]
    // Purpose
    // -------
    // MMSEw does not pick the same location twice within a batch.
    //
    // Given
    // -----
    // - A 1-D model, uniform errors, 50 candidates, batch of 3.
    //
    // Expect
    // ------
    // - Three distinct points inside [0, 1].
    fn mmse_batch_spreads_out() {
        // Arrange
        let model = model_1d();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let nodes = array![[0.0], [0.4], [1.0]];
        let e2 = array![1.0, 1.0, 1.0];

        // Act
        let (points, values) = select_mmse(
            &model,
            nodes.view(),
            e2.view(),
            &array![0.0],
            &array![1.0],
            50,
            3,
            &mut rng,
        )
        .expect("mmse");

        // Assert
        assert_eq!(points.dim(), (3, 1));
        assert!(values.iter().all(|&v| v > 0.0));
        for i in 0..3 {
            assert!((0.0..=1.0).contains(&points[[i, 0]]));
            for j in 0..i {
                assert!((points[[i, 0]] - points[[j, 0]]).abs() > 1e-9);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // IMSEw picks lower the integrated variance and return the batch size.
    //
    // Given
    // -----
    // - A 1-D model, 30 candidates, 40 integration points, batch of 2.
    //
    // Expect
    // ------
    // - Two finite, non-negative criterion values and points in bounds.
    // - Pseudo-adding a point in the widest gap lowers the integrated
    //   variance on a fixed grid.
    fn imse_batch_reduces_integrated_variance() {
        // Arrange
        let model = model_1d();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let nodes = array![[0.0], [0.4], [1.0]];
        let e2 = array![1.0, 1.0, 1.0];
        let xq = Array2::from_shape_fn((41, 1), |(i, _)| i as f64 / 40.0);
        let baseline = model.predict(xq.view()).expect("predict").variance.sum() / 41.0;

        // Act
        let (points, values) = select_imse(
            &model,
            nodes.view(),
            e2.view(),
            &array![0.0],
            &array![1.0],
            30,
            40,
            2,
            &mut rng,
        )
        .expect("imse");

        // Assert
        assert_eq!(points.nrows(), 2);
        assert!(points.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(values.iter().all(|&v| v.is_finite() && v >= 0.0));
        let phi = Array1::ones(41);
        let gap = integrated_mse(&model, array![[0.7]].view(), xq.view(), &phi).expect("imse");
        assert!(gap < baseline);
    }
}
