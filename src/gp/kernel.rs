//! gp::kernel — ARD covariance functions with explicit hyperparameter fields.
//!
//! Purpose
//! -------
//! Describe the covariance of a surrogate output as a stationary ARD kernel
//! (squared exponential, exponential, Matérn 3/2 or Matérn 5/2), optionally
//! plus an ARD linear term, and expose the evaluations needed by regression,
//! co-kriging and the DoE criteria.
//!
//! Key behaviors
//! -------------
//! - [`KernelType`] parses the configuration names ("Radial Basis",
//!   "Exponential", "Matern 3/2", "Matern 5/2") and evaluates the radial
//!   profile `g(r)` of the unit-variance kernel.
//! - [`KernelParams`] stores every hyperparameter as a named field
//!   (`lengthscales`, `variance`, `linear_variances`). Calibration writes
//!   these fields directly; no hyperparameter is looked up by name.
//! - [`KernelParams::contract_gradient`] returns `Σᵢⱼ Wᵢⱼ ∂Kᵢⱼ/∂p` for every
//!   natural hyperparameter `p`, which is the only form the marginal
//!   likelihood gradient needs.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lengthscales.len()` equals the input dimension and every entry is
//!   strictly positive; `variance > 0`.
//! - When present, `linear_variances.len()` equals the input dimension.
//!
//! Conventions
//! -----------
//! - The scaled distance is `r = sqrt(Σ_d (a_d − b_d)² / ℓ_d²)`.
//! - Natural-parameter order in gradients: `ℓ_0 … ℓ_{d−1}, σ², v_0 … v_{d−1}`
//!   (the linear block only when enabled).
//!
//! Testing notes
//! -------------
//! - Unit tests check name parsing, unit diagonal of each profile, symmetry,
//!   and the contracted gradient against finite differences.
use crate::gp::errors::GpError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const SQRT3: f64 = 1.732_050_807_568_877_2;
const SQRT5: f64 = 2.236_067_977_499_79;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelType {
    RadialBasis,
    Exponential,
    Matern32,
    Matern52,
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Matern52
    }
}

impl FromStr for KernelType {
    type Err = GpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
        match key.as_str() {
            "radialbasis" | "rbf" | "squaredexponential" => Ok(KernelType::RadialBasis),
            "exponential" => Ok(KernelType::Exponential),
            "matern3/2" | "matern32" => Ok(KernelType::Matern32),
            "matern5/2" | "matern52" => Ok(KernelType::Matern52),
            _ => Err(GpError::UnknownKernel { name: s.to_string() }),
        }
    }
}

impl KernelType {
    pub fn label(self) -> &'static str {
        match self {
            KernelType::RadialBasis => "Radial Basis",
            KernelType::Exponential => "Exponential",
            KernelType::Matern32 => "Matern 3/2",
            KernelType::Matern52 => "Matern 5/2",
        }
    }

    /// Unit-variance radial profile `g(r)` with `g(0) = 1`.
    pub fn profile(self, r: f64) -> f64 {
        match self {
            KernelType::RadialBasis => (-0.5 * r * r).exp(),
            KernelType::Exponential => (-r).exp(),
            KernelType::Matern32 => (1.0 + SQRT3 * r) * (-SQRT3 * r).exp(),
            KernelType::Matern52 => (1.0 + SQRT5 * r + 5.0 * r * r / 3.0) * (-SQRT5 * r).exp(),
        }
    }

    /// `-g'(r) / r`, finite at `r = 0` for every profile.
    ///
    /// For the exponential profile the limit is infinite; it is only ever
    /// multiplied by a zero squared difference there, so `0.0` is returned.
    pub fn slope_over_r(self, r: f64) -> f64 {
        match self {
            KernelType::RadialBasis => (-0.5 * r * r).exp(),
            KernelType::Exponential => {
                if r > 0.0 {
                    (-r).exp() / r
                } else {
                    0.0
                }
            }
            KernelType::Matern32 => 3.0 * (-SQRT3 * r).exp(),
            KernelType::Matern52 => (5.0 / 3.0) * (1.0 + SQRT5 * r) * (-SQRT5 * r).exp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelParams {
    pub kind: KernelType,
    pub lengthscales: Array1<f64>,
    pub variance: f64,
    pub linear_variances: Option<Array1<f64>>,
}

impl KernelParams {
    /// Unit length scales and variance, no linear term.
    pub fn new(kind: KernelType, x_dim: usize) -> Self {
        Self { kind, lengthscales: Array1::ones(x_dim), variance: 1.0, linear_variances: None }
    }

    pub fn with_linear(mut self, variances: Array1<f64>) -> Self {
        self.linear_variances = Some(variances);
        self
    }

    pub fn x_dim(&self) -> usize {
        self.lengthscales.len()
    }

    pub fn has_linear(&self) -> bool {
        self.linear_variances.is_some()
    }

    /// Number of natural hyperparameters, excluding noise.
    pub fn n_params(&self) -> usize {
        let d = self.x_dim();
        d + 1 + if self.has_linear() { d } else { 0 }
    }

    pub fn scaled_distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .zip(self.lengthscales.iter())
            .map(|((&ai, &bi), &l)| {
                let z = (ai - bi) / l;
                z * z
            })
            .sum::<f64>()
            .sqrt()
    }

    pub fn eval(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let mut k = self.variance * self.kind.profile(self.scaled_distance(a, b));
        if let Some(v) = &self.linear_variances {
            k += a.iter().zip(b.iter()).zip(v.iter()).map(|((&ai, &bi), &vi)| vi * ai * bi).sum::<f64>();
        }
        k
    }

    pub fn matrix(&self, xa: ArrayView2<f64>, xb: ArrayView2<f64>) -> Array2<f64> {
        Array2::from_shape_fn((xa.nrows(), xb.nrows()), |(i, j)| self.eval(xa.row(i), xb.row(j)))
    }

    pub fn diag(&self, x: ArrayView2<f64>) -> Array1<f64> {
        Array1::from_shape_fn(x.nrows(), |i| self.eval(x.row(i), x.row(i)))
    }

    /// `Σᵢⱼ Wᵢⱼ ∂K(X, X)ᵢⱼ / ∂p` for every natural hyperparameter `p`.
    ///
    /// `weights` must be symmetric `n × n`; the loop visits the upper
    /// triangle once and doubles off-diagonal terms.
    pub fn contract_gradient(&self, x: ArrayView2<f64>, weights: &Array2<f64>) -> Array1<f64> {
        let d = self.x_dim();
        let n = x.nrows();
        let mut grad = Array1::<f64>::zeros(self.n_params());
        for i in 0..n {
            for j in i..n {
                let w = if i == j { weights[[i, j]] } else { 2.0 * weights[[i, j]] };
                if w == 0.0 {
                    continue;
                }
                let (xi, xj) = (x.row(i), x.row(j));
                let r = self.scaled_distance(xi, xj);
                grad[d] += w * self.kind.profile(r);
                if i != j {
                    let s = self.variance * self.kind.slope_over_r(r);
                    for dd in 0..d {
                        let delta = xi[dd] - xj[dd];
                        let l = self.lengthscales[dd];
                        grad[dd] += w * s * delta * delta / (l * l * l);
                    }
                }
                if self.has_linear() {
                    for dd in 0..d {
                        grad[d + 1 + dd] += w * xi[dd] * xj[dd];
                    }
                }
            }
        }
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Kernel name parsing and labels.
    // - Profile values at zero distance and matrix symmetry.
    // - The contracted hyperparameter gradient against finite differences.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Configuration names parse regardless of case and spacing.
    //
    // Given
    // -----
    // - "Matern 5/2", "radial basis", "MATERN 3/2", "Exponential", "cubic".
    //
    // Expect
    // ------
    // - Four variants and `UnknownKernel` for "cubic".
    fn kernel_type_parses_configuration_names() {
        assert_eq!("Matern 5/2".parse::<KernelType>(), Ok(KernelType::Matern52));
        assert_eq!("radial basis".parse::<KernelType>(), Ok(KernelType::RadialBasis));
        assert_eq!("MATERN 3/2".parse::<KernelType>(), Ok(KernelType::Matern32));
        assert_eq!("Exponential".parse::<KernelType>(), Ok(KernelType::Exponential));
        assert!(matches!("cubic".parse::<KernelType>(), Err(GpError::UnknownKernel { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Every profile equals one at zero distance and decays with distance.
    //
    // Given
    // -----
    // - All four kernel types at r = 0 and r = 1.
    //
    // Expect
    // ------
    // - g(0) = 1 and 0 < g(1) < 1.
    fn profiles_are_unit_at_origin_and_decay() {
        for kind in [
            KernelType::RadialBasis,
            KernelType::Exponential,
            KernelType::Matern32,
            KernelType::Matern52,
        ] {
            assert_abs_diff_eq!(kind.profile(0.0), 1.0, epsilon = 1e-15);
            let g1 = kind.profile(1.0);
            assert!(g1 > 0.0 && g1 < 1.0, "{kind:?} should decay, got {g1}");
        }
    }

    #[test]
    // Purpose
    // -------
    // The covariance matrix is symmetric with the signal variance on the
    // diagonal.
    //
    // Given
    // -----
    // - Matérn 5/2 with ℓ = (0.5, 2.0), σ² = 1.7 and three 2-D points.
    //
    // Expect
    // ------
    // - K = Kᵀ and diag(K) = 1.7.
    fn matrix_is_symmetric_with_variance_diagonal() {
        // Arrange
        let mut kernel = KernelParams::new(KernelType::Matern52, 2);
        kernel.lengthscales = array![0.5, 2.0];
        kernel.variance = 1.7;
        let x = array![[0.0, 0.0], [0.3, 1.0], [-1.0, 0.5]];

        // Act
        let k = kernel.matrix(x.view(), x.view());

        // Assert
        for i in 0..3 {
            assert_abs_diff_eq!(k[[i, i]], 1.7, epsilon = 1e-12);
            for j in 0..3 {
                assert_abs_diff_eq!(k[[i, j]], k[[j, i]], epsilon = 1e-14);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // `contract_gradient` agrees with central differences of `Σ Wᵢⱼ Kᵢⱼ`.
    //
    // Given
    // -----
    // - Each kernel type with a linear term, 2-D inputs, a symmetric W.
    //
    // Expect
    // ------
    // - Analytic and numerical derivatives agree to 1e-5 for every parameter.
    fn contract_gradient_matches_finite_differences() {
        let x = array![[0.1, -0.4], [0.7, 0.2], [-0.5, 0.9], [0.0, 0.05]];
        let w = array![
            [0.3, -0.2, 0.1, 0.05],
            [-0.2, 0.4, 0.0, -0.1],
            [0.1, 0.0, 0.2, 0.3],
            [0.05, -0.1, 0.3, 0.5]
        ];
        for kind in [
            KernelType::RadialBasis,
            KernelType::Exponential,
            KernelType::Matern32,
            KernelType::Matern52,
        ] {
            // Arrange
            let mut kernel = KernelParams::new(kind, 2).with_linear(array![0.3, 0.8]);
            kernel.lengthscales = array![0.6, 1.3];
            kernel.variance = 1.4;
            let objective = |k: &KernelParams| -> f64 { (&k.matrix(x.view(), x.view()) * &w).sum() };

            // Act
            let analytic = kernel.contract_gradient(x.view(), &w);

            // Assert
            let h = 1e-6;
            for p in 0..kernel.n_params() {
                let mut plus = kernel.clone();
                let mut minus = kernel.clone();
                nudge(&mut plus, p, h);
                nudge(&mut minus, p, -h);
                let numeric = (objective(&plus) - objective(&minus)) / (2.0 * h);
                assert_abs_diff_eq!(analytic[p], numeric, epsilon = 1e-5);
            }
        }
    }

    fn nudge(kernel: &mut KernelParams, p: usize, h: f64) {
        let d = kernel.x_dim();
        if p < d {
            kernel.lengthscales[p] += h;
        } else if p == d {
            kernel.variance += h;
        } else if let Some(v) = kernel.linear_variances.as_mut() {
            v[p - d - 1] += h;
        }
    }
}
