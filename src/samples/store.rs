//! samples::store — the append-only input/output sample set.
//!
//! Purpose
//! -------
//! Pair the simulated inputs `X` (rows = samples, columns = random
//! variables) with the outputs `Y` (columns = QoIs) and keep them aligned.
//!
//! Invariants & assumptions
//! ------------------------
//! - `x.nrows() == y.nrows()` at every observable point.
//! - Rows are only ever appended; [`SampleSet::leave_one_out`] returns a
//!   transient copy and leaves `self` untouched.
use crate::samples::errors::{SampleError, SampleResult};
use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl SampleSet {
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> SampleResult<Self> {
        if x.nrows() != y.nrows() {
            return Err(SampleError::ShapeMismatch {
                what: "sample rows",
                expected: x.nrows(),
                found: y.nrows(),
            });
        }
        Ok(Self { x, y })
    }

    pub fn empty(x_dim: usize, y_dim: usize) -> Self {
        Self { x: Array2::zeros((0, x_dim)), y: Array2::zeros((0, y_dim)) }
    }

    /// Append `x_new`/`y_new` row-wise.
    ///
    /// Errors
    /// ------
    /// - `ShapeMismatch` when the new blocks disagree in rows with each other
    ///   or in columns with the stored matrices. Nothing is appended then.
    pub fn append(&mut self, x_new: ArrayView2<f64>, y_new: ArrayView2<f64>) -> SampleResult<()> {
        if x_new.nrows() != y_new.nrows() {
            return Err(SampleError::ShapeMismatch {
                what: "appended rows",
                expected: x_new.nrows(),
                found: y_new.nrows(),
            });
        }
        if x_new.ncols() != self.x_dim() {
            return Err(SampleError::ShapeMismatch {
                what: "input columns",
                expected: self.x_dim(),
                found: x_new.ncols(),
            });
        }
        if y_new.ncols() != self.y_dim() {
            return Err(SampleError::ShapeMismatch {
                what: "output columns",
                expected: self.y_dim(),
                found: y_new.ncols(),
            });
        }
        let x = stack_rows(self.x.view(), x_new)?;
        let y = stack_rows(self.y.view(), y_new)?;
        self.x = x;
        self.y = y;
        Ok(())
    }

    pub fn leave_one_out(&self, row: usize) -> SampleResult<SampleSet> {
        if row >= self.len() {
            return Err(SampleError::RowOutOfRange { row, len: self.len() });
        }
        let keep: Vec<usize> = (0..self.len()).filter(|&i| i != row).collect();
        Ok(Self { x: self.x.select(Axis(0), &keep), y: self.y.select(Axis(0), &keep) })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_dim(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_dim(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    pub fn output(&self, qoi: usize) -> ArrayView1<f64> {
        self.y.column(qoi)
    }

    /// Population variance of each output column.
    pub fn output_variances(&self) -> Array1<f64> {
        if self.is_empty() {
            return Array1::zeros(self.y_dim());
        }
        self.y.var_axis(Axis(0), 0.0)
    }
}

fn stack_rows(a: ArrayView2<f64>, b: ArrayView2<f64>) -> SampleResult<Array2<f64>> {
    concatenate(Axis(0), &[a.view(), b.view()]).map_err(|_| SampleError::ShapeMismatch {
        what: "stacked rows",
        expected: a.ncols(),
        found: b.ncols(),
    })
}
