//! controller::history — append-only record of the LOO error per iteration.
use ndarray::Array1;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub iteration: usize,
    /// Rows in the training set when the error was measured.
    pub n_samples: usize,
    /// NRMSE per QoI.
    pub nrmse: Array1<f64>,
}

impl ErrorRecord {
    pub fn max_nrmse(&self) -> f64 {
        self.nrmse.iter().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorHistory {
    records: Vec<ErrorRecord>,
}

impl ErrorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, iteration: usize, n_samples: usize, nrmse: Array1<f64>) {
        self.records.push(ErrorRecord { iteration, n_samples, nrmse });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&ErrorRecord> {
        self.records.last()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// Largest NRMSE of every record, in order.
    pub fn max_trace(&self) -> Vec<f64> {
        self.records.iter().map(ErrorRecord::max_nrmse).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Records keep insertion order and report their largest NRMSE.
    //
    // Given
    // -----
    // - Two records with two QoIs each.
    //
    // Expect
    // ------
    // - Trace (0.3, 0.05); last record is iteration 1.
    fn history_appends_in_order() {
        let mut history = ErrorHistory::new();
        history.push(0, 10, array![0.1, 0.3]);
        history.push(1, 15, array![0.05, 0.01]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.max_trace(), vec![0.3, 0.05]);
        assert_eq!(history.last().map(|r| r.iteration), Some(1));
    }
}
