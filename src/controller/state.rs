//! controller::state — loop states and the exit code.
use serde::Serialize;

/// Why the adaptive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExitCode {
    /// The simulation budget is spent.
    Count,
    /// The largest LOO NRMSE fell below the threshold.
    Accuracy,
    /// The wall-clock budget (less the last calibration time) ran out.
    Time,
}

impl ExitCode {
    pub fn label(self) -> &'static str {
        match self {
            ExitCode::Count => "count",
            ExitCode::Accuracy => "accuracy",
            ExitCode::Time => "time",
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// `Initializing → SamplingInitial → (Fitting ⇄ EvaluatingCandidates) →
/// Converged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Initializing,
    SamplingInitial,
    Fitting,
    EvaluatingCandidates,
    Converged(ExitCode),
}

impl ControllerState {
    pub fn is_converged(self) -> bool {
        matches!(self, ControllerState::Converged(_))
    }

    pub fn exit_code(self) -> Option<ExitCode> {
        match self {
            ControllerState::Converged(code) => Some(code),
            _ => None,
        }
    }
}
