//! Error types.
//!
//! The engine reports three recoverable conditions (`FitError`). The binary
//! converts them into an `AppError` carrying a process exit code.

use crate::domain::{Axis, ModelKind};

/// Malformed or unusable input, detected before any optimization starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("No observations supplied.")]
    Empty,

    #[error("Shear rate has {x} values but response has {y}; they must match.")]
    LengthMismatch { x: usize, y: usize },

    #[error("Non-finite {axis} value at index {index}.")]
    NonFinite { axis: Axis, index: usize },

    #[error("{model} has {required} parameters but only {got} observations were supplied.")]
    TooFewObservations {
        model: ModelKind,
        required: usize,
        got: usize,
    },

    #[error("{model} requires {requirement}; {axis}[{index}] = {value}.")]
    OutOfDomain {
        model: ModelKind,
        axis: Axis,
        requirement: &'static str,
        index: usize,
        value: f64,
    },

    #[error("Initial guess has {got} components but {model} takes {expected}.")]
    GuessLength {
        model: ModelKind,
        expected: usize,
        got: usize,
    },

    #[error("Initial guess for {name} is not finite.")]
    NonFiniteGuess { name: &'static str },
}

/// Why a solver gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DivergenceReason {
    #[error("residuals are not finite at the initial guess")]
    NonFiniteStart,
    #[error("the Jacobian is singular (no parameter moves the prediction)")]
    SingularJacobian,
    #[error("iteration limit reached before convergence")]
    IterationLimit,
    #[error("every parameter is pinned at a bound")]
    PinnedAtBounds,
    #[error("no further reduction possible away from a stationary point")]
    Stalled,
    #[error("the solution contains non-finite parameters")]
    NonFiniteSolution,
}

/// Conditions reported by a fit request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("{model} fit diverged after {iterations} iterations: {reason}.")]
    Divergence {
        model: ModelKind,
        reason: DivergenceReason,
        /// Last parameters the solver held. Not trustworthy.
        last_params: Vec<f64>,
        iterations: usize,
    },

    #[error("R² is undefined for {model}: the observed response is constant.")]
    UndefinedGoodnessOfFit { model: ModelKind, params: Vec<f64> },
}

impl FitError {
    /// Short advice for whoever decides whether to retry.
    pub fn remediation(&self) -> &'static str {
        match self {
            FitError::Data(_) => "Fix the input data and resubmit.",
            FitError::Divergence { .. } => "Retry with a different initial guess.",
            FitError::UndefinedGoodnessOfFit { .. } => {
                "Parameters may be usable, but no quality figure can be reported."
            }
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = match &err {
            FitError::Data(_) => 2,
            FitError::Divergence { .. } => 4,
            FitError::UndefinedGoodnessOfFit { .. } => 5,
        };
        AppError::new(code, format!("{err} {}", err.remediation()))
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        FitError::from(err).into()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_data_from_divergence() {
        let data: AppError = DataError::Empty.into();
        assert_eq!(data.exit_code(), 2);

        let diverged: AppError = FitError::Divergence {
            model: ModelKind::Cross,
            reason: DivergenceReason::IterationLimit,
            last_params: vec![1.0, 0.5, 0.1, 0.8],
            iterations: 2000,
        }
        .into();
        assert_eq!(diverged.exit_code(), 4);
        assert!(diverged.to_string().contains("initial guess"));
    }

    #[test]
    fn remediation_differs_by_condition() {
        let data = FitError::Data(DataError::LengthMismatch { x: 3, y: 2 });
        let undefined = FitError::UndefinedGoodnessOfFit {
            model: ModelKind::Bingham,
            params: vec![5.0, 0.0],
        };
        assert_ne!(data.remediation(), undefined.remediation());
        assert!(data.to_string().contains("3 values"));
    }
}
