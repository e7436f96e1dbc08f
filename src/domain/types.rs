//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for comparisons

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Which measurement axis a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Axis {
    ShearRate,
    Response,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::ShearRate => write!(f, "shear rate"),
            Axis::Response => write!(f, "response"),
        }
    }
}

/// Supported generalized Newtonian fluid models.
///
/// Carreau-Yasuda appears twice: once fitted as a least-squares curve fit and
/// once as an explicit sum-of-squares objective handed to the bounded minimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    CarreauYasuda,
    CarreauYasudaSse,
    Cross,
    Ellis,
    Sisko,
    Williamson,
    PowerLaw,
    PowellEyring,
    Bingham,
    Casson,
    HerschelBulkley,
}

impl ModelKind {
    pub const ALL: [ModelKind; 11] = [
        ModelKind::CarreauYasuda,
        ModelKind::CarreauYasudaSse,
        ModelKind::Cross,
        ModelKind::Ellis,
        ModelKind::Sisko,
        ModelKind::Williamson,
        ModelKind::PowerLaw,
        ModelKind::PowellEyring,
        ModelKind::Bingham,
        ModelKind::Casson,
        ModelKind::HerschelBulkley,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::CarreauYasuda => "Carreau-Yasuda",
            ModelKind::CarreauYasudaSse => "Carreau-Yasuda (SSE)",
            ModelKind::Cross => "Cross",
            ModelKind::Ellis => "Ellis",
            ModelKind::Sisko => "Sisko",
            ModelKind::Williamson => "Williamson",
            ModelKind::PowerLaw => "Power-Law",
            ModelKind::PowellEyring => "Powell-Eyring",
            ModelKind::Bingham => "Bingham",
            ModelKind::Casson => "Casson",
            ModelKind::HerschelBulkley => "Herschel-Bulkley",
        }
    }

    /// Number of free parameters.
    pub fn param_count(self) -> usize {
        crate::models::param_specs(self).len()
    }

    /// Which optimizer estimates this model.
    pub fn strategy(self) -> Strategy {
        match self {
            ModelKind::PowerLaw | ModelKind::CarreauYasudaSse => Strategy::Minimize,
            _ => Strategy::LeastSquares,
        }
    }

    /// Whether the model predicts viscosity or shear stress.
    pub fn response(self) -> ResponseKind {
        match self {
            ModelKind::Bingham | ModelKind::Casson | ModelKind::HerschelBulkley => ResponseKind::Stress,
            _ => ResponseKind::Viscosity,
        }
    }

    /// Admissible shear rates.
    ///
    /// Fractional powers of negative shear rates are undefined, and the
    /// Power-Law / Sisko forms blow up at zero for exponents below one.
    pub fn shear_domain(self) -> Domain {
        match self {
            ModelKind::PowerLaw | ModelKind::Sisko => Domain::Positive,
            ModelKind::Bingham | ModelKind::PowellEyring => Domain::Any,
            _ => Domain::NonNegative,
        }
    }

    /// Admissible observed responses.
    pub fn response_domain(self) -> Domain {
        match self.response() {
            ResponseKind::Viscosity => Domain::Positive,
            ResponseKind::Stress => Domain::Any,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Optimization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Bounded nonlinear least squares against the raw data.
    LeastSquares,
    /// Bounded minimization of the sum of squared errors.
    Minimize,
}

/// Physical quantity on the response axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Viscosity,
    Stress,
}

impl ResponseKind {
    pub fn axis_label(self) -> &'static str {
        match self {
            ResponseKind::Viscosity => "Viscosity [Pa.s]",
            ResponseKind::Stress => "Shear stress [Pa]",
        }
    }
}

/// Value domain required by a model on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Any,
    NonNegative,
    Positive,
}

impl Domain {
    pub fn admits(self, v: f64) -> bool {
        match self {
            Domain::Any => true,
            Domain::NonNegative => v >= 0.0,
            Domain::Positive => v > 0.0,
        }
    }

    pub fn requirement(self, axis: Axis) -> &'static str {
        match (self, axis) {
            (Domain::Any, _) => "finite values",
            (Domain::NonNegative, Axis::ShearRate) => "non-negative shear rates",
            (Domain::NonNegative, Axis::Response) => "a non-negative response",
            (Domain::Positive, Axis::ShearRate) => "strictly positive shear rates",
            (Domain::Positive, Axis::Response) => "a strictly positive response",
        }
    }
}

/// Ordered (shear rate, response) pairs.
///
/// Construction checks the model-independent invariants: non-empty, equal
/// length, finite entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservations")]
pub struct Observations {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Wire shape of `Observations`; deserialization goes through `Observations::new`.
#[derive(Deserialize)]
struct RawObservations {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<RawObservations> for Observations {
    type Error = DataError;

    fn try_from(raw: RawObservations) -> Result<Self, Self::Error> {
        Observations::new(raw.x, raw.y)
    }
}

impl Observations {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, DataError> {
        if x.len() != y.len() {
            return Err(DataError::LengthMismatch { x: x.len(), y: y.len() });
        }
        if x.is_empty() {
            return Err(DataError::Empty);
        }
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(DataError::NonFinite { axis: Axis::ShearRate, index });
        }
        if let Some(index) = y.iter().position(|v| !v.is_finite()) {
            return Err(DataError::NonFinite { axis: Axis::Response, index });
        }
        Ok(Self { x, y })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn y_min(&self) -> f64 {
        self.y.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn y_max(&self) -> f64 {
        self.y.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn x_max(&self) -> f64 {
        self.x.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest strictly positive shear rate, if any.
    pub fn x_min_positive(&self) -> Option<f64> {
        self.x
            .iter()
            .copied()
            .filter(|v| *v > 0.0)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// A single fit request: model + data + optional caller guess.
#[derive(Debug, Clone)]
pub struct FitRequest {
    pub model: ModelKind,
    pub observations: Observations,
    pub initial_guess: Option<Vec<f64>>,
}

/// Per-parameter box bounds, in the model's parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(with = "open_bound::lower")]
    pub lower: Vec<f64>,
    #[serde(with = "open_bound::upper")]
    pub upper: Vec<f64>,
}

/// JSON has no infinities: an open bound is written as `null`.
mod open_bound {
    use serde::{Deserialize, Deserializer, Serializer};

    fn write<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(|b| b.is_finite().then_some(*b)))
    }

    fn read<'de, D: Deserializer<'de>>(d: D, open: f64) -> Result<Vec<f64>, D::Error> {
        let v = Vec::<Option<f64>>::deserialize(d)?;
        Ok(v.into_iter().map(|b| b.unwrap_or(open)).collect())
    }

    pub mod lower {
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
            super::write(v, s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
            super::read(d, f64::NEG_INFINITY)
        }
    }

    pub mod upper {
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
            super::write(v, s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
            super::read(d, f64::INFINITY)
        }
    }
}

impl Bounds {
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Clamp each component into `[lower, upper]`.
    pub fn project(&self, p: &mut [f64]) {
        for (i, v) in p.iter_mut().enumerate() {
            *v = v.clamp(self.lower[i], self.upper[i]);
        }
    }

    pub fn contains(&self, p: &[f64]) -> bool {
        p.iter()
            .enumerate()
            .all(|(i, v)| *v >= self.lower[i] && *v <= self.upper[i])
    }

    pub fn at_lower(&self, i: usize, v: f64) -> bool {
        self.lower[i].is_finite() && v <= self.lower[i]
    }

    pub fn at_upper(&self, i: usize, v: f64) -> bool {
        self.upper[i].is_finite() && v >= self.upper[i]
    }
}

/// Where the starting point of a fit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessSource {
    Default,
    Caller,
}

/// Solver tolerances and limits.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub max_iter: usize,
    /// Relative reduction of the cost below which the fit is converged.
    pub f_tol: f64,
    /// Relative parameter step below which the fit is converged.
    pub x_tol: f64,
    /// Scaled gradient size below which the fit is converged.
    pub g_tol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            f_tol: 1e-12,
            x_tol: 1e-12,
            g_tol: 1e-10,
        }
    }
}

/// How a solver finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Residuals vanished to rounding level.
    ZeroResidual,
    FunctionTolerance,
    StepTolerance,
    GradientTolerance,
    /// No step reduces the cost, and the point is stationary.
    NoFurtherReduction,
}

/// One solver iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub iteration: usize,
    pub cost: f64,
    /// Damping (least squares) or accepted step length (minimizer).
    pub control: f64,
    pub accepted: bool,
}

pub type SolverTrace = Vec<TraceStep>;

/// Solver bookkeeping attached to every result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSummary {
    pub strategy: Strategy,
    pub guess_source: GuessSource,
    pub initial_guess: Vec<f64>,
    pub bounds: Bounds,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// A fitted parameter with its name from the model descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParam {
    pub name: String,
    pub symbol: String,
    pub value: f64,
}

/// Coefficient of determination, or the reason it has no value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GoodnessOfFit {
    Defined { r_squared: f64 },
    /// The observed response is constant (SST = 0).
    Undefined,
}

impl GoodnessOfFit {
    pub fn value(self) -> Option<f64> {
        match self {
            GoodnessOfFit::Defined { r_squared } => Some(r_squared),
            GoodnessOfFit::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, GoodnessOfFit::Undefined)
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub n: usize,
}

/// Output of one fit request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ModelKind,
    pub display_name: String,
    pub params: Vec<FittedParam>,
    pub x: Vec<f64>,
    pub y_obs: Vec<f64>,
    /// Prediction at each observed shear rate.
    pub y_fit: Vec<f64>,
    pub r_squared: GoodnessOfFit,
    pub quality: FitQuality,
    pub solver: SolverSummary,
    #[serde(skip)]
    pub trace: SolverTrace,
}

impl FitResult {
    /// Parameter values in descriptor order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }

    pub fn param(&self, symbol: &str) -> Option<f64> {
        self.params.iter().find(|p| p.symbol == symbol).map(|p| p.value)
    }
}

/// Model family filter for comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFilter {
    Viscosity,
    Stress,
    All,
}

impl ResponseFilter {
    pub fn models(self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|m| match self {
                ResponseFilter::Viscosity => m.response() == ResponseKind::Viscosity,
                ResponseFilter::Stress => m.response() == ResponseKind::Stress,
                ResponseFilter::All => true,
            })
            .collect()
    }
}

/// Where the CLI reads observations from.
#[derive(Debug, Clone)]
pub enum DataSource {
    File(PathBuf),
    Inline { x: String, y: String },
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and environment).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub source: DataSource,
    pub model: ModelKind,
    pub initial_guess: Option<Vec<f64>>,
    pub options: SolverOptions,
    pub show_residuals: bool,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub debug: bool,
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub result: FitResult,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub shear_rate: Vec<f64>,
    pub response: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_reject_malformed_input() {
        assert_eq!(Observations::new(vec![], vec![]), Err(DataError::Empty));
        assert_eq!(
            Observations::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0]),
            Err(DataError::LengthMismatch { x: 3, y: 2 })
        );
        assert_eq!(
            Observations::new(vec![1.0, f64::NAN], vec![1.0, 2.0]),
            Err(DataError::NonFinite { axis: Axis::ShearRate, index: 1 })
        );
    }

    #[test]
    fn observation_extremes() {
        let obs = Observations::new(vec![0.0, 0.5, 4.0], vec![9.0, 3.0, 6.0]).unwrap();
        assert_eq!(obs.y_min(), 3.0);
        assert_eq!(obs.y_max(), 9.0);
        assert_eq!(obs.x_max(), 4.0);
        assert_eq!(obs.x_min_positive(), Some(0.5));
    }

    #[test]
    fn bounds_projection_clamps_each_component() {
        let b = Bounds {
            lower: vec![0.0, f64::NEG_INFINITY],
            upper: vec![1.0, 5.0],
        };
        let mut p = [-2.0, 7.0];
        b.project(&mut p);
        assert_eq!(p, [0.0, 5.0]);
        assert!(b.contains(&p));
        assert!(b.at_lower(0, p[0]));
        assert!(b.at_upper(1, p[1]));
        assert!(!b.at_lower(1, -1e300));
    }

    #[test]
    fn open_bounds_survive_json() {
        let b = Bounds {
            lower: vec![0.0, f64::NEG_INFINITY],
            upper: vec![f64::INFINITY, 2.5],
        };
        let text = serde_json::to_string(&b).unwrap();
        assert_eq!(text, r#"{"lower":[0.0,null],"upper":[null,2.5]}"#);
        let back: Bounds = serde_json::from_str(&text).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn filter_splits_families() {
        let stress = ResponseFilter::Stress.models();
        assert_eq!(
            stress,
            vec![ModelKind::Bingham, ModelKind::Casson, ModelKind::HerschelBulkley]
        );
        assert_eq!(ResponseFilter::Viscosity.models().len(), 8);
    }

    #[test]
    fn deserialized_observations_are_validated() {
        let ok: Observations = serde_json::from_str(r#"{"x":[1.0,2.0],"y":[3.0,4.0]}"#).unwrap();
        assert_eq!(ok.len(), 2);

        let err = serde_json::from_str::<Observations>(r#"{"x":[1.0,2.0],"y":[3.0]}"#).unwrap_err();
        assert!(err.to_string().contains("must match"), "{err}");
        assert!(serde_json::from_str::<Observations>(r#"{"x":[],"y":[]}"#).is_err());
    }
}
