//! Command-line parsing for the GNF model fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ModelKind, ResponseFilter, SolverOptions};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gnf",
    version,
    about = "Fit generalized Newtonian fluid models to rheometer data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one model, print parameters and R², and optionally export.
    Fit(FitArgs),
    /// Fit a family of models and select one by BIC.
    Compare(CompareArgs),
    /// Generate synthetic observations from a model.
    Synth(SynthArgs),
    /// Print a previously exported fit JSON.
    Show(ShowArgs),
    /// List the models and their parameters.
    Models,
}

/// Where the observations come from.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Two-column data file (.csv, .txt, .dat).
    #[arg(long, value_name = "FILE", conflicts_with_all = ["x", "y"])]
    pub data: Option<PathBuf>,

    /// Shear rates as whitespace-separated text.
    #[arg(long, requires = "y", allow_hyphen_values = true)]
    pub x: Option<String>,

    /// Responses (viscosity or stress) as whitespace-separated text.
    #[arg(long, requires = "x", allow_hyphen_values = true)]
    pub y: Option<String>,
}

/// Solver tolerances; each can also come from the environment.
#[derive(Debug, Args, Clone)]
pub struct SolverArgs {
    #[arg(long, env = "GNF_MAX_ITER", default_value_t = 2000)]
    pub max_iter: usize,

    #[arg(long, env = "GNF_F_TOL", default_value_t = 1e-12)]
    pub f_tol: f64,

    #[arg(long, env = "GNF_X_TOL", default_value_t = 1e-12)]
    pub x_tol: f64,

    #[arg(long, env = "GNF_G_TOL", default_value_t = 1e-10)]
    pub g_tol: f64,
}

impl SolverArgs {
    pub fn options(&self) -> SolverOptions {
        SolverOptions {
            max_iter: self.max_iter,
            f_tol: self.f_tol,
            x_tol: self.x_tol,
            g_tol: self.g_tol,
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Model to fit.
    #[arg(short = 'm', long, value_enum)]
    pub model: ModelKind,

    #[command(flatten)]
    pub data: DataArgs,

    /// Initial guess, comma-separated in parameter order (all zeros = default).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub guess: Option<Vec<f64>>,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Print the per-point residual table.
    #[arg(long)]
    pub residuals: bool,

    /// Export per-point results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit (parameters, quality, dense curve) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Write a Markdown debug bundle under ./debug.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Which model family to compare.
    #[arg(long, value_enum, default_value_t = ResponseFilter::All)]
    pub response: ResponseFilter,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Export the chosen model's per-point results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the chosen fit to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    #[arg(short = 'm', long, value_enum)]
    pub model: ModelKind,

    /// Parameters, comma-separated in parameter order.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub params: Vec<f64>,

    #[arg(long, default_value_t = 0.01)]
    pub x_min: f64,

    #[arg(long, default_value_t = 1000.0)]
    pub x_max: f64,

    #[arg(short = 'n', long, default_value_t = 30)]
    pub count: usize,

    /// Log-normal noise level (0 = exact curve).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Evenly spaced shear rates instead of log-spaced.
    #[arg(long)]
    pub linear: bool,

    /// Write the table to a file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Fit JSON produced by `gnf fit --export-json`.
    #[arg(value_name = "JSON")]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_flags_parse() {
        let cli = Cli::try_parse_from([
            "gnf", "fit", "-m", "power-law", "--x", "1 2 4", "--y", "10 7.6 5.7", "--guess", "10,0.6",
            "--max-iter", "50",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model, ModelKind::PowerLaw);
        assert_eq!(args.guess, Some(vec![10.0, 0.6]));
        assert_eq!(args.solver.options().max_iter, 50);
        assert_eq!(args.solver.options().g_tol, 1e-10);
    }

    #[test]
    fn data_file_conflicts_with_inline() {
        let res = Cli::try_parse_from([
            "gnf", "compare", "--data", "a.csv", "--x", "1 2", "--y", "3 4",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn synth_requires_params() {
        assert!(Cli::try_parse_from(["gnf", "synth", "-m", "bingham"]).is_err());
        let cli = Cli::try_parse_from(["gnf", "synth", "-m", "bingham", "--params", "-1,2"]).unwrap();
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.params, vec![-1.0, 2.0]);
    }
}
