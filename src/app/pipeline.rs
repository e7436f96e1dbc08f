//! Shared fit pipeline used by the `fit` and `compare` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load data -> fit (or compare) -> optional debug bundle
//!
//! The commands can then focus on presentation and exports.

use std::path::PathBuf;

use crate::debug::{DebugInput, write_debug_bundle};
use crate::domain::{DataSource, FitConfig, FitResult, Observations, ResponseFilter, SolverOptions};
use crate::error::AppError;
use crate::fit::{ModelComparison, compare_models, fit_observations};
use crate::io::ingest::{load_observations, parse_inline};

/// All computed outputs of a single `gnf fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub observations: Observations,
    pub result: FitResult,
    pub debug_bundle: Option<PathBuf>,
}

pub fn load_data(source: &DataSource) -> Result<Observations, AppError> {
    match source {
        DataSource::File(path) => Ok(load_observations(path)?.observations),
        DataSource::Inline { x, y } => parse_inline(x, y),
    }
}

/// Load the data and fit the configured model.
///
/// With `debug` set, the bundle is written whether or not the fit succeeds.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    let observations = load_data(&config.source)?;
    let outcome = fit_observations(
        config.model,
        &observations,
        config.initial_guess.as_deref(),
        &config.options,
    );

    let debug_bundle = if config.debug {
        Some(write_debug_bundle(&DebugInput {
            model: config.model,
            observations: &observations,
            initial_guess: config.initial_guess.as_deref(),
            options: &config.options,
            outcome: &outcome,
        })?)
    } else {
        None
    };

    match outcome {
        Ok(result) => Ok(FitRun {
            observations,
            result,
            debug_bundle,
        }),
        Err(err) => {
            let err = AppError::from(err);
            Err(match debug_bundle {
                Some(path) => AppError::new(
                    err.exit_code(),
                    format!("{err}\nDebug bundle: {}", path.display()),
                ),
                None => err,
            })
        }
    }
}

/// Load the data and compare every model in the family.
pub fn run_compare(
    source: &DataSource,
    filter: ResponseFilter,
    options: &SolverOptions,
) -> Result<(Observations, ModelComparison), AppError> {
    let observations = load_data(source)?;
    let comparison = compare_models(&observations, &filter.models(), options)?;
    Ok((observations, comparison))
}
