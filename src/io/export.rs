//! Export per-point results to CSV, and observation tables.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FitResult, Observations};
use crate::error::AppError;
use crate::report::compute_residuals;

/// Write observed and fitted values, one row per input point.
pub fn write_results_csv(path: &Path, fit: &FitResult) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(file, "x,y_obs,y_fit,residual")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in compute_residuals(fit) {
        writeln!(file, "{},{},{},{}", r.x, r.y_obs, r.y_fit, r.residual)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

/// Render observations as a tab-separated table with a one-line header.
///
/// The output is accepted by `io::ingest::parse_table`.
pub fn format_observations(obs: &Observations) -> String {
    let mut out = String::from("shear_rate\tresponse\n");
    for (x, y) in obs.x().iter().zip(obs.y()) {
        out.push_str(&format!("{x}\t{y}\n"));
    }
    out
}

pub fn write_observations(path: &Path, obs: &Observations) -> Result<(), AppError> {
    std::fs::write(path, format_observations(obs))
        .map_err(|e| AppError::new(2, format!("Failed to write data file '{}': {e}", path.display())))
}
