//! Read/write fit JSON files.
//!
//! A fit file is the portable representation of one fit:
//! - model, parameters, quality and R²
//! - solver bookkeeping
//! - the fitted curve on a dense grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveGrid, FitFile, FitResult, ResponseKind};
use crate::error::AppError;
use crate::fit::grid::{lin_space, log_space};
use crate::models::predict_curve;

const GRID_POINTS: usize = 101;

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    let out = FitFile {
        tool: "gnf".to_string(),
        generated_at: Utc::now(),
        result: fit.clone(),
        grid: build_grid(fit, GRID_POINTS),
    };

    serde_json::to_writer_pretty(file, &out)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

/// Dense curve over the observed shear range.
///
/// Viscosity curves span decades, so they get a log grid whenever the
/// observed shear rates are all positive.
pub fn build_grid(fit: &FitResult, n: usize) -> CurveGrid {
    let n = n.max(2);
    let x_min = fit.x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = fit.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let log_scale = fit.model.response() == ResponseKind::Viscosity && x_min > 0.0;
    let shear_rate = if log_scale {
        log_space(x_min, x_max, n)
    } else {
        lin_space(x_min, x_max, n)
    }
    // A single distinct shear rate gives a degenerate range.
    .unwrap_or_else(|| {
        if x_min.is_finite() {
            vec![x_min]
        } else {
            Vec::new()
        }
    });

    let response = predict_curve(fit.model, &shear_rate, &fit.values());
    CurveGrid {
        shear_rate,
        response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, Observations};
    use crate::report::assemble_result;
    use crate::report::tests::summary;

    fn power_law_fit() -> FitResult {
        let x = vec![1.0, 10.0, 100.0];
        let y = predict_curve(ModelKind::PowerLaw, &x, &[10.0, 0.6]);
        let obs = Observations::new(x, y).unwrap();
        assemble_result(ModelKind::PowerLaw, &obs, &[10.0, 0.6], summary(2), Vec::new())
    }

    #[test]
    fn viscosity_grid_is_log_spaced() {
        let grid = build_grid(&power_law_fit(), 101);
        assert_eq!(grid.shear_rate.len(), 101);
        assert!((grid.shear_rate[50] - 10.0).abs() < 1e-9);
        assert!((grid.response[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn stress_grid_is_linear_from_zero() {
        let obs = Observations::new(vec![0.0, 2.0, 4.0], vec![1.0, 5.0, 9.0]).unwrap();
        let fit = assemble_result(ModelKind::Bingham, &obs, &[1.0, 2.0], summary(2), Vec::new());
        let grid = build_grid(&fit, 5);
        assert_eq!(grid.shear_rate, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.response, vec![1.0, 3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn json_round_trip_keeps_parameters() {
        let path = std::env::temp_dir().join("gnf_curve_test.json");
        write_fit_json(&path, &power_law_fit()).unwrap();
        let back = read_fit_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.tool, "gnf");
        assert_eq!(back.result.model, ModelKind::PowerLaw);
        assert_eq!(back.result.values(), vec![10.0, 0.6]);
        assert_eq!(back.grid.shear_rate.len(), GRID_POINTS);
    }
}
