//! Debug bundle writer for inspecting a single fit request.
//!
//! The bundle is a Markdown file holding the request, the resolved bounds,
//! the starting point and the full solver trace (or the failure).

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{FitResult, ModelKind, Observations, SolverOptions};
use crate::error::{AppError, FitError};
use crate::models::{bounds, param_specs};

/// Everything the bundle records about one request.
pub struct DebugInput<'a> {
    pub model: ModelKind,
    pub observations: &'a Observations,
    pub initial_guess: Option<&'a [f64]>,
    pub options: &'a SolverOptions,
    pub outcome: &'a Result<FitResult, FitError>,
}

/// Write the bundle under `./debug`.
pub fn write_debug_bundle(input: &DebugInput<'_>) -> Result<PathBuf, AppError> {
    write_debug_bundle_in(Path::new("debug"), input)
}

pub fn write_debug_bundle_in(dir: &Path, input: &DebugInput<'_>) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(2, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let name = serde_json::to_value(input.model)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "model".to_string());
    let path = dir.join(format!("gnf_debug_{name}_{ts}.md"));

    let mut file = File::create(&path)
        .map_err(|e| AppError::new(2, format!("Failed to create debug file: {e}")))?;
    file.write_all(render(input).as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write debug: {e}")))?;

    Ok(path)
}

fn render(input: &DebugInput<'_>) -> String {
    let obs = input.observations;
    let mut out = String::new();

    out.push_str("# gnf debug bundle\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- model: {}\n", input.model.display_name()));
    out.push_str(&format!("- strategy: {:?}\n", input.model.strategy()));
    out.push_str(&format!("- n: {}\n", obs.len()));
    out.push_str(&format!(
        "- caller guess: {}\n",
        input.initial_guess.map(fmt_vec).unwrap_or_else(|| "-".to_string())
    ));
    let o = input.options;
    out.push_str(&format!(
        "- options: max_iter={}, f_tol={:e}, x_tol={:e}, g_tol={:e}\n",
        o.max_iter, o.f_tol, o.x_tol, o.g_tol
    ));

    out.push_str("\n## Observations\n");
    out.push_str("| i | x | y |\n| - | - | - |\n");
    for (i, (x, y)) in obs.x().iter().zip(obs.y()).enumerate() {
        out.push_str(&format!("| {i} | {x} | {y} |\n"));
    }

    out.push_str("\n## Bounds\n");
    out.push_str("| parameter | lower | upper |\n| - | - | - |\n");
    let b = bounds(input.model, obs);
    for (i, spec) in param_specs(input.model).iter().enumerate() {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            spec.name, b.lower[i], b.upper[i]
        ));
    }

    match input.outcome {
        Ok(fit) => {
            let s = &fit.solver;
            out.push_str("\n## Seed\n");
            out.push_str(&format!("- source: {:?}\n", s.guess_source));
            out.push_str(&format!("- start: {}\n", fmt_vec(&s.initial_guess)));

            out.push_str("\n## Result\n");
            out.push_str(&format!("- params: {}\n", fmt_vec(&fit.values())));
            out.push_str(&format!("- r_squared: {:?}\n", fit.r_squared));
            out.push_str(&format!(
                "- sse: {:e}, bic: {:.3}\n",
                fit.quality.sse, fit.quality.bic
            ));
            out.push_str(&format!(
                "- termination: {:?} after {} iterations, {} evaluations\n",
                s.termination, s.iterations, s.evaluations
            ));

            out.push_str("\n## Trace\n");
            out.push_str("| iteration | cost | control | accepted |\n| - | - | - | - |\n");
            for step in &fit.trace {
                out.push_str(&format!(
                    "| {} | {:.6e} | {:.3e} | {} |\n",
                    step.iteration, step.cost, step.control, step.accepted
                ));
            }
        }
        Err(err) => {
            out.push_str("\n## Failure\n");
            out.push_str(&format!("- error: {err}\n"));
            out.push_str(&format!("- remediation: {}\n", err.remediation()));
            match err {
                FitError::Divergence { last_params, .. } => {
                    out.push_str(&format!("- last params: {}\n", fmt_vec(last_params)));
                }
                FitError::UndefinedGoodnessOfFit { params, .. } => {
                    out.push_str(&format!("- params: {}\n", fmt_vec(params)));
                }
                FitError::Data(_) => {}
            }
        }
    }

    out
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit_observations;

    #[test]
    fn bundle_records_trace_and_bounds() {
        let obs = Observations::new(vec![1.0, 2.0, 4.0, 8.0], vec![10.0, 7.6, 5.7, 4.4]).unwrap();
        let options = SolverOptions::default();
        let outcome = fit_observations(ModelKind::PowerLaw, &obs, None, &options);
        let input = DebugInput {
            model: ModelKind::PowerLaw,
            observations: &obs,
            initial_guess: None,
            options: &options,
            outcome: &outcome,
        };

        let dir = std::env::temp_dir().join("gnf_debug_test");
        let path = write_debug_bundle_in(&dir, &input).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("gnf_debug_power-law_"));
        assert!(text.contains("## Bounds"));
        assert!(text.contains("| consistency_index | -inf | inf |"));
        assert!(text.contains("## Trace"));
    }

    #[test]
    fn failures_are_rendered() {
        let obs = Observations::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]).unwrap();
        let options = SolverOptions::default();
        let outcome = Err(FitError::Divergence {
            model: ModelKind::Bingham,
            reason: crate::error::DivergenceReason::IterationLimit,
            last_params: vec![0.5, 1.0],
            iterations: 2000,
        });
        let input = DebugInput {
            model: ModelKind::Bingham,
            observations: &obs,
            initial_guess: Some(&[0.5, 1.0]),
            options: &options,
            outcome: &outcome,
        };
        let text = render(&input);
        assert!(text.contains("## Failure"));
        assert!(text.contains("last params: [0.500000, 1.000000]"));
    }
}
