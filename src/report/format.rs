//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{FitResult, GoodnessOfFit, ModelKind};
use crate::fit::selection::ModelComparison;
use crate::models::param_specs;
use crate::report::compute_residuals;

/// Format a single fit: parameters, quality and solver bookkeeping.
pub fn format_fit_summary(fit: &FitResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== gnf - {} fit ===\n", fit.display_name));
    out.push_str(&format!(
        "Response: {}\n",
        fit.model.response().axis_label()
    ));
    out.push_str(&format!("Points: n={}\n", fit.quality.n));

    out.push_str("\nParameters:\n");
    for p in &fit.params {
        out.push_str(&format!("- {:<3} = {:<14} ({})\n", p.symbol, fmt_num(p.value), p.name));
    }

    out.push_str("\nQuality:\n");
    out.push_str(&format!("- R²   : {}\n", fmt_r_squared(fit.r_squared)));
    out.push_str(&format!("- SSE  : {}\n", fmt_num(fit.quality.sse)));
    out.push_str(&format!("- RMSE : {}\n", fmt_num(fit.quality.rmse)));
    out.push_str(&format!("- BIC  : {:.3}\n", fit.quality.bic));

    let s = &fit.solver;
    out.push_str("\nSolver:\n");
    out.push_str(&format!(
        "- {:?} from {:?} guess {}\n",
        s.strategy,
        s.guess_source,
        fmt_vec(&s.initial_guess)
    ));
    out.push_str(&format!(
        "- {} iterations, {} evaluations, stopped on {:?}\n",
        s.iterations, s.evaluations, s.termination
    ));

    out
}

/// Per-point table of observed and fitted values.
pub fn format_residual_table(fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>14} {:>14} {:>14} {:>14}\n",
        "x", "y_obs", "y_fit", "residual"
    ));
    out.push_str(&format!("{:-<14} {:-<14} {:-<14} {:-<14}\n", "", "", "", ""));
    for r in compute_residuals(fit) {
        out.push_str(&format!(
            "{:>14} {:>14} {:>14} {:>14}\n",
            fmt_num(r.x),
            fmt_num(r.y_obs),
            fmt_num(r.y_fit),
            fmt_num(r.residual)
        ));
    }
    out
}

/// Format a model comparison (ranked by BIC, chosen model starred).
pub fn format_comparison(cmp: &ModelComparison) -> String {
    let mut out = String::new();

    out.push_str("=== gnf - model comparison ===\n");
    out.push_str("\nModel diagnostics:\n");
    for fit in &cmp.fits {
        let chosen = if fit.model == cmp.best.model { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<22} R²={:<10} RMSE={:<12} BIC={:.3}\n",
            fit.display_name,
            fmt_r_squared(fit.r_squared),
            fmt_num(fit.quality.rmse),
            fit.quality.bic
        ));
    }
    for (kind, err) in &cmp.failed {
        out.push_str(&format!("  (failed {}) {err}\n", kind.display_name()));
    }
    for (kind, reason) in &cmp.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }

    out.push_str("\nChosen model:\n");
    out.push_str(&format!("- {}\n", cmp.best.display_name));
    out.push_str(&format!("- params: {}\n", fmt_vec(&cmp.best.values())));
    out.push('\n');

    out
}

/// List every model with its ordered parameters.
pub fn format_models() -> String {
    let mut out = String::new();
    for model in ModelKind::ALL {
        let name = serde_json::to_value(model)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        out.push_str(&format!(
            "{} [{name}] - {:?}, {:?}\n",
            model.display_name(),
            model.strategy(),
            model.response()
        ));
        for (i, spec) in param_specs(model).iter().enumerate() {
            out.push_str(&format!("  {i}. {:<3} {}\n", spec.symbol, spec.meaning));
        }
    }
    out
}

fn fmt_r_squared(r: GoodnessOfFit) -> String {
    match r {
        GoodnessOfFit::Defined { r_squared } => format!("{r_squared:.6}"),
        GoodnessOfFit::Undefined => "undefined".to_string(),
    }
}

/// Fixed notation for ordinary magnitudes, scientific otherwise.
fn fmt_num(v: f64) -> String {
    let a = v.abs();
    if v == 0.0 || (1e-3..1e6).contains(&a) {
        format!("{v:.6}")
    } else {
        format!("{v:.6e}")
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| fmt_num(*x)).collect();
    format!("[{}]", parts.join(", "))
}
