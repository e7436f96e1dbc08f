//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - runs a fit, a comparison or the synthetic generator
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, CompareArgs, DataArgs, FitArgs, ShowArgs, SynthArgs};
use crate::data::sample::{SampleSpec, generate_sample};
use crate::domain::{DataSource, FitConfig};
use crate::error::AppError;
use crate::report::format::{format_comparison, format_fit_summary, format_models, format_residual_table};

pub mod pipeline;

/// Entry point for the `gnf` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; flags and the real environment still apply.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Compare(args) => handle_compare(args),
        Command::Synth(args) => handle_synth(args),
        Command::Show(args) => handle_show(args),
        Command::Models => {
            print!("{}", format_models());
            Ok(())
        }
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    println!("{}", format_fit_summary(&run.result));
    if config.show_residuals {
        println!("{}", format_residual_table(&run.result));
    }
    if let Some(path) = &run.debug_bundle {
        eprintln!("Debug bundle: {}", path.display());
    }

    if let Some(path) = &config.export_csv {
        crate::io::export::write_results_csv(path, &run.result)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::curve::write_fit_json(path, &run.result)?;
    }

    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let source = data_source(&args.data)?;
    let (_, cmp) = pipeline::run_compare(&source, args.response, &args.solver.options())?;

    print!("{}", format_comparison(&cmp));
    println!("{}", format_fit_summary(&cmp.best));

    if let Some(path) = &args.export {
        crate::io::export::write_results_csv(path, &cmp.best)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::curve::write_fit_json(path, &cmp.best)?;
    }

    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let obs = generate_sample(&SampleSpec {
        model: args.model,
        params: args.params,
        x_min: args.x_min,
        x_max: args.x_max,
        count: args.count,
        noise: args.noise,
        seed: args.seed,
        linear: args.linear,
    })?;

    match &args.out {
        Some(path) => crate::io::export::write_observations(path, &obs)?,
        None => print!("{}", crate::io::export::format_observations(&obs)),
    }
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let file = crate::io::curve::read_fit_json(&args.file)?;
    println!("Saved by {} at {}", file.tool, file.generated_at.to_rfc3339());
    println!("{}", format_fit_summary(&file.result));
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    Ok(FitConfig {
        source: data_source(&args.data)?,
        model: args.model,
        initial_guess: args.guess.clone(),
        options: args.solver.options(),
        show_residuals: args.residuals,
        export_csv: args.export.clone(),
        export_json: args.export_json.clone(),
        debug: args.debug,
    })
}

fn data_source(args: &DataArgs) -> Result<DataSource, AppError> {
    match (&args.data, &args.x, &args.y) {
        (Some(path), _, _) => Ok(DataSource::File(path.clone())),
        (None, Some(x), Some(y)) => Ok(DataSource::Inline {
            x: x.clone(),
            y: y.clone(),
        }),
        _ => Err(AppError::new(2, "Provide --data FILE, or both --x and --y.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn fit_args(argv: &[&str]) -> FitArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args,
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn config_prefers_the_data_file() {
        let args = fit_args(&["gnf", "fit", "-m", "cross", "--data", "flow.dat", "--debug"]);
        let config = fit_config_from_args(&args).unwrap();
        assert!(matches!(config.source, DataSource::File(ref p) if p.ends_with("flow.dat")));
        assert!(config.debug);
        assert!(config.initial_guess.is_none());
    }

    #[test]
    fn missing_data_is_a_usage_error() {
        let args = fit_args(&["gnf", "fit", "-m", "cross"]);
        assert_eq!(fit_config_from_args(&args).unwrap_err().exit_code(), 2);
    }
}
