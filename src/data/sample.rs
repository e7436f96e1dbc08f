//! Synthetic observations generated from a model at known parameters.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ModelKind, Observations};
use crate::error::AppError;
use crate::fit::grid::{lin_space, log_space};
use crate::models::{param_specs, predict_curve};

/// What to generate.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub model: ModelKind,
    pub params: Vec<f64>,
    pub x_min: f64,
    pub x_max: f64,
    pub count: usize,
    /// Standard deviation of the log-noise; 0 gives the exact curve.
    pub noise: f64,
    pub seed: u64,
    /// Evenly spaced shear rates instead of log-spaced ones.
    pub linear: bool,
}

pub fn generate_sample(spec: &SampleSpec) -> Result<Observations, AppError> {
    let expected = spec.model.param_count();
    if spec.params.len() != expected {
        let names: Vec<&str> = param_specs(spec.model).iter().map(|p| p.name).collect();
        return Err(AppError::new(
            2,
            format!(
                "{} takes {expected} parameters ({}), got {}.",
                spec.model,
                names.join(", "),
                spec.params.len()
            ),
        ));
    }
    if spec.count < 2 {
        return Err(AppError::new(2, "Sample count must be at least 2."));
    }
    if !(spec.noise.is_finite() && spec.noise >= 0.0) {
        return Err(AppError::new(2, "Noise level must be a finite value >= 0."));
    }

    let x = if spec.linear {
        lin_space(spec.x_min, spec.x_max, spec.count)
    } else {
        log_space(spec.x_min, spec.x_max, spec.count)
    }
    .ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "Invalid shear-rate range {}..{} (log spacing needs 0 < min < max).",
                spec.x_min, spec.x_max
            ),
        )
    })?;

    let mut y = predict_curve(spec.model, &x, &spec.params);

    if spec.noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(spec.seed);
        let normal = Normal::new(0.0, spec.noise)
            .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;
        // Mean correction keeps E[exp(noise)] == 1.
        let correction = 0.5 * spec.noise * spec.noise;
        for v in &mut y {
            *v *= (normal.sample(&mut rng) - correction).exp();
        }
    }

    Ok(Observations::new(x, y)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SampleSpec {
        SampleSpec {
            model: ModelKind::Cross,
            params: vec![500.0, 2.0, 2.5, 0.75],
            x_min: 1e-2,
            x_max: 1e3,
            count: 21,
            noise: 0.0,
            seed: 7,
            linear: false,
        }
    }

    #[test]
    fn noiseless_sample_lies_on_the_curve() {
        let obs = generate_sample(&spec()).unwrap();
        assert_eq!(obs.len(), 21);
        assert!((obs.x()[10] - 10f64.powf(0.5)).abs() < 1e-9);
        let exact = predict_curve(ModelKind::Cross, obs.x(), &spec().params);
        assert_eq!(obs.y(), exact.as_slice());
    }

    #[test]
    fn same_seed_same_noise() {
        let noisy = SampleSpec {
            noise: 0.05,
            ..spec()
        };
        let a = generate_sample(&noisy).unwrap();
        let b = generate_sample(&noisy).unwrap();
        assert_eq!(a, b);

        let other = generate_sample(&SampleSpec { seed: 8, ..noisy }).unwrap();
        assert_ne!(a.y(), other.y());
        assert!(a.y().iter().all(|v| *v > 0.0));
    }

    #[test]
    fn bad_requests_are_rejected() {
        let err = generate_sample(&SampleSpec {
            params: vec![1.0],
            ..spec()
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let msg = err.to_string();
        assert!(msg.contains("takes 4 parameters"), "{msg}");
        assert!(msg.contains("zero_shear_viscosity"), "{msg}");
        assert!(!msg.contains("Initial guess"), "{msg}");

        assert!(generate_sample(&SampleSpec { x_min: 0.0, ..spec() }).is_err());
        assert!(generate_sample(&SampleSpec { x_min: 0.0, linear: true, ..spec() }).is_ok());
    }
}
