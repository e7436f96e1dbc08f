//! Parameter specification for each model.
//!
//! For every model this module fixes:
//!
//! - the parameter order (the contract for guesses and results)
//! - a name, symbol and physical meaning for each parameter
//! - box bounds, some of which depend on the observed response range
//! - a fixed fallback seed, used when the data cannot produce a better one
//!
//! Data-derived seeds live in `fit::seed`.

use crate::domain::{Bounds, ModelKind, Observations};

/// One model parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub symbol: &'static str,
    pub meaning: &'static str,
}

const ETA_0: ParamSpec = ParamSpec {
    name: "zero_shear_viscosity",
    symbol: "η0",
    meaning: "zero-shear viscosity",
};
const ETA_INF: ParamSpec = ParamSpec {
    name: "infinite_shear_viscosity",
    symbol: "η∞",
    meaning: "infinite-shear viscosity",
};
const LAMBDA: ParamSpec = ParamSpec {
    name: "consistency",
    symbol: "λ",
    meaning: "consistency / time constant",
};
const TRANSITION: ParamSpec = ParamSpec {
    name: "transition",
    symbol: "a",
    meaning: "transition parameter",
};
const FLOW_INDEX: ParamSpec = ParamSpec {
    name: "flow_index",
    symbol: "n",
    meaning: "power-law / flow index",
};
const K: ParamSpec = ParamSpec {
    name: "consistency_index",
    symbol: "K",
    meaning: "consistency index",
};
const TAU_0: ParamSpec = ParamSpec {
    name: "yield_stress",
    symbol: "τ0",
    meaning: "yield stress",
};

const CARREAU_YASUDA: [ParamSpec; 5] = [ETA_0, ETA_INF, LAMBDA, TRANSITION, FLOW_INDEX];
const CROSS: [ParamSpec; 4] = [ETA_0, ETA_INF, LAMBDA, TRANSITION];
const SISKO: [ParamSpec; 3] = [ETA_INF, LAMBDA, FLOW_INDEX];
const WILLIAMSON: [ParamSpec; 3] = [ETA_0, LAMBDA, FLOW_INDEX];
const POWER_LAW: [ParamSpec; 2] = [K, FLOW_INDEX];
const POWELL_EYRING: [ParamSpec; 3] = [ETA_0, ETA_INF, LAMBDA];
const YIELD_LINEAR: [ParamSpec; 2] = [TAU_0, K];
const HERSCHEL_BULKLEY: [ParamSpec; 3] = [TAU_0, K, FLOW_INDEX];

/// Smallest admissible transition parameter where it appears as a divisor.
const A_MIN: f64 = 1e-6;

/// Ordered parameter list for a model.
pub fn param_specs(model: ModelKind) -> &'static [ParamSpec] {
    match model {
        ModelKind::CarreauYasuda | ModelKind::CarreauYasudaSse => &CARREAU_YASUDA,
        ModelKind::Cross | ModelKind::Ellis => &CROSS,
        ModelKind::Sisko => &SISKO,
        ModelKind::Williamson => &WILLIAMSON,
        ModelKind::PowerLaw => &POWER_LAW,
        ModelKind::PowellEyring => &POWELL_EYRING,
        ModelKind::Bingham | ModelKind::Casson => &YIELD_LINEAR,
        ModelKind::HerschelBulkley => &HERSCHEL_BULKLEY,
    }
}

/// Box bounds for a model given the observed data.
///
/// η∞ never exceeds the smallest observed viscosity; Cross-type transition
/// parameters saturate at 1.
pub fn bounds(model: ModelKind, obs: &Observations) -> Bounds {
    const INF: f64 = f64::INFINITY;
    const NEG_INF: f64 = f64::NEG_INFINITY;
    let y_min = obs.y_min();
    let y_max = obs.y_max();
    let eta_inf_max = y_min.max(0.0);

    let (lower, upper) = match model {
        ModelKind::CarreauYasuda | ModelKind::CarreauYasudaSse => (
            vec![0.0, 0.0, 0.0, A_MIN, NEG_INF],
            vec![INF, eta_inf_max, INF, INF, INF],
        ),
        ModelKind::Cross => (
            vec![eta_inf_max, 0.0, 0.0, 0.0],
            vec![INF, eta_inf_max, INF, 1.0],
        ),
        ModelKind::Ellis => (
            vec![0.0, 0.0, 0.0, A_MIN],
            vec![INF, eta_inf_max, INF, INF],
        ),
        ModelKind::Williamson => (vec![0.0, 0.0, 0.0], vec![INF, INF, INF]),
        ModelKind::PowellEyring => (
            vec![eta_inf_max, 0.0, 0.0],
            vec![INF, eta_inf_max, INF],
        ),
        ModelKind::Casson => (vec![0.0, 0.0], vec![y_max.max(0.0), INF]),
        ModelKind::HerschelBulkley => (vec![0.0, NEG_INF, 0.0], vec![INF, INF, INF]),
        ModelKind::Sisko | ModelKind::PowerLaw | ModelKind::Bingham => {
            return Bounds::unbounded(model.param_count());
        }
    };

    Bounds { lower, upper }
}

/// Fixed seed used when no data-derived seed is available.
pub fn fallback_guess(model: ModelKind) -> Vec<f64> {
    match model {
        ModelKind::CarreauYasuda | ModelKind::CarreauYasudaSse => {
            vec![3354.07, 42.2583, 2.68884e-5, 0.902192, 0.5]
        }
        ModelKind::Cross | ModelKind::Ellis => vec![3354.07, 42.2583, 2.68884e-5, 0.902192],
        ModelKind::Sisko => vec![42.2583, 2.68884e-5, 1.0],
        ModelKind::Williamson => vec![3354.07, 2.68884e-5, 0.5],
        ModelKind::PowerLaw => vec![1.0, 1.0],
        ModelKind::PowellEyring => vec![3354.07, 42.2583, 2.68884e-5],
        ModelKind::Bingham => vec![2.0, 1.0],
        ModelKind::Casson => vec![1.0, 1.0],
        ModelKind::HerschelBulkley => vec![1.0, 1.0, 0.5],
    }
}

/// Indices of parameters that enter the prediction linearly once the others
/// are fixed, with a zero prediction when they are all zero.
///
/// Empty for Casson, which is seeded by a square-root transform instead.
pub fn linear_params(model: ModelKind) -> &'static [usize] {
    match model {
        ModelKind::CarreauYasuda
        | ModelKind::CarreauYasudaSse
        | ModelKind::Cross
        | ModelKind::Ellis
        | ModelKind::PowellEyring => &[0, 1],
        ModelKind::Sisko | ModelKind::Bingham | ModelKind::HerschelBulkley => &[0, 1],
        ModelKind::Williamson | ModelKind::PowerLaw => &[0],
        ModelKind::Casson => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predict;

    fn viscosity_obs() -> Observations {
        Observations::new(vec![0.1, 1.0, 10.0], vec![90.0, 40.0, 12.0]).unwrap()
    }

    #[test]
    fn every_model_has_consistent_lengths() {
        let obs = viscosity_obs();
        for model in ModelKind::ALL {
            let k = param_specs(model).len();
            assert_eq!(bounds(model, &obs).len(), k, "{model}");
            assert_eq!(fallback_guess(model).len(), k, "{model}");
            assert!(linear_params(model).iter().all(|&i| i < k), "{model}");
        }
    }

    #[test]
    fn eta_inf_capped_by_smallest_viscosity() {
        let obs = viscosity_obs();
        let b = bounds(ModelKind::Cross, &obs);
        assert_eq!(b.upper[1], 12.0);
        assert_eq!(b.lower[1], 0.0);
        assert_eq!(b.upper[3], 1.0);
        let b = bounds(ModelKind::CarreauYasuda, &obs);
        assert_eq!(b.upper[1], 12.0);
    }

    #[test]
    fn lower_bounds_never_exceed_upper_bounds() {
        let obs = viscosity_obs();
        for model in ModelKind::ALL {
            let b = bounds(model, &obs);
            for i in 0..b.len() {
                assert!(b.lower[i] <= b.upper[i], "{model} param {i}");
            }
        }
    }

    #[test]
    fn linear_parameters_vanish_together() {
        // With every linear parameter at zero the prediction must be zero,
        // otherwise the separable seed would mis-specify its design matrix.
        for model in ModelKind::ALL {
            let lin = linear_params(model);
            if lin.is_empty() {
                continue;
            }
            let mut p = fallback_guess(model);
            for &i in lin {
                p[i] = 0.0;
            }
            for &x in &[0.5, 2.0, 30.0] {
                assert_eq!(predict(model, x, &p), 0.0, "{model} at {x}");
            }
        }
    }

    #[test]
    fn fallbacks_yield_finite_predictions() {
        for model in ModelKind::ALL {
            let p = fallback_guess(model);
            for &x in &[0.01, 1.0, 100.0] {
                assert!(predict(model, x, &p).is_finite(), "{model} at {x}");
            }
        }
    }
}
