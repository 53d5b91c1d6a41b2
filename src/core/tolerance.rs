//! Tolerance evaluation of one measurement against a part type template
//!
//! Two ordered phases, short-circuiting on the first failure:
//! 1. completeness: every template dimension must be present
//! 2. range: `|measured - nominal| <= tolerance` for dimensions that declare both
//!
//! Dimensions in the measurement that the template does not declare are ignored.

use std::collections::BTreeMap;

use tracing::warn;

use crate::core::error::{QcError, QcResult};
use crate::entities::measurement::Verdict;
use crate::entities::part_type::DimensionSpec;

/// Why a dimension did not pass
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Missing {
        name: String,
    },
    OutOfTolerance {
        name: String,
        measured: f64,
        nominal: f64,
        tolerance: f64,
    },
}

impl Finding {
    pub fn dimension(&self) -> &str {
        match self {
            Finding::Missing { name } | Finding::OutOfTolerance { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::Missing { name } => write!(f, "{}: not measured", name),
            Finding::OutOfTolerance {
                name,
                measured,
                nominal,
                tolerance,
            } => write!(
                f,
                "{}: {} outside {} ± {} (deviation {:.4})",
                name,
                measured,
                nominal,
                tolerance,
                (measured - nominal).abs()
            ),
        }
    }
}

/// Evaluate a measurement. Never fails: malformed template data yields
/// [`Verdict::Rejected`].
pub fn evaluate(measured: &BTreeMap<String, f64>, template: &[DimensionSpec]) -> Verdict {
    match try_evaluate(measured, template) {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(error = %err, "tolerance evaluation degraded, rejecting measurement");
            Verdict::Rejected
        }
    }
}

/// Evaluate a measurement, surfacing malformed input as
/// [`QcError::EvaluationDegraded`] instead of rejecting silently.
pub fn try_evaluate(
    measured: &BTreeMap<String, f64>,
    template: &[DimensionSpec],
) -> QcResult<Verdict> {
    for spec in template {
        check_spec(spec)?;
        if !measured.contains_key(&spec.name) {
            return Ok(Verdict::Rejected);
        }
    }

    for spec in template {
        let Some((nominal, tolerance)) = spec.range() else {
            continue;
        };
        let value = measured_value(measured, &spec.name)?;
        if (value - nominal).abs() > tolerance {
            return Ok(Verdict::Rejected);
        }
    }

    Ok(Verdict::Approved)
}

/// Every reason a measurement fails, in template order (missing first).
///
/// Used for reporting; the verdict itself comes from [`evaluate`].
pub fn findings(measured: &BTreeMap<String, f64>, template: &[DimensionSpec]) -> Vec<Finding> {
    let mut out: Vec<Finding> = template
        .iter()
        .filter(|spec| !measured.contains_key(&spec.name))
        .map(|spec| Finding::Missing {
            name: spec.name.clone(),
        })
        .collect();

    for spec in template {
        let (Some((nominal, tolerance)), Some(&value)) = (spec.range(), measured.get(&spec.name))
        else {
            continue;
        };
        if (value - nominal).abs() > tolerance {
            out.push(Finding::OutOfTolerance {
                name: spec.name.clone(),
                measured: value,
                nominal,
                tolerance,
            });
        }
    }

    out
}

fn check_spec(spec: &DimensionSpec) -> QcResult<()> {
    if spec.name.trim().is_empty() {
        return Err(QcError::EvaluationDegraded(
            "template contains a dimension without a name".to_string(),
        ));
    }
    if let Some(tol) = spec.tolerance {
        if !tol.is_finite() || tol < 0.0 {
            return Err(QcError::EvaluationDegraded(format!(
                "dimension '{}' has invalid tolerance {}",
                spec.name, tol
            )));
        }
    }
    if spec.nominal.is_some_and(|n| !n.is_finite()) {
        return Err(QcError::EvaluationDegraded(format!(
            "dimension '{}' has a non-finite nominal value",
            spec.name
        )));
    }
    Ok(())
}

fn measured_value(measured: &BTreeMap<String, f64>, name: &str) -> QcResult<f64> {
    match measured.get(name) {
        Some(v) if v.is_finite() => Ok(*v),
        Some(v) => Err(QcError::EvaluationDegraded(format!(
            "dimension '{}' has non-finite measured value {}",
            name, v
        ))),
        None => Err(QcError::EvaluationDegraded(format!(
            "dimension '{}' vanished between phases",
            name
        ))),
    }
}
