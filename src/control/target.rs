//! End-of-night charge target from the forecast temperature.

use thiserror::Error;

use crate::config::ChargeCurveConfig;

/// Failure computing the charge target.
///
/// Distinct from transient forecast failures: an inverted curve is a
/// configuration problem and must not be masked by the fallback path.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The curve bounds collapse the interpolation denominator.
    #[error("invalid charge curve: e1 ({e1}) must be < e2 ({e2})")]
    InvalidCurveBounds {
        /// Configured full-charge boundary.
        e1: f64,
        /// Configured no-charge boundary.
        e2: f64,
    },
}

/// Computes the desired end-of-night charge level in percent.
///
/// Below `e1` °C the heater charges fully; above `e2` °C not at all; in
/// between the target falls linearly from 100 % to the `e15` base level.
/// The vacation/season `discount_factor` is applied last.
///
/// # Errors
///
/// Returns [`TargetError::InvalidCurveBounds`] when the interpolation branch
/// would divide by `e2 - e1 <= 0`.
pub fn charge_target(
    temperature: f64,
    discount_factor: f64,
    curve: &ChargeCurveConfig,
) -> Result<f64, TargetError> {
    let target = if temperature < curve.e1 {
        100.0
    } else if temperature > curve.e2 {
        0.0
    } else {
        if curve.e2 <= curve.e1 {
            return Err(TargetError::InvalidCurveBounds {
                e1: curve.e1,
                e2: curve.e2,
            });
        }
        (100.0 * (curve.e2 - temperature) + curve.e15 * (temperature - curve.e1))
            / (curve.e2 - curve.e1)
    };
    Ok(target * discount_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(e1: f64, e2: f64, e15: f64) -> ChargeCurveConfig {
        ChargeCurveConfig { e1, e2, e15 }
    }

    #[test]
    fn full_charge_below_lower_bound() {
        let c = curve(5.0, 15.0, 20.0);
        assert_eq!(charge_target(-10.0, 1.0, &c).unwrap(), 100.0);
        assert_eq!(charge_target(4.9, 1.0, &c).unwrap(), 100.0);
    }

    #[test]
    fn no_charge_above_upper_bound() {
        let c = curve(5.0, 15.0, 20.0);
        assert_eq!(charge_target(15.1, 1.0, &c).unwrap(), 0.0);
        assert_eq!(charge_target(30.0, 1.0, &c).unwrap(), 0.0);
    }

    #[test]
    fn midpoint_interpolates() {
        // (100*(15-10) + 20*(10-5)) / 10 = (500 + 100) / 10 = 60
        let c = curve(5.0, 15.0, 20.0);
        let t = charge_target(10.0, 1.0, &c).unwrap();
        assert!((t - 60.0).abs() < 1e-9);
    }

    #[test]
    fn continuous_at_both_boundaries() {
        let c = curve(5.0, 15.0, 20.0);
        let at_e1 = charge_target(5.0, 1.0, &c).unwrap();
        assert!((at_e1 - 100.0).abs() < 1e-9);
        let at_e2 = charge_target(15.0, 1.0, &c).unwrap();
        assert!((at_e2 - 20.0).abs() < 1e-9);
        // just outside, the flat branches take over
        assert!((charge_target(4.999, 1.0, &c).unwrap() - 100.0).abs() < 1e-9);
        assert!(charge_target(15.001, 1.0, &c).unwrap() < 0.1);
    }

    #[test]
    fn monotonically_non_increasing_in_temperature() {
        let c = curve(5.0, 15.0, 20.0);
        let mut prev = f64::INFINITY;
        let mut temp = -5.0;
        while temp <= 25.0 {
            let t = charge_target(temp, 1.0, &c).unwrap();
            assert!(
                t <= prev + 1e-9,
                "target increased at {temp}: {prev} -> {t}"
            );
            prev = t;
            temp += 0.25;
        }
    }

    #[test]
    fn discount_scales_target() {
        let c = curve(5.0, 15.0, 20.0);
        let full = charge_target(10.0, 1.0, &c).unwrap();
        let third = charge_target(10.0, 1.0 / 3.0, &c).unwrap();
        assert!((third - full / 3.0).abs() < 1e-9);
        assert_eq!(charge_target(10.0, 0.0, &c).unwrap(), 0.0);
    }

    #[test]
    fn blackout_zeroes_even_when_freezing() {
        let c = curve(5.0, 15.0, 20.0);
        assert_eq!(charge_target(-20.0, 0.0, &c).unwrap(), 0.0);
    }

    #[test]
    fn collapsed_bounds_error_only_in_interpolation_branch() {
        let c = curve(10.0, 10.0, 20.0);
        // flat branches never divide
        assert!(charge_target(5.0, 1.0, &c).is_ok());
        assert!(charge_target(15.0, 1.0, &c).is_ok());
        // exactly on the collapsed bound hits the interpolation
        assert!(matches!(
            charge_target(10.0, 1.0, &c),
            Err(TargetError::InvalidCurveBounds { .. })
        ));
    }
}
