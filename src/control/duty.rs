//! Conversion between charge percentage and hardware duty cycle.
//!
//! The charging relay interprets the duty cycle inverted: 80 % duty means
//! "do not charge", 0 % duty means "full charge", linear in between.

/// Duty value meaning "no charge" (%).
pub const DUTY_MAX: f64 = 80.0;
/// Charge percentage mapped to zero duty (full charge).
pub const CHARGE_FULL: f64 = 100.0;

/// Converts a desired charge level to the duty cycle driving the relay.
///
/// Inputs are expected in `[0, 100]`; clamping is the caller's concern.
pub fn duty_from_charge(charge_pct: f64) -> f64 {
    DUTY_MAX - charge_pct * DUTY_MAX / CHARGE_FULL
}

/// Inverse of [`duty_from_charge`], used by the simulated output to recover
/// the setpoint from the applied duty cycle.
pub fn charge_from_duty(duty_pct: f64) -> f64 {
    CHARGE_FULL - duty_pct * CHARGE_FULL / DUTY_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_charge_maps_to_max_duty() {
        assert_eq!(duty_from_charge(0.0), 80.0);
    }

    #[test]
    fn full_charge_maps_to_zero_duty() {
        assert_eq!(duty_from_charge(100.0), 0.0);
    }

    #[test]
    fn conversion_is_linear() {
        assert_eq!(duty_from_charge(50.0), 40.0);
        assert_eq!(duty_from_charge(25.0), 60.0);
    }

    #[test]
    fn round_trip_within_tolerance() {
        for i in 0..=100 {
            let charge = f64::from(i);
            let back = charge_from_duty(duty_from_charge(charge));
            assert!(
                (back - charge).abs() < 1e-9,
                "round trip failed at {charge}: got {back}"
            );
        }
    }
}
