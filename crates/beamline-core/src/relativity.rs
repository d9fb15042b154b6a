//! Relativistic conversions for observed particle speeds.
//!
//! Observed speeds arrive in metres per second. They are converted to
//! `β = v / c`, capped just below one so the Lorentz factor stays finite,
//! and turned into a total proton energy in TeV.

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT_M_PER_S: f64 = 299_792_458.0;

/// Proton rest energy `m_p c²` in TeV.
pub const PROTON_REST_ENERGY_TEV: f64 = 9.382_720_894e-4;

/// Largest accepted `β`. Speeds at or above this are reported at the cap.
pub const MAX_BETA: f64 = 0.999_999_991;

/// `v / c` for a speed in m/s, clamped to `[0, MAX_BETA]`.
///
/// Non-finite input is treated as zero.
pub fn beta(speed_m_per_s: f64) -> f64 {
    if !speed_m_per_s.is_finite() {
        return 0.0;
    }
    (speed_m_per_s / SPEED_OF_LIGHT_M_PER_S).clamp(0.0, MAX_BETA)
}

/// Lorentz factor `γ = 1 / sqrt(1 - β²)` for a speed in m/s.
pub fn lorentz_factor(speed_m_per_s: f64) -> f64 {
    let b = beta(speed_m_per_s);
    1.0 / b.mul_add(-b, 1.0).sqrt()
}

/// Total proton energy in TeV at the given speed.
pub fn energy_from_speed(speed_m_per_s: f64) -> f64 {
    lorentz_factor(speed_m_per_s) * PROTON_REST_ENERGY_TEV
}

/// Speed as a percentage of c, in `[0, MAX_BETA * 100]`.
pub fn percent_c(speed_m_per_s: f64) -> f64 {
    beta(speed_m_per_s) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn at_rest_energy_is_rest_energy() {
        assert!(close(lorentz_factor(0.0), 1.0, 1e-15));
        assert!(close(energy_from_speed(0.0), PROTON_REST_ENERGY_TEV, 1e-18));
        assert!(close(percent_c(0.0), 0.0, 1e-15));
    }

    #[test]
    fn slow_particles_are_barely_relativistic() {
        // 250 m/s is nowhere near c.
        assert!(close(lorentz_factor(250.0), 1.0, 1e-12));
        assert!(percent_c(250.0) > 0.0);
        assert!(percent_c(250.0) < 1e-4);
    }

    #[test]
    fn half_c_has_known_gamma() {
        let gamma = lorentz_factor(SPEED_OF_LIGHT_M_PER_S / 2.0);
        assert!(close(gamma, 2.0 / 3.0_f64.sqrt(), 1e-12));
        assert!(close(percent_c(SPEED_OF_LIGHT_M_PER_S / 2.0), 50.0, 1e-9));
    }

    #[test]
    fn speed_is_capped_below_c() {
        let at_c = lorentz_factor(SPEED_OF_LIGHT_M_PER_S);
        let above_c = lorentz_factor(SPEED_OF_LIGHT_M_PER_S * 10.0);
        assert!(at_c.is_finite());
        assert!(close(at_c, above_c, 1e-9));
        // γ at the cap is roughly 7454, i.e. about 7 TeV for a proton.
        let energy = energy_from_speed(SPEED_OF_LIGHT_M_PER_S);
        assert!((6.5..7.5).contains(&energy), "energy {energy}");
        assert!(close(percent_c(SPEED_OF_LIGHT_M_PER_S), MAX_BETA * 100.0, 1e-12));
    }

    #[test]
    fn energy_grows_with_speed() {
        let mut previous = 0.0;
        for step in 0..100_u32 {
            let speed = SPEED_OF_LIGHT_M_PER_S * f64::from(step) / 100.0;
            let energy = energy_from_speed(speed);
            assert!(energy > previous);
            previous = energy;
        }
    }

    #[test]
    fn non_finite_speed_is_treated_as_rest() {
        assert!(close(beta(f64::NAN), 0.0, 1e-15));
        assert!(close(beta(f64::INFINITY), 0.0, 1e-15));
    }
}
