//! Temperature-dependent transport coefficients.
//!
//! Shear viscosity to entropy ratio, a kinked line clipped at zero:
//!
//! - `η/s(T) = (η/s)_k + a_low (T - T_k)`  for `T < T_k`
//! - `η/s(T) = (η/s)_k + a_high (T - T_k)` otherwise
//!
//! Bulk viscosity to entropy ratio, an asymmetric Lorentzian:
//!
//! - `ζ/s(T) = ζ_max / (1 + x²)`, `x = (T - T_p) / (w (1 + λ sign(T - T_p)))`
//!
//! All functions are scalar; callers map them over temperatures and rows so
//! the kink comparison and sign convention stay explicit per element.

/// Parameters of the kinked η/s curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShearParams {
    /// Kink temperature `T_k` [GeV].
    pub t_kink: f64,
    /// Slope below the kink [GeV⁻¹].
    pub low_slope: f64,
    /// Slope above the kink [GeV⁻¹].
    pub high_slope: f64,
    /// Value at the kink.
    pub at_kink: f64,
}

/// Parameters of the asymmetric-Lorentzian ζ/s curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulkParams {
    pub max: f64,
    /// Peak temperature `T_p` [GeV].
    pub t_peak: f64,
    /// Width [GeV].
    pub width: f64,
    /// Asymmetry `λ`.
    pub lambda: f64,
}

impl ShearParams {
    /// Read from a raw design row (columns 7..=10).
    pub fn from_design_row(row: &[f64]) -> Self {
        Self {
            t_kink: row[7],
            low_slope: row[8],
            high_slope: row[9],
            at_kink: row[10],
        }
    }

    pub fn eval(&self, t: f64) -> f64 {
        eta_over_s(t, self.t_kink, self.low_slope, self.high_slope, self.at_kink)
    }
}

impl BulkParams {
    /// Read from a raw design row (columns 11..=14).
    pub fn from_design_row(row: &[f64]) -> Self {
        Self {
            max: row[11],
            t_peak: row[12],
            width: row[13],
            lambda: row[14],
        }
    }

    pub fn eval(&self, t: f64) -> f64 {
        zeta_over_s(t, self.max, self.t_peak, self.width, self.lambda)
    }
}

/// Specific shear viscosity at temperature `t`. Never negative.
pub fn eta_over_s(t: f64, t_kink: f64, low_slope: f64, high_slope: f64, at_kink: f64) -> f64 {
    let y = if t < t_kink {
        at_kink + low_slope * (t - t_kink)
    } else {
        at_kink + high_slope * (t - t_kink)
    };
    // NaN and -0.0 both land on +0.0.
    if y > 0.0 { y } else { 0.0 }
}

/// Specific bulk viscosity at temperature `t`.
///
/// `sign(0) = +1`: at exactly `t == t_peak` the high-side width is used.
pub fn zeta_over_s(t: f64, max: f64, t_peak: f64, width: f64, lambda: f64) -> f64 {
    let delta = t - t_peak;
    let sign = if delta >= 0.0 { 1.0 } else { -1.0 };
    let x = delta / (width * (1.0 + lambda * sign));
    max / (1.0 + x * x)
}

/// Shear relaxation time `τ_π = b_π (η/s) / T` [GeV⁻¹].
pub fn tau_pi(t: f64, shear: &ShearParams, b_pi: f64) -> f64 {
    b_pi * shear.eval(t) / t
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEAR: ShearParams = ShearParams {
        t_kink: 0.223,
        low_slope: -0.78,
        high_slope: 0.37,
        at_kink: 0.096,
    };

    #[test]
    fn eta_over_s_on_both_sides_of_kink() {
        let below = SHEAR.eval(0.1);
        assert!((below - 0.19194).abs() < 1e-12, "below kink: {below}");
        let above = SHEAR.eval(0.3);
        assert!((above - 0.12449).abs() < 1e-12, "above kink: {above}");
    }

    #[test]
    fn eta_over_s_is_continuous_at_kink() {
        for &(t_kink, at_kink) in &[(0.223, 0.096), (0.15, 0.0), (0.3, 0.25)] {
            let v = eta_over_s(t_kink, t_kink, -2.0, 3.0, at_kink);
            assert_eq!(v, at_kink);
        }
    }

    #[test]
    fn eta_over_s_never_negative() {
        let steep = ShearParams {
            t_kink: 0.25,
            low_slope: 5.0,
            high_slope: -5.0,
            at_kink: 0.01,
        };
        for i in 0..=200 {
            let t = 0.05 + i as f64 * 0.002;
            let v = steep.eval(t);
            assert!(v >= 0.0, "negative η/s {v} at T={t}");
            assert!(!v.is_sign_negative(), "-0.0 at T={t}");
        }
        assert_eq!(eta_over_s(0.1, f64::NAN, 1.0, 1.0, 0.1), 0.0);
    }

    #[test]
    fn zeta_over_s_peaks_at_peak_temperature() {
        for &lambda in &[-0.8, -0.12, 0.0, 0.095, 0.8] {
            let v = zeta_over_s(0.12, 0.13, 0.12, 0.072, lambda);
            assert_eq!(v, 0.13);
        }
    }

    #[test]
    fn zeta_over_s_asymmetry_uses_side_width() {
        let bulk = BulkParams {
            max: 0.1,
            t_peak: 0.2,
            width: 0.05,
            lambda: 0.5,
        };
        // High side: width 0.075 → x = 1 at dT = 0.075.
        assert!((bulk.eval(0.275) - 0.05).abs() < 1e-15);
        // Low side: width 0.025 → x = 1 at dT = -0.025.
        assert!((bulk.eval(0.175) - 0.05).abs() < 1e-15);
    }

    #[test]
    fn shear_relaxation_time() {
        let t = 0.3;
        let expected = 5.0 * SHEAR.eval(t) / t;
        assert!((tau_pi(t, &SHEAR, 5.0) - expected).abs() < 1e-15);
    }
}
