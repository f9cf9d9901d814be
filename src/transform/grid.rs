//! Temperature grid generation.
//!
//! The transformed design samples η/s and ζ/s on a fixed, evenly spaced
//! temperature grid. Grid size and endpoints are baked into every trained
//! emulator, so they are constants here.

use crate::error::PipelineError;

/// Number of grid temperatures per curve.
pub const NUM_T: usize = 10;
/// Lowest grid temperature [GeV].
pub const T_MIN: f64 = 0.135;
/// Highest grid temperature [GeV].
pub const T_MAX: f64 = 0.4;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, PipelineError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(PipelineError::Config(format!(
            "Invalid grid range: min={min}, max={max} (must be finite and max>min)."
        )));
    }
    if steps < 2 {
        return Err(PipelineError::Config("Grid steps must be >= 2.".to_string()));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push(min + step * i as f64);
    }
    // Pin the upper endpoint exactly.
    out[steps - 1] = max;
    Ok(out)
}

/// The emulator's temperature grid, `linspace(T_MIN, T_MAX, NUM_T)`.
pub fn temperature_grid() -> [f64; NUM_T] {
    let step = (T_MAX - T_MIN) / (NUM_T as f64 - 1.0);
    let mut out = [0.0; NUM_T];
    for (i, t) in out.iter_mut().enumerate() {
        *t = T_MIN + step * i as f64;
    }
    out[NUM_T - 1] = T_MAX;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(0.1, 0.35, 100).unwrap();
        assert_eq!(v.len(), 100);
        assert_eq!(v[0], 0.1);
        assert_eq!(v[99], 0.35);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn linspace_rejects_bad_ranges() {
        assert!(linspace(0.4, 0.1, 10).is_err());
        assert!(linspace(0.1, 0.4, 1).is_err());
        assert!(linspace(f64::NAN, 0.4, 10).is_err());
    }

    #[test]
    fn temperature_grid_matches_linspace() {
        let grid = temperature_grid();
        let reference = linspace(T_MIN, T_MAX, NUM_T).unwrap();
        assert_eq!(grid.as_slice(), reference.as_slice());
        assert_eq!(grid[0], 0.135);
        assert_eq!(grid[NUM_T - 1], 0.4);
        assert!((grid[1] - (0.135 + 0.265 / 9.0)).abs() < 1e-15);
    }
}
