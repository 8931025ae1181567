//! Smooth polynomial windows used to taper radial features.
//!
//! All functions are continuous with `n - 1` continuous derivatives at the
//! window edges, which keeps message passing smooth as points cross a cutoff.

/// Default threshold (fraction of the range) at which the taper starts.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Default polynomial degree of the smooth step.
pub const DEFAULT_DEGREE: i32 = 3;

/// Smooth step from 0 to 1 on `[0, 1]`.
///
/// - `x <= 0`: 0
/// - `0 < x < 1`: `(n + 1) x^n - n x^(n + 1)`
/// - `x >= 1`: 1
#[inline]
pub fn soft_step(x: f32, n: i32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    let nf = n as f32;
    (x.powi(n) * (nf + 1.0 - nf * x)).min(1.0)
}

/// Window that is 1 below `threshold` and falls smoothly to 0 at `x = 1`.
#[inline]
pub fn soft_cutoff(x: f32, threshold: f32, n: i32) -> f32 {
    1.0 - soft_step((x - threshold) / (1.0 - threshold), n)
}

/// Window that vanishes at both `x = 0` and `x = 1` and is 1 in the middle.
#[inline]
pub fn soft_square_cutoff(x: f32, threshold: f32, n: i32) -> f32 {
    if x > 0.5 {
        soft_cutoff(x, threshold, n)
    } else {
        soft_cutoff(1.0 - x, threshold, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_step_endpoints() {
        assert_eq!(soft_step(-1.0, 3), 0.0);
        assert_eq!(soft_step(0.0, 3), 0.0);
        assert_eq!(soft_step(1.0, 3), 1.0);
        assert_eq!(soft_step(2.0, 3), 1.0);
        assert!((soft_step(0.5, 3) - 0.3125).abs() < 1e-6);
    }

    #[test]
    fn test_soft_cutoff_plateau() {
        assert_eq!(soft_cutoff(0.3, DEFAULT_THRESHOLD, DEFAULT_DEGREE), 1.0);
        assert_eq!(soft_cutoff(1.0, DEFAULT_THRESHOLD, DEFAULT_DEGREE), 0.0);
        let mid = soft_cutoff(0.9, DEFAULT_THRESHOLD, DEFAULT_DEGREE);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_soft_square_is_symmetric() {
        for i in 0..=20 {
            let x = i as f32 / 20.0;
            let a = soft_square_cutoff(x, DEFAULT_THRESHOLD, DEFAULT_DEGREE);
            let b = soft_square_cutoff(1.0 - x, DEFAULT_THRESHOLD, DEFAULT_DEGREE);
            assert!((a - b).abs() < 1e-6);
        }
        assert_eq!(soft_square_cutoff(0.0, DEFAULT_THRESHOLD, DEFAULT_DEGREE), 0.0);
        assert_eq!(soft_square_cutoff(0.5, DEFAULT_THRESHOLD, DEFAULT_DEGREE), 1.0);
    }
}
