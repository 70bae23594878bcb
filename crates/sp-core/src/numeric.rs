use crate::{CoreError, CoreResult};

/// Floating point type used throughout system
pub type Real = f64;

/// Natural log of ten, the factor between d(c) and d(log10 c).
pub const LN_10: Real = std::f64::consts::LN_10;

/// Slack used when deciding whether a stepped point overshoots its end.
const STEP_SLACK: Real = 1e-9;

/// Largest number of points a single scan may have.
pub const MAX_SCAN_POINTS: usize = 100_000;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v < 0.0 {
        Err(CoreError::Negative { what, value: v })
    } else {
        Ok(v)
    }
}

/// `10^x`.
#[inline]
pub fn pow10(x: Real) -> Real {
    Real::powf(10.0, x)
}

/// Number of points `stepped_points` yields for these bounds.
///
/// Fails when the count would exceed `MAX_SCAN_POINTS`, including the case
/// where `span / step` overflows to infinity.
pub fn scan_point_count(start: Real, end: Real, step: Real) -> CoreResult<usize> {
    let start = ensure_finite(start, "scan start")?;
    let end = ensure_finite(end, "scan end")?;
    let step = ensure_finite(step, "scan step")?;
    if step <= 0.0 {
        return Err(CoreError::InvalidArg {
            what: "scan step must be positive",
        });
    }

    let intervals = ((end - start).abs() / step + STEP_SLACK).floor();
    if !(intervals.is_finite() && intervals < MAX_SCAN_POINTS as Real) {
        return Err(CoreError::TooManyPoints {
            requested: intervals + 1.0,
            limit: MAX_SCAN_POINTS,
        });
    }
    Ok(intervals as usize + 1)
}

/// Points `start, start ± step, ...` walking toward `end` without passing it.
///
/// The direction follows the sign of `end - start`; `step` is a magnitude and
/// must be strictly positive. Each point is computed as `start + k * step` so
/// long scans do not accumulate rounding drift.
pub fn stepped_points(start: Real, end: Real, step: Real) -> CoreResult<Vec<Real>> {
    let count = scan_point_count(start, end, step)?;
    let direction = if end < start { -1.0 } else { 1.0 };

    Ok((0..count)
        .map(|k| start + direction * step * k as Real)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_non_negative_rejects_negative() {
        assert!(ensure_non_negative(0.0, "sigma").is_ok());
        let err = ensure_non_negative(-0.1, "sigma").unwrap_err();
        assert_eq!(
            err,
            CoreError::Negative {
                what: "sigma",
                value: -0.1
            }
        );
    }

    #[test]
    fn stepped_points_default_px_range() {
        let points = stepped_points(1.0, 14.0, 0.1).unwrap();
        assert_eq!(points.len(), 131);
        assert_eq!(points[0], 1.0);
        assert!((points[130] - 14.0).abs() < 1e-9);
    }

    #[test]
    fn stepped_points_descending() {
        let points = stepped_points(5.0, 3.0, 0.5).unwrap();
        assert_eq!(points, vec![5.0, 4.5, 4.0, 3.5, 3.0]);
    }

    #[test]
    fn stepped_points_single_point_when_bounds_equal() {
        assert_eq!(stepped_points(7.0, 7.0, 0.1).unwrap(), vec![7.0]);
    }

    #[test]
    fn stepped_points_rejects_zero_step() {
        assert!(stepped_points(1.0, 2.0, 0.0).is_err());
    }

    #[test]
    fn tiny_step_exceeds_point_limit() {
        match stepped_points(1.0, 14.0, 1e-300) {
            Err(CoreError::TooManyPoints { limit, .. }) => assert_eq!(limit, MAX_SCAN_POINTS),
            other => panic!("unexpected {other:?}"),
        }
        assert!(stepped_points(-1e300, 1e300, 1e-300).is_err());
    }

    #[test]
    fn point_limit_is_inclusive() {
        let last = (MAX_SCAN_POINTS - 1) as Real;
        assert_eq!(scan_point_count(0.0, last, 1.0).unwrap(), MAX_SCAN_POINTS);
        assert!(scan_point_count(0.0, last + 1.0, 1.0).is_err());
    }
}
