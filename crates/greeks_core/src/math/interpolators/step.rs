//! Piecewise constant interpolation.

use super::{validate_points, Interpolator};
use crate::types::InterpolationError;
use num_traits::Float;

/// Piecewise constant interpolator.
///
/// The value `ys[i]` applies on `(xs[i-1], xs[i]]`, the convention used for
/// hazard and forward-rate curves quoted per bucket. A single point is enough.
#[derive(Debug, Clone)]
pub struct StepInterpolator<T: Float> {
    xs: Vec<T>,
    ys: Vec<T>,
}

impl<T: Float> StepInterpolator<T> {
    /// Construct from x and y data points.
    ///
    /// # Errors
    ///
    /// Same validation as [`LinearInterpolator::new`](super::LinearInterpolator::new),
    /// with a minimum of 1 point.
    pub fn new(xs: &[T], ys: &[T]) -> Result<Self, InterpolationError> {
        validate_points(xs, ys, 1)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }
}

impl<T: Float> Interpolator<T> for StepInterpolator<T> {
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        let (lo, hi) = self.domain();
        if x < lo || x > hi {
            return Err(InterpolationError::OutOfBounds {
                x: x.to_f64().unwrap_or(f64::NAN),
                min: lo.to_f64().unwrap_or(f64::NAN),
                max: hi.to_f64().unwrap_or(f64::NAN),
            });
        }
        let i = self.xs.partition_point(|&xi| xi < x);
        Ok(self.ys[i.min(self.ys.len() - 1)])
    }

    #[inline]
    fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_holds_value_up_to_knot() {
        let interp = StepInterpolator::new(&[1.0, 3.0, 5.0], &[0.01, 0.02, 0.03]).unwrap();
        assert_eq!(interp.interpolate(1.0).unwrap(), 0.01);
        assert_eq!(interp.interpolate(1.5).unwrap(), 0.02);
        assert_eq!(interp.interpolate(3.0).unwrap(), 0.02);
        assert_eq!(interp.interpolate(4.9).unwrap(), 0.03);
    }

    #[test]
    fn test_step_single_point() {
        let interp = StepInterpolator::new(&[2.0], &[0.05]).unwrap();
        assert_eq!(interp.domain(), (2.0, 2.0));
        assert_eq!(interp.interpolate_flat(0.0), 0.05);
        assert_eq!(interp.interpolate_flat(10.0), 0.05);
    }
}
