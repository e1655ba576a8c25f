//! Interpolator trait definition.

use crate::types::InterpolationError;
use num_traits::Float;

/// One-dimensional interpolation over sorted data points.
pub trait Interpolator<T: Float> {
    /// Interpolated value at `x`.
    ///
    /// # Errors
    ///
    /// `InterpolationError::OutOfBounds` when `x` lies outside [`domain`](Self::domain).
    fn interpolate(&self, x: T) -> Result<T, InterpolationError>;

    /// Inclusive range `(x_min, x_max)` covered by the data.
    fn domain(&self) -> (T, T);

    /// Value at `x` with flat extrapolation beyond either end of the domain.
    fn interpolate_flat(&self, x: T) -> T {
        let (lo, hi) = self.domain();
        let clamped = x.max(lo).min(hi);
        // Clamped points are inside the domain by construction.
        self.interpolate(clamped).unwrap_or_else(|_| T::nan())
    }

    /// True when `x` is inside the domain.
    fn in_domain(&self, x: T) -> bool {
        let (lo, hi) = self.domain();
        x >= lo && x <= hi
    }
}
