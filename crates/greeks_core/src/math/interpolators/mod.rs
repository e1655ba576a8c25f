//! Interpolation methods used by curves.
//!
//! All interpolators are generic over `T: num_traits::Float` and implement
//! the [`Interpolator`] trait:
//! - `interpolate(x: T) -> Result<T, InterpolationError>`: value inside the domain
//! - `domain() -> (T, T)`: valid interpolation range
//! - `interpolate_flat(x: T) -> T`: flat extrapolation outside the domain
//!
//! ## Available Interpolators
//!
//! - [`LinearInterpolator`]: piecewise linear between data points
//! - [`StepInterpolator`]: piecewise constant, each value holding up to its abscissa
//!
//! ## Example
//!
//! ```
//! use greeks_core::math::interpolators::{Interpolator, LinearInterpolator};
//!
//! let interp = LinearInterpolator::<f64>::new(&[1.0, 5.0], &[0.01, 0.02]).unwrap();
//! let y = interp.interpolate(3.0).unwrap();
//! assert!((y - 0.015).abs() < 1e-12);
//! assert_eq!(interp.interpolate_flat(10.0), 0.02);
//! ```

mod linear;
mod step;
mod traits;

pub use linear::LinearInterpolator;
pub use step::StepInterpolator;
pub use traits::Interpolator;

use crate::types::InterpolationError;
use num_traits::Float;

/// Checks paired abscissae/ordinates: equal lengths, at least `need` points,
/// strictly increasing abscissae.
pub(crate) fn validate_points<T: Float>(
    xs: &[T],
    ys: &[T],
    need: usize,
) -> Result<(), InterpolationError> {
    if xs.len() != ys.len() {
        return Err(InterpolationError::InvalidInput(format!(
            "xs and ys must have same length: got {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < need {
        return Err(InterpolationError::InsufficientData {
            got: xs.len(),
            need,
        });
    }
    if let Some(index) = xs.windows(2).position(|w| w[1] <= w[0]) {
        return Err(InterpolationError::NonMonotonic { index: index + 1 });
    }
    Ok(())
}
