//! Calibrator capability.
//!
//! A calibrator turns a curve's tenor quotes (and its prerequisite curves)
//! into fitted ordinates. The engine only ever triggers a refit; how the fit
//! is done is the calibrator's business.
//!
//! For the semi-analytic sensitivity mode a calibrator also exposes the
//! Jacobian of ordinates with respect to quotes. The default implementation
//! differentiates [`Calibrator::fit`] by central finite differences.

use crate::market_data::curves::{CurveHandle, CurveTenor, Ordinate};
use crate::types::CalibrationError;
use std::fmt;

/// Quote step used by the finite-difference Jacobian.
pub const JACOBIAN_STEP: f64 = 1e-4;

/// Everything a calibrator may read during a fit.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationInput<'a> {
    /// Name of the curve being fitted.
    pub curve: &'a str,
    /// Tenors with the quotes to fit.
    pub tenors: &'a [CurveTenor],
    /// Prerequisite curves, already fitted.
    pub prerequisites: &'a [CurveHandle],
}

/// Derivatives of fitted ordinates with respect to tenor quotes.
///
/// `first[k][i] = ∂o_k/∂q_i`; `second[k][i][j] = ∂²o_k/∂q_i∂q_j` when requested.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteJacobian {
    first: Vec<Vec<f64>>,
    second: Option<Vec<Vec<Vec<f64>>>>,
}

impl QuoteJacobian {
    /// Builds a Jacobian from explicit matrices.
    pub fn new(first: Vec<Vec<f64>>, second: Option<Vec<Vec<Vec<f64>>>>) -> Self {
        Self { first, second }
    }

    /// Identity mapping with zero curvature, for curves whose ordinates are the quotes.
    pub fn identity(n: usize, second_order: bool) -> Self {
        let first = (0..n)
            .map(|k| (0..n).map(|i| if i == k { 1.0 } else { 0.0 }).collect())
            .collect();
        let second = second_order.then(|| vec![vec![vec![0.0; n]; n]; n]);
        Self { first, second }
    }

    /// Number of ordinates (rows).
    pub fn n_ordinates(&self) -> usize {
        self.first.len()
    }

    /// Number of quotes (columns).
    pub fn n_quotes(&self) -> usize {
        self.first.first().map_or(0, Vec::len)
    }

    /// `∂o_k/∂q_i`.
    #[inline]
    pub fn first(&self, k: usize, i: usize) -> f64 {
        self.first[k][i]
    }

    /// `∂²o_k/∂q_i∂q_j`, zero when second order was not computed.
    #[inline]
    pub fn second(&self, k: usize, i: usize, j: usize) -> f64 {
        self.second.as_ref().map_or(0.0, |s| s[k][i][j])
    }

    /// True when second derivatives are available.
    pub fn has_second_order(&self) -> bool {
        self.second.is_some()
    }
}

/// Refits a curve's ordinates from its quotes.
pub trait Calibrator: Send + Sync + fmt::Debug {
    /// Short description of the fit method.
    fn name(&self) -> &str;

    /// Fits ordinates to the quotes in `input`.
    fn fit(&self, input: &CalibrationInput<'_>) -> Result<Vec<Ordinate>, CalibrationError>;

    /// Jacobian of the fitted ordinates with respect to the quotes.
    fn quote_jacobian(
        &self,
        input: &CalibrationInput<'_>,
        second_order: bool,
    ) -> Result<QuoteJacobian, CalibrationError> {
        finite_difference_jacobian(self, input, second_order)
    }
}

/// Central finite-difference Jacobian of `calibrator.fit` with step [`JACOBIAN_STEP`].
pub fn finite_difference_jacobian<C>(
    calibrator: &C,
    input: &CalibrationInput<'_>,
    second_order: bool,
) -> Result<QuoteJacobian, CalibrationError>
where
    C: Calibrator + ?Sized,
{
    central_difference_jacobian(input.tenors.len(), second_order, |shifts| {
        let mut tenors = input.tenors.to_vec();
        for &(i, dq) in shifts {
            tenors[i] = tenors[i].with_quote(tenors[i].quote() + dq);
        }
        let shifted = CalibrationInput {
            tenors: &tenors,
            ..*input
        };
        Ok(calibrator.fit(&shifted)?.iter().map(|o| o.value).collect())
    })
}

/// Central finite-difference Jacobian of an arbitrary quote-to-ordinate map.
///
/// `fit_with` receives `(quote index, shift)` pairs, applies them on top of
/// the unshifted quotes and returns the resulting ordinate values. Steps are
/// [`JACOBIAN_STEP`]; mixed second derivatives take four extra fits per pair.
pub fn central_difference_jacobian<F>(
    n_quotes: usize,
    second_order: bool,
    mut fit_with: F,
) -> Result<QuoteJacobian, CalibrationError>
where
    F: FnMut(&[(usize, f64)]) -> Result<Vec<f64>, CalibrationError>,
{
    let h = JACOBIAN_STEP;
    let n = n_quotes;
    let base = fit_with(&[])?;
    let m = base.len();
    let mut first = vec![vec![0.0; n]; m];
    let mut up = Vec::with_capacity(n);
    let mut down = Vec::with_capacity(n);
    for i in 0..n {
        let fu = fit_with(&[(i, h)])?;
        let fd = fit_with(&[(i, -h)])?;
        for k in 0..m {
            first[k][i] = (fu[k] - fd[k]) / (2.0 * h);
        }
        up.push(fu);
        down.push(fd);
    }

    let second = if second_order {
        let mut s = vec![vec![vec![0.0; n]; n]; m];
        for i in 0..n {
            for k in 0..m {
                s[k][i][i] = (up[i][k] - 2.0 * base[k] + down[i][k]) / (h * h);
            }
            for j in (i + 1)..n {
                let fpp = fit_with(&[(i, h), (j, h)])?;
                let fpm = fit_with(&[(i, h), (j, -h)])?;
                let fmp = fit_with(&[(i, -h), (j, h)])?;
                let fmm = fit_with(&[(i, -h), (j, -h)])?;
                for k in 0..m {
                    let v = (fpp[k] - fpm[k] - fmp[k] + fmm[k]) / (4.0 * h * h);
                    s[k][i][j] = v;
                    s[k][j][i] = v;
                }
            }
        }
        Some(s)
    } else {
        None
    };

    Ok(QuoteJacobian { first, second })
}
