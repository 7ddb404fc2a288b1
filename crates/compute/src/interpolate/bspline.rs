//! Interpolating B-spline of configurable degree with analytic derivatives.
//!
//! Knots are clamped at the sample ends with interior knots at the running
//! averages of the sample sites; the control coefficients come from solving
//! the collocation system, and derivatives are B-splines of lower degree
//! obtained by differencing the control coefficients.

use nalgebra::{DMatrix, DVector};

use thermoelast_core::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct BSpline {
    degree: usize,
    knots: Vec<f64>,
    coeffs: Vec<f64>,
}

fn find_span(knots: &[f64], degree: usize, x: f64) -> usize {
    let n = knots.len() - degree - 1;
    if x >= knots[n] {
        return n - 1;
    }
    if x <= knots[degree] {
        return degree;
    }
    let mut lo = degree;
    let mut hi = n;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if x < knots[mid] {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    lo
}

/// The `degree + 1` basis functions that are nonzero on `span`, evaluated at
/// `x` (Cox-de Boor recursion).
fn basis_funs(knots: &[f64], degree: usize, span: usize, x: f64) -> Vec<f64> {
    let mut values = vec![0.0; degree + 1];
    values[0] = 1.0;
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    for j in 1..=degree {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom != 0.0 { values[r] / denom } else { 0.0 };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    values
}

impl BSpline {
    /// Interpolating spline through `(x, y)`; `x` must be strictly ascending.
    /// The degree is capped at `x.len() - 1`.
    pub fn interpolating(x: &[f64], y: &[f64], degree: usize) -> Result<Self> {
        let n = x.len();
        if n < 2 || y.len() != n {
            return Err(Error::numeric("spline interpolation needs at least two samples"));
        }
        let k = degree.max(1).min(n - 1);

        let mut knots = Vec::with_capacity(n + k + 1);
        knots.extend(std::iter::repeat(x[0]).take(k + 1));
        for j in 1..n - k {
            knots.push(x[j..j + k].iter().sum::<f64>() / k as f64);
        }
        knots.extend(std::iter::repeat(x[n - 1]).take(k + 1));

        let mut a = DMatrix::<f64>::zeros(n, n);
        for (row, &xi) in x.iter().enumerate() {
            let span = find_span(&knots, k, xi);
            for (m, &value) in basis_funs(&knots, k, span, xi).iter().enumerate() {
                a[(row, span - k + m)] = value;
            }
        }
        let coeffs = a
            .lu()
            .solve(&DVector::from_column_slice(y))
            .ok_or_else(|| Error::numeric("b-spline collocation solve"))?;

        Ok(Self { degree: k, knots, coeffs: coeffs.iter().copied().collect() })
    }

    /// De Boor evaluation; outside the knot range the end polynomial is used.
    pub fn eval(&self, x: f64) -> f64 {
        let k = self.degree;
        if self.coeffs.is_empty() {
            return 0.0;
        }
        let span = find_span(&self.knots, k, x);
        if k == 0 {
            return self.coeffs[span];
        }
        let mut d: Vec<f64> = (0..=k).map(|j| self.coeffs[span - k + j]).collect();
        for r in 1..=k {
            for j in (r..=k).rev() {
                let i = j + span - k;
                let denom = self.knots[j + 1 + span - r] - self.knots[i];
                let alpha = if denom != 0.0 { (x - self.knots[i]) / denom } else { 0.0 };
                d[j] = (1.0 - alpha) * d[j - 1] + alpha * d[j];
            }
        }
        d[k]
    }

    /// The derivative spline (degree lowered by one).
    pub fn derivative(&self) -> BSpline {
        let k = self.degree;
        if k == 0 || self.coeffs.len() < 2 {
            // derivative of a piecewise constant: identically zero
            return BSpline { degree: 0, knots: vec![self.knots[0], *self.knots.last().unwrap()], coeffs: vec![0.0] };
        }
        let n = self.coeffs.len();
        let mut coeffs = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            let denom = self.knots[i + k + 1] - self.knots[i + 1];
            let q = if denom != 0.0 {
                k as f64 * (self.coeffs[i + 1] - self.coeffs[i]) / denom
            } else {
                0.0
            };
            coeffs.push(q);
        }
        BSpline {
            degree: k - 1,
            knots: self.knots[1..self.knots.len() - 1].to_vec(),
            coeffs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolates_samples() {
        let x: [f64; 7] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y: Vec<f64> = x.iter().map(|&x| (0.5 * x).sin()).collect();
        let s = BSpline::interpolating(&x, &y, 5).unwrap();
        for (&xi, &yi) in x.iter().zip(&y) {
            assert!((s.eval(xi) - yi).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reproduces_cubic_exactly() {
        let x = [0.0, 0.7, 1.1, 2.0, 2.5, 3.3];
        let f = |x: f64| 1.0 - x + 0.25 * x * x * x;
        let y: Vec<f64> = x.iter().map(|&x| f(x)).collect();
        let s = BSpline::interpolating(&x, &y, 3).unwrap();
        let ds = s.derivative();
        let dds = ds.derivative();
        for &xi in &[0.3, 1.5, 2.2, 3.0] {
            assert!((s.eval(xi) - f(xi)).abs() < 1e-9);
            assert!((ds.eval(xi) - (-1.0 + 0.75 * xi * xi)).abs() < 1e-8);
            assert!((dds.eval(xi) - 1.5 * xi).abs() < 1e-8);
        }
    }

    #[test]
    fn test_degree_capped_for_few_samples() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 4.0];
        let s = BSpline::interpolating(&x, &y, 5).unwrap();
        assert!((s.eval(1.0) - 1.0).abs() < 1e-10);
        // degree 2 through three parabola points is exact
        assert!((s.eval(1.5) - 2.25).abs() < 1e-9);
    }
}
