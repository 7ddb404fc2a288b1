//! Polynomial least squares, Eulerian strain and gradient helpers shared by
//! the thermodynamic engine and the modulus assembler.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1};

use thermoelast_core::error::{Error, Result};

/// A dense polynomial in ascending-power coefficient form.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Horner evaluation.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    /// The derivative polynomial.
    pub fn derivative(&self) -> Polynomial {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(n, &c)| n as f64 * c)
            .collect();
        Polynomial::new(coeffs)
    }
}

/// Least-squares fit of a polynomial with `order + 1` coefficients.
pub fn polyfit(x: &[f64], y: &[f64], order: usize) -> Result<Polynomial> {
    if x.len() != y.len() || x.is_empty() {
        return Err(Error::numeric("polynomial fit needs matching non-empty samples"));
    }
    let ncoeff = order + 1;
    let mut a = DMatrix::<f64>::zeros(x.len(), ncoeff);
    for (row, &xi) in x.iter().enumerate() {
        let mut p = 1.0;
        for col in 0..ncoeff {
            a[(row, col)] = p;
            p *= xi;
        }
    }
    let b = DVector::from_column_slice(y);
    let svd = a.svd(true, true);
    let eps = f64::EPSILON * x.len().max(ncoeff) as f64 * svd.singular_values.max();
    let sol = svd
        .solve(&b, eps)
        .map_err(|e| Error::numeric(format!("polynomial least squares: {e}")))?;
    Ok(Polynomial::new(sol.iter().copied().collect()))
}

/// Fit `y(x)` by polynomial least squares and evaluate on `x_new`.
pub fn polyfit_eval(x: &[f64], y: &[f64], x_new: ArrayView1<f64>, order: usize) -> Result<Array1<f64>> {
    let poly = polyfit(x, y, order)?;
    Ok(x_new.mapv(|xi| poly.eval(xi)))
}

/// Eulerian strain of `v` with respect to the reference volume `v0`:
/// `f = ((v0/v)^(2/3) - 1) / 2`.
pub fn eulerian_strain(v0: f64, v: f64) -> f64 {
    ((v0 / v).powf(2.0 / 3.0) - 1.0) / 2.0
}

/// Eulerian strain of every entry of `v`.
pub fn eulerian_strain_array(v0: f64, v: ArrayView1<f64>) -> Array1<f64> {
    v.mapv(|vi| eulerian_strain(v0, vi))
}

/// Two-sided finite-difference gradient with unit spacing: one-sided at the
/// ends, central in the interior. Derivatives against a second array are
/// taken as the elementwise quotient `gradient(y) / gradient(x)`.
pub fn gradient(y: ArrayView1<f64>) -> Array1<f64> {
    let n = y.len();
    let mut g = Array1::zeros(n);
    if n < 2 {
        return g;
    }
    g[0] = y[1] - y[0];
    g[n - 1] = y[n - 1] - y[n - 2];
    for i in 1..n - 1 {
        g[i] = (y[i + 1] - y[i - 1]) / 2.0;
    }
    g
}

/// `dy/dx` as the quotient of unit-spacing gradients.
pub fn gradient_quotient(y: ArrayView1<f64>, x: ArrayView1<f64>) -> Array1<f64> {
    &gradient(y) / &gradient(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_polyfit_recovers_quadratic() {
        let x: Vec<f64> = (0..7).map(|i| -1.0 + i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|&x| 2.0 - 3.0 * x + 0.5 * x * x).collect();
        let poly = polyfit(&x, &y, 2).unwrap();
        assert!((poly.coeffs()[0] - 2.0).abs() < 1e-10);
        assert!((poly.coeffs()[1] + 3.0).abs() < 1e-10);
        assert!((poly.coeffs()[2] - 0.5).abs() < 1e-10);
        let dp = poly.derivative();
        assert!((dp.eval(2.0) - (-3.0 + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_polyfit_eval_interpolates() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 4.0, 9.0, 16.0];
        let out = polyfit_eval(&x, &y, array![2.5].view(), 2).unwrap();
        assert!((out[0] - 6.25).abs() < 1e-9);
    }

    #[test]
    fn test_eulerian_strain_reference_is_zero() {
        assert!(eulerian_strain(100.0, 100.0).abs() < 1e-15);
        assert!(eulerian_strain(100.0, 80.0) > 0.0);
        assert!(eulerian_strain(100.0, 120.0) < 0.0);
    }

    #[test]
    fn test_gradient_quotient_linear() {
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let g = gradient_quotient(y.view(), x.view());
        for v in g.iter() {
            assert!((v - 2.0).abs() < 1e-12);
        }
    }
}
