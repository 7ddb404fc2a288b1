//! Mode-frequency interpolation over volume.
//!
//! For every (q-point, branch) pair except the Gamma-point acoustic modes,
//! the sampled frequencies are interpolated in (ln V, ln w) space on the
//! refined volume grid, producing
//!
//! - `w(V)` the interpolated frequency,
//! - `gamma(V) = -d ln w / d ln V` (the mode-Grueneisen parameter),
//! - `V dgamma/dV (V) = -d^2 ln w / d(ln V)^2`.

pub mod bspline;
pub mod hermite;
pub mod newton;

use ndarray::{Array3, ArrayView1};
use tracing::warn;

use thermoelast_core::config::Interpolator;
use thermoelast_core::error::Result;
use thermoelast_core::model::QhaInputData;

use crate::fitting::polyfit;
use bspline::BSpline;
use hermite::CubicHermite;
use newton::NewtonPoly;

/// Interpolated mode frequencies and their logarithmic volume derivatives on
/// the refined grid, shape `[N_TV, N_q, N_p]`. Gamma-point acoustic entries
/// are identically zero.
#[derive(Debug, Clone)]
pub struct ModeData {
    pub freq: Array3<f64>,
    pub gamma: Array3<f64>,
    pub vdg_dv: Array3<f64>,
}

/// Pick at most `order` uniformly spaced knots to tame the ill-conditioning
/// of global polynomial interpolation.
fn subsample(x: &[f64], y: &[f64], order: usize) -> (Vec<f64>, Vec<f64>) {
    let interval = (x.len() + order - 1) / order.max(1);
    let interval = interval.max(1);
    let xs: Vec<f64> = x.iter().step_by(interval).copied().collect();
    let ys: Vec<f64> = y.iter().step_by(interval).copied().collect();
    (xs, ys)
}

/// Interpolate one mode in (ln V, ln w) space and evaluate `(w, gamma,
/// V dgamma/dV)` on `ln_v_new`.
fn interpolate_mode(
    method: Interpolator,
    order: Option<usize>,
    ln_v: &[f64],
    ln_w: &[f64],
    ln_v_new: ArrayView1<f64>,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let n = ln_v_new.len();
    let mut freq = Vec::with_capacity(n);
    let mut gamma = Vec::with_capacity(n);
    let mut vdg = Vec::with_capacity(n);

    match method {
        Interpolator::Spline => {
            let s = BSpline::interpolating(ln_v, ln_w, order.unwrap_or(5))?;
            let d1 = s.derivative();
            let d2 = d1.derivative();
            for &x in ln_v_new.iter() {
                freq.push(s.eval(x).exp());
                gamma.push(-d1.eval(x));
                vdg.push(-d2.eval(x));
            }
        }
        Interpolator::Lagrange => {
            let (xs, ys) = subsample(ln_v, ln_w, order.unwrap_or(6));
            let poly = NewtonPoly::fit(&xs, &ys)?.to_power_basis();
            let d1 = poly.derivative();
            let d2 = d1.derivative();
            for &x in ln_v_new.iter() {
                freq.push(poly.eval(x).exp());
                gamma.push(-d1.eval(x));
                vdg.push(-d2.eval(x));
            }
        }
        Interpolator::Krogh => {
            let (xs, ys) = subsample(ln_v, ln_w, order.unwrap_or(6));
            let poly = NewtonPoly::fit(&xs, &ys)?;
            for &x in ln_v_new.iter() {
                let (v, d1, d2) = poly.eval_with_derivatives(x);
                freq.push(v.exp());
                gamma.push(-d1);
                vdg.push(-d2);
            }
        }
        Interpolator::Pchip | Interpolator::Akima | Interpolator::Hermite => {
            let (xs, ys) = subsample(ln_v, ln_w, order.unwrap_or(6));
            let s = match method {
                Interpolator::Pchip => CubicHermite::pchip(&xs, &ys)?,
                Interpolator::Akima => CubicHermite::akima(&xs, &ys)?,
                _ => CubicHermite::three_point(&xs, &ys)?,
            };
            for &x in ln_v_new.iter() {
                let (v, d1, d2) = s.eval_with_derivatives(x);
                freq.push(v.exp());
                gamma.push(-d1);
                vdg.push(-d2);
            }
        }
        Interpolator::LsqPoly => {
            let poly = polyfit(ln_v, ln_w, order.unwrap_or(2))?;
            let d1 = poly.derivative();
            let d2 = d1.derivative();
            for &x in ln_v_new.iter() {
                freq.push(poly.eval(x).exp());
                gamma.push(-d1.eval(x));
                vdg.push(-d2.eval(x));
            }
        }
    }
    Ok((freq, gamma, vdg))
}

/// Interpolate all modes onto the refined volume grid `v_array`.
///
/// Gamma-point acoustic modes (first q-point, first three branches) are
/// skipped and left at zero. A mode whose samples are not all positive
/// cannot be treated in log space and is likewise zeroed, with a warning.
pub fn interpolate_modes(
    input: &QhaInputData,
    v_array: ArrayView1<f64>,
    method: Interpolator,
    order: Option<usize>,
) -> Result<ModeData> {
    let ntv = v_array.len();
    let (nq, np) = (input.nq, input.np);

    let mut freq = Array3::zeros((ntv, nq, np));
    let mut gamma = Array3::zeros((ntv, nq, np));
    let mut vdg_dv = Array3::zeros((ntv, nq, np));

    // ascending ln V with the matching sample permutation
    let raw_volumes = input.raw_volumes();
    let mut perm: Vec<usize> = (0..raw_volumes.len()).collect();
    perm.sort_by(|&a, &b| raw_volumes[a].total_cmp(&raw_volumes[b]));
    let ln_v: Vec<f64> = perm.iter().map(|&n| raw_volumes[n].ln()).collect();
    let ln_v_new = v_array.mapv(f64::ln);

    let mut skipped = 0usize;
    for j in 0..nq {
        for k in 0..np {
            if j == 0 && k < 3 {
                continue;
            }
            let samples: Vec<f64> = perm
                .iter()
                .map(|&n| input.volumes[n].q_points[j].modes[k])
                .collect();
            if samples.iter().any(|&w| w <= 0.0) {
                skipped += 1;
                continue;
            }
            let ln_w: Vec<f64> = samples.iter().map(|w| w.ln()).collect();
            let (f, g, dg) = interpolate_mode(method, order, &ln_v, &ln_w, ln_v_new.view())?;
            for m in 0..ntv {
                freq[(m, j, k)] = f[m];
                gamma[(m, j, k)] = g[m];
                vdg_dv[(m, j, k)] = dg[m];
            }
        }
    }
    if skipped > 0 {
        warn!(
            modes = skipped,
            "modes with non-positive frequency samples excluded from phonon sums"
        );
    }

    Ok(ModeData { freq, gamma, vdg_dv })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use thermoelast_core::model::{QPointData, QPointWeight, VolumeData};

    /// Synthetic input with a single power-law mode `w(V) = A V^(-1/3)` (plus
    /// the skipped Gamma-acoustic branches).
    fn power_law_input() -> QhaInputData {
        let volumes: Vec<f64> = (0..9).map(|i| 140.0 - 5.0 * i as f64).collect();
        let make_volume = |v: f64| VolumeData {
            pressure: 0.0,
            volume: v,
            energy: -10.0,
            q_points: vec![
                QPointData { coord: [0.0; 3], modes: vec![0.0, 0.0, 0.0, 600.0 * v.powf(-1.0 / 3.0)] },
                QPointData { coord: [0.5, 0.0, 0.0], modes: vec![450.0 * v.powf(-1.0 / 3.0); 4] },
            ],
        };
        QhaInputData {
            nv: volumes.len(),
            nq: 2,
            np: 4,
            nm: 1,
            na: 1,
            volumes: volumes.iter().map(|&v| make_volume(v)).collect(),
            weights: vec![
                QPointWeight { coord: [0.0; 3], weight: 1.0 },
                QPointWeight { coord: [0.5, 0.0, 0.0], weight: 3.0 },
            ],
        }
    }

    #[test]
    fn test_every_backend_recovers_power_law() {
        let input = power_law_input();
        let v_array = Array1::linspace(138.0, 102.0, 25);
        for method in [
            Interpolator::Spline,
            Interpolator::Lagrange,
            Interpolator::Krogh,
            Interpolator::Pchip,
            Interpolator::Akima,
            Interpolator::Hermite,
            Interpolator::LsqPoly,
        ] {
            let modes = interpolate_modes(&input, v_array.view(), method, None).unwrap();
            for m in 0..v_array.len() {
                let v = v_array[m];
                let expect = 450.0 * v.powf(-1.0 / 3.0);
                assert!(
                    (modes.freq[(m, 1, 0)] - expect).abs() / expect < 1e-4,
                    "{method:?}: freq {} vs {expect}",
                    modes.freq[(m, 1, 0)]
                );
                assert!(
                    (modes.gamma[(m, 1, 0)] - 1.0 / 3.0).abs() < 1e-4,
                    "{method:?}: gamma {}",
                    modes.gamma[(m, 1, 0)]
                );
                assert!(
                    modes.vdg_dv[(m, 1, 0)].abs() < 1e-4,
                    "{method:?}: vdg {}",
                    modes.vdg_dv[(m, 1, 0)]
                );
            }
        }
    }

    #[test]
    fn test_gamma_acoustic_entries_zeroed() {
        let input = power_law_input();
        let v_array = Array1::linspace(138.0, 102.0, 5);
        let modes =
            interpolate_modes(&input, v_array.view(), Interpolator::LsqPoly, None).unwrap();
        for m in 0..5 {
            for k in 0..3 {
                assert_eq!(modes.freq[(m, 0, k)], 0.0);
                assert_eq!(modes.gamma[(m, 0, k)], 0.0);
            }
            assert!(modes.freq[(m, 0, 3)] > 0.0);
        }
    }
}
