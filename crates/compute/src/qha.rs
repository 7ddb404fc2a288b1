//! Quasi-harmonic thermodynamic engine and its adapter facade.
//!
//! The engine computes the Helmholtz free energy, pressure and heat capacity
//! on the refined `(T, V)` grid from the raw phonon input, plus the inverse
//! `V(T, P)` map on the desired pressure array. The solver consumes it only
//! through [`QhaAdapter`].
//!
//! Free energy per cell at the raw volumes:
//!
//! ```text
//! F(T, V_n) = E_static(V_n)
//!           + sum_q wbar_q sum_m [ hc w/2 + kB T ln(1 - exp(-hc w / kB T)) ]
//! ```
//!
//! Per temperature row, `F` and `C_V` are least-squares fitted over Eulerian
//! strain onto the refined volume grid; the pressure is the gradient quotient
//! `-dF/dV` on that grid.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::{info, warn};

use thermoelast_core::config::QhaSettings;
use thermoelast_core::error::{Error, Result};
use thermoelast_core::model::QhaInputData;
use thermoelast_core::units::{from_gpa, to_gpa, HC_OVER_KB_CM_K, HC_RY_CM, KB_RY_PER_K};

use crate::fitting::{eulerian_strain_array, gradient_quotient, polyfit_eval};

/// Facade over the thermodynamic engine: the arrays the elastic solver needs,
/// on the refined grids.
#[derive(Debug, Clone)]
pub struct QhaAdapter {
    t_array: Array1<f64>,
    v_array: Array1<f64>,
    p_array: Array1<f64>,
    f_tv: Array2<f64>,
    p_tv: Array2<f64>,
    cv_tv: Array2<f64>,
    v_tp: Array2<f64>,
}

impl QhaAdapter {
    pub fn new(settings: &QhaSettings, input: &QhaInputData) -> Result<Self> {
        let nt = settings.nt;
        let ntv = settings.ntv;
        let t_array = Array1::from_iter((0..nt).map(|i| settings.t_min + settings.dt * i as f64));
        let p_array = Array1::from_iter(
            (0..settings.npress).map(|i| from_gpa(settings.p_min + settings.delta_p * i as f64)),
        );

        let raw_volumes = input.raw_volumes();
        let raw_energies: Vec<f64> = input.volumes.iter().map(|v| v.energy).collect();
        let weights = normalized_weights(input);

        // clamp negative frequencies to zero, as the engine contract promises
        let mut frequencies: Vec<Vec<Vec<f64>>> = input
            .volumes
            .iter()
            .map(|v| v.q_points.iter().map(|q| q.modes.clone()).collect())
            .collect();
        let mut negative = 0usize;
        for volume in frequencies.iter_mut() {
            for modes in volume.iter_mut() {
                for w in modes.iter_mut() {
                    if *w < 0.0 {
                        *w = 0.0;
                        negative += 1;
                    }
                }
            }
        }
        if negative > 0 {
            warn!(count = negative, "negative phonon frequencies found; treated as 0");
        }

        // raw-grid thermodynamics
        let nv = input.nv;
        let mut f_raw = Array2::zeros((nt, nv));
        let mut cv_raw = Array2::zeros((nt, nv));
        for (n, volume) in frequencies.iter().enumerate() {
            for (i, &t) in t_array.iter().enumerate() {
                let mut f_vib = 0.0;
                let mut cv = 0.0;
                for (j, modes) in volume.iter().enumerate() {
                    let mut f_q = 0.0;
                    let mut cv_q = 0.0;
                    for &w in modes {
                        if w <= 0.0 {
                            continue;
                        }
                        f_q += HC_RY_CM * w / 2.0;
                        if t > 0.0 {
                            let q = HC_OVER_KB_CM_K * w / t;
                            f_q += KB_RY_PER_K * t * (-(-q).exp()).ln_1p();
                            if q < 500.0 {
                                let eq = q.exp();
                                let em1 = eq - 1.0;
                                cv_q += KB_RY_PER_K * q * q * eq / (em1 * em1);
                            }
                        }
                    }
                    f_vib += weights[j] * f_q;
                    cv += weights[j] * cv_q;
                }
                f_raw[(i, n)] = raw_energies[n] + f_vib;
                cv_raw[(i, n)] = cv;
            }
        }

        // refined volume grid, descending like the input blocks
        let v_max = raw_volumes.iter().cloned().fold(f64::MIN, f64::max);
        let v_min = raw_volumes.iter().cloned().fold(f64::MAX, f64::min);
        let r = settings.volume_ratio;
        let v_array = Array1::linspace(v_max * r, v_min / r, ntv);
        info!(
            "volume grid refined to {} points on [{:.3}, {:.3}] bohr^3",
            ntv,
            v_min / r,
            v_max * r
        );

        // per-row finite-strain fits onto the refined grid
        let v0 = raw_volumes[0];
        let strain_raw: Vec<f64> =
            raw_volumes.iter().map(|&v| crate::fitting::eulerian_strain(v0, v)).collect();
        let strain_new = eulerian_strain_array(v0, v_array.view());

        let mut f_tv = Array2::zeros((nt, ntv));
        let mut cv_tv = Array2::zeros((nt, ntv));
        let mut p_tv = Array2::zeros((nt, ntv));
        for i in 0..nt {
            let f_row = polyfit_eval(
                &strain_raw,
                f_raw.row(i).as_slice().unwrap(),
                strain_new.view(),
                settings.order,
            )?;
            let cv_row = polyfit_eval(
                &strain_raw,
                cv_raw.row(i).as_slice().unwrap(),
                strain_new.view(),
                settings.order,
            )?;
            let p_row = -gradient_quotient(f_row.view(), v_array.view());
            f_tv.row_mut(i).assign(&f_row);
            cv_tv.row_mut(i).assign(&cv_row);
            p_tv.row_mut(i).assign(&p_row);
        }
        if t_array[0] == 0.0 {
            cv_tv.row_mut(0).fill(0.0);
        }

        // the top of the desired range must stay below the smallest-volume
        // pressure at every temperature
        let p_top = p_tv
            .column(ntv - 1)
            .iter()
            .cloned()
            .fold(f64::MAX, f64::min);
        info!(
            "pressure range available: [{:6.2}, {:6.2}] GPa",
            to_gpa(p_tv.column(0).iter().cloned().fold(f64::MIN, f64::max)),
            to_gpa(p_top)
        );
        let p_des_max = p_array.iter().cloned().fold(f64::MIN, f64::max);
        if p_des_max > p_top {
            let max_np = ((to_gpa(p_top) - settings.p_min) / settings.delta_p).floor();
            return Err(Error::PressureRangeTooHigh { max_np: max_np.max(0.0) as usize });
        }

        // invert the monotone pressure rows for the (T, P) volume table
        let mut adapter = Self {
            t_array,
            v_array,
            p_array,
            f_tv,
            p_tv,
            cv_tv,
            v_tp: Array2::zeros((nt, settings.npress)),
        };
        let v_broadcast = adapter
            .v_array
            .view()
            .insert_axis(Axis(0))
            .broadcast((nt, ntv))
            .expect("broadcast volume row")
            .to_owned();
        adapter.v_tp = adapter.v2p(v_broadcast.view());
        Ok(adapter)
    }

    /// Temperatures of the `(T, V)` and `(T, P)` grids, in K.
    pub fn t_array(&self) -> ArrayView1<f64> {
        self.t_array.view()
    }

    /// Refined volume grid in bohr^3, descending.
    pub fn v_array(&self) -> ArrayView1<f64> {
        self.v_array.view()
    }

    /// Desired pressures in Ry/bohr^3, ascending.
    pub fn p_array(&self) -> ArrayView1<f64> {
        self.p_array.view()
    }

    /// Helmholtz free energy `F(T, V)` in Ry.
    pub fn helmholtz_free_energies(&self) -> ArrayView2<f64> {
        self.f_tv.view()
    }

    /// Pressure `P(T, V)` in Ry/bohr^3.
    pub fn pressures(&self) -> ArrayView2<f64> {
        self.p_tv.view()
    }

    /// Heat capacity `C_V(T, V)` in Ry/K per cell.
    pub fn heat_capacity(&self) -> ArrayView2<f64> {
        self.cv_tv.view()
    }

    /// Volume `V(T, P)` in bohr^3.
    pub fn volumes(&self) -> ArrayView2<f64> {
        self.v_tp.view()
    }

    /// Regrid a `(T, V)` field onto the `(T, P)` grid by per-row inverse
    /// interpolation of the monotone pressure rows.
    pub fn v2p(&self, field: ArrayView2<f64>) -> Array2<f64> {
        let nt = self.t_array.len();
        let npress = self.p_array.len();
        let ntv = self.v_array.len();
        let mut out = Array2::zeros((nt, npress));
        for i in 0..nt {
            let ps = self.p_tv.row(i);
            for (m, &p) in self.p_array.iter().enumerate() {
                // pressure increases along the (descending) volume axis
                let mut hi = ps.iter().position(|&pv| pv >= p).unwrap_or(ntv - 1);
                if hi == 0 {
                    hi = 1;
                }
                let lo = hi - 1;
                let span = ps[hi] - ps[lo];
                let frac = if span != 0.0 { (p - ps[lo]) / span } else { 0.0 };
                out[(i, m)] = field[(i, lo)] + frac * (field[(i, hi)] - field[(i, lo)]);
            }
        }
        out
    }
}

fn normalized_weights(input: &QhaInputData) -> Vec<f64> {
    let weights = input.q_weights();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use thermoelast_core::model::{QPointData, QPointWeight, VolumeData};

    /// Synthetic cell: quadratic static energy with a power-law phonon branch.
    pub(crate) fn synthetic_input() -> QhaInputData {
        let volumes: Vec<f64> = (0..9).map(|i| 140.0 - 5.0 * i as f64).collect();
        let make_volume = |v: f64| {
            let modes_gamma = vec![0.0, 0.0, 0.0, 600.0 * (120.0 / v).powf(1.0 / 3.0)];
            let modes_zone = vec![450.0 * (120.0 / v).powf(1.0 / 3.0); 4];
            VolumeData {
                pressure: 0.0,
                volume: v,
                energy: -10.0 + 0.02 * (v - 140.0) * (v - 140.0) / 140.0,
                q_points: vec![
                    QPointData { coord: [0.0; 3], modes: modes_gamma },
                    QPointData { coord: [0.5, 0.0, 0.0], modes: modes_zone },
                ],
            }
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

    pub(crate) fn settings() -> QhaSettings {
        QhaSettings {
            nt: 5,
            dt: 150.0,
            t_min: 0.0,
            npress: 6,
            delta_p: 2.0,
            p_min: 0.0,
            ntv: 41,
            volume_ratio: 1.1,
            order: 3,
        }
    }

    #[test]
    fn test_pressure_monotone_and_grid_shapes() {
        let input = synthetic_input();
        let adapter = QhaAdapter::new(&settings(), &input).unwrap();
        assert_eq!(adapter.pressures().dim(), (5, 41));
        assert_eq!(adapter.volumes().dim(), (5, 6));
        for i in 0..5 {
            let row = adapter.pressures().row(i).to_owned();
            for w in row.windows(2) {
                assert!(w[1] > w[0], "pressure must increase as volume shrinks");
            }
        }
        // heat capacity vanishes at T = 0 and is positive above
        assert!(adapter.heat_capacity().row(0).iter().all(|&cv| cv == 0.0));
        assert!(adapter.heat_capacity()[(4, 20)] > 0.0);
    }

    #[test]
    fn test_pressure_range_too_high() {
        let input = synthetic_input();
        let mut s = settings();
        s.p_min = 0.0;
        s.delta_p = 10.0;
        s.npress = 500;
        let err = QhaAdapter::new(&s, &input).unwrap_err();
        match err {
            Error::PressureRangeTooHigh { max_np } => {
                // the suggested number of points must satisfy the constraint
                let adapter = QhaAdapter::new(
                    &QhaSettings { npress: max_np.max(1), ..s.clone() },
                    &input,
                )
                .unwrap();
                assert_eq!(adapter.p_array().len(), max_np.max(1));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_v2p_left_inverse() {
        let input = synthetic_input();
        let adapter = QhaAdapter::new(&settings(), &input).unwrap();
        // regridding the pressure field itself must reproduce the targets
        let p_tp = adapter.v2p(adapter.pressures());
        for i in 0..adapter.t_array().len() {
            for (m, &p) in adapter.p_array().iter().enumerate() {
                assert!((p_tp[(i, m)] - p).abs() < 1e-10);
            }
        }
    }
}
