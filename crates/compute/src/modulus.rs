//! Full thermal elastic moduli: static finite-strain fits plus the phonon
//! contributions, and the compliance tensor from 6x6 inversion.

use std::collections::BTreeMap;

use nalgebra::Matrix6;
use ndarray::{Array1, Array2, ArrayView1};

use thermoelast_core::error::{Error, Result};
use thermoelast_core::model::ElastData;
use thermoelast_core::units::from_gpa;
use thermoelast_core::voigt::ModulusIndex;

use crate::fitting::{eulerian_strain, eulerian_strain_array, polyfit_eval};
use crate::tasks::PhononContribution;

/// Order of the static-modulus finite-strain fits.
pub const STATIC_FIT_ORDER: usize = 2;

/// The assembled `c_ij(T, V)` fields, in Ry/bohr^3.
#[derive(Debug, Clone)]
pub struct FullModulus {
    pub adiabatic: BTreeMap<ModulusIndex, Array2<f64>>,
    pub isothermal: BTreeMap<ModulusIndex, Array2<f64>>,
    pub static_of_v: BTreeMap<ModulusIndex, Array1<f64>>,
}

/// Interpolate a static modulus onto the refined volume grid: `V c(V)` is
/// fitted over Eulerian strain and divided back by the refined volumes.
fn fit_static_modulus(
    raw_volumes: &[f64],
    moduli_gpa: &[f64],
    v_array: ArrayView1<f64>,
    order: usize,
) -> Result<Array1<f64>> {
    let v0 = raw_volumes[0];
    let strain_raw: Vec<f64> = raw_volumes.iter().map(|&v| eulerian_strain(v0, v)).collect();
    let strain_new = eulerian_strain_array(v0, v_array);
    let vc: Vec<f64> = moduli_gpa
        .iter()
        .zip(raw_volumes)
        .map(|(&c, &v)| from_gpa(c) * v)
        .collect();
    let fitted = polyfit_eval(&strain_raw, &vc, strain_new.view(), order)?;
    Ok(&fitted / &v_array.to_owned())
}

/// Combine the static fits with the phonon contributions for every requested
/// component.
pub fn assemble(
    elast: &ElastData,
    v_array: ArrayView1<f64>,
    phonon: &PhononContribution,
) -> Result<FullModulus> {
    let raw_volumes: Vec<f64> = elast.volumes.iter().map(|v| v.volume).collect();

    let mut adiabatic = BTreeMap::new();
    let mut isothermal = BTreeMap::new();
    let mut static_of_v = BTreeMap::new();

    for key in elast.modulus_keys() {
        let column = elast
            .column(key)
            .ok_or_else(|| Error::numeric(format!("missing static column {key}")))?;
        let c_static = fit_static_modulus(&raw_volumes, &column, v_array, STATIC_FIT_ORDER)?;

        let iso_ph = &phonon.isothermal[&key];
        let adia_ph = &phonon.adiabatic[&key];
        let mut iso = iso_ph.clone();
        let mut adia = adia_ph.clone();
        for i in 0..iso.nrows() {
            for m in 0..iso.ncols() {
                iso[(i, m)] += c_static[m];
                adia[(i, m)] += c_static[m];
            }
        }
        adiabatic.insert(key, adia);
        isothermal.insert(key, iso);
        static_of_v.insert(key, c_static);
    }

    Ok(FullModulus { adiabatic, isothermal, static_of_v })
}

/// Invert the stiffness tensor at every `(T, V)` point and keep the nonzero
/// upper-triangle compliances.
pub fn compliances(
    moduli: &BTreeMap<ModulusIndex, Array2<f64>>,
    dims: (usize, usize),
    drop_atol: f64,
) -> Result<BTreeMap<ModulusIndex, Array2<f64>>> {
    let (nt, ntv) = dims;
    let mut fields: BTreeMap<ModulusIndex, Array2<f64>> = BTreeMap::new();

    for i in 0..nt {
        for m in 0..ntv {
            let mut c = Matrix6::<f64>::zeros();
            for (key, value) in moduli {
                let (a, b) = key.voigt();
                c[(a as usize - 1, b as usize - 1)] = value[(i, m)];
                c[(b as usize - 1, a as usize - 1)] = value[(i, m)];
            }
            let s = c.try_inverse().ok_or_else(|| {
                Error::numeric(format!("stiffness inversion at grid point ({i}, {m})"))
            })?;
            for a in 0..6 {
                for b in a..6 {
                    if s[(a, b)] == 0.0 {
                        continue;
                    }
                    let key = ModulusIndex::from_voigt(a as u8 + 1, b as u8 + 1)?;
                    fields
                        .entry(key)
                        .or_insert_with(|| Array2::zeros(dims))[(i, m)] = s[(a, b)];
                }
            }
        }
    }

    fields.retain(|_, field| field.iter().any(|&s| s.abs() > drop_atol));
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn key(sym: &str) -> ModulusIndex {
        ModulusIndex::parse(sym).unwrap()
    }

    #[test]
    fn test_fit_static_modulus_interpolates() {
        let raw: Vec<f64> = (0..7).map(|i| 130.0 - 5.0 * i as f64).collect();
        // c(V) linear in V, in GPa
        let c: Vec<f64> = raw.iter().map(|&v| 300.0 + (120.0 - v)).collect();
        let v_array = Array1::linspace(128.0, 102.0, 14);
        let fitted = fit_static_modulus(&raw, &c, v_array.view(), 2).unwrap();
        for (m, &v) in v_array.iter().enumerate() {
            let expect = from_gpa(300.0 + (120.0 - v));
            assert!(
                (fitted[m] - expect).abs() / expect < 2e-3,
                "{} vs {expect}",
                fitted[m]
            );
        }
    }

    #[test]
    fn test_compliance_is_right_inverse() {
        // isotropic-like cubic stiffness, constant over a 2x3 grid
        let dims = (2, 3);
        let mut moduli = BTreeMap::new();
        let c11 = from_gpa(300.0);
        let c12 = from_gpa(100.0);
        let c44 = from_gpa(80.0);
        for sym in ["c11", "c22", "c33"] {
            moduli.insert(key(sym), Array2::from_elem(dims, c11));
        }
        for sym in ["c12", "c13", "c23"] {
            moduli.insert(key(sym), Array2::from_elem(dims, c12));
        }
        for sym in ["c44", "c55", "c66"] {
            moduli.insert(key(sym), Array2::from_elem(dims, c44));
        }
        let s = compliances(&moduli, dims, 1e-10).unwrap();

        // c . s = I on the 11 row: c11 s11 + 2 c12 s12 = 1
        let s11 = s[&key("s11")][(0, 0)];
        let s12 = s[&key("s12")][(0, 0)];
        let s44 = s[&key("s44")][(0, 0)];
        assert!((c11 * s11 + 2.0 * c12 * s12 - 1.0).abs() < 1e-6);
        assert!((c44 * s44 - 1.0).abs() < 1e-9);
        // shear rows do not couple
        assert!(!s.contains_key(&key("s14")));
    }

    #[test]
    fn test_singular_stiffness_is_reported() {
        let dims = (1, 1);
        let mut moduli = BTreeMap::new();
        moduli.insert(key("c11"), Array2::from_elem(dims, 1.0));
        let err = compliances(&moduli, dims, 1e-10).unwrap_err();
        assert!(matches!(err, Error::Numeric(_)));
    }
}
