//! Input data model for the two traditional input files.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::voigt::ModulusIndex;

/// One q-point of one volume block: fractional coordinate plus the mode
/// frequencies in cm^-1.
#[derive(Debug, Clone, PartialEq)]
pub struct QPointData {
    pub coord: [f64; 3],
    pub modes: Vec<f64>,
}

/// One volume block of the phonon/energy input.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeData {
    /// Pressure as printed in the input header line (informational)
    pub pressure: f64,
    /// Cell volume in bohr^3
    pub volume: f64,
    /// Static energy in Ry
    pub energy: f64,
    pub q_points: Vec<QPointData>,
}

/// A q-point multiplicity entry from the trailing weight table.
#[derive(Debug, Clone, PartialEq)]
pub struct QPointWeight {
    pub coord: [f64; 3],
    pub weight: f64,
}

/// The phonon/energy input: volumes, q-points, branches and weights.
#[derive(Debug, Clone, PartialEq)]
pub struct QhaInputData {
    /// Number of volumes
    pub nv: usize,
    /// Number of q-points
    pub nq: usize,
    /// Number of branches per q-point
    pub np: usize,
    /// Number of formula units per cell
    pub nm: usize,
    /// Number of atoms per cell
    pub na: usize,
    pub volumes: Vec<VolumeData>,
    pub weights: Vec<QPointWeight>,
}

impl QhaInputData {
    /// Check the structural invariants of the parsed input.
    pub fn validate(&self) -> Result<()> {
        if self.volumes.len() != self.nv {
            return Err(Error::config(format!(
                "expected {} volume blocks, found {}",
                self.nv,
                self.volumes.len()
            )));
        }
        for (n, volume) in self.volumes.iter().enumerate() {
            if volume.q_points.len() != self.nq {
                return Err(Error::config(format!(
                    "volume block {} has {} q-points, expected {}",
                    n + 1,
                    volume.q_points.len(),
                    self.nq
                )));
            }
            for (j, q) in volume.q_points.iter().enumerate() {
                if q.modes.len() != self.np {
                    return Err(Error::config(format!(
                        "volume block {} q-point {} has {} modes, expected {}",
                        n + 1,
                        j + 1,
                        q.modes.len(),
                        self.np
                    )));
                }
            }
        }
        if self.weights.len() != self.nq {
            return Err(Error::config(format!(
                "expected {} q-point weights, found {}",
                self.nq,
                self.weights.len()
            )));
        }
        Ok(())
    }

    /// The volumes of the blocks, in input order (bohr^3).
    pub fn raw_volumes(&self) -> Vec<f64> {
        self.volumes.iter().map(|v| v.volume).collect()
    }

    /// The q-point weights, in input order.
    pub fn q_weights(&self) -> Vec<f64> {
        self.weights.iter().map(|w| w.weight).collect()
    }
}

/// Static elastic constants of one volume point. Values are in GPa, keyed by
/// canonical subscript.
#[derive(Debug, Clone, PartialEq)]
pub struct ElastVolumeData {
    /// Cell volume in bohr^3
    pub volume: f64,
    pub moduli: BTreeMap<ModulusIndex, f64>,
}

/// The elastic-constant input table.
#[derive(Debug, Clone, PartialEq)]
pub struct ElastData {
    /// Reference volume in bohr^3
    pub vref: f64,
    pub nv: usize,
    /// Cell mass in g/mol
    pub cellmass: f64,
    pub volumes: Vec<ElastVolumeData>,
    /// Optional per-volume lattice parameters (a, b, c)
    pub lattice_params: Option<Vec<[f64; 3]>>,
}

impl ElastData {
    /// Check the structural invariants of the parsed table.
    pub fn validate(&self) -> Result<()> {
        if self.volumes.len() != self.nv {
            return Err(Error::config(format!(
                "expected {} elastic-constant rows, found {}",
                self.nv,
                self.volumes.len()
            )));
        }
        let first = match self.volumes.first() {
            Some(v) => &v.moduli,
            None => return Err(Error::config("elastic-constant table is empty")),
        };
        for (n, v) in self.volumes.iter().enumerate().skip(1) {
            if v.moduli.keys().ne(first.keys()) {
                return Err(Error::config(format!(
                    "elastic-constant row {} has a different set of c_ij columns",
                    n + 1
                )));
            }
        }
        if let Some(lat) = &self.lattice_params {
            if lat.len() != self.nv {
                return Err(Error::config(format!(
                    "expected {} lattice-parameter rows, found {}",
                    self.nv,
                    lat.len()
                )));
            }
        }
        Ok(())
    }

    /// Subscripts of the table columns, in canonical order.
    pub fn modulus_keys(&self) -> Vec<ModulusIndex> {
        self.volumes
            .first()
            .map(|v| v.moduli.keys().copied().collect())
            .unwrap_or_default()
    }

    /// One column of the table across volumes, in GPa.
    pub fn column(&self, key: ModulusIndex) -> Option<Vec<f64>> {
        self.volumes
            .iter()
            .map(|v| v.moduli.get(&key).copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sym: &str) -> ModulusIndex {
        ModulusIndex::parse(sym).unwrap()
    }

    #[test]
    fn test_elast_key_set_mismatch_rejected() {
        let mut a = BTreeMap::new();
        a.insert(key("c11"), 100.0);
        let mut b = BTreeMap::new();
        b.insert(key("c12"), 50.0);
        let data = ElastData {
            vref: 100.0,
            nv: 2,
            cellmass: 10.0,
            volumes: vec![
                ElastVolumeData { volume: 100.0, moduli: a },
                ElastVolumeData { volume: 90.0, moduli: b },
            ],
            lattice_params: None,
        };
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_qha_mode_count_checked() {
        let data = QhaInputData {
            nv: 1,
            nq: 1,
            np: 3,
            nm: 1,
            na: 1,
            volumes: vec![VolumeData {
                pressure: 0.0,
                volume: 100.0,
                energy: -1.0,
                q_points: vec![QPointData { coord: [0.0; 3], modes: vec![0.0, 0.0] }],
            }],
            weights: vec![QPointWeight { coord: [0.0; 3], weight: 1.0 }],
        };
        assert!(data.validate().is_err());
    }
}
