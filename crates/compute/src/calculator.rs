//! The calculator aggregate: loads the inputs, runs every stage of the
//! pipeline eagerly, and exposes the results through an explicit query API.
//!
//! Construction order: parse and validate inputs, build the QHA
//! thermodynamic engine, complete the elastic table under symmetry,
//! interpolate the modes, fit the static pressure, resolve and execute the
//! phonon task graph, assemble the full moduli, invert for compliances, and
//! derive the aggregate properties. Nothing is recomputed afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{info, warn};

use thermoelast_core::config::Config;
use thermoelast_core::error::{Error, Result};
use thermoelast_core::model::{ElastData, QhaInputData};
use thermoelast_core::parse::{read_elast_data, read_energy};
use thermoelast_core::symmetry::{apply_symmetry, CrystalSystem, FillOptions};
use thermoelast_core::voigt::ModulusIndex;

use crate::aggregate::{self, Aggregates};
use crate::fitting::{eulerian_strain, eulerian_strain_array, gradient_quotient, polyfit_eval};
use crate::interpolate::interpolate_modes;
use crate::modulus::{assemble, compliances, FullModulus};
use crate::phonon::PhononContext;
use crate::qha::QhaAdapter;
use crate::tasks::calculate_phonon_contribution;

/// Which grid a queried field lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Volume,
    Pressure,
}

/// Which thermodynamic flavor of a modulus is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Adiabatic,
    Isothermal,
    Static,
}

/// Order of the static-pressure finite-strain fit.
const STATIC_PRESSURE_ORDER: usize = 3;

pub struct Calculator {
    config: Config,
    elast: ElastData,
    adapter: QhaAdapter,
    static_p: Array1<f64>,
    full: FullModulus,
    compliance_fields: BTreeMap<ModulusIndex, Array2<f64>>,
    aggregates: Aggregates,
}

impl Calculator {
    /// Build from a settings file; input paths are resolved relative to it.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let config = Config::load(path)?;
        let work_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let qha_input = read_energy(&work_dir.join(&config.qha.input))?;
        let elast = read_elast_data(&work_dir.join(&config.elast.input))?;
        Self::new(config, qha_input, elast)
    }

    pub fn new(config: Config, qha_input: QhaInputData, mut elast: ElastData) -> Result<Self> {
        qha_input.validate()?;
        elast.validate()?;

        let adapter = QhaAdapter::new(&config.qha.settings, &qha_input)?;

        // symmetry completion of the elastic table (still in GPa)
        let symmetry = &config.elast.settings.symmetry;
        match symmetry.system {
            None | Some(CrystalSystem::Triclinic) => {
                warn!(
                    "no symmetry constraints applied; make sure all non-zero \
                     components are present for correct VRH averages"
                );
            }
            Some(system) => {
                let opts = FillOptions {
                    ignore_rank: symmetry.ignore_rank,
                    ignore_residuals: symmetry.ignore_residuals,
                    residual_atol: symmetry.residual_atol.unwrap_or(0.1),
                    drop_atol: symmetry.drop_atol.unwrap_or(1e-8),
                };
                apply_symmetry(&mut elast, system, &opts)?;
                info!(
                    components = elast.modulus_keys().len(),
                    "elastic table completed under {:?} symmetry", system
                );
            }
        }

        let mode_gamma = &config.elast.settings.mode_gamma;
        let modes = interpolate_modes(
            &qha_input,
            adapter.v_array(),
            mode_gamma.interpolator,
            mode_gamma.order,
        )?;

        let static_p = static_pressure(&qha_input, adapter.v_array())?;

        let total_weight: f64 = qha_input.q_weights().iter().sum();
        let ctx = PhononContext {
            v_array: adapter.v_array().to_owned(),
            t_array: adapter.t_array().to_owned(),
            freq: modes.freq,
            gamma: modes.gamma,
            vdg_dv: modes.vdg_dv,
            q_weights: Array1::from_vec(qha_input.q_weights()),
            na: qha_input.na,
            pressures: adapter.pressures().to_owned(),
            heat_capacity: adapter.heat_capacity().to_owned(),
            static_p: static_p.clone(),
        };
        if total_weight <= 0.0 {
            return Err(Error::numeric("q-point weights must sum to a positive value"));
        }

        let keys = elast.modulus_keys();
        let ntv = adapter.v_array().len();
        let e = config.init_strain();
        let mut strain = Array2::zeros((ntv, 3));
        for m in 0..ntv {
            for k in 0..3 {
                strain[(m, k)] = e[k];
            }
        }
        info!(components = keys.len(), "resolving phonon contribution tasks");
        let phonon = calculate_phonon_contribution(&ctx, &strain, &keys)?;

        let full = assemble(&elast, adapter.v_array(), &phonon)?;

        let dims = (adapter.t_array().len(), ntv);
        let drop_atol = symmetry.drop_atol.unwrap_or(1e-8);
        let compliance_fields = compliances(&full.adiabatic, dims, drop_atol)?;

        let aggregates = aggregate::compute(
            &full.adiabatic,
            &compliance_fields,
            adapter.v_array(),
            elast.cellmass,
        )?;

        Ok(Self { config, elast, adapter, static_p, full, compliance_fields, aggregates })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The thermodynamic facade (grids, pressures, heat capacity, volumes).
    pub fn qha(&self) -> &QhaAdapter {
        &self.adapter
    }

    pub fn t_array(&self) -> ArrayView1<f64> {
        self.adapter.t_array()
    }

    pub fn v_array(&self) -> ArrayView1<f64> {
        self.adapter.v_array()
    }

    pub fn p_array(&self) -> ArrayView1<f64> {
        self.adapter.p_array()
    }

    /// Cell mass in g/mol.
    pub fn cellmass(&self) -> f64 {
        self.elast.cellmass
    }

    /// Static pressure on the refined volume grid, Ry/bohr^3.
    pub fn static_pressure(&self) -> ArrayView1<f64> {
        self.static_p.view()
    }

    /// Components carried by the completed elastic table.
    pub fn modulus_keys(&self) -> Vec<ModulusIndex> {
        self.full.adiabatic.keys().copied().collect()
    }

    /// Compliance components with nonzero fields.
    pub fn compliance_keys(&self) -> Vec<ModulusIndex> {
        self.compliance_fields.keys().copied().collect()
    }

    /// Aggregate (VRH and velocity) fields on the volume base.
    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    /// Query one modulus field, `[N_T, N_TV]` or `[N_T, N_P]` in Ry/bohr^3.
    pub fn modulus(&self, base: Base, kind: Kind, key: ModulusIndex) -> Result<Array2<f64>> {
        let volume_based = match kind {
            Kind::Adiabatic => self.full.adiabatic.get(&key).cloned(),
            Kind::Isothermal => self.full.isothermal.get(&key).cloned(),
            Kind::Static => self.full.static_of_v.get(&key).map(|column| {
                let nt = self.adapter.t_array().len();
                column
                    .view()
                    .insert_axis(Axis(0))
                    .broadcast((nt, column.len()))
                    .expect("broadcast static column")
                    .to_owned()
            }),
        }
        .ok_or_else(|| Error::numeric(format!("modulus {key} is not available")))?;
        Ok(self.on_base(base, volume_based))
    }

    /// Query one compliance field (adiabatic), in bohr^3/Ry.
    pub fn compliance(&self, base: Base, key: ModulusIndex) -> Result<Array2<f64>> {
        let field = self
            .compliance_fields
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::numeric(format!("compliance {key} is not available")))?;
        Ok(self.on_base(base, field))
    }

    /// Regrid any volume-based field onto the requested base.
    pub fn on_base(&self, base: Base, field: Array2<f64>) -> Array2<f64> {
        match base {
            Base::Volume => field,
            Base::Pressure => self.adapter.v2p(field.view()),
        }
    }
}

/// Static pressure from the finite-strain fit of the static energies.
fn static_pressure(input: &QhaInputData, v_array: ArrayView1<f64>) -> Result<Array1<f64>> {
    let volumes = input.raw_volumes();
    let energies: Vec<f64> = input.volumes.iter().map(|v| v.energy).collect();
    let v0 = volumes[0];
    let strain_raw: Vec<f64> = volumes.iter().map(|&v| eulerian_strain(v0, v)).collect();
    let strain_new = eulerian_strain_array(v0, v_array);
    let energy_array =
        polyfit_eval(&strain_raw, &energies, strain_new.view(), STATIC_PRESSURE_ORDER)?;
    Ok(-gradient_quotient(energy_array.view(), v_array))
}
