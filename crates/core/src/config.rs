//! Configuration model.
//!
//! The settings file is YAML or JSON, selected by file extension. Schema
//! errors surface as [`Error::ConfigInvalid`] with serde's path/description.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::symmetry::CrystalSystem;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// QHA input location and thermodynamic-engine settings
    pub qha: QhaConfig,

    /// Elastic-constant input location and solver settings
    pub elast: ElastConfig,

    /// Output variables to write, per grid base
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QhaConfig {
    /// Path of the phonon/energy input file, relative to the settings file
    pub input: PathBuf,

    #[serde(default)]
    pub settings: QhaSettings,
}

/// Settings forwarded to the QHA thermodynamic engine
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QhaSettings {
    /// Number of temperature points
    pub nt: usize,
    /// Temperature step in K
    pub dt: f64,
    /// First temperature in K
    pub t_min: f64,
    /// Number of desired pressure points
    pub npress: usize,
    /// Desired-pressure step in GPa
    pub delta_p: f64,
    /// First desired pressure in GPa
    pub p_min: f64,
    /// Number of points of the refined volume grid
    pub ntv: usize,
    /// Expansion ratio of the refined volume grid beyond the input volumes
    pub volume_ratio: f64,
    /// Order of the finite-strain fits of the free energy
    pub order: usize,
}

impl Default for QhaSettings {
    fn default() -> Self {
        Self {
            nt: 401,
            dt: 1.0,
            t_min: 0.0,
            npress: 201,
            delta_p: 0.1,
            p_min: 0.0,
            ntv: 201,
            volume_ratio: 1.2,
            order: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElastConfig {
    /// Path of the elastic-constant table, relative to the settings file
    pub input: PathBuf,

    #[serde(default)]
    pub settings: ElastSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct ElastSettings {
    pub symmetry: SymmetrySettings,
    pub mode_gamma: ModeGammaSettings,

    /// Axial strains under hydrostatic compression, normalized to sum 1
    pub init_strain: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct SymmetrySettings {
    /// Crystal system whose equality constraints complete the input table;
    /// `None` means triclinic, i.e. no completion is performed.
    pub system: Option<CrystalSystem>,
    pub ignore_rank: bool,
    pub ignore_residuals: bool,
    pub residual_atol: Option<f64>,
    pub drop_atol: Option<f64>,
}

/// Mode-frequency interpolation backend names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Interpolator {
    #[default]
    Spline,
    Lagrange,
    Krogh,
    Pchip,
    Akima,
    Hermite,
    LsqPoly,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct ModeGammaSettings {
    pub interpolator: Interpolator,
    /// Backend-specific order; each backend has its own default
    pub order: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    pub volume_base: Vec<OutputEntry>,
    pub pressure_base: Vec<OutputEntry>,
}

/// One requested output: either a bare keyword or a keyword with overrides
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutputEntry {
    Keyword(String),
    Detailed {
        keyword: String,
        fname: Option<String>,
        unit: Option<String>,
    },
}

impl OutputEntry {
    pub fn keyword(&self) -> &str {
        match self {
            Self::Keyword(k) => k,
            Self::Detailed { keyword, .. } => keyword,
        }
    }
}

impl Config {
    /// Load a configuration file; the format is selected by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let config: Config = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .map_err(|e| Error::config(format!("{}: {e}", path.display())))?,
            "json" => serde_json::from_str(&text)
                .map_err(|e| Error::config(format!("{}: {e}", path.display())))?,
            other => {
                return Err(Error::config(format!(
                    "unrecognized settings extension {other:?} for {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let s = &self.qha.settings;
        if s.nt == 0 || s.ntv == 0 || s.npress == 0 {
            return Err(Error::config("nt, ntv and npress must all be positive"));
        }
        if s.dt < 0.0 || s.delta_p <= 0.0 || s.volume_ratio <= 1.0 {
            return Err(Error::config(
                "dt must be non-negative, delta_p positive, volume_ratio > 1",
            ));
        }
        if let Some(e) = self.elast.settings.init_strain {
            if e.iter().any(|&x| x <= 0.0) {
                return Err(Error::config("init_strain components must be positive"));
            }
        }
        Ok(())
    }

    /// Axial strain fractions, defaulting to the isotropic (1/3, 1/3, 1/3).
    pub fn init_strain(&self) -> [f64; 3] {
        self.elast
            .settings
            .init_strain
            .unwrap_or([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0])
    }
}
