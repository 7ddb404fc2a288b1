//! Rule-driven serialization of the derived fields.
//!
//! Every supported output keyword maps to a rule carrying the filename
//! pattern (`{base}` is `tv` or `tp`, `{ij}` the Voigt digits for per-key
//! fields), the internal unit and the default output unit. Entries in the
//! settings file may override the filename and the output unit.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use once_cell::sync::Lazy;
use tracing::info;

use thermoelast_core::config::OutputEntry;
use thermoelast_core::error::{Error, Result};
use thermoelast_core::units::{to_ang3, to_gpa, RY_PER_BOHR3_TO_GPA};
use thermoelast_core::voigt::ModulusIndex;

use thermoelast_compute::{Base, Calculator, Kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prop {
    ModulusAdiabatic,
    ModulusIsothermal,
    Compliance,
    BulkModulusVoigt,
    BulkModulusReuss,
    BulkModulusVrh,
    ShearModulusVoigt,
    ShearModulusReuss,
    ShearModulusVrh,
    PrimaryVelocities,
    SecondaryVelocities,
    BulkVelocities,
    Pressures,
    Volumes,
    HeatCapacity,
}

impl Prop {
    fn per_key(&self) -> bool {
        matches!(self, Prop::ModulusAdiabatic | Prop::ModulusIsothermal | Prop::Compliance)
    }
}

#[derive(Debug, Clone)]
struct WriterRule {
    keywords: &'static [&'static str],
    fname_pattern: &'static str,
    prop: Prop,
    unit_internal: &'static str,
    unit: &'static str,
}

static RULES: Lazy<Vec<WriterRule>> = Lazy::new(|| {
    use Prop::*;
    vec![
        WriterRule {
            keywords: &["modulus_adiabatic", "cijs"],
            fname_pattern: "c{ij}s_{base}.txt",
            prop: ModulusAdiabatic,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["modulus_isothermal", "cijt"],
            fname_pattern: "c{ij}t_{base}.txt",
            prop: ModulusIsothermal,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["compliance", "sij"],
            fname_pattern: "s{ij}_{base}.txt",
            prop: Compliance,
            unit_internal: "bohr3/ry",
            unit: "1/GPa",
        },
        WriterRule {
            keywords: &["bulk_modulus_voigt", "kv"],
            fname_pattern: "K_V_{base}.txt",
            prop: BulkModulusVoigt,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["bulk_modulus_reuss", "kr"],
            fname_pattern: "K_R_{base}.txt",
            prop: BulkModulusReuss,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["bulk_modulus_voigt_reuss_hill", "kvrh"],
            fname_pattern: "K_VRH_{base}.txt",
            prop: BulkModulusVrh,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["shear_modulus_voigt", "gv"],
            fname_pattern: "G_V_{base}.txt",
            prop: ShearModulusVoigt,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["shear_modulus_reuss", "gr"],
            fname_pattern: "G_R_{base}.txt",
            prop: ShearModulusReuss,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["shear_modulus_voigt_reuss_hill", "gvrh"],
            fname_pattern: "G_VRH_{base}.txt",
            prop: ShearModulusVrh,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["primary_velocities", "vp"],
            fname_pattern: "vp_{base}.txt",
            prop: PrimaryVelocities,
            unit_internal: "km/s",
            unit: "km/s",
        },
        WriterRule {
            keywords: &["secondary_velocities", "vs"],
            fname_pattern: "vs_{base}.txt",
            prop: SecondaryVelocities,
            unit_internal: "km/s",
            unit: "km/s",
        },
        WriterRule {
            keywords: &["bulk_sound_velocities", "vb"],
            fname_pattern: "vb_{base}.txt",
            prop: BulkVelocities,
            unit_internal: "km/s",
            unit: "km/s",
        },
        WriterRule {
            keywords: &["pressures", "p"],
            fname_pattern: "p_{base}.txt",
            prop: Pressures,
            unit_internal: "ry/bohr3",
            unit: "GPa",
        },
        WriterRule {
            keywords: &["volumes", "v"],
            fname_pattern: "v_{base}.txt",
            prop: Volumes,
            unit_internal: "bohr3",
            unit: "angstrom3",
        },
        WriterRule {
            keywords: &["heat_capacity", "cv"],
            fname_pattern: "cv_{base}.txt",
            prop: HeatCapacity,
            unit_internal: "ry/k",
            unit: "ry/k",
        },
    ]
});

fn conversion_factor(from: &str, to: &str) -> Result<f64> {
    if from.eq_ignore_ascii_case(to) {
        return Ok(1.0);
    }
    match (from, to) {
        ("ry/bohr3", "GPa") => Ok(RY_PER_BOHR3_TO_GPA),
        ("bohr3/ry", "1/GPa") => Ok(1.0 / RY_PER_BOHR3_TO_GPA),
        ("bohr3", "angstrom3") => Ok(to_ang3(1.0)),
        _ => Err(Error::config(format!("unsupported unit conversion {from} -> {to}"))),
    }
}

pub struct ResultsWriter<'a> {
    calculator: &'a Calculator,
    registry: HashMap<&'static str, &'static WriterRule>,
}

impl<'a> ResultsWriter<'a> {
    pub fn new(calculator: &'a Calculator) -> Self {
        let mut registry = HashMap::new();
        for rule in RULES.iter() {
            for &keyword in rule.keywords {
                registry.insert(keyword, rule);
            }
        }
        Self { calculator, registry }
    }

    fn base_name(base: Base) -> &'static str {
        match base {
            Base::Volume => "tv",
            Base::Pressure => "tp",
        }
    }

    /// Values of the x axis in output units: volumes in A^3 or pressures in
    /// GPa.
    fn x_axis(&self, base: Base) -> Vec<f64> {
        match base {
            Base::Volume => self.calculator.v_array().iter().map(|&v| to_ang3(v)).collect(),
            Base::Pressure => self.calculator.p_array().iter().map(|&p| to_gpa(p)).collect(),
        }
    }

    fn scalar_field(&self, prop: Prop, base: Base) -> Result<Array2<f64>> {
        let calc = self.calculator;
        let agg = calc.aggregates();
        let on_base = |field: &Array2<f64>| calc.on_base(base, field.clone());
        Ok(match prop {
            Prop::BulkModulusVoigt => on_base(&agg.bulk_modulus_voigt),
            Prop::BulkModulusReuss => on_base(&agg.bulk_modulus_reuss),
            Prop::BulkModulusVrh => on_base(&agg.bulk_modulus_voigt_reuss_hill),
            Prop::ShearModulusVoigt => on_base(&agg.shear_modulus_voigt),
            Prop::ShearModulusReuss => on_base(&agg.shear_modulus_reuss),
            Prop::ShearModulusVrh => on_base(&agg.shear_modulus_voigt_reuss_hill),
            Prop::PrimaryVelocities => on_base(&agg.primary_velocities),
            Prop::SecondaryVelocities => on_base(&agg.secondary_velocities),
            Prop::BulkVelocities => on_base(&agg.bulk_velocities),
            Prop::Pressures => on_base(&calc.qha().pressures().to_owned()),
            Prop::HeatCapacity => on_base(&calc.qha().heat_capacity().to_owned()),
            Prop::Volumes => match base {
                Base::Pressure => calc.qha().volumes().to_owned(),
                Base::Volume => {
                    let nt = calc.t_array().len();
                    let v = calc.v_array().to_owned();
                    v.view()
                        .insert_axis(Axis(0))
                        .broadcast((nt, v.len()))
                        .expect("broadcast volume row")
                        .to_owned()
                }
            },
            _ => return Err(Error::config("per-component field queried as scalar")),
        })
    }

    /// Write one requested output entry.
    pub fn write(&self, base: Base, entry: &OutputEntry, out_dir: &Path) -> Result<()> {
        let keyword = entry.keyword();
        let rule = self
            .registry
            .get(keyword)
            .ok_or_else(|| Error::config(format!("unknown output keyword {keyword:?}")))?;

        let (fname_override, unit_override) = match entry {
            OutputEntry::Keyword(_) => (None, None),
            OutputEntry::Detailed { fname, unit, .. } => (fname.as_deref(), unit.as_deref()),
        };
        let unit = unit_override.unwrap_or(rule.unit);
        let factor = conversion_factor(rule.unit_internal, unit)?;

        let calc = self.calculator;
        if rule.prop.per_key() {
            let keys = match rule.prop {
                Prop::Compliance => calc.compliance_keys(),
                _ => calc.modulus_keys(),
            };
            for key in keys {
                let field = match rule.prop {
                    Prop::ModulusAdiabatic => calc.modulus(base, Kind::Adiabatic, key)?,
                    Prop::ModulusIsothermal => calc.modulus(base, Kind::Isothermal, key)?,
                    Prop::Compliance => calc.compliance(base, key)?,
                    _ => unreachable!(),
                };
                let fname = fname_override.map(str::to_owned).unwrap_or_else(|| {
                    expand_pattern(rule.fname_pattern, base, Some(key))
                });
                self.save_table(&out_dir.join(&fname), base, &(field * factor))?;
                info!(file = %fname, "output written");
            }
        } else {
            let field = self.scalar_field(rule.prop, base)?;
            let fname = fname_override
                .map(str::to_owned)
                .unwrap_or_else(|| expand_pattern(rule.fname_pattern, base, None));
            self.save_table(&out_dir.join(&fname), base, &(field * factor))?;
            info!(file = %fname, "output written");
        }
        Ok(())
    }

    /// Whitespace table: the header row carries the x-axis values, the first
    /// column the temperatures.
    fn save_table(&self, path: &Path, base: Base, value: &Array2<f64>) -> Result<()> {
        let t_array: ArrayView1<f64> = self.calculator.t_array();
        let xs = self.x_axis(base);

        let mut out = String::new();
        out.push_str(&format!("{:>12}", "T"));
        for x in &xs {
            out.push_str(&format!("{:>16.6}", x));
        }
        out.push('\n');
        for (i, &t) in t_array.iter().enumerate() {
            out.push_str(&format!("{:12.2}", t));
            for m in 0..xs.len() {
                out.push_str(&format!("{:16.6e}", value[(i, m)]));
            }
            out.push('\n');
        }
        std::fs::write(path, out)?;
        Ok(())
    }
}

fn expand_pattern(pattern: &str, base: Base, key: Option<ModulusIndex>) -> String {
    let mut name = pattern.replace("{base}", ResultsWriter::base_name(base));
    if let Some(key) = key {
        name = name.replace("{ij}", &key.digits());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_expansion() {
        let key = ModulusIndex::parse("c12").unwrap();
        assert_eq!(
            expand_pattern("c{ij}s_{base}.txt", Base::Volume, Some(key)),
            "c12s_tv.txt"
        );
        assert_eq!(expand_pattern("K_VRH_{base}.txt", Base::Pressure, None), "K_VRH_tp.txt");
    }

    #[test]
    fn test_registry_covers_aliases() {
        let mut registry: HashMap<&str, &WriterRule> = HashMap::new();
        for rule in RULES.iter() {
            for &keyword in rule.keywords {
                assert!(registry.insert(keyword, rule).is_none(), "duplicate keyword {keyword}");
            }
        }
        assert!(registry.contains_key("modulus_adiabatic"));
        assert!(registry.contains_key("vp"));
    }

    #[test]
    fn test_conversion_factors() {
        assert!((conversion_factor("ry/bohr3", "GPa").unwrap() - 14710.5076).abs() < 1e-6);
        assert!((conversion_factor("km/s", "km/s").unwrap() - 1.0).abs() < 1e-15);
        assert!(conversion_factor("ry/bohr3", "eV").is_err());
    }
}
