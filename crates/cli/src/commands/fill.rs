//! Complete an elastic-constant table under crystal symmetry and print the
//! result, preserving the surrounding lines of the file.

use std::path::Path;

use anyhow::{bail, Result};

use thermoelast_core::parse::read_elast_data;
use thermoelast_core::symmetry::{apply_symmetry, CrystalSystem, FillOptions};

pub fn parse_system(name: &str) -> Result<CrystalSystem> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "triclinic" => CrystalSystem::Triclinic,
        "monoclinic" => CrystalSystem::Monoclinic,
        "orthorhombic" => CrystalSystem::Orthorhombic,
        "trigonal6" => CrystalSystem::Trigonal6,
        "trigonal7" => CrystalSystem::Trigonal7,
        "tetragonal6" => CrystalSystem::Tetragonal6,
        "tetragonal7" => CrystalSystem::Tetragonal7,
        "hexagonal" => CrystalSystem::Hexagonal,
        "cubic" => CrystalSystem::Cubic,
        other => bail!("unknown crystal system {other:?}"),
    })
}

pub fn render(input: &Path, system: Option<CrystalSystem>, opts: &FillOptions) -> Result<String> {
    let text = std::fs::read_to_string(input)?;
    let mut elast = read_elast_data(input)?;
    if let Some(system) = system {
        apply_symmetry(&mut elast, system, opts)?;
    }

    let mut lines = text.lines();
    let title = lines.next().unwrap_or_default();
    let header = lines.next().unwrap_or_default();

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(header);
    out.push('\n');

    let keys = elast.modulus_keys();
    out.push_str(&format!("{:>12}", "V"));
    for key in &keys {
        out.push_str(&format!("{:>12}", key.to_string()));
    }
    out.push('\n');
    for volume in &elast.volumes {
        out.push_str(&format!("{:12.4}", volume.volume));
        for key in &keys {
            out.push_str(&format!("{:12.4}", volume.moduli[key]));
        }
        out.push('\n');
    }

    if let Some(lattice) = &elast.lattice_params {
        out.push('\n');
        for row in lattice {
            out.push_str(&format!("{:12.6} {:12.6} {:12.6}\n", row[0], row[1], row[2]));
        }
    }
    Ok(out)
}

pub fn execute(
    input: &Path,
    system: Option<&str>,
    ignore_residuals: bool,
    ignore_rank: bool,
    drop_atol: f64,
) -> Result<()> {
    let system = system.map(parse_system).transpose()?;
    let opts = FillOptions {
        ignore_rank,
        ignore_residuals,
        drop_atol,
        ..FillOptions::default()
    };
    print!("{}", render(input, system, &opts)?);
    Ok(())
}
