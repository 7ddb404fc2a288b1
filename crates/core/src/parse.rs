//! Parsers for the two whitespace-delimited traditional input files.
//!
//! Input 1 (phonon/energy): a header of five integers `N_V N_q N_p N_m N_a`,
//! then `N_V` volume blocks (`P= .. V= .. E= ..` line, `N_q` q-blocks of a
//! coordinate line plus `N_p` frequency lines), then a `weight(s)` marker and
//! `N_q` weight rows.
//!
//! Input 2 (elastic constants): a title line, a `V_ref N_V cellmass` line, a
//! header row (`V` plus `c_ij` symbols), `N_V` data rows, and an optional
//! lattice-parameter block.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{
    ElastData, ElastVolumeData, QPointData, QPointWeight, QhaInputData, VolumeData,
};
use crate::voigt::ModulusIndex;

/// Line iterator that remembers the 1-based number of the last yielded line.
struct Lines<'a> {
    path: &'a str,
    iter: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> Lines<'a> {
    fn new(path: &'a str, text: &'a str) -> Self {
        Self { path, iter: text.lines(), line_no: 0 }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.iter.next()?;
        self.line_no += 1;
        Some(line)
    }

    fn expect_line(&mut self) -> Result<&'a str> {
        self.next_line()
            .ok_or_else(|| Error::malformed(self.path, self.line_no + 1, "unexpected end of file"))
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.path, self.line_no, reason)
    }
}

fn parse_floats(lines: &Lines<'_>, line: &str, n: usize) -> Result<Vec<f64>> {
    let fields: Vec<f64> = line
        .split_whitespace()
        .map(|t| t.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| lines.error(format!("expected numeric fields: {e}")))?;
    if fields.len() < n {
        return Err(lines.error(format!("expected {n} fields, found {}", fields.len())));
    }
    Ok(fields)
}

/// Read the phonon/energy input file.
pub fn read_energy(path: &Path) -> Result<QhaInputData> {
    let text = std::fs::read_to_string(path)?;
    let path_str = path.display().to_string();
    let mut lines = Lines::new(&path_str, &text);

    // scan for the header line of five integers
    let (nv, nq, np, nm, na) = loop {
        let line = lines.expect_line()?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() == 5 {
            if let Ok(ints) = fields
                .iter()
                .map(|t| t.parse::<usize>())
                .collect::<std::result::Result<Vec<_>, _>>()
            {
                break (ints[0], ints[1], ints[2], ints[3], ints[4]);
            }
        }
    };

    let mut volumes = Vec::with_capacity(nv);
    for _ in 0..nv {
        // scan for the next "P= .. V= .. E= .." line
        let (pressure, volume, energy) = loop {
            let line = lines.expect_line()?;
            if line.contains("P=") && line.contains("V=") && line.contains("E=") {
                let cleaned = line.replace("P=", " ").replace("V=", " ").replace("E=", " ");
                let fields = parse_floats(&lines, &cleaned, 3)?;
                break (fields[0], fields[1], fields[2]);
            }
            if !line.trim().is_empty() {
                return Err(lines.error("expected a `P= .. V= .. E= ..` block header"));
            }
        };

        let mut q_points = Vec::with_capacity(nq);
        for _ in 0..nq {
            let line = lines.expect_line()?;
            let coord = parse_floats(&lines, line, 3)?;
            let mut modes = Vec::with_capacity(np);
            for _ in 0..np {
                let line = lines.expect_line()?;
                let freq: f64 = line
                    .trim()
                    .parse()
                    .map_err(|e| lines.error(format!("expected a mode frequency: {e}")))?;
                modes.push(freq);
            }
            q_points.push(QPointData { coord: [coord[0], coord[1], coord[2]], modes });
        }
        volumes.push(VolumeData { pressure, volume, energy, q_points });
    }

    // scan for the weight marker
    loop {
        let line = lines.expect_line()?;
        let word = line.trim().to_ascii_lowercase();
        if word == "weight" || word == "weights" {
            break;
        }
    }

    let mut weights = Vec::with_capacity(nq);
    for _ in 0..nq {
        let line = lines.expect_line()?;
        let fields = parse_floats(&lines, line, 4)?;
        weights.push(QPointWeight { coord: [fields[0], fields[1], fields[2]], weight: fields[3] });
    }

    let data = QhaInputData { nv, nq, np, nm, na, volumes, weights };
    data.validate()?;
    Ok(data)
}

/// Read the elastic-constant table.
///
/// Column symbols are case-insensitive (`C11` and `c11` are the same column).
pub fn read_elast_data(path: &Path) -> Result<ElastData> {
    let text = std::fs::read_to_string(path)?;
    let path_str = path.display().to_string();
    let mut lines = Lines::new(&path_str, &text);

    let _title = lines.expect_line()?;

    let line = lines.expect_line()?;
    let fields = parse_floats(&lines, line, 3)?;
    let vref = fields[0];
    let nv = fields[1] as usize;
    let cellmass = fields[2];

    let header = lines.expect_line()?;
    let mut columns = header.split_whitespace();
    match columns.next() {
        Some(v) if v.eq_ignore_ascii_case("v") => {}
        _ => return Err(lines.error("first header column must be V")),
    }
    let keys: Vec<ModulusIndex> = columns
        .map(ModulusIndex::parse)
        .collect::<Result<_>>()
        .map_err(|e| lines.error(e.to_string()))?;

    let mut volumes = Vec::with_capacity(nv);
    for _ in 0..nv {
        let line = lines.expect_line()?;
        let fields = parse_floats(&lines, line, keys.len() + 1)?;
        let mut moduli = BTreeMap::new();
        for (key, value) in keys.iter().zip(&fields[1..]) {
            if moduli.insert(*key, *value).is_some() {
                return Err(lines.error(format!("duplicate column {key}")));
            }
        }
        volumes.push(ElastVolumeData { volume: fields[0], moduli });
    }

    // optional lattice-parameter block after a blank separator
    let mut lattice_params = None;
    while let Some(line) = lines.next_line() {
        if line.trim().is_empty() {
            continue;
        }
        let mut rows = Vec::with_capacity(nv);
        let fields = parse_floats(&lines, line, 3)?;
        rows.push([fields[0], fields[1], fields[2]]);
        for _ in 1..nv {
            let line = lines.expect_line()?;
            let fields = parse_floats(&lines, line, 3)?;
            rows.push([fields[0], fields[1], fields[2]]);
        }
        lattice_params = Some(rows);
        break;
    }

    let data = ElastData { vref, nv, cellmass, volumes, lattice_params };
    data.validate()?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("thermoelast-{name}-{}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const INPUT01: &str = "\
# synthetic phonon input
2 2 3 1 1

P=  0.00  V=  120.00  E=  -10.50
  0.000 0.000 0.000
0.0
0.0
0.0
  0.500 0.000 0.000
100.0
110.0
120.0
P=  5.00  V=  100.00  E=  -10.40
  0.000 0.000 0.000
0.0
0.0
0.0
  0.500 0.000 0.000
110.0
121.0
132.0

weight
  0.000 0.000 0.000  1.0
  0.500 0.000 0.000  3.0
";

    const INPUT02: &str = "\
elastic constants
 120.0  2  40.5
V  c11  C12
 120.0  250.0  100.0
 100.0  300.0  120.0

 4.70 4.70 4.70
 4.42 4.42 4.42
";

    #[test]
    fn test_read_energy() {
        let path = write_temp("input01", INPUT01);
        let data = read_energy(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!((data.nv, data.nq, data.np), (2, 2, 3));
        assert!((data.volumes[0].volume - 120.0).abs() < 1e-12);
        assert!((data.volumes[1].q_points[1].modes[2] - 132.0).abs() < 1e-12);
        assert!((data.weights[1].weight - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_read_energy_reports_line() {
        let broken = INPUT01.replace("121.0", "oops");
        let path = write_temp("input01-broken", &broken);
        let err = read_energy(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        match err {
            Error::InputMalformed { line, .. } => assert_eq!(line, 20),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_read_elast_data() {
        let path = write_temp("input02", INPUT02);
        let data = read_elast_data(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(data.nv, 2);
        assert!((data.cellmass - 40.5).abs() < 1e-12);
        // header symbols are case-insensitive
        let c12 = ModulusIndex::parse("c12").unwrap();
        assert!((data.volumes[0].moduli[&c12] - 100.0).abs() < 1e-12);
        let lat = data.lattice_params.unwrap();
        assert!((lat[1][0] - 4.42).abs() < 1e-12);
    }
}
