//! Voigt / standard subscript algebra for elastic tensor components.
//!
//! A strain subscript is an ordered pair `(i, j)` with `1 <= i <= j <= 3`,
//! isomorphic to a Voigt number 1..6. An elastic modulus subscript is an
//! unordered pair of strain subscripts kept in canonical (ascending Voigt)
//! order, so `c_34` and `c_43` compare equal, as do `c_16` and `c_1121`.

use std::fmt;

use crate::error::{Error, Result};

/// How a modulus component is obtained from the phonon kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalcKind {
    Longitudinal,
    OffDiagonal,
    Shear,
}

const VOIGT_TO_STANDARD: [(u8, u8); 6] = [(1, 1), (2, 2), (3, 3), (2, 3), (1, 3), (1, 2)];

/// A strain subscript: the pair `(i, j)` behind a Voigt number 1..6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrainIndex {
    voigt: u8,
}

impl StrainIndex {
    /// Construct from a Voigt number 1..6.
    pub fn from_voigt(v: u8) -> Result<Self> {
        if !(1..=6).contains(&v) {
            return Err(Error::config(format!("invalid Voigt index {v}")));
        }
        Ok(Self { voigt: v })
    }

    /// Construct from a standard pair; order of `i` and `j` does not matter.
    pub fn from_pair(i: u8, j: u8) -> Result<Self> {
        let (i, j) = if i <= j { (i, j) } else { (j, i) };
        let v = VOIGT_TO_STANDARD
            .iter()
            .position(|&p| p == (i, j))
            .ok_or_else(|| Error::config(format!("invalid standard index {i}{j}")))?;
        Ok(Self { voigt: v as u8 + 1 })
    }

    /// The Voigt number 1..6.
    pub fn voigt(&self) -> u8 {
        self.voigt
    }

    /// The standard pair `(i, j)` with `i <= j`.
    pub fn pair(&self) -> (u8, u8) {
        VOIGT_TO_STANDARD[self.voigt as usize - 1]
    }

    /// Whether this is an axial strain (Voigt 1..3).
    pub fn is_axial(&self) -> bool {
        self.voigt <= 3
    }
}

/// An elastic modulus subscript: a canonically ordered pair of strain
/// subscripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulusIndex {
    e1: StrainIndex,
    e2: StrainIndex,
}

impl ModulusIndex {
    /// Construct from two strain subscripts, canonicalizing the order.
    pub fn new(a: StrainIndex, b: StrainIndex) -> Self {
        let (e1, e2) = if a.voigt() <= b.voigt() { (a, b) } else { (b, a) };
        Self { e1, e2 }
    }

    /// Construct from a pair of Voigt numbers.
    pub fn from_voigt(i: u8, j: u8) -> Result<Self> {
        Ok(Self::new(StrainIndex::from_voigt(i)?, StrainIndex::from_voigt(j)?))
    }

    /// Construct from a standard quadruple `(i, j, k, l)`.
    pub fn from_standard(i: u8, j: u8, k: u8, l: u8) -> Result<Self> {
        Ok(Self::new(StrainIndex::from_pair(i, j)?, StrainIndex::from_pair(k, l)?))
    }

    /// Parse a subscript symbol such as `c11`, `C23`, `11` or `1123`.
    ///
    /// A leading `c` or `s` (any case) is ignored so elastic-constant table
    /// headers can be fed in directly.
    pub fn parse(symbol: &str) -> Result<Self> {
        let symbol = symbol.trim();
        let digits: &str = symbol
            .strip_prefix(['c', 'C', 's', 'S'])
            .unwrap_or(symbol);
        let ds: Vec<u8> = digits
            .chars()
            .map(|c| {
                c.to_digit(10)
                    .map(|d| d as u8)
                    .ok_or_else(|| Error::config(format!("invalid modulus symbol {symbol:?}")))
            })
            .collect::<Result<_>>()?;
        match ds.as_slice() {
            [i, j] => Self::from_voigt(*i, *j),
            [i, j, k, l] => Self::from_standard(*i, *j, *k, *l),
            _ => Err(Error::config(format!("invalid modulus symbol {symbol:?}"))),
        }
    }

    /// The first (smaller-Voigt) strain subscript.
    pub fn e1(&self) -> StrainIndex {
        self.e1
    }

    /// The second strain subscript.
    pub fn e2(&self) -> StrainIndex {
        self.e2
    }

    /// The Voigt pair `(i, j)` with `i <= j`.
    pub fn voigt(&self) -> (u8, u8) {
        (self.e1.voigt(), self.e2.voigt())
    }

    /// The standard quadruple `(i, j, k, l)`.
    pub fn standard(&self) -> (u8, u8, u8, u8) {
        let (i, j) = self.e1.pair();
        let (k, l) = self.e2.pair();
        (i, j, k, l)
    }

    pub fn is_shear(&self) -> bool {
        !self.e1.is_axial() || !self.e2.is_axial()
    }

    pub fn is_longitudinal(&self) -> bool {
        self.e1 == self.e2 && !self.is_shear()
    }

    pub fn is_off_diagonal(&self) -> bool {
        !self.is_shear() && !self.is_longitudinal()
    }

    pub fn kind(&self) -> CalcKind {
        if self.is_longitudinal() {
            CalcKind::Longitudinal
        } else if self.is_off_diagonal() {
            CalcKind::OffDiagonal
        } else {
            CalcKind::Shear
        }
    }

    /// Number of equivalent standard quadruples represented by this symbol.
    pub fn multiplicity(&self) -> u32 {
        let (i1, j1) = self.e1.pair();
        let (i2, j2) = self.e2.pair();
        1 << ((self.e1 != self.e2) as u32 + (i1 != j1) as u32 + (i2 != j2) as u32)
    }

    /// The two Voigt digits, e.g. `"12"`; used in output file names.
    pub fn digits(&self) -> String {
        let (i, j) = self.voigt();
        format!("{i}{j}")
    }
}

impl fmt::Display for ModulusIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (i, j) = self.voigt();
        write!(f, "c{i}{j}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(sym: &str) -> ModulusIndex {
        ModulusIndex::parse(sym).unwrap()
    }

    #[test]
    fn test_voigt_standard_round_trip() {
        for v in 1..=6u8 {
            let e = StrainIndex::from_voigt(v).unwrap();
            let (i, j) = e.pair();
            assert_eq!(StrainIndex::from_pair(i, j).unwrap().voigt(), v);
            // order of the standard pair does not matter
            assert_eq!(StrainIndex::from_pair(j, i).unwrap().voigt(), v);
        }
    }

    #[test]
    fn test_symbol_equivalences() {
        assert_eq!(c("11"), c("1111"));
        assert_eq!(c("c11"), c("11"));
        assert_eq!(c("C11"), c("11"));
        assert_ne!(c("11"), c("22"));
        assert_eq!(c("34"), c("43"));
        assert_eq!(c("1112"), c("16"));
        assert_eq!(c("1121"), c("16"));
        assert_eq!(c("1211"), c("16"));
        assert_eq!(c("56"), c("65"));
    }

    #[test]
    fn test_invalid_symbols() {
        assert!(ModulusIndex::parse("c17").is_err());
        assert!(ModulusIndex::parse("c1").is_err());
        assert!(ModulusIndex::parse("c123").is_err());
        assert!(StrainIndex::from_pair(1, 4).is_err());
    }

    #[test]
    fn test_classification() {
        assert_eq!(c("11").kind(), CalcKind::Longitudinal);
        assert_eq!(c("12").kind(), CalcKind::OffDiagonal);
        assert_eq!(c("44").kind(), CalcKind::Shear);
        assert_eq!(c("16").kind(), CalcKind::Shear);
        assert!(c("45").is_shear());
    }

    #[test]
    fn test_multiplicity() {
        assert_eq!(c("11").multiplicity(), 1);
        assert_eq!(c("12").multiplicity(), 2);
        assert_eq!(c("44").multiplicity(), 4);
        assert_eq!(c("16").multiplicity(), 4);
        assert_eq!(c("45").multiplicity(), 8);
    }

    #[test]
    fn test_standard_quadruple() {
        assert_eq!(c("44").standard(), (2, 3, 2, 3));
        assert_eq!(c("12").standard(), (1, 1, 2, 2));
    }
}
