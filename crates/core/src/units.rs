//! Data sizes expressed in bits or bytes with metric or binary prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix family: powers of 1000 or powers of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitFamily {
    Metric,
    Binary,
}

impl BitFamily {
    pub fn radix(&self) -> f64 {
        match self {
            Self::Metric => 1000.0,
            Self::Binary => 1024.0,
        }
    }

    /// Exponents of this family, smallest first.
    pub fn exponents(&self) -> &'static [BitExponent] {
        use BitExponent::*;
        match self {
            Self::Metric => &[Basic, Kilo, Mega, Giga, Tera, Peta, Exa, Zetta, Yotta],
            Self::Binary => &[Basic, Kibi, Mebi, Gibi, Tebi, Pebi, Exbi, Zebi, Yobi],
        }
    }
}

/// Unit prefix. `Basic` means no prefix and belongs to both families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitExponent {
    Basic,
    Kilo,
    Mega,
    Giga,
    Tera,
    Peta,
    Exa,
    Zetta,
    Yotta,
    Kibi,
    Mebi,
    Gibi,
    Tebi,
    Pebi,
    Exbi,
    Zebi,
    Yobi,
}

/// `(exponent, family, power, short name, long name)`.
const EXPONENTS: [(BitExponent, BitFamily, i32, &str, &str); 17] = [
    (BitExponent::Basic, BitFamily::Metric, 0, "", ""),
    (BitExponent::Kilo, BitFamily::Metric, 1, "K", "Kilo"),
    (BitExponent::Mega, BitFamily::Metric, 2, "M", "Mega"),
    (BitExponent::Giga, BitFamily::Metric, 3, "G", "Giga"),
    (BitExponent::Tera, BitFamily::Metric, 4, "T", "Tera"),
    (BitExponent::Peta, BitFamily::Metric, 5, "P", "Peta"),
    (BitExponent::Exa, BitFamily::Metric, 6, "E", "Exa"),
    (BitExponent::Zetta, BitFamily::Metric, 7, "Z", "Zetta"),
    (BitExponent::Yotta, BitFamily::Metric, 8, "Y", "Yotta"),
    (BitExponent::Kibi, BitFamily::Binary, 1, "Ki", "Kibi"),
    (BitExponent::Mebi, BitFamily::Binary, 2, "Mi", "Mebi"),
    (BitExponent::Gibi, BitFamily::Binary, 3, "Gi", "Gibi"),
    (BitExponent::Tebi, BitFamily::Binary, 4, "Ti", "Tebi"),
    (BitExponent::Pebi, BitFamily::Binary, 5, "Pi", "Pebi"),
    (BitExponent::Exbi, BitFamily::Binary, 6, "Ei", "Exbi"),
    (BitExponent::Zebi, BitFamily::Binary, 7, "Zi", "Zebi"),
    (BitExponent::Yobi, BitFamily::Binary, 8, "Yi", "Yobi"),
];

impl BitExponent {
    fn entry(&self) -> &'static (BitExponent, BitFamily, i32, &'static str, &'static str) {
        // The table holds one row per variant in declaration order.
        &EXPONENTS[*self as usize]
    }

    pub fn family(&self) -> BitFamily {
        self.entry().1
    }

    pub fn power(&self) -> i32 {
        self.entry().2
    }

    pub fn short_name(&self) -> &'static str {
        self.entry().3
    }

    pub fn long_name(&self) -> &'static str {
        self.entry().4
    }

    /// Factor from this prefix to no prefix.
    pub fn multiplier(&self) -> f64 {
        self.family().radix().powi(self.power())
    }

    pub fn all() -> impl Iterator<Item = BitExponent> {
        EXPONENTS.iter().map(|e| e.0)
    }
}

/// Whether a unit counts bits or bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitBase {
    Bit,
    Byte,
}

impl BitBase {
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Bit => "b",
            Self::Byte => "B",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Self::Bit => "Bit",
            Self::Byte => "Byte",
        }
    }

    pub fn bits(&self) -> f64 {
        match self {
            Self::Bit => 1.0,
            Self::Byte => 8.0,
        }
    }
}

/// A prefix applied to a base, e.g. `GB` or `Mib`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitUnit {
    pub exponent: BitExponent,
    pub base: BitBase,
}

impl BitUnit {
    pub const BIT: BitUnit = BitUnit::new(BitExponent::Basic, BitBase::Bit);
    pub const BYTE: BitUnit = BitUnit::new(BitExponent::Basic, BitBase::Byte);
    pub const KILOBIT: BitUnit = BitUnit::new(BitExponent::Kilo, BitBase::Bit);
    pub const KILOBYTE: BitUnit = BitUnit::new(BitExponent::Kilo, BitBase::Byte);
    pub const MEGABYTE: BitUnit = BitUnit::new(BitExponent::Mega, BitBase::Byte);
    pub const GIGABYTE: BitUnit = BitUnit::new(BitExponent::Giga, BitBase::Byte);
    pub const MEBIBYTE: BitUnit = BitUnit::new(BitExponent::Mebi, BitBase::Byte);
    pub const GIBIBYTE: BitUnit = BitUnit::new(BitExponent::Gibi, BitBase::Byte);

    pub const fn new(exponent: BitExponent, base: BitBase) -> Self {
        Self { exponent, base }
    }

    pub fn short_name(&self) -> String {
        format!("{}{}", self.exponent.short_name(), self.base.short_name())
    }

    pub fn long_name(&self) -> String {
        format!("{}{}", self.exponent.long_name(), self.base.long_name())
    }

    /// Number of bits in one of this unit.
    pub fn bits(&self) -> f64 {
        self.exponent.multiplier() * self.base.bits()
    }

    /// Unit whose short name is exactly `name`, e.g. `KiB`.
    pub fn from_short_name(name: &str) -> Option<BitUnit> {
        [BitBase::Bit, BitBase::Byte]
            .into_iter()
            .flat_map(|base| BitExponent::all().map(move |exponent| BitUnit::new(exponent, base)))
            .find(|unit| unit.short_name() == name)
    }
}

impl fmt::Display for BitUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.exponent.short_name(), self.base.short_name())
    }
}

/// A non-negative amount of data in some unit.
///
/// Displays with at most two fraction digits: `BitValue::new(10.0, BitUnit::GIGABYTE)`
/// renders as `10 GB`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BitValue {
    value: f64,
    unit: BitUnit,
}

impl BitValue {
    /// Negative and NaN amounts are clamped to zero.
    pub fn new(value: f64, unit: BitUnit) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.max(0.0) };
        Self { value, unit }
    }

    pub fn from_bytes(bytes: u64) -> Self {
        Self::new(bytes as f64, BitUnit::BYTE)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> BitUnit {
        self.unit
    }

    pub fn bits(&self) -> f64 {
        self.value * self.unit.bits()
    }

    pub fn bytes(&self) -> f64 {
        self.bits() / BitBase::Byte.bits()
    }

    /// Whole bytes, rounded down.
    pub fn whole_bytes(&self) -> u64 {
        self.bytes().floor() as u64
    }

    /// Amount expressed in `unit`.
    pub fn value_in(&self, unit: BitUnit) -> f64 {
        self.bits() / unit.bits()
    }

    pub fn to_unit(&self, unit: BitUnit) -> BitValue {
        BitValue::new(self.value_in(unit), unit)
    }

    /// Same prefix, different base.
    pub fn to_base(&self, base: BitBase) -> BitValue {
        self.to_unit(BitUnit::new(self.unit.exponent, base))
    }

    /// Re-expresses the amount with the largest prefix of the unit's family
    /// that keeps the value at least 1.
    pub fn to_nearest_unit(&self) -> BitValue {
        let base = self.unit.base;
        let family = self.unit.exponent.family();
        let exponent = family
            .exponents()
            .iter()
            .rev()
            .find(|e| self.value_in(BitUnit::new(**e, base)) >= 1.0)
            .copied()
            .unwrap_or(BitExponent::Basic);
        self.to_unit(BitUnit::new(exponent, base))
    }

    /// Display with at most `digits` fraction digits, trailing zeros removed.
    pub fn format(&self, digits: usize) -> String {
        let mut number = format!("{:.*}", digits, self.value);
        if number.contains('.') {
            let trimmed = number.trim_end_matches('0').trim_end_matches('.').len();
            number.truncate(trimmed);
        }
        format!("{} {}", number, self.unit)
    }

    pub fn to_long_string(&self) -> String {
        format!("{} {}", self.value, self.unit.long_name())
    }
}

impl fmt::Display for BitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(2))
    }
}

impl FromStr for BitValue {
    type Err = String;

    /// Parses `10 GB`, `1.5GiB` or `800kb`-style strings. Units are case sensitive,
    /// except that a lower-case `k` is accepted for kilo.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let value = number
            .parse::<f64>()
            .map_err(|_| format!("Invalid size: {}", s))?;
        let unit = unit.trim();
        let unit = if unit.is_empty() {
            BitUnit::BYTE
        } else {
            let normalized = match unit.strip_prefix('k') {
                Some(rest) => format!("K{}", rest),
                None => unit.to_string(),
            };
            BitUnit::from_short_name(&normalized)
                .ok_or_else(|| format!("Unknown size unit: {}", unit))?
        };
        Ok(BitValue::new(value, unit))
    }
}

impl From<BitValue> for String {
    fn from(value: BitValue) -> Self {
        format!("{} {}", value.value, value.unit)
    }
}

impl TryFrom<String> for BitValue {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
