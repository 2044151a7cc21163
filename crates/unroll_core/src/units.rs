//! Unit-tagged physical quantities.
//!
//! A [`Quantity`] is a value plus a [`Unit`]. Every unit belongs to one
//! [`Dimension`] and carries a scale factor to the SI unit of that dimension,
//! so values can be converted within a dimension and rejected across them.
//! Checks happen at runtime because quantities arrive as text from the CLI,
//! config files and the WASM bridge.

use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Length,
    Time,
    Angle,
    AngularVelocity,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Length => "length",
            Dimension::Time => "time",
            Dimension::Angle => "angle",
            Dimension::AngularVelocity => "angular velocity",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Meter,
    Centimeter,
    Millimeter,
    Kilometer,
    Second,
    Minute,
    Hour,
    Radian,
    Degree,
    Revolution,
    RadianPerSecond,
    RevolutionPerMinute,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Meter | Unit::Centimeter | Unit::Millimeter | Unit::Kilometer => {
                Dimension::Length
            }
            Unit::Second | Unit::Minute | Unit::Hour => Dimension::Time,
            Unit::Radian | Unit::Degree | Unit::Revolution => Dimension::Angle,
            Unit::RadianPerSecond | Unit::RevolutionPerMinute => Dimension::AngularVelocity,
        }
    }

    /// Factor that converts a value in this unit into the SI unit of its dimension.
    pub fn to_si(self) -> f64 {
        match self {
            Unit::Meter => 1.0,
            Unit::Centimeter => 1e-2,
            Unit::Millimeter => 1e-3,
            Unit::Kilometer => 1e3,
            Unit::Second => 1.0,
            Unit::Minute => 60.0,
            Unit::Hour => 3600.0,
            Unit::Radian => 1.0,
            Unit::Degree => PI / 180.0,
            Unit::Revolution => 2.0 * PI,
            Unit::RadianPerSecond => 1.0,
            Unit::RevolutionPerMinute => 2.0 * PI / 60.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Meter => "m",
            Unit::Centimeter => "cm",
            Unit::Millimeter => "mm",
            Unit::Kilometer => "km",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Hour => "h",
            Unit::Radian => "rad",
            Unit::Degree => "deg",
            Unit::Revolution => "rev",
            Unit::RadianPerSecond => "rad/s",
            Unit::RevolutionPerMinute => "rpm",
        }
    }
}

impl FromStr for Unit {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim() {
            "m" | "meter" | "meters" => Unit::Meter,
            "cm" | "centimeter" | "centimeters" => Unit::Centimeter,
            "mm" | "millimeter" | "millimeters" => Unit::Millimeter,
            "km" | "kilometer" | "kilometers" => Unit::Kilometer,
            "s" | "sec" | "second" | "seconds" => Unit::Second,
            "min" | "minute" | "minutes" => Unit::Minute,
            "h" | "hr" | "hour" | "hours" => Unit::Hour,
            "rad" | "radian" | "radians" => Unit::Radian,
            "deg" | "degree" | "degrees" => Unit::Degree,
            "rev" | "revolution" | "revolutions" => Unit::Revolution,
            "rad/s" | "radian/second" | "radians/second" => Unit::RadianPerSecond,
            "rpm" => Unit::RevolutionPerMinute,
            other => {
                return Err(SimulationError::UnitParse(format!(
                    "unknown unit \"{other}\""
                )))
            }
        };
        Ok(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A value tagged with a physical unit.
///
/// Serializes as its display string (`"0.02 m"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn meters(value: f64) -> Self {
        Self::new(value, Unit::Meter)
    }

    pub fn seconds(value: f64) -> Self {
        Self::new(value, Unit::Second)
    }

    pub fn radians_per_second(value: f64) -> Self {
        Self::new(value, Unit::RadianPerSecond)
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Value expressed in the SI unit of this quantity's dimension.
    pub fn si_value(&self) -> f64 {
        self.value * self.unit.to_si()
    }

    /// Fails unless this quantity has the given dimension.
    pub fn expect_dimension(&self, expected: Dimension) -> Result<(), SimulationError> {
        if self.dimension() == expected {
            Ok(())
        } else {
            Err(SimulationError::UnitMismatch {
                expected,
                found: self.dimension(),
            })
        }
    }

    /// SI value after checking the dimension.
    pub fn si_value_as(&self, expected: Dimension) -> Result<f64, SimulationError> {
        self.expect_dimension(expected)?;
        Ok(self.si_value())
    }

    pub fn convert_to(&self, unit: Unit) -> Result<Quantity, SimulationError> {
        self.expect_dimension(unit.dimension())?;
        Ok(Quantity::new(self.si_value() / unit.to_si(), unit))
    }

    pub fn checked_add(&self, other: &Quantity) -> Result<Quantity, SimulationError> {
        let rhs = other.convert_to(self.unit)?;
        Ok(Quantity::new(self.value + rhs.value, self.unit))
    }

    pub fn checked_sub(&self, other: &Quantity) -> Result<Quantity, SimulationError> {
        let rhs = other.convert_to(self.unit)?;
        Ok(Quantity::new(self.value - rhs.value, self.unit))
    }
}

impl FromStr for Quantity {
    type Err = SimulationError;

    /// Parses `"<number> <unit>"`; the space is optional (`"47m"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, unit) = match trimmed.split_once(char::is_whitespace) {
            Some(parts) => parts,
            None => {
                let split = unit_start(trimmed).ok_or_else(|| {
                    SimulationError::UnitParse(format!("missing unit in \"{trimmed}\""))
                })?;
                trimmed.split_at(split)
            }
        };
        let value: f64 = number.trim().parse().map_err(|_| {
            SimulationError::UnitParse(format!("invalid number \"{}\"", number.trim()))
        })?;
        Ok(Quantity::new(value, unit.parse()?))
    }
}

impl TryFrom<String> for Quantity {
    type Error = SimulationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self {
        q.to_string()
    }
}

/// Index of the first letter that is not an exponent marker.
fn unit_start(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    for (idx, &b) in bytes.iter().enumerate() {
        if !b.is_ascii_alphabetic() {
            continue;
        }
        let is_exponent = matches!(b, b'e' | b'E')
            && idx > 0
            && bytes[idx - 1].is_ascii_digit()
            && bytes
                .get(idx + 1)
                .is_some_and(|next| next.is_ascii_digit() || matches!(next, b'+' | b'-'));
        if !is_exponent {
            return Some(idx);
        }
    }
    None
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
