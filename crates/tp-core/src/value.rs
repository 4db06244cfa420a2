//! Attribute values: unit-tagged quantities, lists and flags.

use core::cmp::Ordering;
use core::fmt;

use crate::error::TpError;
use crate::units::{Area, Length, Power, Unit, VolumeRate};

/// Value of an element attribute.
///
/// Quantities carry their dimension through uom, so adding a length to a
/// power is rejected instead of silently producing a number.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Length(Length),
    Area(Area),
    Power(Power),
    VolumeRate(VolumeRate),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    /// Build a quantity from a magnitude expressed in `unit`.
    pub fn from_magnitude(value: f64, unit: Unit) -> Self {
        use crate::units::{kw, m, m2, m3ph, mm, watt};
        match unit {
            Unit::Meter => Value::Length(m(value)),
            Unit::Millimeter => Value::Length(mm(value)),
            Unit::SquareMeter => Value::Area(m2(value)),
            Unit::Watt => Value::Power(watt(value)),
            Unit::Kilowatt => Value::Power(kw(value)),
            Unit::CubicMeterPerSecond => {
                use uom::si::volume_rate::cubic_meter_per_second;
                Value::VolumeRate(VolumeRate::new::<cubic_meter_per_second>(value))
            }
            Unit::CubicMeterPerHour => Value::VolumeRate(m3ph(value)),
            Unit::Dimensionless => Value::Number(value),
        }
    }

    /// Magnitude expressed in `unit`, if the dimensions agree.
    pub fn magnitude_in(&self, unit: Unit) -> Option<f64> {
        use uom::si::{area, length, power, volume_rate};
        match (self, unit) {
            (Value::Length(l), Unit::Meter) => Some(l.get::<length::meter>()),
            (Value::Length(l), Unit::Millimeter) => Some(l.get::<length::millimeter>()),
            (Value::Area(a), Unit::SquareMeter) => Some(a.get::<area::square_meter>()),
            (Value::Power(p), Unit::Watt) => Some(p.get::<power::watt>()),
            (Value::Power(p), Unit::Kilowatt) => Some(p.get::<power::kilowatt>()),
            (Value::VolumeRate(q), Unit::CubicMeterPerSecond) => {
                Some(q.get::<volume_rate::cubic_meter_per_second>())
            }
            (Value::VolumeRate(q), Unit::CubicMeterPerHour) => {
                Some(q.get::<volume_rate::cubic_meter_per_hour>())
            }
            (Value::Number(n), Unit::Dimensionless) => Some(*n),
            _ => None,
        }
    }

    /// Check that the value can be expressed in `unit`.
    pub fn conform(self, unit: Unit, what: &'static str) -> Result<Self, TpError> {
        if self.magnitude_in(unit).is_some() {
            Ok(self)
        } else {
            Err(TpError::UnitMismatch {
                what,
                expected: unit.dimension(),
                actual: self.dimension(),
            })
        }
    }

    pub fn dimension(&self) -> &'static str {
        match self {
            Value::Length(_) => "length",
            Value::Area(_) => "area",
            Value::Power(_) => "power",
            Value::VolumeRate(_) => "volume rate",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    pub fn as_length(&self) -> Option<Length> {
        match self {
            Value::Length(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_area(&self) -> Option<Area> {
        match self {
            Value::Area(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_power(&self) -> Option<Power> {
        match self {
            Value::Power(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_volume_rate(&self) -> Option<VolumeRate> {
        match self {
            Value::VolumeRate(q) => Some(*q),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Zero-ish values count as missing data, as the aggregation math skips them.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Length(l) => l.value == 0.0,
            Value::Area(a) => a.value == 0.0,
            Value::Power(p) => p.value == 0.0,
            Value::VolumeRate(q) => q.value == 0.0,
            Value::Number(n) => *n == 0.0,
            Value::Bool(_) => false,
            Value::List(items) => items.is_empty(),
        }
    }

    /// Sum of two quantities of the same dimension.
    pub fn try_add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Length(a), Value::Length(b)) => Some(Value::Length(*a + *b)),
            (Value::Area(a), Value::Area(b)) => Some(Value::Area(*a + *b)),
            (Value::Power(a), Value::Power(b)) => Some(Value::Power(*a + *b)),
            (Value::VolumeRate(a), Value::VolumeRate(b)) => Some(Value::VolumeRate(*a + *b)),
            (Value::Number(a), Value::Number(b)) => Some(Value::Number(a + b)),
            _ => None,
        }
    }

    /// Multiply a quantity by a plain scalar.
    pub fn scale(&self, factor: f64) -> Option<Value> {
        match self {
            Value::Length(l) => Some(Value::Length(*l * factor)),
            Value::Area(a) => Some(Value::Area(*a * factor)),
            Value::Power(p) => Some(Value::Power(*p * factor)),
            Value::VolumeRate(q) => Some(Value::VolumeRate(*q * factor)),
            Value::Number(n) => Some(Value::Number(n * factor)),
            Value::Bool(_) | Value::List(_) => None,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Length(a), Value::Length(b)) => a.partial_cmp(b),
            (Value::Area(a), Value::Area(b)) => a.partial_cmp(b),
            (Value::Power(a), Value::Power(b)) => a.partial_cmp(b),
            (Value::VolumeRate(a), Value::VolumeRate(b)) => a.partial_cmp(b),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<Length> for Value {
    fn from(v: Length) -> Self {
        Value::Length(v)
    }
}

impl From<Area> for Value {
    fn from(v: Area) -> Self {
        Value::Area(v)
    }
}

impl From<Power> for Value {
    fn from(v: Power) -> Self {
        Value::Power(v)
    }
}

impl From<VolumeRate> for Value {
    fn from(v: VolumeRate) -> Self {
        Value::VolumeRate(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Length(l) => write!(f, "{} m", l.value),
            Value::Area(a) => write!(f, "{} m²", a.value),
            Value::Power(p) => write!(f, "{} W", p.value),
            Value::VolumeRate(q) => write!(f, "{} m³/s", q.value),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
