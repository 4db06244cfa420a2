// tp-core/src/units.rs

use uom::si::f64::{
    Acceleration as UomAcceleration, Area as UomArea, Length as UomLength,
    MassDensity as UomMassDensity, Power as UomPower, VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Accel = UomAcceleration;
pub type Area = UomArea;
pub type Density = UomMassDensity;
pub type Length = UomLength;
pub type Power = UomPower;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn kw(v: f64) -> Power {
    use uom::si::power::kilowatt;
    Power::new::<kilowatt>(v)
}

#[inline]
pub fn watt(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn m3ph(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_hour;
    VolumeRate::new::<cubic_meter_per_hour>(v)
}

/// Unit symbols the engine can express attribute values in.
///
/// Values are stored as uom quantities; a `Unit` only decides which magnitude
/// is reported to, or read from, the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Meter,
    Millimeter,
    SquareMeter,
    Watt,
    Kilowatt,
    CubicMeterPerSecond,
    CubicMeterPerHour,
    Dimensionless,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Meter => "m",
            Unit::Millimeter => "mm",
            Unit::SquareMeter => "m²",
            Unit::Watt => "W",
            Unit::Kilowatt => "kW",
            Unit::CubicMeterPerSecond => "m³/s",
            Unit::CubicMeterPerHour => "m³/h",
            Unit::Dimensionless => "1",
        }
    }

    /// Parse a unit symbol as written in network files.
    pub fn parse(symbol: &str) -> Option<Self> {
        let unit = match symbol.trim() {
            "m" => Unit::Meter,
            "mm" => Unit::Millimeter,
            "m2" | "m²" | "m^2" => Unit::SquareMeter,
            "W" => Unit::Watt,
            "kW" => Unit::Kilowatt,
            "m3/s" | "m³/s" => Unit::CubicMeterPerSecond,
            "m3/h" | "m³/h" => Unit::CubicMeterPerHour,
            "" | "1" | "-" => Unit::Dimensionless,
            _ => return None,
        };
        Some(unit)
    }

    /// Name of the physical dimension measured in this unit.
    pub fn dimension(self) -> &'static str {
        match self {
            Unit::Meter | Unit::Millimeter => "length",
            Unit::SquareMeter => "area",
            Unit::Watt | Unit::Kilowatt => "power",
            Unit::CubicMeterPerSecond | Unit::CubicMeterPerHour => "volume rate",
            Unit::Dimensionless => "number",
        }
    }
}

pub mod constants {
    use super::*;

    /// Gravitational acceleration used by the pump power formula.
    pub const G_MPS2: f64 = 9.81;

    /// Water density used by the pump power formula.
    pub const RHO_WATER_KGPM3: f64 = 1000.0;

    #[inline]
    pub fn g() -> Accel {
        use uom::si::acceleration::meter_per_second_squared;
        Accel::new::<meter_per_second_squared>(G_MPS2)
    }

    #[inline]
    pub fn rho_water() -> Density {
        use uom::si::mass_density::kilogram_per_cubic_meter;
        Density::new::<kilogram_per_cubic_meter>(RHO_WATER_KGPM3)
    }
}
