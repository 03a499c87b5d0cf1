//! Unit helpers that scale human units into the engine's internal base units.
//!
//! Internal base units are the micrometre for length, the cubic micrometre
//! for volume, the second for time and the radian for angles. Every helper
//! is a pure linear scaling: the same input always yields the same output
//! and there is no failure mode.
//!
//! ```rust
//! use cece_core::units::*;
//!
//! assert_eq!(mm(1.0).value(), 1_000.0);
//! assert_eq!(ul(1.0).value(), 1.0e9);
//! assert_eq!(f64::from(um3(13.0)), 13.0);
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident, $symbol:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(f64);

        impl $name {
            /// Wrap a magnitude already expressed in internal units.
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Magnitude in internal units.
            pub const fn value(self) -> f64 {
                self.0
            }
        }

        impl From<$name> for f64 {
            fn from(quantity: $name) -> f64 {
                quantity.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", self.0, $symbol)
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }
    };
}

quantity!(
    /// A length in micrometres.
    Length,
    "um"
);
quantity!(
    /// A volume in cubic micrometres.
    Volume,
    "um3"
);
quantity!(
    /// A span of simulated time in seconds.
    Duration,
    "s"
);
quantity!(
    /// An angle in radians.
    Angle,
    "rad"
);

const NM_PER_UM: f64 = 1.0e3;
const UM_PER_MM: f64 = 1.0e3;
const UM_PER_CM: f64 = 1.0e4;
const UM_PER_M: f64 = 1.0e6;

/// 1 µm³ = 1 fl, so a picolitre is 10³ µm³.
const UM3_PER_PL: f64 = 1.0e3;
const UM3_PER_NL: f64 = 1.0e6;
const UM3_PER_UL: f64 = 1.0e9;
const UM3_PER_ML: f64 = 1.0e12;

// Length

/// Nanometres.
pub fn nm(value: f64) -> Length {
    Length(value / NM_PER_UM)
}

/// Micrometres (the internal length unit).
pub fn um(value: f64) -> Length {
    Length(value)
}

/// Millimetres.
pub fn mm(value: f64) -> Length {
    Length(value * UM_PER_MM)
}

/// Centimetres.
pub fn cm(value: f64) -> Length {
    Length(value * UM_PER_CM)
}

/// Metres.
pub fn m(value: f64) -> Length {
    Length(value * UM_PER_M)
}

// Volume

/// Cubic micrometres (the internal volume unit).
pub fn um3(value: f64) -> Volume {
    Volume(value)
}

/// Picolitres.
pub fn pl(value: f64) -> Volume {
    Volume(value * UM3_PER_PL)
}

/// Nanolitres.
pub fn nl(value: f64) -> Volume {
    Volume(value * UM3_PER_NL)
}

/// Microlitres.
pub fn ul(value: f64) -> Volume {
    Volume(value * UM3_PER_UL)
}

/// Millilitres.
pub fn ml(value: f64) -> Volume {
    Volume(value * UM3_PER_ML)
}

// Time

/// Microseconds.
pub fn us(value: f64) -> Duration {
    Duration(value / 1.0e6)
}

/// Milliseconds.
pub fn ms(value: f64) -> Duration {
    Duration(value / 1.0e3)
}

/// Seconds (the internal time unit).
pub fn s(value: f64) -> Duration {
    Duration(value)
}

/// Minutes.
pub fn min(value: f64) -> Duration {
    Duration(value * 60.0)
}

/// Hours.
pub fn h(value: f64) -> Duration {
    Duration(value * 3600.0)
}

// Angle

/// Radians (the internal angle unit).
pub fn rad(value: f64) -> Angle {
    Angle(value)
}

/// Degrees.
pub fn deg(value: f64) -> Angle {
    Angle(value.to_radians())
}

/// Radius of a cell drawn as a disc whose area equals `volume`.
pub fn radius_from_volume(volume: Volume) -> Length {
    Length((volume.value().max(0.0) / PI).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_scales_are_linear() {
        assert_eq!(um(12.5).value(), 12.5);
        assert_eq!(mm(2.0).value(), 2_000.0);
        assert_eq!(cm(1.0).value(), 10_000.0);
        assert_eq!(m(1.0), mm(1_000.0));
        assert!((nm(500.0).value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn volume_scales_match_litre_definitions() {
        assert_eq!(um3(13.0).value(), 13.0);
        assert_eq!(pl(1.0).value(), 1_000.0);
        assert_eq!(ul(1.0), nl(1_000.0));
        assert_eq!(ml(1.0), ul(1_000.0));
    }

    #[test]
    fn time_and_angle_helpers() {
        assert_eq!(min(2.0).value(), 120.0);
        assert_eq!(h(1.0), min(60.0));
        assert!((ms(250.0).value() - 0.25).abs() < 1e-12);
        assert!((deg(180.0).value() - PI).abs() < 1e-12);
        assert_eq!(rad(1.0).value(), 1.0);
    }

    #[test]
    fn same_dimension_arithmetic() {
        let total = um3(10.0) + um3(5.0) - um3(3.0);
        assert_eq!(total, um3(12.0));
        assert_eq!(um(4.0) * 2.5, um(10.0));
        assert_eq!(-um(1.0), um(-1.0));
    }

    #[test]
    fn radius_of_disc_area() {
        let r = radius_from_volume(um3(PI * 4.0));
        assert!((r.value() - 2.0).abs() < 1e-12);
        assert_eq!(radius_from_volume(um3(-1.0)).value(), 0.0);
    }
}
