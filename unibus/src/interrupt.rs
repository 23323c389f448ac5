//! Interrupt priority levels and vectors.
//!
//! A device requests an interrupt on one of the bus-request lines
//! BR4-BR7.  When the request is granted the device supplies a vector,
//! the low-memory address from which the CPU loads the new PC and PS.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// A processor or bus-request priority, 0 to 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PriorityLevel(u8);

impl PriorityLevel {
    pub const ZERO: PriorityLevel = PriorityLevel(0);
    pub const BR4: PriorityLevel = PriorityLevel(4);
    pub const BR5: PriorityLevel = PriorityLevel(5);
    pub const BR6: PriorityLevel = PriorityLevel(6);
    pub const BR7: PriorityLevel = PriorityLevel(7);

    /// The level as it appears in bits 5-7 of the processor status word.
    pub fn psw_bits(&self) -> u16 {
        u16::from(self.0) << 5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelOutOfRange(pub u8);

impl Display for LevelOutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "priority level {} is not in the range 0-7", self.0)
    }
}

impl Error for LevelOutOfRange {}

impl TryFrom<u8> for PriorityLevel {
    type Error = LevelOutOfRange;
    fn try_from(n: u8) -> Result<PriorityLevel, LevelOutOfRange> {
        if n <= 7 {
            Ok(PriorityLevel(n))
        } else {
            Err(LevelOutOfRange(n))
        }
    }
}

impl From<PriorityLevel> for u8 {
    fn from(level: PriorityLevel) -> u8 {
        level.0
    }
}

impl Display for PriorityLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "BR{}", self.0)
    }
}

/// An interrupt vector: a word-pair address in the bottom of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Vector(u16);

impl Vector {
    /// Largest vector address a Unibus device can supply.
    const MAX: u16 = 0o774;

    pub const fn new<const N: u16>() -> Vector {
        assert!(N <= Vector::MAX && N % 4 == 0);
        Vector(N)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorOutOfRange(pub u16);

impl Display for VectorOutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{:o} is not a valid interrupt vector (it must be a multiple of 4 no greater than 774)",
            self.0
        )
    }
}

impl Error for VectorOutOfRange {}

impl TryFrom<u16> for Vector {
    type Error = VectorOutOfRange;
    fn try_from(n: u16) -> Result<Vector, VectorOutOfRange> {
        if n <= Vector::MAX && n % 4 == 0 {
            Ok(Vector(n))
        } else {
            Err(VectorOutOfRange(n))
        }
    }
}

impl From<Vector> for u16 {
    fn from(v: Vector) -> u16 {
        v.0
    }
}

impl Display for Vector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:03o}", self.0)
    }
}

#[test]
fn test_vector_validation() {
    assert_eq!(Vector::try_from(0o224).map(u16::from), Ok(0o224));
    assert_eq!(Vector::try_from(0o226), Err(VectorOutOfRange(0o226)));
    assert_eq!(Vector::try_from(0o1000), Err(VectorOutOfRange(0o1000)));
    assert_eq!(Vector::new::<0o224>().to_string(), "224");
}

#[test]
fn test_level_validation() {
    assert_eq!(PriorityLevel::try_from(5), Ok(PriorityLevel::BR5));
    assert!(PriorityLevel::try_from(8).is_err());
    assert_eq!(PriorityLevel::BR5.psw_bits(), 5 << 5);
    assert!(PriorityLevel::BR7 > PriorityLevel::BR4);
}
