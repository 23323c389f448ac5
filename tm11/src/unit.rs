//! Per-drive state.
//!
//! The controller can address four tape drives (TU10 transports).
//! Each one remembers where its tape is positioned and which command,
//! if any, it is part-way through.  Positions are counted in 16-bit
//! tape words from the load point: a record header occupies two words
//! and a record of `n` bytes occupies `(n + 1) / 2` words.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::registers::Function;

/// The number of drives one controller can address.
pub const UNIT_COUNT: usize = 4;

/// Identifies one of the four drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UnitNumber(u8);

impl UnitNumber {
    pub const ZERO: UnitNumber = UnitNumber(0);

    /// Select a unit from the unit-select field of MTC.  The field is
    /// three bits wide but only four drives are emulated, so the top
    /// bit is ignored.
    pub fn from_select_field(select: u8) -> UnitNumber {
        UnitNumber(select & 0o3)
    }

    pub fn all() -> impl Iterator<Item = UnitNumber> {
        (0..UNIT_COUNT as u8).map(UnitNumber)
    }

    pub fn index(&self) -> usize {
        usize::from(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoSuchUnit(pub u8);

impl Display for NoSuchUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "there is no tape unit {}", self.0)
    }
}

impl std::error::Error for NoSuchUnit {}

impl TryFrom<u8> for UnitNumber {
    type Error = NoSuchUnit;
    fn try_from(n: u8) -> Result<UnitNumber, NoSuchUnit> {
        if usize::from(n) < UNIT_COUNT {
            Ok(UnitNumber(n))
        } else {
            Err(NoSuchUnit(n))
        }
    }
}

impl From<UnitNumber> for u8 {
    fn from(unit: UnitNumber) -> u8 {
        unit.0
    }
}

impl Display for UnitNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.0)
    }
}

/// Names the tape image a unit reads.  The name is derived from the
/// unit number and otherwise means nothing to the controller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BackingId(String);

impl BackingId {
    pub fn for_unit(unit: UnitNumber) -> BackingId {
        BackingId(format!("tm{unit}.tap"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BackingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(&self.0)
    }
}

/// Commands which need to look at the tape, and so can be waiting for
/// a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Motion {
    Read,
    SpaceForward,
    SpaceReverse,
}

impl Motion {
    pub fn function(&self) -> Function {
        match self {
            Motion::Read => Function::Read,
            Motion::SpaceForward => Function::SpaceForward,
            Motion::SpaceReverse => Function::SpaceReverse,
        }
    }
}

/// What a unit is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Activity {
    #[default]
    Idle,
    /// A header probe is outstanding for this command.
    AwaitingHeader(Motion),
    /// The header of the record being read has been interpreted and
    /// the data transfer is outstanding.
    AwaitingTransfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitState {
    pub unit: UnitNumber,
    pub position: u64,
    pub activity: Activity,
    pub backing: BackingId,
}

impl UnitState {
    pub fn new(unit: UnitNumber) -> UnitState {
        UnitState {
            unit,
            position: 0,
            activity: Activity::Idle,
            backing: BackingId::for_unit(unit),
        }
    }

    /// The function code of the command in progress, if the unit is
    /// still interpreting tape for it.  A read whose data transfer is
    /// outstanding has already finished with the tape, so it reports
    /// `None` here even though the command has not completed.
    pub fn active_command(&self) -> Option<Function> {
        match self.activity {
            Activity::AwaitingHeader(motion) => Some(motion.function()),
            Activity::Idle | Activity::AwaitingTransfer => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.activity == Activity::Idle
    }

    pub fn at_load_point(&self) -> bool {
        self.position == 0
    }
}

/// The fixed set of drives attached to one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitPool {
    units: [UnitState; UNIT_COUNT],
}

impl UnitPool {
    pub fn new() -> UnitPool {
        UnitPool {
            units: [0u8, 1, 2, 3].map(|n| UnitState::new(UnitNumber(n))),
        }
    }

    pub fn get(&self, unit: UnitNumber) -> &UnitState {
        &self.units[unit.index()]
    }

    pub fn get_mut(&mut self, unit: UnitNumber) -> &mut UnitState {
        &mut self.units[unit.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitState> {
        self.units.iter()
    }

    /// Move every unit back to the load point.  Backing identifiers and
    /// any outstanding I/O are left alone.
    pub fn rewind_all(&mut self) {
        for unit in self.units.iter_mut() {
            unit.position = 0;
        }
    }
}

impl Default for UnitPool {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_unit_select_ignores_top_bit() {
    assert_eq!(UnitNumber::from_select_field(0o5), UnitNumber(1));
    assert_eq!(UnitNumber::from_select_field(0o3), UnitNumber(3));
}

#[test]
fn test_unit_number_range() {
    assert!(UnitNumber::try_from(3).is_ok());
    assert_eq!(UnitNumber::try_from(4), Err(NoSuchUnit(4)));
    assert_eq!(UnitNumber::all().count(), UNIT_COUNT);
}

#[test]
fn test_backing_id_naming() {
    let unit = UnitNumber::try_from(2).expect("valid test data");
    assert_eq!(BackingId::for_unit(unit).as_str(), "tm2.tap");
}

#[test]
fn test_active_command() {
    let mut state = UnitState::new(UnitNumber::ZERO);
    assert_eq!(state.active_command(), None);
    state.activity = Activity::AwaitingHeader(Motion::SpaceReverse);
    assert_eq!(state.active_command(), Some(Function::SpaceReverse));
    assert_eq!(state.active_command().map(|f| f.code()), Some(5));
    state.activity = Activity::AwaitingTransfer;
    assert_eq!(state.active_command(), None);
    assert!(!state.is_idle());
}

#[test]
fn test_rewind_all_keeps_backing() {
    let mut pool = UnitPool::new();
    for unit in UnitNumber::all() {
        pool.get_mut(unit).position = 100 + u64::from(u8::from(unit));
    }
    pool.rewind_all();
    for (n, state) in pool.iter().enumerate() {
        assert!(state.at_load_point());
        assert_eq!(state.backing.as_str(), format!("tm{n}.tap"));
    }
}
