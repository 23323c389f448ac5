//! Faults which indicate that the emulation itself has gone wrong, as
//! opposed to conditions the emulated software can observe in the
//! status register.  Either of these stops the machine.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use super::unit::UnitNumber;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerFault {
    /// A backing-store completion arrived for a unit which was not
    /// waiting for one.
    InconsistentState { unit: UnitNumber, message: String },
    /// A unit asked for a second backing-store operation while its
    /// first was still queued.
    DuplicateRequest { unit: UnitNumber },
}

impl ControllerFault {
    pub fn unit(&self) -> UnitNumber {
        match self {
            ControllerFault::InconsistentState { unit, .. }
            | ControllerFault::DuplicateRequest { unit } => *unit,
        }
    }
}

impl Display for ControllerFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ControllerFault::InconsistentState { unit, message } => {
                write!(f, "tape unit {unit} is in an inconsistent state: {message}")
            }
            ControllerFault::DuplicateRequest { unit } => {
                write!(
                    f,
                    "tape unit {unit} requested a second backing-store operation while one was already queued"
                )
            }
        }
    }
}

impl Error for ControllerFault {}

#[test]
fn test_fault_display() {
    let fault = ControllerFault::InconsistentState {
        unit: UnitNumber::ZERO,
        message: "completion arrived while idle".to_string(),
    };
    assert_eq!(
        fault.to_string(),
        "tape unit 0 is in an inconsistent state: completion arrived while idle"
    );
    assert_eq!(fault.unit(), UnitNumber::ZERO);
}
