//! Faults which abort a bus cycle.
//!
//! On a real PDP-11 both of these cause a trap through vector 4.  We
//! report them to the caller, which decides how its CPU should react.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::address::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BusFault {
    /// No register responds at this address (the bus timed out).
    NonExistentRegister(Address),
    /// A word access was made to an odd address.
    OddAddress(Address),
}

impl BusFault {
    pub fn address(&self) -> Address {
        match self {
            BusFault::NonExistentRegister(a) | BusFault::OddAddress(a) => *a,
        }
    }
}

impl Display for BusFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            BusFault::NonExistentRegister(addr) => {
                write!(f, "bus timeout: no register at address {addr}")
            }
            BusFault::OddAddress(addr) => {
                write!(f, "word access to odd address {addr}")
            }
        }
    }
}

impl Error for BusFault {}

#[test]
fn test_bus_fault_display() {
    let fault = BusFault::NonExistentRegister(Address::from(0o172_534_u16));
    assert_eq!(
        fault.to_string(),
        "bus timeout: no register at address 00172534"
    );
    assert_eq!(fault.address(), Address::from(0o172_534_u16));
}
