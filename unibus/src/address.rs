/// Physical addresses on the bus.
///
/// The Unibus itself carries 18 address bits, but the I/O page is
/// conventionally written as a 22-bit physical address (for example
/// 17772520 octal for the TM11 status register), so we keep 22 bits
/// and let each device decide which of them it decodes.
use std::fmt::{self, Debug, Display, Formatter, Octal};

use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

const ADDRESS_MASK: u32 = 0o17_777_777;

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Address(#[cfg_attr(test, strategy(0..=ADDRESS_MASK))] u32);

impl Address {
    pub const ZERO: Address = Address(0);
    pub const MAX: Address = Address(ADDRESS_MASK);

    /// Build an address at compile time; out-of-range values fail to
    /// compile.  See also the [`addr!`](crate::addr) macro.
    pub const fn new<const N: u32>() -> Address {
        assert!(N <= ADDRESS_MASK);
        Address(N)
    }

    /// Truncate a value to the width of a bus address.
    pub const fn wrapping_from(n: u32) -> Address {
        Address(n & ADDRESS_MASK)
    }

    /// Is this the address of the high (odd) byte of a word?
    pub const fn is_odd(&self) -> bool {
        self.0 & 1 != 0
    }

    /// Offset of this address from `base`, if it lies at or above it.
    pub fn offset_from(&self, base: Address) -> Option<u32> {
        self.0.checked_sub(base.0)
    }

    pub fn wrapping_add(&self, delta: u32) -> Address {
        Address::wrapping_from(self.0.wrapping_add(delta))
    }

    /// The low 16 bits, as held in a device's memory-address register.
    pub const fn low_word(&self) -> u16 {
        (self.0 & 0o177_777) as u16
    }

    /// Bits 16 and 17, which Unibus DMA devices keep in a separate
    /// two-bit "extended address" field.
    pub const fn extension_bits(&self) -> u8 {
        ((self.0 >> 16) & 0o3) as u8
    }

    /// Join an extended-address field and a 16-bit address register.
    pub const fn from_parts(extension: u8, low: u16) -> Address {
        Address((((extension & 0o3) as u32) << 16) | low as u32)
    }
}

impl From<u16> for Address {
    fn from(n: u16) -> Address {
        Address(u32::from(n))
    }
}

impl TryFrom<u32> for Address {
    type Error = u32;
    fn try_from(n: u32) -> Result<Address, u32> {
        if n > ADDRESS_MASK {
            Err(n)
        } else {
            Ok(Address(n))
        }
    }
}

impl From<Address> for u32 {
    fn from(a: Address) -> u32 {
        a.0
    }
}

impl From<Address> for usize {
    fn from(a: Address) -> usize {
        a.0 as usize
    }
}

impl Octal for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Octal::fmt(&self.0, f)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:>08o}", self.0)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:>08o})", self.0)
    }
}

#[test]
fn test_address_parts() {
    let a = Address::from_parts(0o3, 0o123_456);
    assert_eq!(u32::from(a), 0o3_123_456);
    assert_eq!(a.low_word(), 0o123_456);
    assert_eq!(a.extension_bits(), 0o3);
}

#[test]
fn test_address_display() {
    assert_eq!(Address::from(0o1000_u16).to_string(), "00001000");
    assert_eq!(Address::MAX.to_string(), "17777777");
}

#[test]
fn test_address_try_from() {
    assert!(Address::try_from(0o20_000_000_u32).is_err());
    assert_eq!(
        Address::try_from(0o17_777_777_u32).map(u32::from),
        Ok(0o17_777_777)
    );
}

#[test]
fn test_is_odd() {
    assert!(Address::from(0o525_u16).is_odd());
    assert!(!Address::from(0o524_u16).is_odd());
}

#[cfg(test)]
mod proptests {
    use super::Address;
    use test_strategy::proptest;

    #[proptest]
    fn parts_round_trip_below_256k(a: Address) {
        let n = u32::from(a) & 0o777_777;
        let a = Address::wrapping_from(n);
        assert_eq!(Address::from_parts(a.extension_bits(), a.low_word()), a);
    }
}
