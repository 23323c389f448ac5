//! Bus cycles and the merging of partial (byte) writes into 16-bit
//! device registers.
//!
//! A DATOB cycle (byte write) to an even address changes only the low
//! byte of the addressed word; to an odd address, only the high byte.
//! Word cycles must be aimed at even addresses.
use serde::Serialize;

use super::address::Address;
use super::fault::BusFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Width {
    Byte,
    Word,
}

/// A single bus access to a device register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Access {
    Read,
    /// For byte writes only the bottom 8 bits of the value are
    /// significant.
    Write(Width, u16),
}

impl Access {
    pub fn is_write(&self) -> bool {
        matches!(self, Access::Write(_, _))
    }

    pub fn width(&self) -> Width {
        match self {
            Access::Read => Width::Word,
            Access::Write(width, _) => *width,
        }
    }
}

/// Combine a bus access with the current value of a register.
///
/// For a read the current value is returned unchanged.  For a write,
/// the result is the value the register should hold afterwards; the
/// byte which is not written keeps its previous contents.
///
/// # Errors
///
/// A word write to an odd address is rejected with
/// [`BusFault::OddAddress`].
pub fn merge_register_write(
    current: u16,
    address: Address,
    access: Access,
) -> Result<u16, BusFault> {
    match access {
        Access::Read => Ok(current),
        Access::Write(Width::Word, _) if address.is_odd() => Err(BusFault::OddAddress(address)),
        Access::Write(Width::Word, value) => Ok(value),
        Access::Write(Width::Byte, value) => {
            let byte = value & 0o377;
            if address.is_odd() {
                Ok((current & 0o377) | (byte << 8))
            } else {
                Ok((current & 0o177_400) | byte)
            }
        }
    }
}

#[test]
fn test_merge_read_returns_current() {
    assert_eq!(
        merge_register_write(0o123_456, Address::from(0o1000_u16), Access::Read),
        Ok(0o123_456)
    );
}

#[test]
fn test_merge_word_write() {
    assert_eq!(
        merge_register_write(
            0o123_456,
            Address::from(0o1000_u16),
            Access::Write(Width::Word, 0o7)
        ),
        Ok(0o7)
    );
}

#[test]
fn test_merge_low_byte() {
    assert_eq!(
        merge_register_write(
            0o177_777,
            Address::from(0o1000_u16),
            Access::Write(Width::Byte, 0o177_401)
        ),
        Ok(0o177_401)
    );
}

#[test]
fn test_merge_high_byte() {
    // 0x12 goes into the high byte, the low byte is untouched.
    assert_eq!(
        merge_register_write(
            0x00ab,
            Address::from(0o1001_u16),
            Access::Write(Width::Byte, 0x3412)
        ),
        Ok(0x12ab)
    );
}

#[test]
fn test_merge_odd_word_write_faults() {
    let odd = Address::from(0o1001_u16);
    assert_eq!(
        merge_register_write(0, odd, Access::Write(Width::Word, 1)),
        Err(BusFault::OddAddress(odd))
    );
}
