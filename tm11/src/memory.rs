//! Host memory, as seen by a DMA device.
//!
//! The TM11 moves data into memory one byte at a time through the
//! [`HostMemory`] trait.  [`Ram`] is a simple implementation with no
//! holes: everything below its size exists, nothing above it does.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use unibus::Address;

use super::config::MemoryConfiguration;

/// A DMA cycle addressed memory which does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonExistentMemory(pub Address);

impl Display for NonExistentMemory {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "non-existent memory at {}", self.0)
    }
}

impl Error for NonExistentMemory {}

pub trait HostMemory {
    fn read_byte(&self, address: Address) -> Result<u8, NonExistentMemory>;
    fn write_byte(&mut self, address: Address, value: u8) -> Result<(), NonExistentMemory>;
}

pub struct Ram {
    bytes: Vec<u8>,
}

impl Ram {
    pub fn new(config: &MemoryConfiguration) -> Ram {
        event!(
            Level::DEBUG,
            "creating {} bytes of host memory",
            config.size_bytes
        );
        Ram {
            bytes: vec![0; config.size_bytes],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes from `start` up to `start + len`, or `None` if any of them
    /// do not exist.
    pub fn slice(&self, start: Address, len: usize) -> Option<&[u8]> {
        let start = usize::from(start);
        self.bytes.get(start..start.checked_add(len)?)
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("Ram")
            .field("size", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl HostMemory for Ram {
    fn read_byte(&self, address: Address) -> Result<u8, NonExistentMemory> {
        self.bytes
            .get(usize::from(address))
            .copied()
            .ok_or(NonExistentMemory(address))
    }

    fn write_byte(&mut self, address: Address, value: u8) -> Result<(), NonExistentMemory> {
        match self.bytes.get_mut(usize::from(address)) {
            Some(b) => {
                *b = value;
                Ok(())
            }
            None => Err(NonExistentMemory(address)),
        }
    }
}

#[test]
fn test_ram_bounds() {
    let mut ram = Ram::new(&MemoryConfiguration { size_bytes: 16 });
    assert_eq!(ram.size(), 16);
    assert!(ram.write_byte(Address::from(15_u16), 0o252).is_ok());
    assert_eq!(ram.read_byte(Address::from(15_u16)), Ok(0o252));
    assert_eq!(
        ram.write_byte(Address::from(16_u16), 1),
        Err(NonExistentMemory(Address::from(16_u16)))
    );
    assert!(ram.slice(Address::from(8_u16), 8).is_some());
    assert!(ram.slice(Address::from(8_u16), 9).is_none());
}
