//! The `unibus` crate defines the bus-related things which are
//! useful both to a peripheral emulation and to whatever drives it
//! (a CPU emulation, a test harness or a command-line tool).  The
//! idea is that a peripheral can be written against these types
//! without depending on any particular host emulator.

mod access;
mod address;
mod fault;
mod interrupt;

pub mod collections;
pub mod prelude;

pub use access::{merge_register_write, Access, Width};
pub use address::Address;
pub use fault::BusFault;
pub use interrupt::{LevelOutOfRange, PriorityLevel, Vector, VectorOutOfRange};

/// Form an [`Address`] from an octal literal at compile time.
#[macro_export]
macro_rules! addr {
    ($n:expr) => {
        $crate::Address::new::<{ $n }>()
    };
}

#[test]
fn test_addr_macro() {
    let a: Address = addr!(0o17772520);
    assert_eq!(u32::from(a), 0o17772520);
}
