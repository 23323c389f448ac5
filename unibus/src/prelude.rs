//! The prelude exports the types most users of this crate need: bus
//! addresses and accesses, faults, and interrupt identification.
pub use super::access::{merge_register_write, Access, Width};
pub use super::address::Address;
pub use super::collections::pq::KeyedReversePriorityQueue;
pub use super::fault::BusFault;
pub use super::interrupt::{PriorityLevel, Vector};
pub use super::addr;
