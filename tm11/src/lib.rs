//! Emulation of the DEC TM11 magnetic tape controller, as attached to
//! the Unibus of a PDP-11.
//!
//! The controller ([`Tm11`]) presents six registers on the bus and
//! drives up to four tape units.  It never performs I/O itself;
//! instead it asks its host (through [`HostServices`]) for
//! backing-store operations and interrupts.  [`Machine`] is a simple
//! host which keeps tape images in a [`TapeLibrary`] and data in
//! [`Ram`].
#![crate_name = "tm11"]

mod clock;
mod config;
mod context;
mod controller;
mod fault;
mod interrupts;
mod io;
mod machine;
mod memory;
mod registers;
mod scheduler;
mod storage;
mod unit;

pub use clock::{BasicClock, Clock};
pub use config::{ControllerConfiguration, MemoryConfiguration, TM11_BASE_ADDRESS, TM11_VECTOR};
pub use context::Context;
pub use controller::{ControllerStatus, Tm11};
pub use fault::ControllerFault;
pub use interrupts::{DeliveryAction, InterruptQueue, InterruptRequest, PendingInterrupt};
pub use io::{HostServices, IoCompletion, IoKind, IoRequest, IoStatus, HEADER_BYTES, HEADER_WORDS};
pub use machine::{HostQueues, Machine};
pub use memory::{HostMemory, NonExistentMemory, Ram};
pub use registers::{
    count_magnitude, negative_count, CommandRegister, ControllerRegisters, Density, Function,
    Register, StatusRegister, MTS_ERROR_SUMMARY_MASK,
};
pub use scheduler::IoQueue;
pub use storage::{
    payload_words, TapeEntry, TapeImage, TapeImageBuilder, TapeImageError, TapeLibrary,
    TapeStorage, Transfer, END_OF_MEDIUM, MARKER_THRESHOLD, TAPE_MARK,
};
pub use unit::{
    Activity, BackingId, Motion, NoSuchUnit, UnitNumber, UnitPool, UnitState, UNIT_COUNT,
};
