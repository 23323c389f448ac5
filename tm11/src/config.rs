//! Configuration of the controller and of the host around it.
use std::time::Duration;

use serde::Serialize;

use unibus::prelude::*;

/// Standard CSR address of the first TM11.
pub const TM11_BASE_ADDRESS: Address = addr!(0o17772520);

/// Standard interrupt vector of the first TM11.
pub const TM11_VECTOR: Vector = Vector::new::<0o224>();

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerConfiguration {
    /// Address of MTS; the other registers follow it.
    pub base_address: Address,
    pub vector: Vector,
    pub level: PriorityLevel,
    /// Simulated time taken by each backing-store request.
    pub io_latency: Duration,
    /// Simulated time between an interrupt being requested and it
    /// becoming deliverable.
    pub interrupt_latency: Duration,
}

impl Default for ControllerConfiguration {
    fn default() -> ControllerConfiguration {
        ControllerConfiguration {
            base_address: TM11_BASE_ADDRESS,
            vector: TM11_VECTOR,
            level: PriorityLevel::BR5,
            io_latency: Duration::from_micros(100),
            interrupt_latency: Duration::from_micros(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryConfiguration {
    /// Size of host memory in bytes.  DMA to addresses at or beyond
    /// this size fails with a non-existent memory error.
    pub size_bytes: usize,
}

impl Default for MemoryConfiguration {
    /// 248 KiB: the whole 18-bit Unibus address space below the I/O page.
    fn default() -> MemoryConfiguration {
        MemoryConfiguration {
            size_bytes: 0o760_000,
        }
    }
}
