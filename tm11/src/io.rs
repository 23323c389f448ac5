//! Requests the controller makes of its host, and the completions
//! which come back.
//!
//! The controller never touches a tape image itself.  It asks the
//! host to perform a backing-store request and later receives an
//! [`IoCompletion`] for it.  Between the two the controller yields;
//! nothing in it polls.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use unibus::prelude::*;

use super::context::Context;
use super::interrupts::InterruptRequest;
use super::unit::{BackingId, UnitNumber};

/// Size in bytes of a record header (and of a tape mark).
pub const HEADER_BYTES: u32 = 4;

/// Size in tape words of a record header.
pub const HEADER_WORDS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IoKind {
    /// Read the 32-bit header at `position`.
    HeaderProbe,
    /// Copy `length` bytes starting at `position` into host memory at
    /// `address`.
    DataTransfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IoRequest {
    pub kind: IoKind,
    pub unit: UnitNumber,
    pub backing: BackingId,
    pub position: u64,
    pub address: Address,
    pub length: u32,
}

impl IoRequest {
    pub fn header_probe(unit: UnitNumber, backing: BackingId, position: u64) -> IoRequest {
        IoRequest {
            kind: IoKind::HeaderProbe,
            unit,
            backing,
            position,
            address: Address::ZERO,
            length: HEADER_BYTES,
        }
    }

    pub fn data_transfer(
        unit: UnitNumber,
        backing: BackingId,
        position: u64,
        address: Address,
        length: u32,
    ) -> IoRequest {
        IoRequest {
            kind: IoKind::DataTransfer,
            unit,
            backing,
            position,
            address,
            length,
        }
    }
}

impl Display for IoRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self.kind {
            IoKind::HeaderProbe => write!(
                f,
                "header probe on unit {} ({}) at word {}",
                self.unit, self.backing, self.position
            ),
            IoKind::DataTransfer => write!(
                f,
                "transfer of {} bytes on unit {} ({}) from word {} to {}",
                self.length, self.unit, self.backing, self.position, self.address
            ),
        }
    }
}

/// How a backing-store request went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IoStatus {
    Ok,
    /// The tape image could not be read.
    DataError,
    /// The DMA target address does not exist.
    NonExistentMemory,
}

impl IoStatus {
    /// Numeric error code as used by the host's disk/tape layer.
    pub fn code(&self) -> u8 {
        match self {
            IoStatus::Ok => 0,
            IoStatus::DataError => 1,
            IoStatus::NonExistentMemory => 2,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == IoStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IoCompletion {
    pub unit: UnitNumber,
    pub status: IoStatus,
    /// For a header probe, the position just after the header.  For a
    /// data transfer, the position just after the bytes transferred.
    pub position: u64,
    /// For a header probe, the header.  For a data transfer, the host
    /// address following the last byte stored.
    pub value: u32,
    /// Bytes requested but not transferred.
    pub count: u32,
}

/// The services a controller needs from the machine it is plugged
/// into.
pub trait HostServices {
    /// Queue a backing-store request.  Its completion must eventually
    /// be handed to [`crate::Tm11::complete_io`].
    fn request_backing_io(&mut self, ctx: &Context, request: IoRequest);

    /// Ask for an interrupt.  At most one request per vector is
    /// outstanding; a second request for the same vector replaces the
    /// first.
    fn request_interrupt(&mut self, ctx: &Context, request: InterruptRequest);

    /// Withdraw a pending interrupt, if there is one.
    fn cancel_interrupt(&mut self, level: PriorityLevel, vector: Vector);
}

#[test]
fn test_io_status_codes() {
    assert_eq!(IoStatus::Ok.code(), 0);
    assert_eq!(IoStatus::DataError.code(), 1);
    assert_eq!(IoStatus::NonExistentMemory.code(), 2);
}

#[test]
fn test_request_display() {
    let unit = UnitNumber::ZERO;
    let probe = IoRequest::header_probe(unit, BackingId::for_unit(unit), 7);
    assert_eq!(probe.length, HEADER_BYTES);
    assert_eq!(probe.to_string(), "header probe on unit 0 (tm0.tap) at word 7");
}
