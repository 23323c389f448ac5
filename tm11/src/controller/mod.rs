//! The TM11 controller: its register bank, the command dispatcher and
//! the completion signaller.
//!
//! The controller is passive.  The host calls [`Tm11::access`] for
//! each bus cycle aimed at the controller's registers, and
//! [`Tm11::complete_io`] each time a backing-store request the
//! controller made has finished.  Everything the controller wants
//! from the host (backing-store I/O, interrupts) it asks for through
//! [`HostServices`].
//!
//! A command moves a unit through the states in [`Activity`]:
//!
//! ```text
//!   Idle --read/space--> AwaitingHeader --read--> AwaitingTransfer --> Idle
//!                           |    ^
//!                           |    | (space, more blocks to go)
//!                           +----+
//!                           |
//!                           +--> Idle (tape mark, error, space done)
//! ```
//!
//! Commands which do not need the tape complete immediately.
use serde::Serialize;
use tracing::{event, span, Level};

use unibus::prelude::*;

use super::config::ControllerConfiguration;
use super::context::Context;
use super::interrupts::{DeliveryAction, InterruptRequest};
use super::io::{HostServices, IoRequest, IoStatus, HEADER_WORDS};
use super::registers::{
    CommandRegister, ControllerRegisters, Function, Register, StatusRegister,
};
use super::unit::{Activity, Motion, UnitNumber, UnitPool, UnitState};

mod traversal;

#[cfg(test)]
mod tests;

#[derive(Debug)]
pub struct Tm11 {
    config: ControllerConfiguration,
    regs: ControllerRegisters,
    units: UnitPool,
}

/// A point-in-time copy of the controller's state, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub mts: u16,
    pub mtc: u16,
    pub mtbrc: u16,
    pub mtcma: u16,
    pub status: StatusRegister,
    pub command: CommandRegister,
    pub selected_unit: UnitNumber,
    pub units: Vec<UnitState>,
}

impl Tm11 {
    /// A controller in its power-up state, with all four units at the
    /// load point.
    pub fn new(config: ControllerConfiguration) -> Tm11 {
        event!(
            Level::INFO,
            "TM11 at {} vector {} level {}",
            config.base_address,
            config.vector,
            config.level
        );
        Tm11 {
            config,
            regs: ControllerRegisters::default(),
            units: UnitPool::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfiguration {
        &self.config
    }

    pub fn registers(&self) -> &ControllerRegisters {
        &self.regs
    }

    pub fn units(&self) -> &UnitPool {
        &self.units
    }

    pub fn unit(&self, unit: UnitNumber) -> &UnitState {
        self.units.get(unit)
    }

    /// The unit addressed by the unit-select field of MTC.
    pub fn selected_unit(&self) -> UnitNumber {
        UnitNumber::from_select_field(self.regs.command.unit_select())
    }

    /// Identify the register at `address`.
    ///
    /// # Errors
    ///
    /// [`BusFault::NonExistentRegister`] if `address` is not one of
    /// ours.
    pub fn decode(&self, address: Address) -> Result<Register, BusFault> {
        address
            .offset_from(self.config.base_address)
            .and_then(Register::decode)
            .ok_or(BusFault::NonExistentRegister(address))
    }

    /// Perform a bus cycle on one of the controller's registers,
    /// returning the register's value (for a write, the value written
    /// after merging).
    pub fn access(
        &mut self,
        ctx: &Context,
        address: Address,
        access: Access,
        host: &mut dyn HostServices,
    ) -> Result<u16, BusFault> {
        let register = self.decode(address)?;
        event!(
            Level::TRACE,
            "{} {access:?} at {address}",
            register.mnemonic()
        );
        match register {
            // Writes to MTS are ignored.
            Register::Status => Ok(self.read_status()),
            Register::Command => self.access_command(ctx, address, access, host),
            Register::ByteCount => {
                self.regs.byte_count = merge_register_write(self.regs.byte_count, address, access)?;
                Ok(self.regs.byte_count)
            }
            Register::MemoryAddress => {
                self.regs.memory_address =
                    merge_register_write(self.regs.memory_address, address, access)?;
                Ok(self.regs.memory_address)
            }
            Register::Data | Register::ReadLines => Ok(0),
        }
    }

    fn read_status(&mut self) -> u16 {
        let unit = self.selected_unit();
        self.regs.status.beginning_of_tape = self.units.get(unit).at_load_point();
        self.regs.status.bits()
    }

    fn access_command(
        &mut self,
        ctx: &Context,
        address: Address,
        access: Access,
        host: &mut dyn HostServices,
    ) -> Result<u16, BusFault> {
        self.regs.refresh_error_summary();
        let previous = self.regs.command;
        let bits = merge_register_write(previous.bits(), address, access)?;
        if !access.is_write() {
            return Ok(bits);
        }
        let merged = CommandRegister::from_bits(bits);

        if previous.interrupt_enable && !merged.interrupt_enable {
            host.cancel_interrupt(self.config.level, self.config.vector);
        }
        if merged.power_clear {
            self.reset(host);
            return Ok(bits);
        }

        // Ready is set only by the controller, and the error summary
        // only mirrors MTS.
        let mut stored = merged;
        stored.ready = previous.ready;
        stored.error = previous.error;
        if previous.ready && merged.go {
            self.regs.command = stored;
            self.start_command(ctx, host);
        } else {
            if merged.interrupt_enable && !previous.interrupt_enable && previous.ready {
                // Enabling interrupts on an idle controller interrupts
                // straight away.
                host.request_interrupt(ctx, self.interrupt_request(None));
            }
            self.regs.command = stored;
        }
        Ok(bits)
    }

    /// Power clear.  Every register returns to its power-up value and
    /// every unit goes back to the load point.  Any pending interrupt
    /// is withdrawn, but backing-store requests already in flight will
    /// still complete.
    pub fn reset(&mut self, host: &mut dyn HostServices) {
        event!(Level::INFO, "controller reset");
        host.cancel_interrupt(self.config.level, self.config.vector);
        self.regs = ControllerRegisters::default();
        self.units.rewind_all();
    }

    /// Called when the controller's command-complete interrupt is
    /// delivered (or, with interrupts disabled, directly).  Returns
    /// whether interrupts are still enabled; if they are not, the
    /// interrupt should not be taken.
    pub fn command_end(&mut self) -> bool {
        self.regs.status.tape_unit_ready = true;
        self.regs.command.ready = true;
        self.regs.command.interrupt_enable
    }

    pub fn status(&self) -> ControllerStatus {
        let selected_unit = self.selected_unit();
        let mut status = self.regs.status;
        status.beginning_of_tape = self.units.get(selected_unit).at_load_point();
        let mut command = self.regs.command;
        command.error = status.any_error();
        ControllerStatus {
            mts: status.bits(),
            mtc: command.bits(),
            mtbrc: self.regs.byte_count,
            mtcma: self.regs.memory_address,
            status,
            command,
            selected_unit,
            units: self.units.iter().cloned().collect(),
        }
    }

    fn interrupt_request(&self, on_deliver: Option<DeliveryAction>) -> InterruptRequest {
        InterruptRequest {
            level: self.config.level,
            vector: self.config.vector,
            on_deliver,
        }
    }

    /// Command dispatch, following the setting of GO in MTC while the
    /// controller was ready.
    fn start_command(&mut self, ctx: &Context, host: &mut dyn HostServices) {
        let unit = self.selected_unit();
        let function = self.regs.command.function;
        let span = span!(Level::ERROR, "command", unit=%unit, function=%function);
        let _enter = span.enter();

        self.regs.command.go = false;
        self.regs.command.ready = false;
        self.regs.status.clear_for_new_command();

        if !self.units.get(unit).is_idle() {
            event!(
                Level::WARN,
                "unit {unit} is still busy with an earlier command; refusing this one"
            );
            self.regs.status.illegal_command = true;
            self.signal_completion(ctx, host);
            return;
        }

        let position = self.units.get(unit).position;
        event!(Level::DEBUG, "starting at word {position}");
        match function {
            Function::OffLine
            | Function::Write
            | Function::WriteEof
            | Function::WriteExtendedGap => {
                // Nothing moves.
            }
            Function::Read => {
                self.request_header(ctx, host, unit, Motion::Read, position);
                return;
            }
            Function::SpaceForward => {
                self.request_header(ctx, host, unit, Motion::SpaceForward, position);
                return;
            }
            Function::SpaceReverse => {
                if position > 0 {
                    self.request_header(
                        ctx,
                        host,
                        unit,
                        Motion::SpaceReverse,
                        position.saturating_sub(HEADER_WORDS),
                    );
                    return;
                }
            }
            Function::Rewind => {
                self.units.get_mut(unit).position = 0;
                self.regs.status.beginning_of_tape = true;
                self.regs.status.end_of_tape = false;
            }
        }
        self.signal_completion(ctx, host);
    }

    /// Ask the backing store for the record header at `position`.
    fn request_header(
        &mut self,
        ctx: &Context,
        host: &mut dyn HostServices,
        unit: UnitNumber,
        motion: Motion,
        position: u64,
    ) {
        let state = self.units.get_mut(unit);
        state.activity = Activity::AwaitingHeader(motion);
        host.request_backing_io(
            ctx,
            IoRequest::header_probe(unit, state.backing.clone(), position),
        );
    }

    /// The unit has finished with the tape; record any error and
    /// signal completion.
    fn end_command(
        &mut self,
        ctx: &Context,
        host: &mut dyn HostServices,
        unit: UnitNumber,
        status: IoStatus,
    ) {
        self.units.get_mut(unit).activity = Activity::Idle;
        match status {
            IoStatus::Ok => (),
            IoStatus::DataError => {
                self.regs.status.data_error = true;
            }
            IoStatus::NonExistentMemory => {
                self.regs.status.non_existent_memory = true;
            }
        }
        self.signal_completion(ctx, host);
    }

    fn signal_completion(&mut self, ctx: &Context, host: &mut dyn HostServices) {
        if self.regs.command.interrupt_enable {
            event!(Level::TRACE, "requesting command-complete interrupt");
            host.request_interrupt(ctx, self.interrupt_request(Some(DeliveryAction::CommandEnd)));
        } else {
            self.command_end();
        }
    }
}

impl Default for Tm11 {
    fn default() -> Tm11 {
        Tm11::new(ControllerConfiguration::default())
    }
}
