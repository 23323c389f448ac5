//! A tape driver which programs the controller through its registers,
//! in the way a PDP-11 operating system would: load the byte count
//! and buffer address, write the command with GO and interrupt-enable
//! set, then wait for the interrupt.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use tm11::{
    count_magnitude, negative_count, ControllerConfiguration, ControllerFault, Function, Machine,
    Ram, StatusRegister, TapeLibrary, UnitNumber,
};
use unibus::prelude::*;

const MTS_OFFSET: u32 = 0o0;
const MTC_OFFSET: u32 = 0o2;
const MTBRC_OFFSET: u32 = 0o4;
const MTCMA_OFFSET: u32 = 0o6;

const MTC_GO: u16 = 0o1;
const MTC_IE: u16 = 0o100;
const MTC_DENSITY_800_NINE_TRACK: u16 = 0o60000;

#[derive(Debug)]
pub enum DriverError {
    Bus(BusFault),
    Controller(ControllerFault),
    /// The command never completed.
    NoInterrupt { function: Function },
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DriverError::Bus(e) => write!(f, "bus error: {e}"),
            DriverError::Controller(e) => write!(f, "controller failure: {e}"),
            DriverError::NoInterrupt { function } => {
                write!(f, "the {function} command never completed")
            }
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DriverError::Bus(e) => Some(e),
            DriverError::Controller(e) => Some(e),
            DriverError::NoInterrupt { .. } => None,
        }
    }
}

impl From<BusFault> for DriverError {
    fn from(e: BusFault) -> DriverError {
        DriverError::Bus(e)
    }
}

impl From<ControllerFault> for DriverError {
    fn from(e: ControllerFault) -> DriverError {
        DriverError::Controller(e)
    }
}

/// The outcome of reading one record.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Record { data: Vec<u8>, truncated: bool },
    TapeMark,
    EndOfTape,
    /// The controller reported an error; the status register is
    /// attached.
    Failed(StatusRegister),
}

pub struct TapeDriver {
    machine: Machine<TapeLibrary, Ram>,
    base: Address,
    unit: UnitNumber,
}

impl TapeDriver {
    pub fn new(machine: Machine<TapeLibrary, Ram>, unit: UnitNumber) -> TapeDriver {
        let base = machine.controller().config().base_address;
        TapeDriver {
            machine,
            base,
            unit,
        }
    }

    pub fn with_library(
        config: ControllerConfiguration,
        library: TapeLibrary,
        memory: Ram,
        unit: UnitNumber,
    ) -> TapeDriver {
        TapeDriver::new(Machine::new(config, library, memory), unit)
    }

    pub fn machine(&self) -> &Machine<TapeLibrary, Ram> {
        &self.machine
    }

    fn register(&self, offset: u32) -> Address {
        self.base.wrapping_add(offset)
    }

    fn write_register(&mut self, offset: u32, value: u16) -> Result<(), DriverError> {
        let address = self.register(offset);
        self.machine.bus_write(address, Width::Word, value)?;
        Ok(())
    }

    fn read_register(&mut self, offset: u32) -> Result<u16, DriverError> {
        let address = self.register(offset);
        Ok(self.machine.bus_read(address)?)
    }

    pub fn status(&mut self) -> Result<StatusRegister, DriverError> {
        Ok(StatusRegister::from_bits(self.read_register(MTS_OFFSET)?))
    }

    /// Issue `function` and wait for its completion interrupt.
    /// Returns the status register afterwards.
    fn execute(
        &mut self,
        function: Function,
        count: u16,
        buffer: Address,
    ) -> Result<StatusRegister, DriverError> {
        event!(
            Level::DEBUG,
            "unit {}: {function}, count {count}, buffer {buffer}",
            self.unit
        );
        self.write_register(MTBRC_OFFSET, negative_count(count))?;
        self.write_register(MTCMA_OFFSET, buffer.low_word())?;
        let command = MTC_DENSITY_800_NINE_TRACK
            | u16::from(u8::from(self.unit)) << 8
            | MTC_IE
            | u16::from(buffer.extension_bits()) << 4
            | u16::from(function.code()) << 1
            | MTC_GO;
        self.write_register(MTC_OFFSET, command)?;
        match self.machine.wait_for_interrupt(PriorityLevel::ZERO)? {
            Some(vector) => {
                event!(Level::TRACE, "interrupt through vector {vector}");
                self.status()
            }
            None => Err(DriverError::NoInterrupt { function }),
        }
    }

    pub fn rewind(&mut self) -> Result<StatusRegister, DriverError> {
        self.execute(Function::Rewind, 0, Address::ZERO)
    }

    pub fn space_forward(&mut self, records: u16) -> Result<StatusRegister, DriverError> {
        self.execute(Function::SpaceForward, records, Address::ZERO)
    }

    /// Read the next record into host memory at `buffer`, which has
    /// room for `size` bytes, and return what was read.
    pub fn read_record(&mut self, buffer: Address, size: u16) -> Result<ReadOutcome, DriverError> {
        let status = self.execute(Function::Read, size, buffer)?;
        if status.end_of_tape {
            return Ok(ReadOutcome::EndOfTape);
        }
        if status.end_of_file {
            return Ok(ReadOutcome::TapeMark);
        }
        if status.data_error || status.non_existent_memory || status.illegal_command {
            return Ok(ReadOutcome::Failed(status));
        }
        let remaining = count_magnitude(self.read_register(MTBRC_OFFSET)?);
        // A record longer than the buffer leaves the counter at zero.
        let length = if status.record_length_error {
            size
        } else {
            size.wrapping_sub(remaining)
        };
        let data = self
            .machine
            .memory()
            .slice(buffer, usize::from(length))
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        Ok(ReadOutcome::Record {
            data,
            truncated: status.record_length_error,
        })
    }
}
