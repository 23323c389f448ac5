//! The TM11's software-visible registers.
//!
//! | Offset | Name  | Register                         |
//! | ------ | ----- | -------------------------------- |
//! | +0     | MTS   | Status (read-only)               |
//! | +2     | MTC   | Command                          |
//! | +4     | MTBRC | Byte/record counter              |
//! | +6     | MTCMA | Current memory address           |
//! | +10    | MTD   | Data buffer (reads as zero)      |
//! | +12    | MTRD  | TU10 read lines (reads as zero)  |
//!
//! Offsets are octal.  The status and command registers are kept as
//! structured values and only packed into 16-bit words at the bus.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use unibus::Address;

/// Identifies the register at a (word-aligned) offset from the
/// controller's base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Register {
    Status,
    Command,
    ByteCount,
    MemoryAddress,
    Data,
    ReadLines,
}

impl Register {
    pub fn decode(offset: u32) -> Option<Register> {
        match offset & !1 {
            0o0 => Some(Register::Status),
            0o2 => Some(Register::Command),
            0o4 => Some(Register::ByteCount),
            0o6 => Some(Register::MemoryAddress),
            0o10 => Some(Register::Data),
            0o12 => Some(Register::ReadLines),
            _ => None,
        }
    }

    pub fn offset(&self) -> u32 {
        match self {
            Register::Status => 0o0,
            Register::Command => 0o2,
            Register::ByteCount => 0o4,
            Register::MemoryAddress => 0o6,
            Register::Data => 0o10,
            Register::ReadLines => 0o12,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Register::Status => "MTS",
            Register::Command => "MTC",
            Register::ByteCount => "MTBRC",
            Register::MemoryAddress => "MTCMA",
            Register::Data => "MTD",
            Register::ReadLines => "MTRD",
        }
    }
}

/// The function field (bits 1-3) of the command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Function {
    OffLine,
    Read,
    Write,
    WriteEof,
    SpaceForward,
    SpaceReverse,
    WriteExtendedGap,
    Rewind,
}

impl Function {
    /// Decode the bottom three bits of `code`.
    pub fn from_code(code: u8) -> Function {
        match code & 0o7 {
            0 => Function::OffLine,
            1 => Function::Read,
            2 => Function::Write,
            3 => Function::WriteEof,
            4 => Function::SpaceForward,
            5 => Function::SpaceReverse,
            6 => Function::WriteExtendedGap,
            _ => Function::Rewind,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Function::OffLine => 0,
            Function::Read => 1,
            Function::Write => 2,
            Function::WriteEof => 3,
            Function::SpaceForward => 4,
            Function::SpaceReverse => 5,
            Function::WriteExtendedGap => 6,
            Function::Rewind => 7,
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Function::OffLine => "off-line",
            Function::Read => "read",
            Function::Write => "write",
            Function::WriteEof => "write end-of-file",
            Function::SpaceForward => "space forward",
            Function::SpaceReverse => "space reverse",
            Function::WriteExtendedGap => "write with extended IRG",
            Function::Rewind => "rewind",
        })
    }
}

/// Density and parity selection, bits 13-14 of the command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Density {
    Bpi200SevenTrack,
    Bpi556SevenTrack,
    Bpi800SevenTrack,
    Bpi800NineTrack,
}

impl Density {
    fn from_code(code: u16) -> Density {
        match code & 0o3 {
            0 => Density::Bpi200SevenTrack,
            1 => Density::Bpi556SevenTrack,
            2 => Density::Bpi800SevenTrack,
            _ => Density::Bpi800NineTrack,
        }
    }

    fn code(&self) -> u16 {
        match self {
            Density::Bpi200SevenTrack => 0,
            Density::Bpi556SevenTrack => 1,
            Density::Bpi800SevenTrack => 2,
            Density::Bpi800NineTrack => 3,
        }
    }
}

const MTC_GO: u16 = 0o1;
const MTC_FUNCTION_SHIFT: u16 = 1;
const MTC_XBA_SHIFT: u16 = 4;
const MTC_IE: u16 = 0o100;
const MTC_READY: u16 = 0o200;
const MTC_UNIT_SHIFT: u16 = 8;
const MTC_EVEN_PARITY: u16 = 0o4000;
const MTC_POWER_CLEAR: u16 = 0o10000;
const MTC_DENSITY_SHIFT: u16 = 13;
const MTC_ERROR: u16 = 0o100_000;

/// MTC, the command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CommandRegister {
    pub go: bool,
    pub function: Function,
    extended_address: u8,
    pub interrupt_enable: bool,
    pub ready: bool,
    unit_select: u8,
    pub even_parity: bool,
    /// Power clear; writing a one resets the controller.
    pub power_clear: bool,
    pub density: Density,
    /// Error summary.  The controller refreshes this from the status
    /// register; writes have no effect on it.
    pub error: bool,
}

impl CommandRegister {
    /// Value after power-up or a power clear: 800 bpi nine-track,
    /// controller ready.
    pub const POWER_UP_VALUE: u16 = 0o60200;

    pub fn from_bits(bits: u16) -> CommandRegister {
        CommandRegister {
            go: bits & MTC_GO != 0,
            function: Function::from_code((bits >> MTC_FUNCTION_SHIFT) as u8),
            extended_address: ((bits >> MTC_XBA_SHIFT) & 0o3) as u8,
            interrupt_enable: bits & MTC_IE != 0,
            ready: bits & MTC_READY != 0,
            unit_select: ((bits >> MTC_UNIT_SHIFT) & 0o7) as u8,
            even_parity: bits & MTC_EVEN_PARITY != 0,
            power_clear: bits & MTC_POWER_CLEAR != 0,
            density: Density::from_code(bits >> MTC_DENSITY_SHIFT),
            error: bits & MTC_ERROR != 0,
        }
    }

    pub fn bits(&self) -> u16 {
        let flag = |set: bool, mask: u16| if set { mask } else { 0 };
        flag(self.go, MTC_GO)
            | u16::from(self.function.code()) << MTC_FUNCTION_SHIFT
            | u16::from(self.extended_address) << MTC_XBA_SHIFT
            | flag(self.interrupt_enable, MTC_IE)
            | flag(self.ready, MTC_READY)
            | u16::from(self.unit_select) << MTC_UNIT_SHIFT
            | flag(self.even_parity, MTC_EVEN_PARITY)
            | flag(self.power_clear, MTC_POWER_CLEAR)
            | self.density.code() << MTC_DENSITY_SHIFT
            | flag(self.error, MTC_ERROR)
    }

    /// Bits 16-17 of the DMA address.
    pub fn extended_address(&self) -> u8 {
        self.extended_address
    }

    pub fn set_extended_address(&mut self, bits: u8) {
        self.extended_address = bits & 0o3;
    }

    /// The full three-bit unit select field.  Only the bottom two bits
    /// select a drive; see [`crate::UnitNumber`].
    pub fn unit_select(&self) -> u8 {
        self.unit_select
    }

    pub fn set_unit_select(&mut self, unit: u8) {
        self.unit_select = unit & 0o7;
    }
}

impl Default for CommandRegister {
    fn default() -> CommandRegister {
        CommandRegister::from_bits(CommandRegister::POWER_UP_VALUE)
    }
}

const MTS_TUR: u16 = 0o1;
const MTS_RWS: u16 = 0o2;
const MTS_WRL: u16 = 0o4;
const MTS_SDWN: u16 = 0o10;
const MTS_CH7: u16 = 0o20;
const MTS_BOT: u16 = 0o40;
const MTS_SELR: u16 = 0o100;
const MTS_NXM: u16 = 0o200;
const MTS_BTE: u16 = 0o400;
const MTS_RLE: u16 = 0o1000;
const MTS_EOT: u16 = 0o2000;
const MTS_BGL: u16 = 0o4000;
const MTS_PAE: u16 = 0o10000;
const MTS_CRE: u16 = 0o20000;
const MTS_EOF: u16 = 0o40000;
const MTS_ILC: u16 = 0o100_000;

/// Status bits which feed the error summary bit of MTC.
pub const MTS_ERROR_SUMMARY_MASK: u16 = 0o177_600;

/// MTS, the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct StatusRegister {
    pub tape_unit_ready: bool,
    pub rewinding: bool,
    pub write_locked: bool,
    pub settle_down: bool,
    pub seven_channel: bool,
    pub beginning_of_tape: bool,
    pub online: bool,
    pub non_existent_memory: bool,
    /// "Bad tape error"; set when the tape image could not be read.
    pub data_error: bool,
    pub record_length_error: bool,
    pub end_of_tape: bool,
    pub bus_grant_late: bool,
    pub parity_error: bool,
    pub crc_error: bool,
    pub end_of_file: bool,
    pub illegal_command: bool,
}

impl StatusRegister {
    /// Value after power-up or a power clear: on line, at BOT,
    /// write-locked, ready.
    pub const POWER_UP_VALUE: u16 = 0o145;

    pub fn power_up() -> StatusRegister {
        StatusRegister::from_bits(StatusRegister::POWER_UP_VALUE)
    }

    pub fn from_bits(bits: u16) -> StatusRegister {
        let has = |mask: u16| bits & mask != 0;
        StatusRegister {
            tape_unit_ready: has(MTS_TUR),
            rewinding: has(MTS_RWS),
            write_locked: has(MTS_WRL),
            settle_down: has(MTS_SDWN),
            seven_channel: has(MTS_CH7),
            beginning_of_tape: has(MTS_BOT),
            online: has(MTS_SELR),
            non_existent_memory: has(MTS_NXM),
            data_error: has(MTS_BTE),
            record_length_error: has(MTS_RLE),
            end_of_tape: has(MTS_EOT),
            bus_grant_late: has(MTS_BGL),
            parity_error: has(MTS_PAE),
            crc_error: has(MTS_CRE),
            end_of_file: has(MTS_EOF),
            illegal_command: has(MTS_ILC),
        }
    }

    pub fn bits(&self) -> u16 {
        [
            (self.tape_unit_ready, MTS_TUR),
            (self.rewinding, MTS_RWS),
            (self.write_locked, MTS_WRL),
            (self.settle_down, MTS_SDWN),
            (self.seven_channel, MTS_CH7),
            (self.beginning_of_tape, MTS_BOT),
            (self.online, MTS_SELR),
            (self.non_existent_memory, MTS_NXM),
            (self.data_error, MTS_BTE),
            (self.record_length_error, MTS_RLE),
            (self.end_of_tape, MTS_EOT),
            (self.bus_grant_late, MTS_BGL),
            (self.parity_error, MTS_PAE),
            (self.crc_error, MTS_CRE),
            (self.end_of_file, MTS_EOF),
            (self.illegal_command, MTS_ILC),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(0, |acc, (_, mask)| acc | mask)
    }

    /// True when any bit covered by the error summary is set.
    pub fn any_error(&self) -> bool {
        self.bits() & MTS_ERROR_SUMMARY_MASK != 0
    }

    /// Starting a new command drops tape-unit-ready and the error
    /// conditions left by the previous one.  End-of-tape describes
    /// where the tape is, not how the last command went, so it stays.
    pub fn clear_for_new_command(&mut self) {
        self.tape_unit_ready = false;
        self.non_existent_memory = false;
        self.data_error = false;
        self.record_length_error = false;
        self.bus_grant_late = false;
        self.parity_error = false;
        self.crc_error = false;
        self.end_of_file = false;
        self.illegal_command = false;
    }
}

/// The magnitude of a two's complement counter such as MTBRC.  A
/// register value of zero yields zero.
pub fn count_magnitude(register: u16) -> u16 {
    register.wrapping_neg()
}

/// The value to load into a two's complement counter in order to
/// count `n` items.
pub fn negative_count(n: u16) -> u16 {
    n.wrapping_neg()
}

/// All of the controller's registers which hold state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerRegisters {
    pub status: StatusRegister,
    pub command: CommandRegister,
    pub byte_count: u16,
    pub memory_address: u16,
}

impl ControllerRegisters {
    /// The DMA address formed from MTC's extended address bits and
    /// MTCMA.
    pub fn transfer_address(&self) -> Address {
        Address::from_parts(self.command.extended_address(), self.memory_address)
    }

    pub fn set_transfer_address(&mut self, address: Address) {
        self.memory_address = address.low_word();
        self.command.set_extended_address(address.extension_bits());
    }

    /// Refresh the error summary bit in MTC from MTS.
    pub fn refresh_error_summary(&mut self) {
        self.command.error = self.status.any_error();
    }
}

impl Default for ControllerRegisters {
    fn default() -> ControllerRegisters {
        ControllerRegisters {
            status: StatusRegister::power_up(),
            command: CommandRegister::default(),
            byte_count: 0,
            memory_address: 0,
        }
    }
}

#[test]
fn test_power_up_values() {
    let regs = ControllerRegisters::default();
    assert_eq!(regs.status.bits(), 0o145);
    assert!(regs.status.tape_unit_ready);
    assert!(regs.status.beginning_of_tape);
    assert!(regs.status.online);
    assert!(regs.status.write_locked);
    assert_eq!(regs.command.bits(), 0o60200);
    assert!(regs.command.ready);
    assert_eq!(regs.command.density, Density::Bpi800NineTrack);
    assert_eq!(regs.command.function, Function::OffLine);
}

#[test]
fn test_command_fields() {
    // Unit 2, read, IE, go, extended address 01.
    let mtc = CommandRegister::from_bits(0o1000 | 0o100 | 0o20 | 0o2 | 0o1);
    assert!(mtc.go);
    assert_eq!(mtc.function, Function::Read);
    assert_eq!(mtc.extended_address(), 1);
    assert!(mtc.interrupt_enable);
    assert!(!mtc.ready);
    assert_eq!(mtc.unit_select(), 2);
    assert_eq!(mtc.density, Density::Bpi200SevenTrack);
}

#[test]
fn test_status_error_summary() {
    let mut mts = StatusRegister::power_up();
    assert!(!mts.any_error());
    mts.end_of_file = true;
    assert!(mts.any_error());
    mts.clear_for_new_command();
    assert!(!mts.any_error());
    mts.end_of_tape = true;
    mts.clear_for_new_command();
    assert!(mts.end_of_tape);
}

#[test]
fn test_register_decode() {
    assert_eq!(Register::decode(0o0), Some(Register::Status));
    assert_eq!(Register::decode(0o3), Some(Register::Command));
    assert_eq!(Register::decode(0o12), Some(Register::ReadLines));
    assert_eq!(Register::decode(0o14), None);
    for reg in [
        Register::Status,
        Register::Command,
        Register::ByteCount,
        Register::MemoryAddress,
        Register::Data,
        Register::ReadLines,
    ] {
        assert_eq!(Register::decode(reg.offset()), Some(reg));
    }
}

#[test]
fn test_count_magnitude() {
    assert_eq!(count_magnitude(0), 0);
    assert_eq!(count_magnitude(0o177_777), 1);
    assert_eq!(negative_count(10), 0o177_766);
    assert_eq!(count_magnitude(negative_count(512)), 512);
}

#[test]
fn test_transfer_address() {
    let mut regs = ControllerRegisters::default();
    regs.set_transfer_address(Address::from_parts(2, 0o1234));
    assert_eq!(regs.memory_address, 0o1234);
    assert_eq!(regs.command.extended_address(), 2);
    assert_eq!(u32::from(regs.transfer_address()), 0o2_001_234);
}
