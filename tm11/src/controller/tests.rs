use std::time::Duration;

use unibus::prelude::*;

use super::*;
use crate::fault::ControllerFault;
use crate::io::{IoCompletion, IoKind, IoStatus};
use crate::registers::negative_count;
use crate::unit::BackingId;

const MTS: Address = addr!(0o17772520);
const MTC: Address = addr!(0o17772522);
const MTBRC: Address = addr!(0o17772524);
const MTCMA: Address = addr!(0o17772526);
const MTD: Address = addr!(0o17772530);
const MTRD: Address = addr!(0o17772532);

const GO: u16 = 0o1;
const READ: u16 = 1 << 1;
const SPACE_FORWARD: u16 = 4 << 1;
const SPACE_REVERSE: u16 = 5 << 1;
const REWIND: u16 = 7 << 1;
const IE: u16 = 0o100;
const INIT: u16 = 0o10000;

/// Records what the controller asks of its host without doing any of
/// it.
#[derive(Debug, Default)]
struct RecordingHost {
    io: Vec<IoRequest>,
    interrupts: Vec<InterruptRequest>,
    cancelled: Vec<(PriorityLevel, Vector)>,
}

impl HostServices for RecordingHost {
    fn request_backing_io(&mut self, _ctx: &Context, request: IoRequest) {
        self.io.push(request);
    }

    fn request_interrupt(&mut self, _ctx: &Context, request: InterruptRequest) {
        self.interrupts.push(request);
    }

    fn cancel_interrupt(&mut self, level: PriorityLevel, vector: Vector) {
        self.cancelled.push((level, vector));
    }
}

fn ctx() -> Context {
    Context::at(Duration::from_micros(1))
}

fn read(tm: &mut Tm11, host: &mut RecordingHost, address: Address) -> u16 {
    tm.access(&ctx(), address, Access::Read, host)
        .expect("register should exist")
}

fn write(tm: &mut Tm11, host: &mut RecordingHost, address: Address, value: u16) {
    tm.access(&ctx(), address, Access::Write(Width::Word, value), host)
        .expect("register should exist");
}

fn probe_result(unit: UnitNumber, position: u64, header: u32) -> IoCompletion {
    IoCompletion {
        unit,
        status: IoStatus::Ok,
        position,
        value: header,
        count: 0,
    }
}

fn transfer_result(unit: UnitNumber, final_address: u32, residual: u32) -> IoCompletion {
    IoCompletion {
        unit,
        status: IoStatus::Ok,
        position: 0,
        value: final_address,
        count: residual,
    }
}

fn complete(tm: &mut Tm11, host: &mut RecordingHost, completion: IoCompletion) {
    tm.complete_io(&ctx(), completion, host)
        .expect("completion should be expected");
}

fn last_io(host: &RecordingHost) -> &IoRequest {
    host.io.last().expect("an I/O request should have been made")
}

fn unit(n: u8) -> UnitNumber {
    UnitNumber::try_from(n).expect("valid unit number")
}

#[test]
fn test_power_up_state() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    assert_eq!(read(&mut tm, &mut host, MTS), 0o145);
    assert_eq!(read(&mut tm, &mut host, MTC), 0o60200);
    assert_eq!(read(&mut tm, &mut host, MTBRC), 0);
    assert_eq!(read(&mut tm, &mut host, MTCMA), 0);
}

#[test]
fn test_unknown_register_is_a_bus_fault() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let address = addr!(0o17772534);
    assert_eq!(
        tm.access(&ctx(), address, Access::Read, &mut host),
        Err(BusFault::NonExistentRegister(address))
    );
    let below = addr!(0o17772516);
    assert_eq!(
        tm.access(&ctx(), below, Access::Read, &mut host),
        Err(BusFault::NonExistentRegister(below))
    );
}

#[test]
fn test_data_registers_read_zero() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTD, 0o177_777);
    write(&mut tm, &mut host, MTRD, 0o123);
    assert_eq!(read(&mut tm, &mut host, MTD), 0);
    assert_eq!(read(&mut tm, &mut host, MTRD), 0);
}

#[test]
fn test_status_writes_are_ignored() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTS, 0o177_777);
    assert_eq!(read(&mut tm, &mut host, MTS), 0o145);
}

#[test]
fn test_byte_write_to_command_high_byte() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTC, 0o60200 | IE);
    // Select unit 2 by writing only the high byte.
    tm.access(
        &ctx(),
        MTC.wrapping_add(1),
        Access::Write(Width::Byte, 0o142),
        &mut host,
    )
    .expect("register should exist");
    let mtc = read(&mut tm, &mut host, MTC);
    assert_eq!(mtc & 0o377, 0o200 | IE);
    assert_eq!(tm.selected_unit(), unit(2));
}

#[test]
fn test_odd_word_write_is_a_fault() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let odd = MTBRC.wrapping_add(1);
    assert_eq!(
        tm.access(&ctx(), odd, Access::Write(Width::Word, 5), &mut host),
        Err(BusFault::OddAddress(odd))
    );
    assert_eq!(read(&mut tm, &mut host, MTBRC), 0);
}

#[test]
fn test_ready_and_error_bits_cannot_be_written() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTC, 0o100_000);
    let mtc = read(&mut tm, &mut host, MTC);
    assert_eq!(mtc & 0o100_000, 0);
    assert_ne!(mtc & 0o200, 0);
}

#[test]
fn test_init_rewinds_every_unit() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    for n in 0..4 {
        tm.units.get_mut(unit(n)).position = 100;
    }
    write(&mut tm, &mut host, MTC, INIT);
    for n in 0..4 {
        assert_eq!(tm.unit(unit(n)).position, 0);
        write(&mut tm, &mut host, MTC, u16::from(n) << 8);
        assert_ne!(read(&mut tm, &mut host, MTS) & 0o40, 0, "unit {n} not at BOT");
    }
}

#[test]
fn test_init_resets_registers_and_keeps_backing() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    tm.regs.status.end_of_file = true;
    tm.regs.status.illegal_command = true;
    tm.regs.command.interrupt_enable = true;
    write(&mut tm, &mut host, MTBRC, negative_count(80));
    write(&mut tm, &mut host, MTCMA, 0o4000);
    write(&mut tm, &mut host, MTC, INIT | IE | 0o1000);
    assert_eq!(tm.registers().status.bits(), 0o145);
    assert_eq!(tm.registers().command.bits(), 0o60200);
    assert_eq!(read(&mut tm, &mut host, MTBRC), 0);
    assert_eq!(read(&mut tm, &mut host, MTCMA), 0);
    assert!(host.io.is_empty());
    assert!(!host.cancelled.is_empty());
    for n in 0..4 {
        assert_eq!(tm.unit(unit(n)).backing, BackingId::for_unit(unit(n)));
    }
}

#[test]
fn test_rewind() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    tm.units.get_mut(UnitNumber::ZERO).position = 1234;
    tm.regs.status.end_of_tape = true;
    assert_eq!(read(&mut tm, &mut host, MTS) & 0o40, 0);
    write(&mut tm, &mut host, MTC, 0o60200 | REWIND | GO);
    assert!(host.io.is_empty());
    assert_eq!(tm.unit(UnitNumber::ZERO).position, 0);
    let mts = read(&mut tm, &mut host, MTS);
    assert_ne!(mts & 0o40, 0);
    assert_eq!(mts & 0o2000, 0);
    assert_ne!(mts & 0o1, 0);
    assert_ne!(read(&mut tm, &mut host, MTC) & 0o200, 0);
}

#[test]
fn test_go_ignored_when_not_ready() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    tm.regs.command.ready = false;
    write(&mut tm, &mut host, MTC, READ | GO);
    assert!(host.io.is_empty());
}

#[test]
fn test_read_exact_length() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTBRC, negative_count(80));
    write(&mut tm, &mut host, MTCMA, 0o1000);
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    assert_eq!(read(&mut tm, &mut host, MTC) & 0o200, 0);
    assert_eq!(read(&mut tm, &mut host, MTS) & 0o1, 0);
    assert_eq!(last_io(&host).kind, IoKind::HeaderProbe);
    assert_eq!(last_io(&host).position, 0);

    complete(&mut tm, &mut host, probe_result(u0, 2, 80));
    let transfer = last_io(&host).clone();
    assert_eq!(transfer.kind, IoKind::DataTransfer);
    assert_eq!(transfer.position, 2);
    assert_eq!(transfer.length, 80);
    assert_eq!(u32::from(transfer.address), 0o1000);
    assert_eq!(tm.registers().byte_count, 0);
    assert_eq!(tm.unit(u0).position, 2 + 2 + 40);
    assert_eq!(tm.unit(u0).activity, Activity::AwaitingTransfer);

    complete(&mut tm, &mut host, transfer_result(u0, 0o1000 + 80, 0));
    assert!(tm.unit(u0).is_idle());
    assert_eq!(tm.registers().byte_count, 0);
    assert_eq!(tm.registers().memory_address, 0o1000 + 80);
    assert_eq!(tm.registers().status.bits() & 0o177_600, 0);
    assert!(tm.registers().command.ready);
    assert!(tm.registers().status.tape_unit_ready);
}

#[test]
fn test_read_truncates_long_record() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTBRC, negative_count(10));
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    complete(&mut tm, &mut host, probe_result(u0, 2, 15));
    assert_eq!(last_io(&host).length, 10);
    assert!(tm.registers().status.record_length_error);
    assert_eq!(tm.registers().byte_count, 0);
    assert_eq!(tm.unit(u0).position, 2 + 2 + 8);
    complete(&mut tm, &mut host, transfer_result(u0, 10, 0));
    assert_ne!(read(&mut tm, &mut host, MTC) & 0o100_000, 0);
}

#[test]
fn test_read_with_zero_count_takes_whole_record() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    complete(&mut tm, &mut host, probe_result(UnitNumber::ZERO, 2, 300));
    assert_eq!(last_io(&host).length, 300);
    assert_eq!(tm.registers().byte_count, 300);
    assert!(!tm.registers().status.record_length_error);
}

#[test]
fn test_read_count_wraps_for_record_longer_than_counter() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    complete(&mut tm, &mut host, probe_result(u0, 2, 0x1_0010));
    assert_eq!(last_io(&host).length, 0x1_0010);
    assert_eq!(tm.registers().byte_count, 0x10);
    // A residual of exactly 64K bytes leaves the counter where it was.
    complete(&mut tm, &mut host, transfer_result(u0, 0o20, 0x1_0000));
    assert_eq!(tm.registers().byte_count, 0x10);
}

#[test]
fn test_transfer_residual_and_extended_address() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTBRC, negative_count(100));
    write(&mut tm, &mut host, MTCMA, 0o177_770);
    write(&mut tm, &mut host, MTC, 0o60200 | 0o20 | READ | GO);
    complete(&mut tm, &mut host, probe_result(u0, 2, 20));
    assert_eq!(u32::from(last_io(&host).address), 0o377_770);
    assert_eq!(tm.registers().byte_count, negative_count(80));
    // The memory ran out after 8 bytes, which crossed into the next
    // 64K bank.
    complete(
        &mut tm,
        &mut host,
        IoCompletion {
            unit: u0,
            status: IoStatus::NonExistentMemory,
            position: 6,
            value: 0o400_000,
            count: 12,
        },
    );
    assert_eq!(tm.registers().byte_count, negative_count(92));
    assert_eq!(tm.registers().memory_address, 0);
    assert_eq!(tm.registers().command.extended_address(), 2);
    assert!(tm.registers().status.non_existent_memory);
}

#[test]
fn test_read_then_tape_mark() {
    // One 10-byte record followed by a tape mark, with a backing store
    // which reports the probe position unchanged.
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTBRC, negative_count(20));
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    complete(&mut tm, &mut host, probe_result(u0, 0, 10));
    assert_eq!(tm.unit(u0).position, 7);
    assert_eq!(last_io(&host).position, 0);
    assert_eq!(last_io(&host).length, 10);
    complete(&mut tm, &mut host, transfer_result(u0, 10, 0));
    assert_eq!(tm.registers().byte_count, negative_count(20).wrapping_add(10));
    assert!(!tm.registers().status.any_error());

    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    assert_eq!(last_io(&host).position, 7);
    let requests = host.io.len();
    complete(&mut tm, &mut host, probe_result(u0, 7, 0));
    assert_eq!(host.io.len(), requests);
    assert_eq!(tm.unit(u0).position, 7);
    assert!(tm.unit(u0).is_idle());
    assert!(tm.registers().status.end_of_file);
    assert!(!tm.registers().status.end_of_tape);
}

#[test]
fn test_marker_headers_are_tape_marks() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTC, 0o60200 | SPACE_FORWARD | GO);
    complete(&mut tm, &mut host, probe_result(u0, 2, 0x8000_0010));
    assert!(tm.registers().status.end_of_file);
    assert!(!tm.registers().status.end_of_tape);
    assert_eq!(tm.unit(u0).position, 2);

    write(&mut tm, &mut host, MTC, 0o60200 | SPACE_FORWARD | GO);
    assert!(!tm.registers().status.end_of_file);
    complete(&mut tm, &mut host, probe_result(u0, 4, 0xFFFF_FFFF));
    assert!(tm.registers().status.end_of_file);
    assert!(tm.registers().status.end_of_tape);

    // End of tape survives the next command, but not a rewind.
    write(&mut tm, &mut host, MTC, 0o60200 | SPACE_FORWARD | GO);
    assert!(tm.registers().status.end_of_tape);
    complete(&mut tm, &mut host, probe_result(u0, 6, 0xFFFF_FFFF));
    write(&mut tm, &mut host, MTC, 0o60200 | REWIND | GO);
    assert!(!tm.registers().status.end_of_tape);
}

#[test]
fn test_space_forward_over_blocks() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTBRC, negative_count(3));
    write(&mut tm, &mut host, MTC, 0o60200 | SPACE_FORWARD | GO);
    complete(&mut tm, &mut host, probe_result(u0, 2, 512));
    assert_eq!(tm.unit(u0).position, 2 + 2 + 256);
    assert_eq!(last_io(&host).position, 260);
    assert_eq!(tm.registers().byte_count, negative_count(2));
    complete(&mut tm, &mut host, probe_result(u0, 262, 3));
    assert_eq!(tm.unit(u0).position, 262 + 2 + 2);
    complete(&mut tm, &mut host, probe_result(u0, 268, 1));
    assert_eq!(tm.unit(u0).position, 268 + 2 + 1);
    assert_eq!(tm.registers().byte_count, 0);
    assert!(tm.unit(u0).is_idle());
    assert_eq!(host.io.len(), 3);
    assert!(tm.registers().command.ready);
}

#[test]
fn test_space_reverse() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    tm.units.get_mut(u0).position = 20;
    write(&mut tm, &mut host, MTBRC, negative_count(5));
    write(&mut tm, &mut host, MTC, 0o60200 | SPACE_REVERSE | GO);
    assert_eq!(last_io(&host).position, 18);
    // The trailer of a 10-byte record, which begins at word 7.
    complete(&mut tm, &mut host, probe_result(u0, 20, 10));
    assert_eq!(tm.unit(u0).position, 11);
    assert_eq!(last_io(&host).position, 9);
    // A 13-byte record at the load point.
    complete(&mut tm, &mut host, probe_result(u0, 11, 13));
    assert_eq!(tm.unit(u0).position, 0);
    // The count has not run out, but the tape is at its start.
    assert_eq!(host.io.len(), 2);
    assert!(tm.unit(u0).is_idle());
    assert_eq!(tm.registers().byte_count, negative_count(3));
    assert_ne!(read(&mut tm, &mut host, MTS) & 0o40, 0);
}

#[test]
fn test_space_reverse_over_mismatched_trailer() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    tm.units.get_mut(u0).position = 11;
    write(&mut tm, &mut host, MTBRC, negative_count(2));
    write(&mut tm, &mut host, MTC, 0o60200 | SPACE_REVERSE | GO);
    assert_eq!(last_io(&host).position, 9);
    // The trailer says 8 bytes, so the step back lands on word 1,
    // inside the first header.
    complete(&mut tm, &mut host, probe_result(u0, 9, 8));
    assert_eq!(tm.unit(u0).position, 1);
    assert_eq!(last_io(&host).position, 0);
    complete(&mut tm, &mut host, probe_result(u0, 2, 10));
    assert_eq!(tm.unit(u0).position, 0);
    assert!(tm.unit(u0).is_idle());
    assert_eq!(tm.registers().byte_count, 0);
    assert!(tm.registers().command.ready);
}

#[test]
fn test_space_reverse_at_load_point() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTBRC, negative_count(1));
    write(&mut tm, &mut host, MTC, 0o60200 | SPACE_REVERSE | GO);
    assert!(host.io.is_empty());
    assert!(tm.registers().command.ready);
    assert!(tm.unit(UnitNumber::ZERO).is_idle());
}

#[test]
fn test_probe_error_sets_bad_tape() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let u0 = UnitNumber::ZERO;
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    complete(
        &mut tm,
        &mut host,
        IoCompletion {
            status: IoStatus::DataError,
            ..probe_result(u0, 0, 99)
        },
    );
    assert!(tm.registers().status.data_error);
    assert_eq!(tm.unit(u0).position, 0);
    assert!(tm.unit(u0).is_idle());
    assert_ne!(read(&mut tm, &mut host, MTC) & 0o100_000, 0);

    // The next command clears the error.
    write(&mut tm, &mut host, MTC, 0o60200 | REWIND | GO);
    assert!(!tm.registers().status.data_error);
    assert_eq!(read(&mut tm, &mut host, MTC) & 0o100_000, 0);
}

#[test]
fn test_completion_while_idle_is_a_fault() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    let result = tm.complete_io(&ctx(), probe_result(unit(3), 2, 10), &mut host);
    assert!(matches!(
        result,
        Err(ControllerFault::InconsistentState { unit: u, .. }) if u == unit(3)
    ));
}

#[test]
fn test_command_on_busy_unit_is_illegal() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    // Init while the header probe is outstanding.
    write(&mut tm, &mut host, MTC, INIT);
    write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
    assert_eq!(host.io.len(), 1);
    assert!(tm.registers().status.illegal_command);
    assert!(tm.registers().command.ready);
    // The first request still completes normally.
    complete(&mut tm, &mut host, probe_result(UnitNumber::ZERO, 2, 0));
    assert!(tm.unit(UnitNumber::ZERO).is_idle());
}

#[test]
fn test_interrupt_on_completion() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTC, 0o60200 | IE | REWIND | GO);
    assert_eq!(host.interrupts.len(), 1);
    let request = host.interrupts[0];
    assert_eq!(request.level, PriorityLevel::BR5);
    assert_eq!(u16::from(request.vector), 0o224);
    assert_eq!(request.on_deliver, Some(DeliveryAction::CommandEnd));
    // Until the interrupt is delivered, the command has not ended.
    assert!(!tm.registers().command.ready);
    assert!(tm.command_end());
    assert!(tm.registers().command.ready);
    assert!(tm.registers().status.tape_unit_ready);
}

#[test]
fn test_enabling_interrupts_when_ready_interrupts() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTC, 0o60200 | IE);
    assert_eq!(host.interrupts.len(), 1);
    assert_eq!(host.interrupts[0].on_deliver, None);
    // Writing IE again when it is already set does not.
    write(&mut tm, &mut host, MTC, 0o60200 | IE);
    assert_eq!(host.interrupts.len(), 1);
}

#[test]
fn test_clearing_interrupt_enable_withdraws_interrupt() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    write(&mut tm, &mut host, MTC, 0o60200 | IE | REWIND | GO);
    assert_eq!(host.interrupts.len(), 1);
    write(&mut tm, &mut host, MTC, 0o60200);
    assert_eq!(
        host.cancelled,
        vec![(PriorityLevel::BR5, Vector::new::<0o224>())]
    );
    // Should the interrupt be delivered anyway, it is refused.
    assert!(!tm.command_end());
}

#[test]
fn test_status_snapshot() {
    let mut tm = Tm11::default();
    let mut host = RecordingHost::default();
    tm.units.get_mut(unit(1)).position = 40;
    write(&mut tm, &mut host, MTC, 0o60200 | 0o400);
    let status = tm.status();
    assert_eq!(status.selected_unit, unit(1));
    assert!(!status.status.beginning_of_tape);
    assert_eq!(status.mts, 0o105);
    assert_eq!(status.units.len(), 4);
    assert_eq!(status.units[1].position, 40);
}

mod proptests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn read_count_arithmetic(
        #[strategy(1_u16..=0o177_777)] requested: u16,
        #[strategy(1_u32..=0o177_777)] length: u32,
    ) {
        let mut tm = Tm11::default();
        let mut host = RecordingHost::default();
        let u0 = UnitNumber::ZERO;
        write(&mut tm, &mut host, MTBRC, negative_count(requested));
        write(&mut tm, &mut host, MTC, 0o60200 | READ | GO);
        complete(&mut tm, &mut host, probe_result(u0, 2, length));
        let moved = last_io(&host).length;
        if u32::from(requested) >= length {
            assert_eq!(moved, length);
            assert!(!tm.registers().status.record_length_error);
            assert_eq!(
                tm.registers().byte_count,
                negative_count(requested).wrapping_add(length as u16)
            );
        } else {
            assert_eq!(moved, u32::from(requested));
            assert!(tm.registers().status.record_length_error);
            assert_eq!(tm.registers().byte_count, 0);
        }
        complete(&mut tm, &mut host, transfer_result(u0, moved, 0));
        assert!(tm.unit(u0).is_idle());
        assert_eq!(tm.unit(u0).position, 4 + (u64::from(length) + 1) / 2);
    }

    #[proptest]
    fn space_forward_visits_count_records(#[strategy(1_u16..50)] count: u16) {
        let mut tm = Tm11::default();
        let mut host = RecordingHost::default();
        let u0 = UnitNumber::ZERO;
        write(&mut tm, &mut host, MTBRC, negative_count(count));
        write(&mut tm, &mut host, MTC, 0o60200 | SPACE_FORWARD | GO);
        let mut probes = 0;
        while !tm.unit(u0).is_idle() {
            let at = last_io(&host).position;
            probes += 1;
            complete(&mut tm, &mut host, probe_result(u0, at + 2, 8));
        }
        assert_eq!(probes, usize::from(count));
        assert_eq!(tm.unit(u0).position, u64::from(count) * 8);
        assert_eq!(tm.registers().byte_count, 0);
    }
}
