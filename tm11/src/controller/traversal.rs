//! Interpretation of backing-store completions.
//!
//! Reading a record takes two round trips to the backing store: one
//! to fetch the header, and one to move the data.  Spacing takes one
//! round trip per record skipped.  Each completion resumes the command
//! from whatever state the unit was left in.
use tracing::{event, span, Level};

use unibus::Address;

use super::Tm11;
use crate::context::Context;
use crate::fault::ControllerFault;
use crate::io::{HostServices, IoCompletion, IoRequest, HEADER_WORDS};
use crate::registers::count_magnitude;
use crate::storage::{payload_words, END_OF_MEDIUM, MARKER_THRESHOLD, TAPE_MARK};
use crate::unit::{Activity, Motion, UnitNumber};

impl Tm11 {
    /// Resume the command on `completion.unit` now that its
    /// backing-store request has finished.
    ///
    /// # Errors
    ///
    /// [`ControllerFault::InconsistentState`] if the unit was not
    /// waiting for anything.
    pub fn complete_io(
        &mut self,
        ctx: &Context,
        completion: IoCompletion,
        host: &mut dyn HostServices,
    ) -> Result<(), ControllerFault> {
        let unit = completion.unit;
        let span = span!(Level::ERROR, "complete_io", unit=%unit);
        let _enter = span.enter();
        event!(Level::TRACE, "completion: {completion:?}");

        match self.units.get(unit).activity {
            Activity::Idle => Err(ControllerFault::InconsistentState {
                unit,
                message: format!(
                    "a backing-store completion ({:?} at word {}) arrived while the unit was idle",
                    completion.status, completion.position
                ),
            }),
            Activity::AwaitingHeader(motion) => {
                self.interpret_header(ctx, host, unit, motion, &completion);
                Ok(())
            }
            Activity::AwaitingTransfer => {
                self.finish_transfer(ctx, host, unit, &completion);
                Ok(())
            }
        }
    }

    fn interpret_header(
        &mut self,
        ctx: &Context,
        host: &mut dyn HostServices,
        unit: UnitNumber,
        motion: Motion,
        completion: &IoCompletion,
    ) {
        if !completion.status.is_ok() {
            event!(
                Level::DEBUG,
                "header probe failed with {:?}",
                completion.status
            );
            self.end_command(ctx, host, unit, completion.status);
            return;
        }

        let header = completion.value;
        if header == TAPE_MARK || header >= MARKER_THRESHOLD {
            self.units.get_mut(unit).position = completion.position;
            self.regs.status.end_of_file = true;
            if header == END_OF_MEDIUM {
                event!(Level::DEBUG, "end of medium at word {}", completion.position);
                self.regs.status.end_of_tape = true;
            } else {
                event!(Level::DEBUG, "tape mark at word {}", completion.position);
            }
            self.end_command(ctx, host, unit, completion.status);
            return;
        }

        let length = header;
        let words = payload_words(length);
        match motion {
            Motion::Read => {
                self.units.get_mut(unit).position = completion.position + HEADER_WORDS + words;
                let wanted = u32::from(count_magnitude(self.regs.byte_count));
                let actual = if wanted >= length || wanted == 0 {
                    // The counter is 16 bits wide; longer records wrap it.
                    self.regs.byte_count = self
                        .regs
                        .byte_count
                        .wrapping_add((length & 0xffff) as u16);
                    length
                } else {
                    event!(
                        Level::DEBUG,
                        "record of {length} bytes is longer than the {wanted} requested"
                    );
                    self.regs.status.record_length_error = true;
                    self.regs.byte_count = 0;
                    wanted
                };
                let destination = self.regs.transfer_address();
                let state = self.units.get_mut(unit);
                state.activity = Activity::AwaitingTransfer;
                host.request_backing_io(
                    ctx,
                    IoRequest::data_transfer(
                        unit,
                        state.backing.clone(),
                        completion.position,
                        destination,
                        actual,
                    ),
                );
            }
            Motion::SpaceForward => {
                let position = completion.position + HEADER_WORDS + words;
                self.units.get_mut(unit).position = position;
                self.regs.byte_count = self.regs.byte_count.wrapping_add(1);
                if self.regs.byte_count != 0 {
                    self.request_header(ctx, host, unit, motion, position);
                } else {
                    self.end_command(ctx, host, unit, completion.status);
                }
            }
            Motion::SpaceReverse => {
                let position = completion
                    .position
                    .saturating_sub(2 * HEADER_WORDS + words);
                self.units.get_mut(unit).position = position;
                self.regs.byte_count = self.regs.byte_count.wrapping_add(1);
                if self.regs.byte_count != 0 && position > 0 {
                    // A trailer which disagrees with its header can leave
                    // the tape part way into the first header.
                    self.request_header(
                        ctx,
                        host,
                        unit,
                        motion,
                        position.saturating_sub(HEADER_WORDS),
                    );
                } else {
                    self.end_command(ctx, host, unit, completion.status);
                }
            }
        }
    }

    fn finish_transfer(
        &mut self,
        ctx: &Context,
        host: &mut dyn HostServices,
        unit: UnitNumber,
        completion: &IoCompletion,
    ) {
        event!(
            Level::DEBUG,
            "transfer finished with {:?}, {} bytes short, next address {:o}",
            completion.status,
            completion.count,
            completion.value
        );
        self.regs.byte_count = self
            .regs
            .byte_count
            .wrapping_sub((completion.count & 0xffff) as u16);
        self.regs
            .set_transfer_address(Address::wrapping_from(completion.value));
        self.end_command(ctx, host, unit, completion.status);
    }
}
