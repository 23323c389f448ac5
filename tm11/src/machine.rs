//! A minimal host machine around one TM11.
//!
//! [`Machine`] plays the part of the rest of the computer: it owns the
//! host memory the controller transfers into, queues the controller's
//! backing-store requests and completes them after the configured
//! latency, and arbitrates interrupts.  Time advances only when the
//! caller asks for it, from one event to the next.
use std::cmp::min;
use std::time::Duration;

use tracing::{event, span, Level};

use unibus::prelude::*;

use super::clock::{BasicClock, Clock};
use super::config::ControllerConfiguration;
use super::context::Context;
use super::controller::Tm11;
use super::fault::ControllerFault;
use super::interrupts::{DeliveryAction, InterruptQueue, InterruptRequest};
use super::io::{HostServices, IoRequest};
use super::memory::HostMemory;
use super::scheduler::IoQueue;
use super::storage::TapeStorage;

/// The machine's side of [`HostServices`]: the queues into which the
/// controller's requests go.
#[derive(Debug)]
pub struct HostQueues {
    io: IoQueue,
    interrupts: InterruptQueue,
    io_latency: Duration,
    interrupt_latency: Duration,
    fault: Option<ControllerFault>,
}

impl HostQueues {
    pub fn new(config: &ControllerConfiguration) -> HostQueues {
        HostQueues {
            io: IoQueue::new(),
            interrupts: InterruptQueue::new(),
            io_latency: config.io_latency,
            interrupt_latency: config.interrupt_latency,
            fault: None,
        }
    }

    pub fn io(&self) -> &IoQueue {
        &self.io
    }

    pub fn interrupts(&self) -> &InterruptQueue {
        &self.interrupts
    }

    /// When the next queued event (completion or interrupt) is due.
    pub fn next_due(&self) -> Option<Duration> {
        match (self.io.next_due(), self.interrupts.next_due()) {
            (Some(a), Some(b)) => Some(min(a, b)),
            (a, b) => a.or(b),
        }
    }

    fn take_fault(&mut self) -> Result<(), ControllerFault> {
        match self.fault.take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

impl HostServices for HostQueues {
    fn request_backing_io(&mut self, ctx: &Context, request: IoRequest) {
        let due = ctx.simulated_time + self.io_latency;
        if let Err(fault) = self.io.push(request, due) {
            // Reported from the next call into the machine loop.
            self.fault.get_or_insert(fault);
        }
    }

    fn request_interrupt(&mut self, ctx: &Context, request: InterruptRequest) {
        self.interrupts
            .request(request, ctx.simulated_time + self.interrupt_latency);
    }

    fn cancel_interrupt(&mut self, level: PriorityLevel, vector: Vector) {
        self.interrupts.cancel(level, vector);
    }
}

pub struct Machine<S: TapeStorage, M: HostMemory> {
    controller: Tm11,
    host: HostQueues,
    storage: S,
    memory: M,
    clock: BasicClock,
}

impl<S: TapeStorage, M: HostMemory> Machine<S, M> {
    pub fn new(config: ControllerConfiguration, storage: S, memory: M) -> Machine<S, M> {
        let host = HostQueues::new(&config);
        Machine {
            controller: Tm11::new(config),
            host,
            storage,
            memory,
            clock: BasicClock::new(),
        }
    }

    pub fn controller(&self) -> &Tm11 {
        &self.controller
    }

    pub fn host(&self) -> &HostQueues {
        &self.host
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    fn context(&self) -> Context {
        Context::at(self.clock.now())
    }

    pub fn bus_read(&mut self, address: Address) -> Result<u16, BusFault> {
        let ctx = self.context();
        self.controller
            .access(&ctx, address, Access::Read, &mut self.host)
    }

    pub fn bus_write(&mut self, address: Address, width: Width, value: u16) -> Result<(), BusFault> {
        let ctx = self.context();
        self.controller
            .access(&ctx, address, Access::Write(width, value), &mut self.host)
            .map(|_| ())
    }

    /// When the next event is due, if anything is waiting to happen.
    pub fn next_event_due(&self) -> Option<Duration> {
        self.host.next_due()
    }

    /// The next time at which running the machine would change
    /// something.  An interrupt which is already due but masked does
    /// not count.
    fn next_progress(&self) -> Option<Duration> {
        let now = self.now();
        let io = self.host.io.next_due();
        let interrupt = self.host.interrupts.next_due().filter(|due| *due > now);
        match (io, interrupt) {
            (Some(a), Some(b)) => Some(min(a, b)),
            (a, b) => a.or(b),
        }
    }

    /// Complete every backing-store request due at or before
    /// `deadline`, in order, then advance the clock to `deadline`.
    pub fn run_until(&mut self, deadline: Duration) -> Result<(), ControllerFault> {
        self.host.take_fault()?;
        while let Some(due) = self.host.io.next_due() {
            if due > deadline {
                break;
            }
            self.clock.advance_to(due);
            let ctx = self.context();
            let tick_span = span!(Level::INFO, "tick", t=?ctx.simulated_time);
            let _enter = tick_span.enter();
            let Some(request) = self.host.io.pop_due(ctx.simulated_time) else {
                break;
            };
            let completion = self.storage.perform(&request, &mut self.memory);
            event!(Level::TRACE, "{request} completed: {completion:?}");
            self.controller
                .complete_io(&ctx, completion, &mut self.host)?;
            self.host.take_fault()?;
        }
        self.clock.advance_to(deadline);
        Ok(())
    }

    /// Hand over the interrupt the processor, running at
    /// `processor_level`, would take now.  Interrupts whose delivery
    /// action declines them are dropped.
    pub fn take_interrupt(&mut self, processor_level: PriorityLevel) -> Option<Vector> {
        let now = self.clock.now();
        while let Some(pending) = self.host.interrupts.take_deliverable(now, processor_level) {
            let accepted = match pending.request.on_deliver {
                None => true,
                Some(DeliveryAction::CommandEnd) => self.controller.command_end(),
            };
            if accepted {
                event!(
                    Level::DEBUG,
                    "delivering interrupt at {} vector {}",
                    pending.request.level,
                    pending.request.vector
                );
                return Some(pending.request.vector);
            }
            event!(
                Level::DEBUG,
                "interrupt at vector {} dropped because interrupts are now disabled",
                pending.request.vector
            );
        }
        None
    }

    /// Run until an interrupt is delivered, returning its vector, or
    /// until there is nothing left to happen, returning `None`.
    pub fn wait_for_interrupt(
        &mut self,
        processor_level: PriorityLevel,
    ) -> Result<Option<Vector>, ControllerFault> {
        loop {
            if let Some(vector) = self.take_interrupt(processor_level) {
                return Ok(Some(vector));
            }
            match self.next_progress() {
                Some(due) => self.run_until(due)?,
                None => return Ok(None),
            }
        }
    }

    /// Run until the controller is ready again (for a command issued
    /// with interrupts disabled) or the command-complete interrupt is
    /// delivered.  Returns the vector of any interrupt delivered.
    pub fn wait_for_ready(
        &mut self,
        processor_level: PriorityLevel,
    ) -> Result<Option<Vector>, ControllerFault> {
        loop {
            if let Some(vector) = self.take_interrupt(processor_level) {
                return Ok(Some(vector));
            }
            if self.controller.registers().command.ready {
                return Ok(None);
            }
            match self.next_progress() {
                Some(due) => self.run_until(due)?,
                // Busy, but only a masked interrupt would finish it.
                None => return Ok(None),
            }
        }
    }
}
