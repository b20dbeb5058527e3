//! Per-node preemptive priority scheduler.
//!
//! Each node owns a ready queue keyed by effective priority, a
//! blocked queue keyed by absolute wake tick, and a single running
//! slot, and drives them through the barrier-synchronized tick loop.
//! Processes move by value between the queues, the running slot, the
//! rendezvous fabric, and the global finished queue.

use tracing::{debug, info};

use crate::prio_queue::PrioQueue;
use crate::process::{Op, ProcState, Process, StepKind};
use crate::sim::Simulation;
use crate::trace::TraceState;
use crate::types::{NodeId, ProcId, Tick};

pub(crate) struct NodeScheduler<'sim> {
    sim: &'sim Simulation,
    node: NodeId,
    ready: PrioQueue<Box<Process>>,
    /// Keyed by absolute wake tick.
    blocked: PrioQueue<Box<Process>>,
    running: Option<Box<Process>>,
    quantum_left: u32,
    clock: Tick,
    next_proc_id: u32,
}

impl<'sim> NodeScheduler<'sim> {
    pub(crate) fn new(sim: &'sim Simulation, node: NodeId) -> Self {
        NodeScheduler {
            sim,
            node,
            ready: PrioQueue::new(),
            blocked: PrioQueue::new(),
            running: None,
            quantum_left: 0,
            clock: 0,
            next_proc_id: 1,
        }
    }

    fn emit(&self, proc: &Process, state: TraceState) {
        self.sim.record(self.clock, self.node, proc.id, state);
    }

    /// Admit a process: assign its id, advance to its first effective
    /// primitive, and queue it under the placement rule. A process
    /// whose first primitive is HALT (or whose program is malformed)
    /// finishes immediately.
    pub(crate) fn admit(&mut self, mut proc: Box<Process>) {
        proc.id = ProcId(self.next_proc_id);
        self.next_proc_id += 1;
        proc.state = ProcState::New;
        debug!(node = self.node.0, id = proc.id.0, name = proc.name(), "admit");
        self.emit(&proc, TraceState::New);

        match proc.advance() {
            StepKind::Halt | StepKind::Error => {
                self.finish(proc);
                return;
            }
            StepKind::Effective => {}
        }
        proc.duration = match proc.current_op() {
            Op::Doop(n) | Op::Block(n) => u64::from(n),
            _ => 1,
        };
        self.place(proc);
    }

    /// Mark a process finished at the current tick and hand it to the
    /// global finished queue.
    fn finish(&mut self, mut proc: Box<Process>) {
        proc.state = ProcState::Finished;
        proc.finished_at = self.clock;
        self.emit(&proc, TraceState::Finished);
        self.sim.push_finished(self.clock, proc);
    }

    /// Queue a process according to its current primitive. DOOP and
    /// HALT go to the ready queue and may run this tick; SEND/RECV go
    /// to the ready queue but only become dispatchable next tick (the
    /// rendezvous-initiating tick is not billed as waiting); BLOCK
    /// parks on the wake timer.
    fn place(&mut self, mut proc: Box<Process>) {
        match proc.current_op() {
            Op::Block(n) => {
                proc.state = ProcState::Blocked;
                let wake = self.clock + u64::from(n);
                self.emit(&proc, TraceState::Blocked);
                self.blocked.push(wake, proc);
            }
            Op::Send(_) | Op::Recv(_) => {
                proc.state = ProcState::Ready;
                proc.counters.wait_count += 1;
                proc.enqueue_time = self.clock + 1;
                let key = proc.effective_priority();
                self.emit(&proc, TraceState::Ready);
                self.ready.push(key, proc);
            }
            Op::Doop(_) | Op::Halt => {
                proc.state = ProcState::Ready;
                proc.counters.wait_count += 1;
                proc.enqueue_time = self.clock;
                let key = proc.effective_priority();
                self.emit(&proc, TraceState::Ready);
                self.ready.push(key, proc);
            }
            Op::Loop(_) | Op::End => self.finish(proc),
        }
    }

    /// Advance to the next effective primitive, reset the duration,
    /// and queue under the placement rule. Malformed control flow
    /// finishes the process; HALT costs one tick through the ready
    /// queue.
    fn advance_and_place(&mut self, mut proc: Box<Process>) {
        match proc.advance() {
            StepKind::Error => {
                self.finish(proc);
                return;
            }
            StepKind::Halt => proc.duration = 1,
            StepKind::Effective => {
                proc.duration = match proc.current_op() {
                    Op::Doop(n) | Op::Block(n) => u64::from(n),
                    _ => 1,
                };
            }
        }
        self.place(proc);
    }

    /// Return a preempted process to the ready queue at its current
    /// effective priority.
    fn preempt(&mut self, mut proc: Box<Process>) {
        debug!(node = self.node.0, id = proc.id.0, tick = self.clock, "preempt");
        proc.state = ProcState::Ready;
        proc.counters.wait_count += 1;
        proc.enqueue_time = self.clock;
        let key = proc.effective_priority();
        self.emit(&proc, TraceState::Ready);
        self.ready.push(key, proc);
    }

    /// One-shot priority refresh and initial selection before the
    /// first tick: re-key every admitted process under its current
    /// effective priority and move the minimum into the running slot.
    fn select_initial(&mut self) {
        if self.ready.is_empty() {
            return;
        }
        let mut rekeyed = PrioQueue::new();
        for proc in self.ready.drain() {
            let key = proc.effective_priority();
            rekeyed.push(key, proc);
        }
        let mut cur = rekeyed.pop().unwrap();
        while let Some(mut proc) = rekeyed.pop() {
            proc.counters.wait_count += 1;
            let key = proc.effective_priority();
            self.ready.push(key, proc);
        }
        self.quantum_left = self.sim.quantum;
        cur.state = ProcState::Running;
        self.emit(&cur, TraceState::Running);
        self.running = Some(cur);
    }

    /// Advance the running process by one tick and react to primitive
    /// completion or quantum expiry. Completion is checked first, so a
    /// rendezvous whose setup tick coincides with quantum expiry still
    /// posts; preemption never touches the fabric.
    fn dispatch_tick(&mut self) {
        let Some(mut cur) = self.running.take() else {
            return;
        };
        match cur.current_op() {
            Op::Send(peer) => {
                cur.duration = cur.duration.saturating_sub(1);
                self.quantum_left -= 1;
                cur.counters.doop_time += 1;
                if cur.duration == 0 {
                    cur.state = ProcState::Blocked;
                    self.emit(&cur, TraceState::BlockedSend);
                    self.sim.fabric.send(cur, peer, self.clock);
                } else if self.quantum_left == 0 {
                    self.preempt(cur);
                } else {
                    self.running = Some(cur);
                }
            }
            Op::Recv(peer) => {
                cur.duration = cur.duration.saturating_sub(1);
                self.quantum_left -= 1;
                cur.counters.doop_time += 1;
                if cur.duration == 0 {
                    cur.state = ProcState::Blocked;
                    self.emit(&cur, TraceState::BlockedRecv);
                    self.sim.fabric.recv(cur, peer, self.clock);
                } else if self.quantum_left == 0 {
                    self.preempt(cur);
                } else {
                    self.running = Some(cur);
                }
            }
            Op::Halt => {
                cur.duration = cur.duration.saturating_sub(1);
                self.quantum_left -= 1;
                if cur.duration == 0 {
                    self.finish(cur);
                } else if self.quantum_left == 0 {
                    self.preempt(cur);
                } else {
                    self.running = Some(cur);
                }
            }
            Op::Doop(_) | Op::Loop(_) | Op::End => {
                cur.duration = cur.duration.saturating_sub(1);
                self.quantum_left -= 1;
                if cur.duration == 0 {
                    self.advance_and_place(cur);
                } else if self.quantum_left == 0 {
                    self.preempt(cur);
                } else {
                    self.running = Some(cur);
                }
            }
            Op::Block(_) => unreachable!("BLOCK never occupies the running slot; place() parks it in blocked"),
        }
    }

    /// If the running slot is free and the ready head became
    /// dispatchable on or before this tick, start it and bill its
    /// queue wait.
    fn try_dispatch(&mut self) {
        if self.running.is_some() {
            return;
        }
        let dispatchable = matches!(self.ready.peek(), Some((_, head)) if head.enqueue_time <= self.clock);
        if !dispatchable {
            return;
        }
        let mut cur = self.ready.pop().unwrap();
        cur.counters.wait_time += self.clock - cur.enqueue_time;
        cur.state = ProcState::Running;
        self.quantum_left = self.sim.quantum;
        self.emit(&cur, TraceState::Running);
        self.running = Some(cur);
    }

    /// Nothing left to do locally and no rendezvous outstanding.
    fn quiescent(&self) -> bool {
        self.running.is_none()
            && self.ready.is_empty()
            && self.blocked.is_empty()
            && !self.sim.fabric.has_pending(self.clock)
    }

    /// Consume the final 1-tick HALT of a batch of unblocked processes
    /// whose next primitive is HALT when no other work remains
    /// anywhere: place them normally, take one more synchronized tick,
    /// then finish them in ready order.
    fn terminal_flush(&mut self, unblocked: Vec<Box<Process>>) {
        info!(node = self.node.0, tick = self.clock, count = unblocked.len(), "terminal flush");
        for proc in unblocked {
            self.advance_and_place(proc);
        }
        self.sim.barrier.wait();
        self.clock += 1;
        while let Some(proc) = self.ready.pop() {
            self.finish(proc);
        }
    }

    /// The barrier-synchronized tick loop. Runs until the node is
    /// quiescent, then drops out of the barrier.
    pub(crate) fn run(&mut self) {
        self.select_initial();
        loop {
            self.sim.barrier.wait();
            self.clock += 1;

            self.dispatch_tick();

            let unblocked = self.sim.fabric.drain_ready(self.node, self.clock);

            // Termination probe: if every freshly unblocked process is
            // about to HALT and nothing else remains anywhere, consume
            // their final tick together and exit.
            if !unblocked.is_empty()
                && unblocked.iter().all(|p| p.next_is_halt())
                && self.quiescent()
            {
                self.terminal_flush(unblocked);
                break;
            }

            for proc in unblocked {
                self.advance_and_place(proc);
            }

            // Wake expired sleepers.
            while let Some((wake, _)) = self.blocked.peek() {
                if wake > self.clock {
                    break;
                }
                let proc = self.blocked.pop().unwrap();
                self.advance_and_place(proc);
            }

            self.try_dispatch();

            if self.quiescent() {
                break;
            }
        }
        debug!(node = self.node.0, tick = self.clock, "node done");
        self.sim.barrier.leave();
    }
}
