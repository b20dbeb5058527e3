//! Process model and primitive interpreter.
//!
//! Each simulated process carries a small program of primitives and a
//! loop-frame stack. The interpreter advances the instruction pointer
//! over LOOP/END bookkeeping transparently and stops on the next
//! effective primitive (DOOP, BLOCK, SEND, RECV) or HALT; the node
//! scheduler reacts to the classification.

use crate::types::{Addr, NodeId, Priority, ProcId, Tick};

/// One primitive in a process program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Terminate. Costs one tick when reached through the ready queue.
    Halt,
    /// Compute for the given number of ticks.
    Doop(u32),
    /// Open a loop running the body the given number of times.
    Loop(u32),
    /// Close the innermost loop.
    End,
    /// Sleep for the given number of ticks without consuming the CPU.
    Block(u32),
    /// Synchronous send to the process at the peer address.
    Send(Addr),
    /// Synchronous receive from the process at the peer address.
    Recv(Addr),
}

/// Scheduling state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    New,
    Ready,
    Running,
    Blocked,
    Finished,
}

/// What the interpreter stopped on after an advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// DOOP, BLOCK, SEND, or RECV.
    Effective,
    Halt,
    /// Malformed control flow: END with no open loop, or running off
    /// the end of the program.
    Error,
}

#[derive(Debug, Clone, Copy)]
struct LoopFrame {
    start: usize,
    remaining: u32,
}

/// Aggregate per-process counters reported in the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcCounters {
    pub doop_count: u32,
    /// Ticks of compute, including one setup tick per rendezvous.
    pub doop_time: u64,
    pub block_count: u32,
    pub block_time: u64,
    /// Times the process entered the ready queue.
    pub wait_count: u32,
    pub wait_time: u64,
    pub send_count: u32,
    pub recv_count: u32,
}

/// A simulated process: immutable program plus mutable runtime state.
pub struct Process {
    pub(crate) name: String,
    pub(crate) node: NodeId,
    pub(crate) priority: Priority,
    code: Vec<Op>,
    /// Per-node id, assigned at admission. Zero until then.
    pub(crate) id: ProcId,
    /// `None` until the first advance.
    ip: Option<usize>,
    loop_stack: Vec<LoopFrame>,
    /// Ticks remaining in the current primitive.
    pub(crate) duration: u64,
    pub(crate) state: ProcState,
    /// Tick at which the process last entered the ready queue.
    pub(crate) enqueue_time: Tick,
    /// Tick at which the process finished.
    pub(crate) finished_at: Tick,
    pub(crate) counters: ProcCounters,
}

impl Process {
    pub fn new(name: impl Into<String>, node: NodeId, priority: Priority, code: Vec<Op>) -> Self {
        Process {
            name: name.into(),
            node,
            priority,
            code,
            id: ProcId(0),
            ip: None,
            loop_stack: Vec::new(),
            duration: 0,
            state: ProcState::New,
            enqueue_time: 0,
            finished_at: 0,
            counters: ProcCounters::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn id(&self) -> ProcId {
        self.id
    }

    pub fn counters(&self) -> &ProcCounters {
        &self.counters
    }

    /// The process's own rendezvous address.
    pub fn addr(&self) -> Addr {
        Addr::new(self.node, self.id)
    }

    /// Key used when entering the ready queue: the declared priority,
    /// or the remaining duration when the priority is negative.
    pub(crate) fn effective_priority(&self) -> u64 {
        if self.priority >= 0 {
            self.priority as u64
        } else {
            self.duration
        }
    }

    /// The primitive at the instruction pointer. Only meaningful after
    /// an advance returned `Effective` or `Halt`.
    pub fn current_op(&self) -> Op {
        let ip = self.ip.expect("current_op before first advance");
        self.code[ip]
    }

    /// Advance the instruction pointer to the next effective primitive
    /// or HALT, executing LOOP/END bookkeeping and updating the
    /// compute/block/rendezvous counters along the way.
    pub fn advance(&mut self) -> StepKind {
        loop {
            let next = self.ip.map_or(0, |ip| ip + 1);
            self.ip = Some(next);
            let Some(op) = self.code.get(next).copied() else {
                return StepKind::Error;
            };
            match op {
                Op::Loop(n) => self.loop_stack.push(LoopFrame {
                    start: next,
                    remaining: n,
                }),
                Op::End => {
                    let Some(frame) = self.loop_stack.last_mut() else {
                        return StepKind::Error;
                    };
                    if frame.remaining > 1 {
                        frame.remaining -= 1;
                        self.ip = Some(frame.start);
                    } else {
                        self.loop_stack.pop();
                    }
                }
                Op::Doop(n) => {
                    self.counters.doop_count += 1;
                    self.counters.doop_time += u64::from(n);
                    return StepKind::Effective;
                }
                Op::Block(n) => {
                    self.counters.block_count += 1;
                    self.counters.block_time += u64::from(n);
                    return StepKind::Effective;
                }
                Op::Send(_) => {
                    self.counters.send_count += 1;
                    return StepKind::Effective;
                }
                Op::Recv(_) => {
                    self.counters.recv_count += 1;
                    return StepKind::Effective;
                }
                Op::Halt => return StepKind::Halt,
            }
        }
    }

    /// Whether the next effective primitive is HALT, without moving
    /// the instruction pointer, the loop stack, or any counter. Used
    /// by the termination probe on freshly unblocked processes.
    pub fn next_is_halt(&self) -> bool {
        let mut ip = self.ip.map_or(0, |ip| ip + 1);
        let mut stack = self.loop_stack.clone();
        loop {
            let Some(op) = self.code.get(ip).copied() else {
                return false;
            };
            match op {
                Op::Loop(n) => {
                    stack.push(LoopFrame {
                        start: ip,
                        remaining: n,
                    });
                    ip += 1;
                }
                Op::End => match stack.last_mut() {
                    Some(frame) if frame.remaining > 1 => {
                        frame.remaining -= 1;
                        ip = frame.start + 1;
                    }
                    Some(_) => {
                        stack.pop();
                        ip += 1;
                    }
                    None => return false,
                },
                Op::Halt => return true,
                Op::Doop(_) | Op::Block(_) | Op::Send(_) | Op::Recv(_) => return false,
            }
        }
    }
}
