//! Trace recording and the per-transition output format.
//!
//! Every process state transition is recorded as a [`TraceEvent`] and,
//! when a sink is attached, echoed as one line in the form
//! `[NN] TTTTT: process I <state>`. The record lock makes each line
//! atomic across the node worker threads.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use crate::types::{NodeId, ProcId, Tick};

/// The scheduling state named by a trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    New,
    Ready,
    Running,
    /// Blocked on the sleep timer.
    Blocked,
    BlockedSend,
    BlockedRecv,
    Finished,
}

impl TraceState {
    pub fn label(self) -> &'static str {
        match self {
            TraceState::New => "new",
            TraceState::Ready => "ready",
            TraceState::Running => "running",
            TraceState::Blocked => "blocked",
            TraceState::BlockedSend => "blocked (send)",
            TraceState::BlockedRecv => "blocked (recv)",
            TraceState::Finished => "finished",
        }
    }
}

impl fmt::Display for TraceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    pub time: Tick,
    pub node: NodeId,
    pub proc: ProcId,
    pub state: TraceState,
}

impl TraceEvent {
    /// The transition formatted as an output line (without newline).
    pub fn line(&self) -> String {
        format!(
            "[{:02}] {:05}: process {} {}",
            self.node.0, self.time, self.proc.0, self.state
        )
    }
}

struct TraceInner {
    events: Vec<TraceEvent>,
    sink: Option<Box<dyn Write + Send>>,
}

/// A complete simulation trace, shared by all node workers.
pub struct Trace {
    inner: Mutex<TraceInner>,
}

impl Trace {
    pub fn new() -> Self {
        Trace {
            inner: Mutex::new(TraceInner {
                events: Vec::new(),
                sink: None,
            }),
        }
    }

    /// A trace that also echoes each line to `sink` as it is recorded.
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Trace {
            inner: Mutex::new(TraceInner {
                events: Vec::new(),
                sink: Some(sink),
            }),
        }
    }

    pub(crate) fn record(&self, event: TraceEvent) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(sink) = inner.sink.as_mut() {
            let _ = writeln!(sink, "{}", event.line());
        }
        inner.events.push(event);
    }

    /// All recorded events, in record order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// The events of a single node, in that node's tick order.
    pub fn for_node(&self, node: NodeId) -> Vec<TraceEvent> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.node == node)
            .copied()
            .collect()
    }

    /// The (tick, state) history of one process.
    pub fn for_proc(&self, node: NodeId, proc: ProcId) -> Vec<(Tick, TraceState)> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.node == node && e.proc == proc)
            .map(|e| (e.time, e.state))
            .collect()
    }

    /// How many times a process was recorded in the given state.
    pub fn state_count(&self, node: NodeId, proc: ProcId, state: TraceState) -> usize {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.node == node && e.proc == proc && e.state == state)
            .count()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}
