//! schedsim - Deterministic discrete-time multi-node process
//! scheduling simulator.
//!
//! Each simulated node (a logical CPU) runs on its own worker thread
//! and independently schedules a local set of processes whose programs
//! are small primitive sequences: compute (DOOP), timed sleep (BLOCK),
//! loop control (LOOP/END), synchronous cross-node rendezvous
//! (SEND/RECV), and terminate (HALT). Nodes advance a shared logical
//! clock in lock-step through a tick barrier and exchange rendezvous
//! messages through a process-global fabric.
//!
//! # Architecture
//!
//! - **Node scheduler**: per-node preemptive priority scheduling with
//!   a time quantum, a ready queue, a wake-timer queue, and a single
//!   running slot
//! - **Fabric**: slot-per-address rendezvous table plus a staging list
//!   that hands completed pairs back to their nodes
//! - **Barrier**: dynamic-party tick barrier; finished nodes drop out
//! - **Trace**: every state transition, recorded and optionally echoed
//!   in the `[NN] TTTTT: process I <state>` line format
//!
//! # Usage
//!
//! ```rust,no_run
//! use schedsim::{Simulation, Workload};
//!
//! let workload = Workload::parse("1 5 1\np 2 0 1\nDOOP 3\nHALT\n")?;
//! let report = Simulation::run(workload, None);
//! for summary in &report.summaries {
//!     println!("{summary}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod barrier;
pub mod fabric;
mod node;
pub mod prio_queue;
pub mod process;
pub mod sim;
pub mod summary;
pub mod trace;
pub mod types;
pub mod workload;

// Re-export the main public types for convenience.
pub use prio_queue::PrioQueue;
pub use process::{Op, ProcCounters, ProcState, Process, StepKind};
pub use sim::{SimReport, Simulation};
pub use summary::ProcSummary;
pub use trace::{Trace, TraceEvent, TraceState};
pub use types::{Addr, NodeId, Priority, ProcId, Tick, MAX_NODES, MAX_PROCS_PER_NODE};
pub use workload::{ProcDef, Workload};
