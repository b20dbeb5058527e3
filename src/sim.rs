//! Simulation driver: shared state, worker spawning, and the summary.
//!
//! A [`Simulation`] owns everything the node workers share: the tick
//! barrier, the rendezvous fabric, the finished queue, and the trace.
//! One scoped thread per node admits that node's processes in input
//! order, synchronizes once so every admission is visible at tick
//! zero, and runs the tick loop.

use std::io::Write;
use std::sync::Mutex;
use std::thread;

use tracing::info;

use crate::barrier::TickBarrier;
use crate::fabric::Fabric;
use crate::node::NodeScheduler;
use crate::prio_queue::PrioQueue;
use crate::process::Process;
use crate::summary::ProcSummary;
use crate::trace::{Trace, TraceEvent, TraceState};
use crate::types::{NodeId, ProcId, Tick, MAX_NODES, MAX_PROCS_PER_NODE};
use crate::workload::Workload;

/// Shared state of one simulation run, borrowed by every node worker.
pub struct Simulation {
    pub(crate) quantum: u32,
    pub(crate) barrier: TickBarrier,
    pub(crate) fabric: Fabric,
    finished: Mutex<PrioQueue<Box<Process>>>,
    trace: Trace,
}

/// Everything a finished run produced: the recorded trace and the
/// per-process summaries in (time, node, id) order.
pub struct SimReport {
    pub trace: Trace,
    pub summaries: Vec<ProcSummary>,
}

impl Simulation {
    /// Run a workload to completion. Trace lines are echoed to `sink`
    /// as they happen when one is given; the recorded trace is
    /// returned either way.
    pub fn run(workload: Workload, sink: Option<Box<dyn Write + Send>>) -> SimReport {
        let Workload {
            quantum,
            nr_nodes,
            procs,
        } = workload;
        assert!(quantum >= 1, "quantum must be at least 1");
        assert!(
            nr_nodes >= 1 && nr_nodes <= MAX_NODES,
            "node count {nr_nodes} out of range"
        );

        info!(nodes = nr_nodes, procs = procs.len(), quantum, "starting simulation");

        let sim = Simulation {
            quantum,
            barrier: TickBarrier::new(nr_nodes),
            fabric: Fabric::new(),
            finished: Mutex::new(PrioQueue::new()),
            trace: match sink {
                Some(sink) => Trace::with_sink(sink),
                None => Trace::new(),
            },
        };

        // Partition processes by declared node, preserving input order
        // within each node (admission order determines ids).
        let mut per_node: Vec<Vec<Box<Process>>> = (0..nr_nodes).map(|_| Vec::new()).collect();
        for def in procs {
            assert!(
                def.node.0 >= 1 && def.node.0 <= nr_nodes,
                "process {:?} assigned to unknown node {}",
                def.name,
                def.node.0
            );
            per_node[(def.node.0 - 1) as usize].push(Box::new(Process::new(
                def.name,
                def.node,
                def.priority,
                def.code,
            )));
        }

        thread::scope(|scope| {
            for (i, batch) in per_node.into_iter().enumerate() {
                let sim = &sim;
                scope.spawn(move || {
                    let node = NodeId(i as u32 + 1);
                    let mut sched = NodeScheduler::new(sim, node);
                    for proc in batch {
                        sched.admit(proc);
                    }
                    // All nodes finish admission before the first tick.
                    sim.barrier.wait();
                    sched.run();
                });
            }
        });

        let Simulation {
            finished, trace, ..
        } = sim;
        let mut finished = finished.into_inner().unwrap();
        let mut summaries = Vec::with_capacity(finished.len());
        while let Some(proc) = finished.pop() {
            summaries.push(ProcSummary::of(&proc));
        }
        info!(finished = summaries.len(), "simulation complete");

        SimReport { trace, summaries }
    }

    pub(crate) fn record(&self, time: Tick, node: NodeId, proc: ProcId, state: TraceState) {
        self.trace.record(TraceEvent {
            time,
            node,
            proc,
            state,
        });
    }

    /// Enqueue a finished process under the deterministic summary
    /// order key (time, node, id).
    pub(crate) fn push_finished(&self, clock: Tick, proc: Box<Process>) {
        let key = clock * u64::from(MAX_NODES * MAX_PROCS_PER_NODE)
            + u64::from(proc.node.0 * MAX_PROCS_PER_NODE + proc.id.0);
        self.finished.lock().unwrap().push(key, proc);
    }
}
