//! Cross-node rendezvous fabric.
//!
//! Synchronous message passing between processes identified by packed
//! addresses. A send/recv pair agrees on a single slot because both
//! sides index by the SENDER's address: a sender parks in (or matches
//! at) its own slot, a receiver parks in (or matches at) the slot of
//! the sender it expects.
//!
//! A completed rendezvous publishes both processes to a staging list,
//! stamped with the tick of publication. A node drains its own staged
//! processes at the top of each tick body; only entries published on
//! an earlier tick are handed out, so a rendezvous completed on tick T
//! becomes visible on tick T+1 regardless of how the worker threads
//! interleave within a tick.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::process::Process;
use crate::types::{Addr, NodeId, ProcId, Tick};

/// A process parked in a slot, together with the peer address it
/// targets (sender) or expects (receiver).
struct Waiter {
    proc: Box<Process>,
    peer: Addr,
}

#[derive(Default)]
struct Slot {
    sender: Option<Waiter>,
    receiver: Option<Waiter>,
}

struct Staged {
    node: NodeId,
    id: ProcId,
    staged_at: Tick,
    proc: Box<Process>,
}

pub struct Fabric {
    slots: Vec<Mutex<Slot>>,
    staging: Mutex<Vec<Staged>>,
    /// Number of processes parked in slots. Decremented only after a
    /// matched pair has been staged, so a reader that observes zero
    /// waiters (before inspecting staging) also observes the staged
    /// pair.
    waiters: AtomicUsize,
}

impl Fabric {
    pub fn new() -> Self {
        // One slot per packed address, the highest one included.
        let nr_slots = Addr::MAX.0 as usize + 1;
        Fabric {
            slots: (0..nr_slots).map(|_| Mutex::new(Slot::default())).collect(),
            staging: Mutex::new(Vec::new()),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Complete or park a send targeting `peer`. If the addressed
    /// receiver is already parked in the sender's slot, both processes
    /// are staged; otherwise the sender parks.
    pub fn send(&self, sender: Box<Process>, peer: Addr, now: Tick) {
        let my_addr = sender.addr();
        let mut slot = self.slots[my_addr.0 as usize].lock().unwrap();
        match slot.receiver.take() {
            Some(waiter) if waiter.peer == my_addr => {
                debug!(
                    sender = my_addr.0,
                    receiver = waiter.proc.addr().0,
                    tick = now,
                    "rendezvous complete"
                );
                self.stage(now, waiter.proc, sender);
                self.waiters.fetch_sub(1, Ordering::SeqCst);
            }
            other => {
                slot.receiver = other;
                slot.sender = Some(Waiter { proc: sender, peer });
                self.waiters.fetch_add(1, Ordering::SeqCst);
                debug!(sender = my_addr.0, peer = peer.0, tick = now, "sender parked");
            }
        }
    }

    /// Complete or park a receive expecting the sender at `peer`. If
    /// that sender is parked and targets this receiver, both processes
    /// are staged; otherwise the receiver parks in the sender's slot.
    pub fn recv(&self, receiver: Box<Process>, peer: Addr, now: Tick) {
        let my_addr = receiver.addr();
        let mut slot = self.slots[peer.0 as usize].lock().unwrap();
        match slot.sender.take() {
            Some(waiter) if waiter.peer == my_addr => {
                debug!(
                    sender = peer.0,
                    receiver = my_addr.0,
                    tick = now,
                    "rendezvous complete"
                );
                self.stage(now, waiter.proc, receiver);
                self.waiters.fetch_sub(1, Ordering::SeqCst);
            }
            other => {
                slot.sender = other;
                slot.receiver = Some(Waiter {
                    proc: receiver,
                    peer,
                });
                self.waiters.fetch_add(1, Ordering::SeqCst);
                debug!(receiver = my_addr.0, peer = peer.0, tick = now, "receiver parked");
            }
        }
    }

    fn stage(&self, now: Tick, a: Box<Process>, b: Box<Process>) {
        let mut staging = self.staging.lock().unwrap();
        for proc in [a, b] {
            staging.push(Staged {
                node: proc.node,
                id: proc.id,
                staged_at: now,
                proc,
            });
        }
    }

    /// Take the staged processes belonging to `node` that were
    /// published before tick `now`, sorted by process id. Entries for
    /// other nodes (and entries published this tick) stay.
    pub fn drain_ready(&self, node: NodeId, now: Tick) -> Vec<Box<Process>> {
        let mut staging = self.staging.lock().unwrap();
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(staging.len());
        for entry in staging.drain(..) {
            if entry.node == node && entry.staged_at < now {
                taken.push(entry);
            } else {
                kept.push(entry);
            }
        }
        *staging = kept;
        drop(staging);

        taken.sort_by_key(|entry| entry.id);
        taken.into_iter().map(|entry| entry.proc).collect()
    }

    /// Whether any rendezvous work is outstanding at tick `now`: a
    /// parked waiter, or a pair staged this tick (not yet drainable).
    /// Pairs staged on earlier ticks are their owning node's work for
    /// the current tick and are not reported.
    pub fn has_pending(&self, now: Tick) -> bool {
        if self.waiters.load(Ordering::SeqCst) > 0 {
            return true;
        }
        self.staging
            .lock()
            .unwrap()
            .iter()
            .any(|entry| entry.staged_at == now)
    }
}

impl Default for Fabric {
    fn default() -> Self {
        Self::new()
    }
}
