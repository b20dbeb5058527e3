//! Dynamic-party tick barrier.
//!
//! All live nodes call [`TickBarrier::wait`] at the top of every tick,
//! which blocks until the full party has arrived and then releases the
//! generation. A node that finishes calls [`TickBarrier::leave`] to
//! drop out; the remaining nodes continue with the reduced party
//! count. A generation counter guards against spurious wakeups and
//! against a thread racing into the next round.

use std::sync::{Condvar, Mutex};

struct BarrierState {
    /// Number of live parties that must arrive to release a round.
    parties: u32,
    /// Parties currently blocked in `wait`.
    waiters: u32,
    generation: u64,
}

pub struct TickBarrier {
    mu: Mutex<BarrierState>,
    cv: Condvar,
}

impl TickBarrier {
    pub fn new(parties: u32) -> Self {
        TickBarrier {
            mu: Mutex::new(BarrierState {
                parties,
                waiters: 0,
                generation: 0,
            }),
            cv: Condvar::new(),
        }
    }

    /// Block until every live party has arrived.
    pub fn wait(&self) {
        let mut state = self.mu.lock().unwrap();
        let gen = state.generation;
        state.waiters += 1;
        if state.waiters == state.parties {
            state.generation += 1;
            state.waiters = 0;
            self.cv.notify_all();
        } else {
            while state.generation == gen {
                state = self.cv.wait(state).unwrap();
            }
        }
    }

    /// Drop out of the barrier. If the parties already waiting now
    /// complete the round, release them immediately.
    pub fn leave(&self) {
        let mut state = self.mu.lock().unwrap();
        state.parties -= 1;
        if state.waiters > 0 && state.waiters == state.parties {
            state.generation += 1;
            state.waiters = 0;
            self.cv.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_all_parties_released_together() {
        let barrier = Arc::new(TickBarrier::new(4));
        let arrived = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let barrier = Arc::clone(&barrier);
            let arrived = Arc::clone(&arrived);
            handles.push(thread::spawn(move || {
                arrived.fetch_add(1, Ordering::SeqCst);
                barrier.wait();
                // Nobody gets past the barrier until all four arrived.
                assert_eq!(arrived.load(Ordering::SeqCst), 4);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_rounds_advance_in_lockstep() {
        let barrier = Arc::new(TickBarrier::new(2));
        let rounds = 100;
        let a = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                for _ in 0..rounds {
                    barrier.wait();
                }
            })
        };
        for _ in 0..rounds {
            barrier.wait();
        }
        a.join().unwrap();
    }

    #[test]
    fn test_leave_releases_waiters() {
        let barrier = Arc::new(TickBarrier::new(2));
        let waiter = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
            })
        };
        // Give the waiter time to block, then drop out; the waiter
        // alone now completes the round.
        thread::sleep(std::time::Duration::from_millis(50));
        barrier.leave();
        waiter.join().unwrap();
    }

    #[test]
    fn test_leave_without_waiters() {
        let barrier = TickBarrier::new(2);
        barrier.leave();
        // Remaining single party must pass unblocked.
        barrier.wait();
        barrier.leave();
    }
}
