//! Per-process accounting reported after the simulation.

use std::fmt;

use crate::process::Process;
use crate::types::{NodeId, ProcId, Tick};

/// Final accounting for one finished process, printed as
/// `| TTTTT | Proc NN.II | Run R, Block B, Wait W, Sends S, Recvs V`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSummary {
    pub finished_at: Tick,
    pub node: NodeId,
    pub id: ProcId,
    /// Ticks of compute, including one setup tick per rendezvous.
    pub run_time: u64,
    pub block_time: u64,
    pub wait_time: u64,
    pub sends: u32,
    pub recvs: u32,
}

impl ProcSummary {
    pub(crate) fn of(proc: &Process) -> Self {
        ProcSummary {
            finished_at: proc.finished_at,
            node: proc.node,
            id: proc.id,
            run_time: proc.counters.doop_time,
            block_time: proc.counters.block_time,
            wait_time: proc.counters.wait_time,
            sends: proc.counters.send_count,
            recvs: proc.counters.recv_count,
        }
    }
}

impl fmt::Display for ProcSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {:05} | Proc {:02}.{:02} | Run {}, Block {}, Wait {}, Sends {}, Recvs {}",
            self.finished_at,
            self.node.0,
            self.id.0,
            self.run_time,
            self.block_time,
            self.wait_time,
            self.sends,
            self.recvs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_format() {
        let summary = ProcSummary {
            finished_at: 4,
            node: NodeId(1),
            id: ProcId(1),
            run_time: 3,
            block_time: 0,
            wait_time: 0,
            sends: 0,
            recvs: 0,
        };
        assert_eq!(
            summary.to_string(),
            "| 00004 | Proc 01.01 | Run 3, Block 0, Wait 0, Sends 0, Recvs 0"
        );
    }

    #[test]
    fn test_summary_line_wide_fields() {
        let summary = ProcSummary {
            finished_at: 123,
            node: NodeId(12),
            id: ProcId(34),
            run_time: 17,
            block_time: 5,
            wait_time: 9,
            sends: 2,
            recvs: 1,
        };
        assert_eq!(
            summary.to_string(),
            "| 00123 | Proc 12.34 | Run 17, Block 5, Wait 9, Sends 2, Recvs 1"
        );
    }
}
