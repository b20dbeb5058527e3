//! Newtype wrappers and type aliases for domain concepts.
//!
//! Newtypes for identifiers (node IDs, process IDs, rendezvous
//! addresses) prevent silent type confusion. Type aliases for
//! quantities (ticks, priorities) provide self-documenting code
//! without the boilerplate of implementing arithmetic traits.

/// Maximum number of nodes the packed address space supports.
pub const MAX_NODES: u32 = 100;

/// Maximum number of processes admitted per node.
pub const MAX_PROCS_PER_NODE: u32 = 100;

/// Simulated node (logical CPU) identifier. 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Per-node process identifier. 1-based, assigned at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcId(pub u32);

/// Packed rendezvous address: `node * 100 + id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr(pub u32);

impl Addr {
    pub fn new(node: NodeId, id: ProcId) -> Self {
        Addr(node.0 * MAX_PROCS_PER_NODE + id.0)
    }

    /// Highest address the packing can produce: the 100th process of
    /// the 100th node.
    pub const MAX: Addr = Addr(MAX_NODES * MAX_PROCS_PER_NODE + MAX_PROCS_PER_NODE);

    // Process ids are 1-based and run up to MAX_PROCS_PER_NODE
    // inclusive, so an address that is an exact multiple of 100 is the
    // 100th process of the previous node, not process 0 of this one.

    pub fn node(self) -> NodeId {
        if self.0 % MAX_PROCS_PER_NODE == 0 {
            NodeId(self.0 / MAX_PROCS_PER_NODE - 1)
        } else {
            NodeId(self.0 / MAX_PROCS_PER_NODE)
        }
    }

    pub fn id(self) -> ProcId {
        match self.0 % MAX_PROCS_PER_NODE {
            0 => ProcId(MAX_PROCS_PER_NODE),
            id => ProcId(id),
        }
    }
}

/// Simulated time in ticks of the lock-step global clock.
pub type Tick = u64;

/// Declared scheduling priority. Lower wins; negative selects
/// remaining-duration ordering (shortest job first).
pub type Priority = i32;
