//! Workload parsing: the textual process description format.
//!
//! The format is a stream of whitespace-separated tokens; line breaks
//! carry no meaning. A header of `<num_procs> <quantum> <num_threads>`
//! is followed by one block per process:
//!
//! ```text
//! <name> <num_primitives> <priority> <thread>
//! <primitive>...
//! ```
//!
//! Primitive tokens are `HALT`, `DOOP n`, `LOOP n`, `END`, `BLOCK n`,
//! `SEND addr`, `RECV addr`, where `addr` is the packed peer address
//! `thread*100 + id`.

use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::process::Op;
use crate::types::{Addr, NodeId, Priority, MAX_NODES, MAX_PROCS_PER_NODE};

/// One parsed process description.
#[derive(Debug, Clone)]
pub struct ProcDef {
    pub name: String,
    pub priority: Priority,
    pub node: NodeId,
    pub code: Vec<Op>,
}

/// A complete parsed workload: simulation parameters plus the process
/// descriptions in input order.
#[derive(Debug, Clone)]
pub struct Workload {
    pub quantum: u32,
    pub nr_nodes: u32,
    pub procs: Vec<ProcDef>,
}

const MAX_NAME_LEN: usize = 10;

impl Workload {
    pub fn parse(input: &str) -> Result<Workload> {
        let mut tokens = input.split_ascii_whitespace();
        let mut next = |what: &str| {
            tokens
                .next()
                .with_context(|| format!("unexpected end of input, expecting {what}"))
        };

        let num_procs: usize = parse_token(next("number of processes")?, "number of processes")?;
        let quantum: u32 = parse_token(next("quantum")?, "quantum")?;
        let nr_nodes: u32 = parse_token(next("number of threads")?, "number of threads")?;

        if quantum == 0 {
            bail!("quantum must be at least 1");
        }
        if nr_nodes == 0 || nr_nodes > MAX_NODES {
            bail!("number of threads must be between 1 and {MAX_NODES}, got {nr_nodes}");
        }

        let mut procs = Vec::with_capacity(num_procs);
        let mut per_node = vec![0u32; nr_nodes as usize];
        for i in 0..num_procs {
            let name = next("process name")?;
            if name.len() > MAX_NAME_LEN {
                bail!("process {} name {name:?} exceeds {MAX_NAME_LEN} characters", i + 1);
            }
            let size: usize = parse_token(next("program size")?, "program size")
                .with_context(|| format!("in process {name:?}"))?;
            let priority: Priority = parse_token(next("priority")?, "priority")
                .with_context(|| format!("in process {name:?}"))?;
            let thread: u32 = parse_token(next("thread")?, "thread")
                .with_context(|| format!("in process {name:?}"))?;
            if thread == 0 || thread > nr_nodes {
                bail!("process {name:?} assigned to thread {thread}, valid range is 1..={nr_nodes}");
            }
            let count = &mut per_node[(thread - 1) as usize];
            *count += 1;
            if *count > MAX_PROCS_PER_NODE {
                bail!("thread {thread} holds more than {MAX_PROCS_PER_NODE} processes");
            }

            let mut code = Vec::with_capacity(size);
            for line in 1..=size {
                let op = next("operation")?;
                let mut arg = |what: &str| -> Result<u32> {
                    parse_token(next(what)?, what)
                        .with_context(|| format!("argument to {op} on line {line} in {name:?}"))
                };
                code.push(match op {
                    "HALT" => Op::Halt,
                    "DOOP" => Op::Doop(arg("compute duration")?),
                    "LOOP" => Op::Loop(arg("iteration count")?),
                    "END" => Op::End,
                    "BLOCK" => Op::Block(arg("block duration")?),
                    "SEND" => Op::Send(Addr(arg("peer address")?)),
                    "RECV" => Op::Recv(Addr(arg("peer address")?)),
                    other => bail!("unknown operation {other:?} on line {line} in {name:?}"),
                });
            }

            procs.push(ProcDef {
                name: name.to_string(),
                priority,
                node: NodeId(thread),
                code,
            });
        }

        Ok(Workload {
            quantum,
            nr_nodes,
            procs,
        })
    }
}

fn parse_token<T: FromStr>(token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| anyhow::anyhow!("expecting {what}, got {token:?}"))
}
