//! Single-node scheduling scenarios: placement, preemption, priority
//! ordering, timers, and loop control.

mod common;

use common::{assert_accounting, run_workload, summary_lines};
use schedsim::{NodeId, ProcId, TraceState};

use schedsim::TraceState::{Blocked, Finished, New, Ready, Running};

#[test]
fn test_single_doop_process() {
    let report = run_workload("1 5 1\np 2 0 1\nDOOP 3\nHALT\n");

    assert_eq!(
        report.trace.for_proc(NodeId(1), ProcId(1)),
        vec![
            (0, New),
            (0, Ready),
            (0, Running),
            (3, Ready),
            (3, Running),
            (4, Finished),
        ]
    );
    assert_eq!(
        summary_lines(&report),
        vec!["| 00004 | Proc 01.01 | Run 3, Block 0, Wait 0, Sends 0, Recvs 0"]
    );
}

#[test]
fn test_two_processes_round_robin() {
    let report = run_workload("2 2 1\na 2 0 1\nDOOP 5\nHALT\nb 2 0 1\nDOOP 5\nHALT\n");

    // Quantum 2 alternation: a runs [1,2], b [3,4], a [5,6], b [7,8],
    // then the 1-tick DOOP tails and HALTs interleave.
    assert_eq!(
        report.trace.for_proc(NodeId(1), ProcId(1)),
        vec![
            (0, New),
            (0, Ready),
            (0, Running),
            (2, Ready),
            (4, Running),
            (6, Ready),
            (8, Running),
            (9, Ready),
            (10, Running),
            (11, Finished),
        ]
    );
    assert_eq!(
        report.trace.for_proc(NodeId(1), ProcId(2)),
        vec![
            (0, New),
            (0, Ready),
            (2, Running),
            (4, Ready),
            (6, Running),
            (8, Ready),
            (9, Running),
            (10, Ready),
            (11, Running),
            (12, Finished),
        ]
    );
    assert_eq!(
        summary_lines(&report),
        vec![
            "| 00011 | Proc 01.01 | Run 5, Block 0, Wait 5, Sends 0, Recvs 0",
            "| 00012 | Proc 01.02 | Run 5, Block 0, Wait 6, Sends 0, Recvs 0",
        ]
    );
    assert_accounting(&report);
}

#[test]
fn test_priority_orders_execution() {
    let report = run_workload("2 3 1\np1 2 10 1\nDOOP 10\nHALT\np2 2 1 1\nDOOP 2\nHALT\n");

    // The priority-1 process runs to completion before the
    // priority-10 process gets the CPU at all.
    let p1 = &report.summaries[1];
    let p2 = &report.summaries[0];
    assert_eq!(p2.id, ProcId(2));
    assert_eq!(p2.finished_at, 3);
    assert_eq!(p2.wait_time, 0);
    assert_eq!(p1.id, ProcId(1));
    assert_eq!(p1.finished_at, 14);
    assert_eq!(p1.wait_time, 3);

    let p1_first_run = report
        .trace
        .for_proc(NodeId(1), ProcId(1))
        .iter()
        .find(|(_, s)| *s == Running)
        .map(|(t, _)| *t);
    assert_eq!(p1_first_run, Some(3));
}

#[test]
fn test_negative_priority_runs_shortest_first() {
    let report = run_workload("2 3 1\np1 2 -1 1\nDOOP 5\nHALT\np2 2 -1 1\nDOOP 2\nHALT\n");

    // Negative priority keys the ready queue by remaining duration,
    // so the 2-tick job beats the 5-tick job despite admission order.
    assert_eq!(report.summaries[0].id, ProcId(2));
    assert_eq!(report.summaries[0].finished_at, 3);
    assert_eq!(report.summaries[1].id, ProcId(1));
    assert_eq!(report.summaries[1].finished_at, 9);
    assert_accounting(&report);
}

#[test]
fn test_block_timer() {
    let report = run_workload("1 5 1\np 4 0 1\nDOOP 1\nBLOCK 3\nDOOP 1\nHALT\n");

    assert_eq!(
        report.trace.for_proc(NodeId(1), ProcId(1)),
        vec![
            (0, New),
            (0, Ready),
            (0, Running),
            (1, Blocked),
            (4, Ready),
            (4, Running),
            (5, Ready),
            (5, Running),
            (6, Finished),
        ]
    );
    assert_eq!(
        summary_lines(&report),
        vec!["| 00006 | Proc 01.01 | Run 2, Block 3, Wait 0, Sends 0, Recvs 0"]
    );
}

#[test]
fn test_quantum_one_slices_every_tick() {
    let report = run_workload("1 1 1\np 2 0 1\nDOOP 3\nHALT\n");

    // A 3-tick DOOP under quantum 1 is preempted after every tick but
    // re-dispatched immediately (it is alone), so timing matches the
    // generous-quantum run while the ready queue churns.
    let history = report.trace.for_proc(NodeId(1), ProcId(1));
    assert_eq!(history.last(), Some(&(4, Finished)));
    let preemptions = history
        .iter()
        .filter(|(t, s)| *s == Ready && (1..=2).contains(t))
        .count();
    assert_eq!(preemptions, 2);
    assert_eq!(
        summary_lines(&report),
        vec!["| 00004 | Proc 01.01 | Run 3, Block 0, Wait 0, Sends 0, Recvs 0"]
    );
}

#[test]
fn test_loop_executes_body_repeatedly() {
    let report = run_workload("1 5 1\np 4 0 1\nLOOP 3\nDOOP 1\nEND\nHALT\n");

    assert_eq!(
        summary_lines(&report),
        vec!["| 00004 | Proc 01.01 | Run 3, Block 0, Wait 0, Sends 0, Recvs 0"]
    );
}

#[test]
fn test_nested_loops_multiply() {
    let report = run_workload("1 5 1\np 6 0 1\nLOOP 2\nLOOP 2\nDOOP 1\nEND\nEND\nHALT\n");

    assert_eq!(
        summary_lines(&report),
        vec!["| 00005 | Proc 01.01 | Run 4, Block 0, Wait 0, Sends 0, Recvs 0"]
    );
}

#[test]
fn test_immediate_halt_finishes_at_admission() {
    let report = run_workload("1 5 1\np 1 0 1\nHALT\n");

    assert_eq!(
        report.trace.for_proc(NodeId(1), ProcId(1)),
        vec![(0, New), (0, Finished)]
    );
    assert_eq!(
        summary_lines(&report),
        vec!["| 00000 | Proc 01.01 | Run 0, Block 0, Wait 0, Sends 0, Recvs 0"]
    );
}

#[test]
fn test_malformed_control_flow_finishes_process() {
    // END with no open loop: the process is declared finished and the
    // rest of the simulation continues.
    let report = run_workload("2 5 1\nbad 2 0 1\nEND\nHALT\nok 2 0 1\nDOOP 2\nHALT\n");

    assert_eq!(
        report.trace.for_proc(NodeId(1), ProcId(1)),
        vec![(0, New), (0, Finished)]
    );
    let ok = report.summaries.iter().find(|s| s.id == ProcId(2)).unwrap();
    assert_eq!(ok.run_time, 2);
    assert_eq!(ok.finished_at, 3);
}

#[test]
fn test_summary_order_is_time_then_id() {
    // Two processes finishing at different times come out in finish
    // order regardless of admission order.
    let report = run_workload("2 3 1\nslow 2 5 1\nDOOP 6\nHALT\nfast 2 1 1\nDOOP 1\nHALT\n");

    let ids: Vec<u32> = report.summaries.iter().map(|s| s.id.0).collect();
    assert_eq!(ids, vec![2, 1]);
    assert!(report.summaries[0].finished_at <= report.summaries[1].finished_at);
}

#[test]
fn test_determinism_across_runs() {
    let input = "2 2 1\na 2 0 1\nDOOP 5\nHALT\nb 2 0 1\nDOOP 5\nHALT\n";
    let first = run_workload(input);
    let second = run_workload(input);

    assert_eq!(first.trace.events(), second.trace.events());
    assert_eq!(summary_lines(&first), summary_lines(&second));
}
