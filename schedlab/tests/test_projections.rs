//! Projection rendering tests: one synthetic event sequence, checked
//! against every mode's CSV schema and gating rules.

use schedlab::aggregates::TaskTable;
use schedlab::cli::Mode;
use schedlab::domain::{CpuId, Pid};
use schedlab::events::{EventKind, ForkInfo, SwitchInfo, TraceEvent};
use schedlab::output::{header_line, Renderer};
use schedlab::tracing::Consumer;

fn basic(ts_ns: u64, pid: u32, comm: &str, kind: EventKind) -> TraceEvent {
    TraceEvent { ts_ns, pid: Pid(pid), comm: comm.to_string(), kind }
}

fn switch(ts_ns: u64, prev: u32, next: u32, run_ns: u64, wait_ns: u64) -> TraceEvent {
    TraceEvent {
        ts_ns,
        pid: Pid(next),
        comm: format!("task{next}"),
        kind: EventKind::Switch(SwitchInfo {
            prev_pid: Pid(prev),
            next_pid: Pid(next),
            prev_comm: format!("task{prev}"),
            next_comm: format!("task{next}"),
            run_ns,
            wait_ns,
            prev_cpu: CpuId(1),
            next_cpu: CpuId(1),
        }),
    }
}

fn fork(ts_ns: u64, parent: u32, child: u32) -> TraceEvent {
    TraceEvent {
        ts_ns,
        pid: Pid(parent),
        comm: format!("task{parent}"),
        kind: EventKind::Fork(ForkInfo {
            parent_pid: Pid(parent),
            child_pid: Pid(child),
            parent_comm: format!("task{parent}"),
            child_comm: format!("task{child}"),
        }),
    }
}

/// exec(7) → wake(7) → alert(7) → switch(1→7) → switch(7→1) → fork(7→8) → exit(7)
fn fixture() -> Vec<TraceEvent> {
    vec![
        basic(1_000_000, 7, "worker", EventKind::Exec),
        basic(2_000_000, 7, "worker", EventKind::Wake),
        basic(3_000_000, 7, "worker", EventKind::WaitAlert),
        switch(3_000_000, 1, 7, 500_000, 1_000_000),
        switch(9_000_000, 7, 1, 6_000_000, 0),
        fork(9_500_000, 7, 8),
        basic(10_000_000, 7, "worker", EventKind::Exit),
    ]
}

fn run_mode(mode: Mode, csv: bool, csv_header: bool) -> String {
    let renderer = Renderer::new(mode, csv, csv_header, Vec::new());
    let mut consumer = Consumer::new(renderer);
    for event in fixture() {
        consumer.handle(&event).unwrap();
    }
    String::from_utf8(consumer.into_writer()).unwrap()
}

fn rows(output: &str) -> Vec<&str> {
    output.lines().collect()
}

#[test]
fn stream_csv_covers_every_event() {
    let out = run_mode(Mode::Stream, true, false);
    let rows = rows(&out);
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0], "1000000,exec,7,worker,,,,");
    assert_eq!(rows[3], "3000000,switch,7,task7,1,7,500000,1000000");
    assert_eq!(rows[6], "10000000,exit,7,worker,,,,");
}

#[test]
fn stream_csv_non_switch_rows_leave_switch_columns_empty() {
    let out = run_mode(Mode::Stream, true, false);
    for row in rows(&out) {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 8, "schema is 8 columns: {row}");
        if fields[1] != "switch" {
            assert!(fields[4..].iter().all(|f| f.is_empty()), "row: {row}");
        }
    }
}

#[test]
fn latency_csv_reports_switch_ins_only() {
    let out = run_mode(Mode::Latency, true, false);
    let rows = rows(&out);
    assert_eq!(rows, vec!["3000000,7,1000000", "9000000,1,0"]);
}

#[test]
fn fairness_csv_reports_running_totals() {
    let out = run_mode(Mode::Fairness, true, false);
    let rows = rows(&out);
    // First switch-in of 7: only its 1ms wait is on the books.
    assert_eq!(rows[0], "7,0,1,1");
    // Second row is pid 1 coming back on CPU after its own slice.
    assert_eq!(rows[1], "1,0,0,2");
}

#[test]
fn ctx_csv_reports_switch_pairs() {
    let out = run_mode(Mode::Ctx, true, false);
    assert_eq!(rows(&out), vec!["3000000,1,7,500000", "9000000,7,1,6000000"]);
}

#[test]
fn timeline_excludes_alerts_and_forks() {
    let out = run_mode(Mode::Timeline, true, false);
    let rows = rows(&out);
    assert_eq!(rows.len(), 5); // exec, wake, 2 switches, exit
    assert!(rows.iter().all(|r| !r.contains("waitlong") && !r.contains("fork")));
    assert_eq!(rows[0], "1000000,7,exec,,");
    assert_eq!(rows[2], "3000000,7,switch,1000000,500000");
}

#[test]
fn shortlong_summarizes_on_exit() {
    let out = run_mode(Mode::Shortlong, true, false);
    // lifetime = exit(10ms) - exec(1ms) = 9ms; 1 wake; 2 switches.
    assert_eq!(rows(&out), vec!["7,9,1,2"]);
}

#[test]
fn starvation_reports_alerts_only() {
    let out = run_mode(Mode::Starvation, true, false);
    assert_eq!(rows(&out), vec!["3000000,7,wait_alert"]);
}

#[test]
fn fork_reports_parent_child_pairs() {
    let out = run_mode(Mode::Fork, true, false);
    assert_eq!(rows(&out), vec!["9500000,7,8"]);
}

#[test]
fn csv_header_appears_exactly_once_and_first() {
    for mode in [
        Mode::Stream,
        Mode::Latency,
        Mode::Fairness,
        Mode::Ctx,
        Mode::Timeline,
        Mode::Shortlong,
        Mode::Starvation,
        Mode::Fork,
    ] {
        let out = run_mode(mode, true, true);
        let rows = rows(&out);
        let header = header_line(mode);
        assert_eq!(rows[0], header, "header leads the output for {mode:?}");
        assert_eq!(
            rows.iter().filter(|r| **r == header).count(),
            1,
            "header printed once for {mode:?}"
        );
    }
}

#[test]
fn header_is_omitted_unless_requested() {
    let out = run_mode(Mode::Latency, true, false);
    assert!(!out.contains(header_line(Mode::Latency)));
}

#[test]
fn human_stream_mentions_both_sides_of_a_switch() {
    let out = run_mode(Mode::Stream, false, false);
    assert!(out.contains("SWITCH"));
    assert!(out.contains("task1(1)"));
    assert!(out.contains("task7(7)"));
}

#[test]
fn aggregates_are_mode_independent() {
    // The table is fed before projection, so a narrow mode sees the same
    // numbers as the stream mode.
    let renderer = Renderer::new(Mode::Starvation, true, false, Vec::new());
    let mut consumer = Consumer::new(renderer);
    for event in fixture() {
        consumer.handle(&event).unwrap();
    }
    let stats = consumer.table().get(Pid(7)).unwrap();
    assert_eq!(stats.total_run_ns, 6_000_000);
    assert_eq!(stats.total_wait_ns, 1_000_000);
    assert_eq!(stats.switches, 2);
    assert_eq!(stats.wakes, 1);
}

#[test]
fn empty_table_lookup_is_none() {
    let table = TaskTable::new();
    assert!(table.get(Pid(1)).is_none());
    assert!(table.is_empty());
}
