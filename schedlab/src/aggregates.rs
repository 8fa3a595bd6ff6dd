//! User-side per-task aggregate table
//!
//! Mirrors the kernel's `TASK_COUNTERS` map but is computed independently
//! from the event stream, so it stays internally consistent even when the
//! kernel dropped counter updates under contention. This table is the
//! authoritative source for projection output.
//!
//! Entries are created lazily on the first wake, switch, or exec and never
//! evicted: an exit event must still find the counters it summarizes, and
//! short-lived tasks are only summarized when their exit arrives. An exit
//! or wait alert alone creates nothing, matching the probe layer — a task
//! first seen at its exit has no counters worth summarizing.

use std::collections::HashMap;

use crate::domain::Pid;
use crate::events::{EventKind, TraceEvent};

/// Cumulative counters for one task id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total_run_ns: u64,
    pub total_wait_ns: u64,
    /// Switches involving this task, as either the outgoing or incoming side.
    pub switches: u64,
    pub wakes: u64,
    /// First exec timestamp observed, 0 until seen.
    pub first_exec_ns: u64,
    /// Timestamp of the most recent event touching this task.
    pub last_seen_ns: u64,
}

impl TaskStats {
    /// Lifetime from first exec to last observation, 0 when no exec was seen.
    #[must_use]
    pub fn lifetime_ns(&self) -> u64 {
        if self.first_exec_ns == 0 {
            return 0;
        }
        self.last_seen_ns.saturating_sub(self.first_exec_ns)
    }
}

/// Task-id-keyed aggregate table.
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: HashMap<Pid, TaskStats>,
}

impl TaskTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&TaskStats> {
        self.tasks.get(&pid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Fold one event into the table. The idle task (pid 0) accrues nothing.
    pub fn observe(&mut self, event: &TraceEvent) {
        match &event.kind {
            EventKind::Wake => {
                let stats = self.touch(event.pid, event.ts_ns);
                stats.wakes += 1;
            }
            EventKind::Exec => {
                let stats = self.touch(event.pid, event.ts_ns);
                if stats.first_exec_ns == 0 {
                    stats.first_exec_ns = event.ts_ns;
                }
            }
            // Not creation triggers: only an existing entry is stamped. The
            // entry outlives the task so the exit summary can read it.
            EventKind::Exit | EventKind::WaitAlert => {
                if let Some(stats) = self.tasks.get_mut(&event.pid) {
                    if event.ts_ns > stats.last_seen_ns {
                        stats.last_seen_ns = event.ts_ns;
                    }
                }
            }
            EventKind::Switch(sw) => {
                if !sw.prev_pid.is_idle() {
                    let prev = self.touch(sw.prev_pid, event.ts_ns);
                    prev.total_run_ns += sw.run_ns;
                    prev.switches += 1;
                }
                if !sw.next_pid.is_idle() {
                    let next = self.touch(sw.next_pid, event.ts_ns);
                    next.total_wait_ns += sw.wait_ns;
                    next.switches += 1;
                }
            }
            // Fork updates no timing state, matching the probe layer.
            EventKind::Fork(_) => {}
        }
    }

    fn touch(&mut self, pid: Pid, ts_ns: u64) -> &mut TaskStats {
        let stats = self.tasks.entry(pid).or_default();
        if ts_ns > stats.last_seen_ns {
            stats.last_seen_ns = ts_ns;
        }
        stats
    }
}
