//! Mode projections over the event stream
//!
//! Each mode selects the event kinds it reacts to and reshapes them into
//! either a human-readable line or a CSV row. The CSV schemas are stable:
//!
//! | mode | columns |
//! |---|---|
//! | stream | `ts_ns,type,pid,comm,prev_pid,next_pid,run_ns,wait_ns` |
//! | latency | `ts_ns,pid,latency_ns` |
//! | fairness | `pid,run_ms,wait_ms,switches` |
//! | ctx | `ts_ns,prev_pid,next_pid,run_ns` |
//! | timeline | `ts_ns,pid,event,wait_ns,run_prev_ns` |
//! | shortlong | `pid,lifetime_ms,wakes,switches` |
//! | starvation | `ts_ns,pid,event` |
//! | fork | `ts_ns,parent_pid,child_pid` |
//!
//! Non-switch stream rows leave the four switch columns empty. The header,
//! when requested, is written exactly once, before any data row.

// Time conversions intentionally lose precision for display purposes
#![allow(clippy::cast_precision_loss)]

use std::io::{self, Write};

use crate::aggregates::TaskTable;
use crate::cli::Mode;
use crate::events::{EventKind, ForkInfo, SwitchInfo, TraceEvent};

const NS_PER_MS: u64 = 1_000_000;

/// Renders events for one fixed mode into a sink.
pub struct Renderer<W: Write> {
    mode: Mode,
    csv: bool,
    header_pending: bool,
    out: W,
}

impl<W: Write> Renderer<W> {
    pub fn new(mode: Mode, csv: bool, csv_header: bool, out: W) -> Self {
        Self { mode, csv, header_pending: csv && csv_header, out }
    }

    /// Project one event. The aggregate table must already include it.
    pub fn render(&mut self, event: &TraceEvent, table: &TaskTable) -> io::Result<()> {
        if self.header_pending {
            writeln!(self.out, "{}", header_line(self.mode))?;
            self.header_pending = false;
        }

        match self.mode {
            Mode::Stream => self.stream(event),
            Mode::Latency => match &event.kind {
                EventKind::Switch(sw) => self.latency(event, sw),
                _ => Ok(()),
            },
            Mode::Fairness => match &event.kind {
                EventKind::Switch(sw) => self.fairness(sw, table),
                _ => Ok(()),
            },
            Mode::Ctx => match &event.kind {
                EventKind::Switch(sw) => self.ctx(event, sw),
                _ => Ok(()),
            },
            Mode::Timeline => match &event.kind {
                EventKind::Wake | EventKind::Switch(_) | EventKind::Exec | EventKind::Exit => {
                    self.timeline(event)
                }
                _ => Ok(()),
            },
            Mode::Shortlong => match &event.kind {
                EventKind::Exit => self.shortlong(event, table),
                _ => Ok(()),
            },
            Mode::Starvation => match &event.kind {
                EventKind::WaitAlert => self.starvation(event),
                _ => Ok(()),
            },
            Mode::Fork => match &event.kind {
                EventKind::Fork(fork) => self.fork(event, fork),
                _ => Ok(()),
            },
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Consume the renderer and hand back the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn stream(&mut self, event: &TraceEvent) -> io::Result<()> {
        if self.csv {
            return match &event.kind {
                EventKind::Switch(sw) => writeln!(
                    self.out,
                    "{},{},{},{},{},{},{},{}",
                    event.ts_ns,
                    event.label(),
                    event.pid,
                    event.comm,
                    sw.prev_pid,
                    sw.next_pid,
                    sw.run_ns,
                    sw.wait_ns
                ),
                _ => writeln!(
                    self.out,
                    "{},{},{},{},,,,",
                    event.ts_ns,
                    event.label(),
                    event.pid,
                    event.comm
                ),
            };
        }
        match &event.kind {
            EventKind::Switch(sw) => writeln!(
                self.out,
                "{:<14} SWITCH   {}({}) -> {}({}) run={} wait={} cpu={}",
                fmt_ts(event.ts_ns),
                sw.prev_comm,
                sw.prev_pid,
                sw.next_comm,
                sw.next_pid,
                fmt_ms(sw.run_ns),
                fmt_ms(sw.wait_ns),
                sw.next_cpu,
            ),
            EventKind::Fork(fork) => writeln!(
                self.out,
                "{:<14} FORK     {}({}) -> {}({})",
                fmt_ts(event.ts_ns),
                fork.parent_comm,
                fork.parent_pid,
                fork.child_comm,
                fork.child_pid,
            ),
            EventKind::WaitAlert => writeln!(
                self.out,
                "{:<14} WAITLONG {}({})",
                fmt_ts(event.ts_ns),
                event.comm,
                event.pid,
            ),
            EventKind::Wake | EventKind::Exec | EventKind::Exit => writeln!(
                self.out,
                "{:<14} {:<8} {}({})",
                fmt_ts(event.ts_ns),
                event.label().to_uppercase(),
                event.comm,
                event.pid,
            ),
        }
    }

    fn latency(&mut self, event: &TraceEvent, sw: &SwitchInfo) -> io::Result<()> {
        if self.csv {
            writeln!(self.out, "{},{},{}", event.ts_ns, sw.next_pid, sw.wait_ns)
        } else {
            writeln!(
                self.out,
                "{:<14} pid={} latency={}",
                fmt_ts(event.ts_ns),
                sw.next_pid,
                fmt_ms(sw.wait_ns)
            )
        }
    }

    fn fairness(&mut self, sw: &SwitchInfo, table: &TaskTable) -> io::Result<()> {
        // Running totals for the task that just got the CPU.
        let Some(stats) = table.get(sw.next_pid) else { return Ok(()) };
        if self.csv {
            writeln!(
                self.out,
                "{},{},{},{}",
                sw.next_pid,
                stats.total_run_ns / NS_PER_MS,
                stats.total_wait_ns / NS_PER_MS,
                stats.switches
            )
        } else {
            writeln!(
                self.out,
                "pid={:<7} run={}ms wait={}ms switches={}",
                sw.next_pid,
                stats.total_run_ns / NS_PER_MS,
                stats.total_wait_ns / NS_PER_MS,
                stats.switches
            )
        }
    }

    fn ctx(&mut self, event: &TraceEvent, sw: &SwitchInfo) -> io::Result<()> {
        if self.csv {
            writeln!(self.out, "{},{},{},{}", event.ts_ns, sw.prev_pid, sw.next_pid, sw.run_ns)
        } else {
            writeln!(
                self.out,
                "{:<14} {} -> {} run={}",
                fmt_ts(event.ts_ns),
                sw.prev_pid,
                sw.next_pid,
                fmt_ms(sw.run_ns)
            )
        }
    }

    fn timeline(&mut self, event: &TraceEvent) -> io::Result<()> {
        let timings = match &event.kind {
            EventKind::Switch(sw) => Some((sw.wait_ns, sw.run_ns)),
            _ => None,
        };
        if self.csv {
            return match timings {
                Some((wait_ns, run_prev_ns)) => writeln!(
                    self.out,
                    "{},{},{},{},{}",
                    event.ts_ns,
                    event.pid,
                    event.label(),
                    wait_ns,
                    run_prev_ns
                ),
                None => {
                    writeln!(self.out, "{},{},{},,", event.ts_ns, event.pid, event.label())
                }
            };
        }
        match timings {
            Some((wait_ns, run_prev_ns)) => writeln!(
                self.out,
                "{:<14} pid={:<7} {:<6} wait={} run_prev={}",
                fmt_ts(event.ts_ns),
                event.pid,
                event.label(),
                fmt_ms(wait_ns),
                fmt_ms(run_prev_ns)
            ),
            None => writeln!(
                self.out,
                "{:<14} pid={:<7} {}",
                fmt_ts(event.ts_ns),
                event.pid,
                event.label()
            ),
        }
    }

    fn shortlong(&mut self, event: &TraceEvent, table: &TaskTable) -> io::Result<()> {
        let Some(stats) = table.get(event.pid) else { return Ok(()) };
        if self.csv {
            writeln!(
                self.out,
                "{},{},{},{}",
                event.pid,
                stats.lifetime_ns() / NS_PER_MS,
                stats.wakes,
                stats.switches
            )
        } else {
            writeln!(
                self.out,
                "pid={:<7} {:<16} lifetime={}ms wakes={} switches={}",
                event.pid,
                event.comm,
                stats.lifetime_ns() / NS_PER_MS,
                stats.wakes,
                stats.switches
            )
        }
    }

    fn starvation(&mut self, event: &TraceEvent) -> io::Result<()> {
        if self.csv {
            writeln!(self.out, "{},{},wait_alert", event.ts_ns, event.pid)
        } else {
            writeln!(
                self.out,
                "{:<14} pid={:<7} {} starved past the alert threshold",
                fmt_ts(event.ts_ns),
                event.pid,
                event.comm
            )
        }
    }

    fn fork(&mut self, event: &TraceEvent, fork: &ForkInfo) -> io::Result<()> {
        if self.csv {
            writeln!(self.out, "{},{},{}", event.ts_ns, fork.parent_pid, fork.child_pid)
        } else {
            writeln!(
                self.out,
                "{:<14} {}({}) forked {}({})",
                fmt_ts(event.ts_ns),
                fork.parent_comm,
                fork.parent_pid,
                fork.child_comm,
                fork.child_pid
            )
        }
    }
}

/// CSV header row for a mode.
#[must_use]
pub const fn header_line(mode: Mode) -> &'static str {
    match mode {
        Mode::Stream => "ts_ns,type,pid,comm,prev_pid,next_pid,run_ns,wait_ns",
        Mode::Latency => "ts_ns,pid,latency_ns",
        Mode::Fairness => "pid,run_ms,wait_ms,switches",
        Mode::Ctx => "ts_ns,prev_pid,next_pid,run_ns",
        Mode::Timeline => "ts_ns,pid,event,wait_ns,run_prev_ns",
        Mode::Shortlong => "pid,lifetime_ms,wakes,switches",
        Mode::Starvation => "ts_ns,pid,event",
        Mode::Fork => "ts_ns,parent_pid,child_pid",
    }
}

/// Monotonic timestamp as seconds with microsecond resolution.
fn fmt_ts(ts_ns: u64) -> String {
    format!("{:.6}", ts_ns as f64 / 1e9)
}

/// Nanoseconds as milliseconds for human output.
fn fmt_ms(ns: u64) -> String {
    format!("{:.3}ms", ns as f64 / 1e6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_formatting_keeps_three_decimals() {
        assert_eq!(fmt_ms(1_500_000), "1.500ms");
        assert_eq!(fmt_ms(0), "0.000ms");
    }

    #[test]
    fn every_mode_has_a_header() {
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
            assert!(!header_line(mode).is_empty());
        }
    }
}
