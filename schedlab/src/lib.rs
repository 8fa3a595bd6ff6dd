//! # SchedLab — eBPF-based Scheduler Tracing Lab
//!
//! SchedLab attaches to the kernel's scheduler tracepoints, derives per-task
//! timing metrics in the probe path, and streams compact event records to
//! userspace where they feed one of eight analysis projections.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Linux Kernel                           │
//! │  sched_wakeup ─┐                                            │
//! │  sched_switch ─┤   ┌──────────────────┐   ┌──────────────┐  │
//! │  sched_*_exec ─┼──▶│  eBPF programs   │──▶│ EVENTS (ring)│  │
//! │  sched_*_exit ─┤   │  (schedlab-ebpf) │   └──────┬───────┘  │
//! │  sched_*_fork ─┘   └────────┬─────────┘          │          │
//! │                             ▼                    │          │
//! │              WAKE_STAMPS / ONCPU_STAMPS /        │          │
//! │              TASK_COUNTERS / CONFIG maps         │          │
//! └──────────────────────────────────────────────────┼──────────┘
//!                                                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  schedlab (this crate)                      │
//! │   poll ring ▶ decode ▶ per-task aggregate table ▶ renderer  │
//! │   (stream | latency | fairness | ctx | timeline |           │
//! │    shortlong | starvation | fork, human or CSV)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module structure
//!
//! - [`cli`]: command-line arguments and the projection [`cli::Mode`]
//! - [`domain`]: core newtypes ([`domain::Pid`], [`domain::CpuId`]) and the
//!   typed setup error carrying process exit codes
//! - [`events`]: decoding ring records into the [`events::TraceEvent`] sum
//!   type
//! - [`aggregates`]: the user-side per-task counter table, computed
//!   independently from the event stream so it stays consistent even when
//!   kernel-side counter updates were lost
//! - [`output`]: the eight mode projections in human-readable and CSV form
//! - [`tracing`]: BPF object loading, config write, tracepoint attachment
//!   and the ring-buffer consumer
//! - [`preflight`]: privilege and kernel-version checks before loading
//!
//! The wire types shared with the kernel side live in `schedlab-common`;
//! the probe programs themselves in `schedlab-ebpf`.

// Expose modules for testing
pub mod aggregates;
pub mod cli;
pub mod domain;
pub mod events;
pub mod output;
pub mod preflight;
pub mod tracing;
