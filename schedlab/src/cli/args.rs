//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schedlab", version, about = "Trace the kernel scheduler and analyze per-task timing")]
pub struct Args {
    /// Analysis projection driven by the event stream
    #[arg(long, value_enum, default_value_t = Mode::Stream)]
    pub mode: Mode,

    /// Only record events involving this pid (0 = trace everything)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub filter_pid: u32,

    /// Wait-latency alert threshold in milliseconds (0 disables alerts)
    #[arg(long, value_name = "M", default_value_t = 5)]
    pub wait_alert_ms: u64,

    /// Machine-readable CSV output
    #[arg(long)]
    pub csv: bool,

    /// Print the mode-specific CSV header once before the data rows
    #[arg(long)]
    pub csv_header: bool,

    /// Seconds to trace (0 = until interrupted)
    #[arg(long, default_value_t = 0)]
    pub duration: u64,

    /// Compiled BPF object to load (default: $SCHEDLAB_BPF_OBJ, then the
    /// `cargo xtask build-ebpf --release` output)
    #[arg(long, value_name = "PATH")]
    pub bpf_object: Option<PathBuf>,
}

/// Output projection over the event stream. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Raw event stream with timings
    Stream,
    /// Wake→run latency per switch-in
    Latency,
    /// Running per-task run/wait totals
    Fairness,
    /// Context-switch pairs with run slices
    Ctx,
    /// Interleaved lifecycle timeline
    Timeline,
    /// Lifetime summary on process exit
    Shortlong,
    /// Wait-latency alerts above the threshold
    Starvation,
    /// Parent/child process creation pairs
    Fork,
}
