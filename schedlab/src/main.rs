//! # SchedLab - Main Entry Point
//!
//! Wires the pipeline together in dependency order and runs the poll loop:
//!
//! 1. Parse CLI arguments (malformed CLI exits 1)
//! 2. Pre-flight checks: root, kernel ≥ 5.8 (exit 2)
//! 3. Load the BPF object (exit 2)
//! 4. Write the configuration record — before any probe can fire (exit 3)
//! 5. Attach the five `sched` tracepoints (exit 4)
//! 6. Map the event ring (exit 5)
//! 7. Poll: drain the ring, then sleep up to 200 ms waiting for data,
//!    SIGINT/SIGTERM, or the `--duration` deadline
//! 8. Teardown: flush the sink, detach the probes, free the maps. Records
//!    produced after the final drain are discarded.
//!
//! Diagnostics go to stderr via `env_logger`; stdout carries only
//! projection output so CSV stays machine-readable.

use std::io::{self, BufWriter};
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{info, warn};
use schedlab_common::TracerConfig;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;

use schedlab::cli::Args;
use schedlab::domain::TracerError;
use schedlab::events::TraceEvent;
use schedlab::output::Renderer;
use schedlab::preflight::run_preflight_checks;
use schedlab::tracing::{attach_probes, load_probes, take_event_ring, write_config, Consumer};

/// How long one ring poll waits for data before rechecking the stop
/// conditions. Shutdown latency is bounded by this interval.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() {
    env_logger::init();

    // clap's default error exit code is 2, which collides with the probe
    // load failure code; the CLI contract wants 1.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    if let Err(err) = run(args).await {
        eprintln!("schedlab: {err}");
        process::exit(err.exit_code());
    }
}

async fn run(args: Args) -> Result<(), TracerError> {
    run_preflight_checks().map_err(TracerError::preflight)?;

    let mut bpf = load_probes(args.bpf_object.as_deref())?;

    let config = TracerConfig {
        wait_alert_ns: args.wait_alert_ms * 1_000_000,
        filter_pid: args.filter_pid,
        _padding: 0,
    };
    write_config(&mut bpf, config)?;

    attach_probes(&mut bpf)?;
    let mut ring = take_event_ring(&mut bpf)?;

    let renderer =
        Renderer::new(args.mode, args.csv, args.csv_header, BufWriter::new(io::stdout()));
    let mut consumer = Consumer::new(renderer);

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let started = Instant::now();
    let deadline = (args.duration > 0).then(|| Duration::from_secs(args.duration));

    info!("Tracing scheduler events (mode: {:?})", args.mode);

    loop {
        // Drain everything the producers have submitted since the last poll.
        while let Some(record) = ring.next() {
            match TraceEvent::parse(&record) {
                Some(event) => consumer.handle(&event)?,
                None => warn!("Skipping malformed ring record ({} bytes)", record.len()),
            }
        }
        consumer.flush()?;

        if let Some(limit) = deadline {
            if started.elapsed() >= limit {
                info!("Duration limit reached ({}s)", args.duration);
                break;
            }
        }

        tokio::select! {
            () = sleep(POLL_INTERVAL) => {}
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    // Records submitted after the final drain are discarded by design.
    consumer.flush()?;
    info!("Processed {} events across {} tasks", consumer.event_count, consumer.table().len());

    drop(ring);
    drop(bpf); // detaches the tracepoints and frees the maps
    Ok(())
}
