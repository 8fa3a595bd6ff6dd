//! # BPF Object Loading and Attachment
//!
//! Loads the compiled schedlab BPF object and wires it up in the order the
//! probes depend on:
//!
//! 1. [`load_probes`] — open the object (exit code 2 on failure)
//! 2. [`write_config`] — publish the configuration record (exit code 3);
//!    the record must be fully written before any probe can fire
//! 3. [`attach_probes`] — attach the five `sched` tracepoints (exit code 4)
//! 4. [`take_event_ring`] — map the ring buffer for polling (exit code 5)
//!
//! The object is loaded from disk at runtime (`--bpf-object`, then
//! `$SCHEDLAB_BPF_OBJ`, then the `cargo xtask build-ebpf --release` output
//! path), so the userspace build never needs the BPF toolchain.

use std::path::{Path, PathBuf};

use aya::maps::{Array, MapData, RingBuf};
use aya::programs::TracePoint;
use aya::Ebpf;
use log::info;
use schedlab_common::TracerConfig;

use crate::domain::TracerError;

/// Environment override for the BPF object location.
pub const BPF_OBJ_ENV: &str = "SCHEDLAB_BPF_OBJ";

/// Locations probed when neither the CLI flag nor the env var is set.
const DEFAULT_OBJ_PATHS: &[&str] = &[
    "target/bpfel-unknown-none/release/schedlab",
    "/usr/local/lib/schedlab/schedlab.bpf.o",
];

/// Program name in the object → tracepoint under the `sched` category.
const TRACEPOINTS: &[(&str, &'static str)] = &[
    ("sched_wakeup_hook", "sched_wakeup"),
    ("sched_switch_hook", "sched_switch"),
    ("sched_exec_hook", "sched_process_exec"),
    ("sched_exit_hook", "sched_process_exit"),
    ("sched_fork_hook", "sched_process_fork"),
];

/// Load the BPF object holding the scheduler probes.
///
/// # Errors
/// Returns [`TracerError::ProbeLoad`] when no object can be found or the
/// kernel rejects it.
pub fn load_probes(override_path: Option<&Path>) -> Result<Ebpf, TracerError> {
    let path = resolve_object_path(override_path)?;
    info!("Loading BPF object: {}", path.display());
    Ebpf::load_file(&path)
        .map_err(|err| TracerError::ProbeLoad(format!("{}: {err}", path.display())))
}

fn resolve_object_path(override_path: Option<&Path>) -> Result<PathBuf, TracerError> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(BPF_OBJ_ENV) {
        return Ok(PathBuf::from(path));
    }
    for candidate in DEFAULT_OBJ_PATHS {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }
    Err(TracerError::ProbeLoad(format!(
        "no BPF object found (tried {}); build one with `cargo xtask build-ebpf --release` \
         or pass --bpf-object",
        DEFAULT_OBJ_PATHS.join(", ")
    )))
}

/// Publish the configuration record read by every probe firing.
///
/// Must complete before [`attach_probes`]: a probe never observes a
/// half-initialized record.
///
/// # Errors
/// Returns [`TracerError::ConfigWrite`] when the map is missing or rejects
/// the write.
pub fn write_config(bpf: &mut Ebpf, config: TracerConfig) -> Result<(), TracerError> {
    let map = bpf
        .map_mut("CONFIG")
        .ok_or_else(|| TracerError::ConfigWrite("CONFIG map not found".to_string()))?;
    let mut array: Array<_, TracerConfig> =
        Array::try_from(map).map_err(|err| TracerError::ConfigWrite(err.to_string()))?;
    array.set(0, config, 0).map_err(|err| TracerError::ConfigWrite(err.to_string()))?;
    info!(
        "Configured tracer: wait_alert={}ms filter_pid={}",
        config.wait_alert_ns / 1_000_000,
        config.filter_pid
    );
    Ok(())
}

/// Attach the five scheduler tracepoints.
///
/// # Errors
/// Returns [`TracerError::ProbeAttach`] naming the tracepoint that failed.
pub fn attach_probes(bpf: &mut Ebpf) -> Result<(), TracerError> {
    for &(program, tracepoint) in TRACEPOINTS {
        let attach_err =
            |err: String| TracerError::ProbeAttach { tracepoint, error: err };

        let prog: &mut TracePoint = bpf
            .program_mut(program)
            .ok_or_else(|| attach_err(format!("program {program} missing from object")))?
            .try_into()
            .map_err(|err: aya::programs::ProgramError| attach_err(err.to_string()))?;
        prog.load().map_err(|err| attach_err(err.to_string()))?;
        prog.attach("sched", tracepoint).map_err(|err| attach_err(err.to_string()))?;
        info!("Attached tracepoint: sched/{tracepoint}");
    }
    Ok(())
}

/// Take ownership of the event ring buffer for polling.
///
/// # Errors
/// Returns [`TracerError::RingSetup`] when the map is missing or cannot be
/// mapped.
pub fn take_event_ring(bpf: &mut Ebpf) -> Result<RingBuf<MapData>, TracerError> {
    let map = bpf
        .take_map("EVENTS")
        .ok_or_else(|| TracerError::RingSetup("EVENTS map not found".to_string()))?;
    RingBuf::try_from(map).map_err(|err| TracerError::RingSetup(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_is_passed_through_untouched() {
        let path = resolve_object_path(Some(Path::new("/nonexistent/schedlab.o"))).unwrap();
        assert_eq!(path, Path::new("/nonexistent/schedlab.o"));
    }

    #[test]
    fn missing_object_suggests_the_build_command() {
        // None of the default locations exist relative to the test cwd.
        std::env::remove_var(BPF_OBJ_ENV);
        if let Err(TracerError::ProbeLoad(msg)) = resolve_object_path(None) {
            assert!(msg.contains("xtask build-ebpf"));
        }
    }
}
