//! # SchedLab — eBPF Kernel-Side Instrumentation
//!
//! Five tracepoint programs that observe the Linux scheduler and stream
//! fixed-schema event records to userspace:
//!
//! - **`sched_wakeup_hook`**: a task became runnable — stamp the wake time
//!   and count the wake.
//! - **`sched_switch_hook`**: a CPU switched tasks — derive the outgoing
//!   task's run slice and the incoming task's wake→run latency, update the
//!   per-task counters, and emit the switch record (preceded by a WAITLONG
//!   alert when the latency crosses the configured threshold).
//! - **`sched_exec_hook`** / **`sched_exit_hook`**: process lifecycle
//!   markers; exit also clears the timing stamps for the pid.
//! - **`sched_fork_hook`**: process creation, reported as a parent/child
//!   pair with no state-table updates.
//!
//! ## Maps
//!
//! - **`EVENTS` (RingBuf, 512 KiB)**: lock-free transport to userspace.
//!   Reservation failure under backpressure drops the record silently;
//!   state-table updates are never rolled back, so the timing of later
//!   events stays correct even when the stream is lossy.
//! - **`WAKE_STAMPS` (HashMap)**: pid → last wake timestamp. Written on
//!   wakeup, consumed (deleted) by the next switch-in of that pid.
//! - **`ONCPU_STAMPS` (HashMap)**: pid → timestamp the task last began
//!   running. Overwritten on every switch-in, cleared on exit.
//! - **`TASK_COUNTERS` (HashMap)**: pid → cumulative run/wait/switch/wake
//!   counters. Read-modify-write here is not atomic across CPUs; a small
//!   fraction of counter updates may be lost under extreme contention.
//! - **`CONFIG` (Array, 1 entry)**: wait-alert threshold and pid filter,
//!   written by userspace before any program attaches.
//!
//! Tracepoint arguments are read through the `#[repr(C)]` layouts in
//! `schedlab-common`, mirroring the kernel's
//! `/sys/kernel/debug/tracing/events/sched/*/format` descriptions.

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    bindings::BPF_NOEXIST,
    helpers::{
        bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_get_smp_processor_id,
        bpf_ktime_get_ns,
    },
    macros::{map, tracepoint},
    maps::{Array, HashMap, RingBuf},
    programs::TracePointContext,
    EbpfContext,
};
use schedlab_common::{
    EventPayload, ForkPayload, RawEvent, SchedForkArgs, SchedSwitchArgs, SchedWakeupArgs,
    SwitchPayload, TaskCounters, TracerConfig, COMM_LEN, EVENT_EXEC, EVENT_EXIT, EVENT_FORK,
    EVENT_SWITCH, EVENT_WAITLONG, EVENT_WAKE,
};

/// Ring buffer for streaming event records to userspace.
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(512 * 1024, 0);

/// pid → last wake timestamp (ns). Consumed by the next switch-in.
#[map]
static WAKE_STAMPS: HashMap<u32, u64> = HashMap::with_max_entries(131_072, 0);

/// pid → timestamp the task last began running on a CPU.
#[map]
static ONCPU_STAMPS: HashMap<u32, u64> = HashMap::with_max_entries(131_072, 0);

/// pid → cumulative scheduling counters.
#[map]
static TASK_COUNTERS: HashMap<u32, TaskCounters> = HashMap::with_max_entries(131_072, 0);

/// Single-slot configuration record, written by userspace at startup.
#[map]
static CONFIG: Array<TracerConfig> = Array::with_max_entries(1, 0);

fn tracer_config() -> TracerConfig {
    unsafe { CONFIG.get(0).copied().unwrap_or_default() }
}

fn passes_filter(cfg: &TracerConfig, pid: u32) -> bool {
    cfg.filter_pid == 0 || cfg.filter_pid == pid
}

/// Ensure a counters entry exists for `pid` and return it for in-place
/// updates. BPF_NOEXIST keeps a concurrently inserted entry's counts.
fn counters_mut(pid: u32) -> Option<&'static mut TaskCounters> {
    if let Some(ptr) = TASK_COUNTERS.get_ptr_mut(&pid) {
        return Some(unsafe { &mut *ptr });
    }
    let zero = TaskCounters::zeroed();
    let _ = unsafe { TASK_COUNTERS.insert(&pid, &zero, BPF_NOEXIST as u64) };
    TASK_COUNTERS.get_ptr_mut(&pid).map(|ptr| unsafe { &mut *ptr })
}

/// Emit a payload-less event record. Reservation failure means the ring is
/// full; the record is dropped without an error channel.
fn emit_basic(kind: u32, ts_ns: u64, pid: u32, comm: &[u8; COMM_LEN]) {
    if let Some(mut entry) = EVENTS.reserve::<RawEvent>(0) {
        entry.write(RawEvent { ts_ns, kind, pid, comm: *comm, payload: EventPayload::zeroed() });
        entry.submit(0);
    }
}

#[tracepoint]
pub fn sched_wakeup_hook(ctx: TracePointContext) -> u32 {
    match try_sched_wakeup(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_wakeup(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SchedWakeupArgs = ctx.as_ptr() as *const SchedWakeupArgs;
    let pid = unsafe { (*args).pid as u32 };
    let comm = unsafe { (*args).comm };

    let now = unsafe { bpf_ktime_get_ns() };
    let cfg = tracer_config();
    if !passes_filter(&cfg, pid) {
        return Ok(());
    }

    // Unconditional overwrite: a wake that was never consumed by a
    // switch-in is replaced, keeping at most one outstanding stamp per pid.
    unsafe {
        WAKE_STAMPS.insert(&pid, &now, 0)?;
    }

    if let Some(counters) = counters_mut(pid) {
        counters.wakes += 1;
    }

    emit_basic(EVENT_WAKE, now, pid, &comm);
    Ok(())
}

#[tracepoint]
pub fn sched_switch_hook(ctx: TracePointContext) -> u32 {
    match try_sched_switch(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_switch(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SchedSwitchArgs = ctx.as_ptr() as *const SchedSwitchArgs;
    let prev_pid = unsafe { (*args).prev_pid as u32 };
    let next_pid = unsafe { (*args).next_pid as u32 };
    let prev_comm = unsafe { (*args).prev_comm };
    let next_comm = unsafe { (*args).next_comm };

    let now = unsafe { bpf_ktime_get_ns() };
    let cfg = tracer_config();
    if !passes_filter(&cfg, prev_pid) && !passes_filter(&cfg, next_pid) {
        return Ok(());
    }

    // Outgoing side: run slice since the task last began running.
    let mut run_ns = 0u64;
    if prev_pid != 0 {
        if let Some(started) = unsafe { ONCPU_STAMPS.get(&prev_pid).copied() } {
            run_ns = now - started;
        }
    }

    // Incoming side: consume the wake stamp (if any) and start a new slice.
    let mut wait_ns = 0u64;
    if next_pid != 0 {
        if let Some(woken) = unsafe { WAKE_STAMPS.get(&next_pid).copied() } {
            wait_ns = now - woken;
            let _ = unsafe { WAKE_STAMPS.remove(&next_pid) };
        }
        unsafe {
            ONCPU_STAMPS.insert(&next_pid, &now, 0)?;
        }
    }

    // The idle task (pid 0) accrues no counters.
    if prev_pid != 0 {
        if let Some(counters) = counters_mut(prev_pid) {
            counters.total_run_ns += run_ns;
            counters.switches += 1;
        }
    }
    if next_pid != 0 {
        if let Some(counters) = counters_mut(next_pid) {
            counters.total_wait_ns += wait_ns;
            counters.switches += 1;
        }
    }

    // The alert precedes its switch record so the consumer can attribute
    // both to the same instant.
    if cfg.wait_alert_ns != 0 && wait_ns >= cfg.wait_alert_ns {
        emit_basic(EVENT_WAITLONG, now, next_pid, &next_comm);
    }

    let cpu = unsafe { bpf_get_smp_processor_id() } as i32;
    if let Some(mut entry) = EVENTS.reserve::<RawEvent>(0) {
        entry.write(RawEvent {
            ts_ns: now,
            kind: EVENT_SWITCH,
            pid: next_pid,
            comm: next_comm,
            payload: EventPayload {
                switch: SwitchPayload {
                    prev_pid,
                    next_pid,
                    prev_comm,
                    next_comm,
                    run_ns,
                    wait_ns,
                    prev_cpu: cpu,
                    next_cpu: cpu,
                },
            },
        });
        entry.submit(0);
    }
    Ok(())
}

#[tracepoint]
pub fn sched_exec_hook(ctx: TracePointContext) -> u32 {
    match try_sched_exec(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_exec(_ctx: &TracePointContext) -> Result<(), i64> {
    let now = unsafe { bpf_ktime_get_ns() };
    // Process-scoped lifecycle uses the thread-group leader id.
    let tgid = (unsafe { bpf_get_current_pid_tgid() } >> 32) as u32;

    let cfg = tracer_config();
    if !passes_filter(&cfg, tgid) {
        return Ok(());
    }

    if let Some(counters) = counters_mut(tgid) {
        if counters.first_exec_ns == 0 {
            counters.first_exec_ns = now;
        }
    }

    let comm = bpf_get_current_comm().unwrap_or([0u8; COMM_LEN]);
    emit_basic(EVENT_EXEC, now, tgid, &comm);
    Ok(())
}

#[tracepoint]
pub fn sched_exit_hook(ctx: TracePointContext) -> u32 {
    match try_sched_exit(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_exit(_ctx: &TracePointContext) -> Result<(), i64> {
    let id = unsafe { bpf_get_current_pid_tgid() };
    let tgid = (id >> 32) as u32;
    let tid = id as u32;

    // Per-process lifetime accounting only: non-leader threads are ignored.
    if tid != tgid {
        return Ok(());
    }
    let cfg = tracer_config();
    if !passes_filter(&cfg, tgid) {
        return Ok(());
    }

    // Timing stamps die with the process; the counters entry survives so
    // userspace can still produce the exit summary.
    let _ = unsafe { WAKE_STAMPS.remove(&tgid) };
    let _ = unsafe { ONCPU_STAMPS.remove(&tgid) };

    let now = unsafe { bpf_ktime_get_ns() };
    let comm = bpf_get_current_comm().unwrap_or([0u8; COMM_LEN]);
    emit_basic(EVENT_EXIT, now, tgid, &comm);
    Ok(())
}

#[tracepoint]
pub fn sched_fork_hook(ctx: TracePointContext) -> u32 {
    match try_sched_fork(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_fork(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SchedForkArgs = ctx.as_ptr() as *const SchedForkArgs;
    let parent_pid = unsafe { (*args).parent_pid as u32 };
    let child_pid = unsafe { (*args).child_pid as u32 };
    let parent_comm = unsafe { (*args).parent_comm };
    let child_comm = unsafe { (*args).child_comm };

    let now = unsafe { bpf_ktime_get_ns() };
    let cfg = tracer_config();
    if !passes_filter(&cfg, parent_pid) {
        return Ok(());
    }

    if let Some(mut entry) = EVENTS.reserve::<RawEvent>(0) {
        entry.write(RawEvent {
            ts_ns: now,
            kind: EVENT_FORK,
            pid: parent_pid,
            comm: parent_comm,
            payload: EventPayload {
                fork: ForkPayload { parent_pid, child_pid, parent_comm, child_comm },
            },
        });
        entry.submit(0);
    }
    Ok(())
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
