#![no_std]

// Shared data structures between eBPF and userspace

/// Event kinds carried in [`RawEvent::kind`].
///
/// Value 5 is retired and intentionally skipped.
pub const EVENT_WAKE: u32 = 1;
pub const EVENT_SWITCH: u32 = 2;
pub const EVENT_EXEC: u32 = 3;
pub const EVENT_EXIT: u32 = 4;
pub const EVENT_WAITLONG: u32 = 6;
pub const EVENT_FORK: u32 = 7;

/// Length of a kernel command string (`task_struct::comm`), NUL-padded.
pub const COMM_LEN: usize = 16;

/// Fixed payload size reserved in every [`RawEvent`]. Both payload variants
/// must fit; see the const assertions at the bottom of this file.
pub const PAYLOAD_SIZE: usize = 64;

/// Payload of a context-switch event.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SwitchPayload {
    pub prev_pid: u32,
    pub next_pid: u32,
    pub prev_comm: [u8; COMM_LEN],
    pub next_comm: [u8; COMM_LEN],
    /// How long `prev` held the CPU in this slice (0 if unknown).
    pub run_ns: u64,
    /// `next`'s wake-to-run latency (0 if no wake stamp was outstanding).
    pub wait_ns: u64,
    pub prev_cpu: i32,
    pub next_cpu: i32,
}

/// Payload of a process-fork event.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ForkPayload {
    pub parent_pid: u32,
    pub child_pid: u32,
    pub parent_comm: [u8; COMM_LEN],
    pub child_comm: [u8; COMM_LEN],
}

/// Wire payload area. Which variant is live is determined by
/// [`RawEvent::kind`]; all other kinds carry a zeroed payload.
#[repr(C)]
#[derive(Clone, Copy)]
pub union EventPayload {
    pub switch: SwitchPayload,
    pub fork: ForkPayload,
    pub raw: [u8; PAYLOAD_SIZE],
}

impl EventPayload {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self { raw: [0; PAYLOAD_SIZE] }
    }
}

/// Event record sent from eBPF to userspace through the ring buffer.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawEvent {
    pub ts_ns: u64,
    pub kind: u32,
    /// Primary task id for convenience (next pid for SWITCH, parent for FORK).
    pub pid: u32,
    pub comm: [u8; COMM_LEN],
    pub payload: EventPayload,
}

/// Per-task cumulative counters, updated in the probe path and mirrored
/// independently by the consumer.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TaskCounters {
    pub total_run_ns: u64,
    pub total_wait_ns: u64,
    pub switches: u64,
    pub wakes: u64,
    /// First exec timestamp observed for this pid, 0 until seen.
    pub first_exec_ns: u64,
}

impl TaskCounters {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self { total_run_ns: 0, total_wait_ns: 0, switches: 0, wakes: 0, first_exec_ns: 0 }
    }
}

/// Configuration record written once by userspace before the probes attach.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct TracerConfig {
    /// WAITLONG threshold in nanoseconds; 0 disables alerts.
    pub wait_alert_ns: u64,
    /// If non-zero, only events involving this pid are recorded.
    pub filter_pid: u32,
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,
}

/// Tracepoint arguments for `sched/sched_wakeup`.
/// Layout from `/sys/kernel/debug/tracing/events/sched/sched_wakeup/format`.
#[repr(C)]
pub struct SchedWakeupArgs {
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,
    pub comm: [u8; COMM_LEN],
    pub pid: i32,
    pub prio: i32,
    pub target_cpu: i32,
}

/// Tracepoint arguments for `sched/sched_switch`.
/// Layout from `/sys/kernel/debug/tracing/events/sched/sched_switch/format`.
#[repr(C)]
pub struct SchedSwitchArgs {
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,
    pub prev_comm: [u8; COMM_LEN],
    pub prev_pid: i32,
    pub prev_prio: i32,
    pub prev_state: i64,
    pub next_comm: [u8; COMM_LEN],
    pub next_pid: i32,
    pub next_prio: i32,
}

/// Tracepoint arguments for `sched/sched_process_fork`.
/// Layout from `/sys/kernel/debug/tracing/events/sched/sched_process_fork/format`.
#[repr(C)]
pub struct SchedForkArgs {
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,
    pub parent_comm: [u8; COMM_LEN],
    pub parent_pid: i32,
    pub child_comm: [u8; COMM_LEN],
    pub child_pid: i32,
}

// The wire layout is shared with the in-kernel producer; a drifting size
// would desynchronize the ring decode.
const _: () = assert!(core::mem::size_of::<SwitchPayload>() == PAYLOAD_SIZE);
const _: () = assert!(core::mem::size_of::<ForkPayload>() <= PAYLOAD_SIZE);
const _: () = assert!(core::mem::size_of::<EventPayload>() == PAYLOAD_SIZE);
const _: () = assert!(core::mem::size_of::<RawEvent>() == 96);

#[cfg(feature = "user")]
use aya::Pod;

// These unsafe impls are required for eBPF <-> userspace communication.
// Pod ensures the types can be transmitted as plain bytes.
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for RawEvent {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for TaskCounters {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for TracerConfig {}
