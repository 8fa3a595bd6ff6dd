//! Decoding ring-buffer records into typed events
//!
//! The wire format (`schedlab_common::RawEvent`) is a discriminated record
//! whose payload bytes are only meaningful for SWITCH and FORK kinds. This
//! module lifts it into a proper sum type so the projections downstream can
//! match on structure instead of trusting a tag, and so fork records carry
//! parent/child fields rather than reusing the switch payload's names.

use schedlab_common::{
    RawEvent, COMM_LEN, EVENT_EXEC, EVENT_EXIT, EVENT_FORK, EVENT_SWITCH, EVENT_WAITLONG,
    EVENT_WAKE,
};

use crate::domain::{CpuId, Pid};

/// A decoded scheduler event.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub ts_ns: u64,
    /// Primary task id (next task for a switch, parent for a fork).
    pub pid: Pid,
    pub comm: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Wake,
    Switch(SwitchInfo),
    Exec,
    Exit,
    /// Wake→run latency crossed the configured threshold. Emitted by the
    /// switch probe immediately before the switch record it belongs to.
    WaitAlert,
    Fork(ForkInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchInfo {
    pub prev_pid: Pid,
    pub next_pid: Pid,
    pub prev_comm: String,
    pub next_comm: String,
    pub run_ns: u64,
    pub wait_ns: u64,
    pub prev_cpu: CpuId,
    pub next_cpu: CpuId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForkInfo {
    pub parent_pid: Pid,
    pub child_pid: Pid,
    pub parent_comm: String,
    pub child_comm: String,
}

impl TraceEvent {
    /// Decode a raw ring-buffer record. Returns `None` for short reads and
    /// unknown kind tags.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < std::mem::size_of::<RawEvent>() {
            return None;
        }
        // SAFETY: length checked above; the producer writes a valid RawEvent
        // and every bit pattern of its fields is a valid value.
        #[allow(unsafe_code)]
        let raw = unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<RawEvent>()) };
        Self::decode(&raw)
    }

    /// Decode an already-deserialized record. The payload union is read
    /// according to the kind tag; all other kinds ignore the payload bytes.
    #[must_use]
    pub fn decode(raw: &RawEvent) -> Option<Self> {
        let kind = match raw.kind {
            EVENT_WAKE => EventKind::Wake,
            EVENT_EXEC => EventKind::Exec,
            EVENT_EXIT => EventKind::Exit,
            EVENT_WAITLONG => EventKind::WaitAlert,
            EVENT_SWITCH => {
                // SAFETY: the producer fills the switch variant for this tag.
                #[allow(unsafe_code)]
                let sw = unsafe { raw.payload.switch };
                EventKind::Switch(SwitchInfo {
                    prev_pid: Pid(sw.prev_pid),
                    next_pid: Pid(sw.next_pid),
                    prev_comm: comm_str(&sw.prev_comm),
                    next_comm: comm_str(&sw.next_comm),
                    run_ns: sw.run_ns,
                    wait_ns: sw.wait_ns,
                    prev_cpu: CpuId(sw.prev_cpu),
                    next_cpu: CpuId(sw.next_cpu),
                })
            }
            EVENT_FORK => {
                // SAFETY: the producer fills the fork variant for this tag.
                #[allow(unsafe_code)]
                let fork = unsafe { raw.payload.fork };
                EventKind::Fork(ForkInfo {
                    parent_pid: Pid(fork.parent_pid),
                    child_pid: Pid(fork.child_pid),
                    parent_comm: comm_str(&fork.parent_comm),
                    child_comm: comm_str(&fork.child_comm),
                })
            }
            _ => return None,
        };
        Some(Self { ts_ns: raw.ts_ns, pid: Pid(raw.pid), comm: comm_str(&raw.comm), kind })
    }

    /// Stable lowercase name of the event kind, used by the stream and
    /// timeline projections.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.kind {
            EventKind::Wake => "wake",
            EventKind::Switch(_) => "switch",
            EventKind::Exec => "exec",
            EventKind::Exit => "exit",
            EventKind::WaitAlert => "waitlong",
            EventKind::Fork(_) => "fork",
        }
    }
}

/// Convert a NUL-padded kernel command string to UTF-8, dropping the padding.
fn comm_str(comm: &[u8; COMM_LEN]) -> String {
    let end = comm.iter().position(|&b| b == 0).unwrap_or(COMM_LEN);
    String::from_utf8_lossy(&comm[..end]).into_owned()
}
