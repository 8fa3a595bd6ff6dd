//! Structured error types for schedlab
//!
//! Setup failures are fatal and map onto distinct process exit codes so
//! scripts driving the tracer can tell the stages apart.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracerError {
    #[error("{0}")]
    Preflight(String),

    #[error("failed to load scheduler probes: {0}")]
    ProbeLoad(String),

    #[error("failed to write tracer configuration: {0}")]
    ConfigWrite(String),

    #[error("failed to attach sched/{tracepoint}: {error}")]
    ProbeAttach { tracepoint: &'static str, error: String },

    #[error("failed to set up the event ring: {0}")]
    RingSetup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TracerError {
    /// Process exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Preflight(_) | Self::ProbeLoad(_) => 2,
            Self::ConfigWrite(_) => 3,
            Self::ProbeAttach { .. } => 4,
            Self::RingSetup(_) => 5,
            Self::Io(_) => 1,
        }
    }

    /// Wrap a preflight failure, keeping its full context chain.
    #[must_use]
    pub fn preflight(err: anyhow::Error) -> Self {
        Self::Preflight(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_cli_contract() {
        assert_eq!(TracerError::ProbeLoad(String::new()).exit_code(), 2);
        assert_eq!(TracerError::ConfigWrite(String::new()).exit_code(), 3);
        assert_eq!(
            TracerError::ProbeAttach { tracepoint: "sched_switch", error: String::new() }
                .exit_code(),
            4
        );
        assert_eq!(TracerError::RingSetup(String::new()).exit_code(), 5);
    }

    #[test]
    fn attach_error_names_the_tracepoint() {
        let err = TracerError::ProbeAttach {
            tracepoint: "sched_wakeup",
            error: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("sched/sched_wakeup"));
        assert!(err.to_string().contains("permission denied"));
    }
}
