//! Domain model for schedlab
//!
//! Core newtypes and the structured setup error that carries the process
//! exit codes of the CLI contract.

pub mod errors;
pub mod types;

pub use errors::TracerError;
pub use types::{CpuId, Pid};
