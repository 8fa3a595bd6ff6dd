//! Tracing core modules
//!
//! - BPF object loading, configuration write, and tracepoint attachment
//! - The ring-buffer consumer driving the aggregate table and renderer

pub mod ebpf_setup;
pub mod event_processor;

pub use ebpf_setup::{attach_probes, load_probes, take_event_ring, write_config};
pub use event_processor::Consumer;
