//! # Event Processing
//!
//! The consumer half of the pipeline: every record polled off the ring is
//! folded into the user-side aggregate table first, then handed to the
//! active projection. The table is updated for *every* event regardless of
//! mode, so switching projections never changes the numbers a projection
//! would report.
//!
//! The table is rebuilt from the event stream instead of being read back
//! from the kernel maps: kernel-side counter updates may be lost under
//! contention, while the stream the consumer actually saw is, by
//! construction, consistent with the output produced from it.

use std::io::{self, Write};

use crate::aggregates::TaskTable;
use crate::events::TraceEvent;
use crate::output::Renderer;

/// Single-threaded event consumer: aggregate table + projection.
pub struct Consumer<W: Write> {
    table: TaskTable,
    renderer: Renderer<W>,
    pub event_count: u64,
}

impl<W: Write> Consumer<W> {
    #[must_use]
    pub fn new(renderer: Renderer<W>) -> Self {
        Self { table: TaskTable::new(), renderer, event_count: 0 }
    }

    /// Process a single decoded event.
    ///
    /// # Errors
    /// Propagates sink write failures; the poll loop treats them as fatal.
    pub fn handle(&mut self, event: &TraceEvent) -> io::Result<()> {
        self.event_count += 1;
        self.table.observe(event);
        self.renderer.render(event, &self.table)
    }

    /// Flush buffered projection output to the sink.
    ///
    /// # Errors
    /// Propagates sink flush failures.
    pub fn flush(&mut self) -> io::Result<()> {
        self.renderer.flush()
    }

    /// The aggregate table built so far.
    #[must_use]
    pub fn table(&self) -> &TaskTable {
        &self.table
    }

    /// Tear down the consumer and hand back the output sink.
    pub fn into_writer(self) -> W {
        self.renderer.into_inner()
    }
}
