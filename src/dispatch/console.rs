//! Console sink
//!
//! Partial hypotheses are drawn as a single overwriting line (carriage
//! return, padded so a shorter hypothesis erases the longer one it replaces);
//! Final and Complete results each get their own full line.

use super::{EventKind, RecognitionEvent, Sink};
use crate::error::SinkError;
use std::io::Write;

/// Terminal output for recognition results
pub struct ConsoleSink {
    show_partial: bool,
    show_final: bool,
}

impl ConsoleSink {
    pub fn new(show_partial: bool, show_final: bool) -> Self {
        Self {
            show_partial,
            show_final,
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn send(&self, text: &str, event: &RecognitionEvent) -> Result<(), SinkError> {
        let stamp = event.timestamp.format("%H:%M:%S");
        let mut out = std::io::stdout().lock();
        match event.kind {
            EventKind::Partial if self.show_partial => {
                write!(out, "\r[{}] {:<60}", stamp, text)?;
                out.flush()?;
            }
            EventKind::Final if self.show_final => {
                writeln!(out, "\n[{}] {}", stamp, text)?;
            }
            EventKind::Complete => {
                writeln!(out, "\n[{}] final: {}", stamp, text)?;
            }
            _ => {}
        }
        Ok(())
    }
}
