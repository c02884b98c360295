//! File sink
//!
//! Appends one record per event. Two formats:
//! - `json`: JSON-lines, `{"timestamp": "...", "text": "...", "type": "final"}`
//! - `text`: plain `[timestamp] text`
//!
//! The file is opened per write so a long-running session survives log
//! rotation and the file is always flushed between events.

use super::{RecognitionEvent, Sink};
use crate::error::SinkError;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Persisted record format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Text,
}

impl FileFormat {
    pub fn from_config(s: &str) -> Option<FileFormat> {
        match s.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "text" | "txt" => Some(FileFormat::Text),
            _ => None,
        }
    }
}

/// Newline-delimited transcript log
pub struct FileSink {
    path: PathBuf,
    format: FileFormat,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    fn render(&self, text: &str, event: &RecognitionEvent) -> String {
        match self.format {
            FileFormat::Json => {
                let record = json!({
                    "timestamp": event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    "text": text,
                    "type": event.kind.as_str(),
                });
                format!("{}\n", record)
            }
            FileFormat::Text => format!(
                "[{}] {}\n",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                text
            ),
        }
    }
}

impl Sink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn send(&self, text: &str, event: &RecognitionEvent) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(self.render(text, event).as_bytes())?;
        Ok(())
    }
}
