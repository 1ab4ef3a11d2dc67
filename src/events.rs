use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Serialize)]
pub struct SessionEvent<'a> {
    pub event: &'static str,
    pub timestamp: String,
    pub source: &'a str,
    pub model: &'a str,
    pub conf_thresh: f32,
    pub min_width: i32,
    pub min_height: i32,
    pub timeout_frames: u64,
}

/// Entry or exit of a single person.
#[derive(Serialize)]
pub struct TransitionEvent {
    pub event: &'static str,
    pub timestamp: String,
    pub frame_index: u64,
    pub person_id: u32,
}

#[derive(Serialize)]
pub struct IntervalEvent {
    pub event: &'static str,
    pub timestamp: String,
    pub frame_index: u64,
    pub unique_people: u32,
    pub active_tracks: usize,
}

/// Line-delimited JSON event log for the tracking stage.
pub struct JsonLogger {
    writer: BufWriter<File>,
}

impl JsonLogger {
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

pub fn timestamp_now() -> String {
    chrono::Local::now().to_rfc3339()
}
