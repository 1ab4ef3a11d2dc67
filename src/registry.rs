use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::Serialize;

const TIME_FORMAT: &str = "%H:%M:%S";

/// Visible lifespan of one tracked person, keyed by the collaborator's raw id.
#[derive(Debug, Clone)]
pub struct Track {
    pub stable_id: u32,
    pub entry_time: NaiveTime,
    pub exit_time: Option<NaiveTime>,
    pub last_seen_frame: u64,
}

/// One row of the entry/exit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRow {
    #[serde(rename = "Person_ID")]
    pub person_id: u32,
    #[serde(rename = "Entry_Time")]
    pub entry_time: String,
    #[serde(rename = "Exit_Time")]
    pub exit_time: Option<String>,
}

/// Maps the tracker's raw ids onto small sequential ids and records each
/// person's visible lifespan. Raw ids are opaque and may be large or
/// non-sequential; stable ids start at 1 and are assigned in order of first
/// sighting, never reused or reassigned.
#[derive(Debug)]
pub struct TrackRegistry {
    tracks: HashMap<i64, Track>,
    next_stable_id: u32,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self {
            tracks: HashMap::new(),
            next_stable_id: 1,
        }
    }

    /// Registers a detection of `raw_id` at `frame_index`. A previously unseen
    /// raw id gets the next stable id and its entry timestamp; a known one only
    /// has its last-seen frame refreshed. Returns the stable id and whether the
    /// track was created by this call.
    pub fn observe(&mut self, raw_id: i64, frame_index: u64, now: NaiveTime) -> (u32, bool) {
        if let Some(track) = self.tracks.get_mut(&raw_id) {
            track.last_seen_frame = frame_index;
            return (track.stable_id, false);
        }
        let stable_id = self.next_stable_id;
        self.next_stable_id += 1;
        self.tracks.insert(
            raw_id,
            Track {
                stable_id,
                entry_time: now,
                exit_time: None,
                last_seen_frame: frame_index,
            },
        );
        (stable_id, true)
    }

    /// Times out tracks that have gone undetected for more than
    /// `timeout_frames` frames. Must run once per frame, after the frame's
    /// `observe` calls, over the full track set. Exited tracks are terminal:
    /// the exit timestamp is set exactly once and never cleared. Returns the
    /// stable ids that exited on this sweep.
    pub fn sweep(&mut self, frame_index: u64, now: NaiveTime, timeout_frames: u64) -> Vec<u32> {
        let mut exited = Vec::new();
        for track in self.tracks.values_mut() {
            if track.exit_time.is_none() && frame_index - track.last_seen_frame > timeout_frames {
                track.exit_time = Some(now);
                exited.push(track.stable_id);
            }
        }
        exited.sort_unstable();
        exited
    }

    /// All tracks ever created, ordered by stable id. Tracks that never timed
    /// out carry an empty exit time.
    pub fn export(&self) -> Vec<TrackRow> {
        let mut rows: Vec<TrackRow> = self
            .tracks
            .values()
            .map(|track| TrackRow {
                person_id: track.stable_id,
                entry_time: track.entry_time.format(TIME_FORMAT).to_string(),
                exit_time: track.exit_time.map(|t| t.format(TIME_FORMAT).to_string()),
            })
            .collect();
        rows.sort_unstable_by_key(|row| row.person_id);
        rows
    }

    pub fn unique_count(&self) -> u32 {
        self.next_stable_id - 1
    }

    pub fn active_count(&self) -> usize {
        self.tracks.values().filter(|t| t.exit_time.is_none()).count()
    }
}

/// Writes the entry/exit log as CSV with `Person_ID,Entry_Time,Exit_Time`
/// columns.
pub fn write_csv(path: &Path, rows: &[TrackRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
