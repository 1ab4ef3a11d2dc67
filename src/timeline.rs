use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Number of leading per-frame samples kept in each compact record.
pub const SAMPLE_LEN: usize = 20;

/// One frame of the per-frame detection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub objects: Vec<TrackedObject>,
}

/// One active person within a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: i64,
    pub direction: String,
    pub speed: f64,
    pub center: (f64, f64),
}

/// Compact per-person record embedded into the generation prompt.
///
/// `avg_speed` is the modal speed, not a mean; the field name follows the
/// established output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub person_id: i64,
    pub first_frame: u64,
    pub last_frame: u64,
    pub dominant_direction: String,
    pub avg_speed: f64,
    pub movement_samples: Vec<String>,
    pub speed_samples: Vec<f64>,
}

#[derive(Debug)]
struct History {
    first_frame: u64,
    last_frame: u64,
    movement: Vec<String>,
    speed: Vec<f64>,
}

/// Most frequent value over the full history. Ties go to the value that was
/// observed first, which keeps the reduction deterministic.
fn mode<T, K, F>(values: &[T], key: F) -> Option<&T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    for value in values {
        *counts.entry(key(value)).or_insert(0) += 1;
    }
    let mut best: Option<(&T, usize)> = None;
    for value in values {
        let count = counts[&key(value)];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Builds one running history per person id over all frames, then reduces each
/// to a compact record. Frames are iterated in input order.
pub fn summarize_frames(frames: &[FrameRecord]) -> BTreeMap<i64, PersonSummary> {
    let mut histories: BTreeMap<i64, History> = BTreeMap::new();

    for record in frames {
        for object in &record.objects {
            let history = histories.entry(object.id).or_insert_with(|| History {
                first_frame: record.frame,
                last_frame: record.frame,
                movement: Vec::new(),
                speed: Vec::new(),
            });
            history.last_frame = record.frame;
            history.movement.push(object.direction.clone());
            history.speed.push(object.speed);
        }
    }

    histories
        .into_iter()
        .map(|(person_id, history)| {
            let dominant_direction = mode(&history.movement, |d| d.clone())
                .cloned()
                .unwrap_or_default();
            let avg_speed = mode(&history.speed, |s| s.to_bits()).copied().unwrap_or(0.0);
            let summary = PersonSummary {
                person_id,
                first_frame: history.first_frame,
                last_frame: history.last_frame,
                dominant_direction,
                avg_speed,
                movement_samples: history.movement.iter().take(SAMPLE_LEN).cloned().collect(),
                speed_samples: history.speed.iter().take(SAMPLE_LEN).copied().collect(),
            };
            (person_id, summary)
        })
        .collect()
}
