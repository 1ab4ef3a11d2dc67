use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::{highgui, imgproc, prelude::*, videoio};

use footfall::detect::{BBox, Detection, PersonDetector, YoloByteTrack};
use footfall::events::{timestamp_now, IntervalEvent, JsonLogger, SessionEvent, TransitionEvent};
use footfall::motion::MotionEstimator;
use footfall::registry::{write_csv, TrackRegistry};
use footfall::timeline::{FrameRecord, TrackedObject};

#[derive(Parser, Debug)]
#[command(name = "track", about = "Stable-ID people tracking with entry/exit logging")]
struct Args {
    /// Input video file
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
    /// ONNX model for the detection collaborator
    #[arg(long, default_value = "assets/models/yolov8l.onnx")]
    model: PathBuf,
    /// Entry/exit log output
    #[arg(long, default_value = "people_entry_exit_log.csv")]
    output_csv: PathBuf,
    /// Frame-by-frame detection record consumed by the summarize stage
    #[arg(long)]
    detections_json: Option<PathBuf>,
    /// Line-delimited JSON event log
    #[arg(long)]
    log_json: Option<PathBuf>,
    #[arg(long, default_value_t = 0.30)]
    conf_thresh: f32,
    #[arg(long, default_value_t = 40)]
    min_width: i32,
    #[arg(long, default_value_t = 90)]
    min_height: i32,
    /// Frames a person may go undetected before counting as exited
    #[arg(long, default_value_t = 40)]
    timeout_frames: u64,
    #[arg(long, default_value_t = 5)]
    log_interval_seconds: u64,
    #[arg(long)]
    headless: bool,
}

/// Overlay gate. Detections failing it are still tracked; they are just not
/// drawn.
struct QualityFilter {
    conf_thresh: f32,
    min_width: i32,
    min_height: i32,
}

impl QualityFilter {
    fn is_clear(&self, detection: &Detection) -> bool {
        detection.confidence >= self.conf_thresh
            && detection.bbox.width() as i32 >= self.min_width
            && detection.bbox.height() as i32 >= self.min_height
    }
}

struct FrameOutcome {
    record: FrameRecord,
    entered: Vec<u32>,
    exited: Vec<u32>,
    overlays: Vec<(u32, BBox)>,
}

/// Per-frame bookkeeping: observe every detection, then sweep the full track
/// set for timeouts. Only the overlay list respects the quality filter.
fn process_frame(
    detections: &[Detection],
    registry: &mut TrackRegistry,
    motion: &mut MotionEstimator,
    frame_index: u64,
    now: chrono::NaiveTime,
    timeout_frames: u64,
    quality: &QualityFilter,
) -> FrameOutcome {
    let mut entered = Vec::new();
    let mut overlays = Vec::new();
    let mut objects = Vec::with_capacity(detections.len());

    for detection in detections {
        let (stable_id, is_new) = registry.observe(detection.raw_id, frame_index, now);
        if is_new {
            entered.push(stable_id);
        }

        let center = detection.bbox.center();
        let (direction, speed) = motion.step(detection.raw_id, center);
        objects.push(TrackedObject {
            id: i64::from(stable_id),
            direction,
            speed,
            center,
        });

        if quality.is_clear(detection) {
            overlays.push((stable_id, detection.bbox));
        }
    }

    let exited = registry.sweep(frame_index, now, timeout_frames);

    FrameOutcome {
        record: FrameRecord {
            frame: frame_index,
            objects,
        },
        entered,
        exited,
        overlays,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let source = args.file.to_string_lossy().to_string();
    let mut capture = videoio::VideoCapture::from_file(&source, videoio::CAP_ANY)
        .with_context(|| format!("failed to open input source: {source}"))?;
    if !capture.is_opened()? {
        bail!("failed to open input source: {source}");
    }
    let fps = capture.get(videoio::CAP_PROP_FPS)?;

    let mut detector = YoloByteTrack::new(&args.model, args.conf_thresh, fps)?;

    let mut json_logger = match args.log_json.as_ref() {
        Some(path) => Some(JsonLogger::new(path)?),
        None => None,
    };
    if let Some(logger) = json_logger.as_mut() {
        let model = args.model.to_string_lossy();
        logger.write_event(&SessionEvent {
            event: "session_start",
            timestamp: timestamp_now(),
            source: &source,
            model: &model,
            conf_thresh: args.conf_thresh,
            min_width: args.min_width,
            min_height: args.min_height,
            timeout_frames: args.timeout_frames,
        })?;
        logger.flush()?;
    }

    let mut display_enabled = !args.headless;
    let window_name = "Footfall Tracker";
    if display_enabled {
        if let Err(err) = highgui::named_window(window_name, highgui::WINDOW_AUTOSIZE) {
            tracing::warn!("Failed to open display window: {}. Running headless.", err);
            display_enabled = false;
        }
    }

    let quality = QualityFilter {
        conf_thresh: args.conf_thresh,
        min_width: args.min_width,
        min_height: args.min_height,
    };
    let mut registry = TrackRegistry::new();
    let mut motion = MotionEstimator::new();
    let mut frame_records: Vec<FrameRecord> = Vec::new();

    let start_time = Instant::now();
    let mut last_interval = Instant::now();
    let mut frame_index: u64 = 0;
    let mut frame = Mat::default();

    loop {
        if !capture.read(&mut frame)? {
            break;
        }
        if frame.empty() {
            break;
        }
        frame_index += 1;

        let detections = detector.detect(&frame)?;
        let outcome = process_frame(
            &detections,
            &mut registry,
            &mut motion,
            frame_index,
            Local::now().time(),
            args.timeout_frames,
            &quality,
        );

        for person_id in &outcome.entered {
            tracing::info!("ENTRY -> ID {person_id}");
        }
        for person_id in &outcome.exited {
            tracing::info!("EXIT -> ID {person_id}");
        }
        if let Some(logger) = json_logger.as_mut() {
            for person_id in &outcome.entered {
                logger.write_event(&TransitionEvent {
                    event: "entry",
                    timestamp: timestamp_now(),
                    frame_index,
                    person_id: *person_id,
                })?;
            }
            for person_id in &outcome.exited {
                logger.write_event(&TransitionEvent {
                    event: "exit",
                    timestamp: timestamp_now(),
                    frame_index,
                    person_id: *person_id,
                })?;
            }
        }

        if args.detections_json.is_some() {
            frame_records.push(outcome.record);
        }

        if display_enabled {
            draw_overlays(&mut frame, &outcome.overlays)?;
            draw_hud(
                &mut frame,
                registry.unique_count(),
                registry.active_count(),
                start_time,
                frame_index,
            )?;
            highgui::imshow(window_name, &frame)?;
            let key = highgui::wait_key(1)?;
            if key == 27 || key == 113 {
                tracing::info!("interrupted at frame {frame_index}; exporting accumulated tracks");
                break;
            }
        }

        if last_interval.elapsed().as_secs() >= args.log_interval_seconds {
            tracing::info!(
                "frames={} unique={} active={}",
                frame_index,
                registry.unique_count(),
                registry.active_count()
            );
            if let Some(logger) = json_logger.as_mut() {
                logger.write_event(&IntervalEvent {
                    event: "summary",
                    timestamp: timestamp_now(),
                    frame_index,
                    unique_people: registry.unique_count(),
                    active_tracks: registry.active_count(),
                })?;
                logger.flush()?;
            }
            last_interval = Instant::now();
        }
    }

    if frame_index == 0 {
        bail!("no frames read from {source}");
    }

    if let Some(logger) = json_logger.as_mut() {
        logger.flush()?;
    }

    write_csv(&args.output_csv, &registry.export())?;
    tracing::info!("log saved: {}", args.output_csv.display());

    if let Some(path) = args.detections_json.as_ref() {
        write_detections(path, &frame_records)?;
        tracing::info!("detections saved: {}", path.display());
    }

    Ok(())
}

/// Serializes the full record in one shot so a failure cannot leave a
/// truncated file behind.
fn write_detections(path: &Path, records: &[FrameRecord]) -> Result<()> {
    let body = serde_json::to_vec_pretty(records)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

fn draw_overlays(frame: &mut Mat, overlays: &[(u32, BBox)]) -> Result<()> {
    let color = Scalar::new(0.0, 255.0, 0.0, 0.0);
    for (stable_id, bbox) in overlays {
        let rect = Rect::new(
            bbox.x1 as i32,
            bbox.y1 as i32,
            bbox.width().max(1.0) as i32,
            bbox.height().max(1.0) as i32,
        );
        imgproc::rectangle(frame, rect, color, 2, imgproc::LINE_8, 0)?;
        let label = format!("ID {stable_id}");
        let origin = Point::new(rect.x, (rect.y - 5).max(0));
        imgproc::put_text(
            frame,
            &label,
            origin,
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.7,
            color,
            2,
            imgproc::LINE_8,
            false,
        )?;
    }
    Ok(())
}

fn draw_hud(
    frame: &mut Mat,
    unique: u32,
    active: usize,
    start_time: Instant,
    frame_index: u64,
) -> Result<()> {
    let elapsed = start_time.elapsed().as_secs_f64();
    let fps = if elapsed > 0.0 {
        frame_index as f64 / elapsed
    } else {
        0.0
    };

    let color = Scalar::new(0.0, 255.0, 0.0, 0.0);
    let text = format!("Unique: {unique} | Active: {active} | FPS: {fps:.1}");
    imgproc::put_text(
        frame,
        &text,
        Point::new(10, 24),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.6,
        color,
        2,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn detection(raw_id: i64, confidence: f32, x: f32, w: f32, h: f32) -> Detection {
        Detection {
            raw_id,
            bbox: BBox {
                x1: x,
                y1: 0.0,
                x2: x + w,
                y2: h,
            },
            confidence,
        }
    }

    fn quality() -> QualityFilter {
        QualityFilter {
            conf_thresh: 0.30,
            min_width: 40,
            min_height: 90,
        }
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn quality_filter_gates_overlays_not_lifecycle() {
        let mut registry = TrackRegistry::new();
        let mut motion = MotionEstimator::new();

        // low-confidence, undersized box: tracked, never drawn
        let detections = vec![detection(77, 0.10, 0.0, 10.0, 10.0)];
        let outcome = process_frame(
            &detections,
            &mut registry,
            &mut motion,
            1,
            noon(),
            40,
            &quality(),
        );

        assert_eq!(outcome.entered, vec![1]);
        assert!(outcome.overlays.is_empty());
        assert_eq!(outcome.record.objects.len(), 1);
        assert_eq!(registry.unique_count(), 1);
    }

    #[test]
    fn undetected_people_time_out_on_later_frames() {
        let mut registry = TrackRegistry::new();
        let mut motion = MotionEstimator::new();
        let q = quality();

        let outcome = process_frame(
            &[detection(5, 0.9, 0.0, 50.0, 100.0)],
            &mut registry,
            &mut motion,
            1,
            noon(),
            3,
            &q,
        );
        assert_eq!(outcome.entered, vec![1]);

        // the person disappears; frames 2..=4 stay within the timeout
        for frame_index in 2..=4 {
            let outcome =
                process_frame(&[], &mut registry, &mut motion, frame_index, noon(), 3, &q);
            assert!(outcome.exited.is_empty());
        }
        let outcome = process_frame(&[], &mut registry, &mut motion, 5, noon(), 3, &q);
        assert_eq!(outcome.exited, vec![1]);
    }

    #[test]
    fn frame_record_uses_stable_ids_and_motion_labels() {
        let mut registry = TrackRegistry::new();
        let mut motion = MotionEstimator::new();
        let q = quality();

        process_frame(
            &[detection(9_000, 0.9, 100.0, 50.0, 100.0)],
            &mut registry,
            &mut motion,
            1,
            noon(),
            40,
            &q,
        );
        let outcome = process_frame(
            &[detection(9_000, 0.9, 90.0, 50.0, 100.0)],
            &mut registry,
            &mut motion,
            2,
            noon(),
            40,
            &q,
        );

        let object = &outcome.record.objects[0];
        assert_eq!(object.id, 1);
        assert_eq!(object.direction, "left");
        assert_eq!(object.speed, 10.0);
    }
}
