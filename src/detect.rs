use std::path::Path;

use anyhow::{Context, Result};
use jamtrack_rs::byte_tracker::ByteTracker;
use jamtrack_rs::{Object, Rect as TrackRect};
use ndarray::Array3;
use opencv::core::{AlgorithmHint, Mat};
use opencv::{imgproc, prelude::*};
use ultralytics_inference::{InferenceConfig, YOLOModel};

/// COCO class id for "person". Every other class is discarded before it can
/// reach overlay or lifecycle logic.
const PERSON_CLASS: i64 = 0;

const NMS_IOU: f32 = 0.45;
const MAX_DETECTIONS: usize = 300;
const TRACK_BUFFER: usize = 30;
const TRACK_THRESH: f32 = 0.25;
const HIGH_THRESH: f32 = 0.6;
const MATCH_THRESH: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x1 + self.x2) / 2.0,
            f64::from(self.y1 + self.y2) / 2.0,
        )
    }
}

/// One person detection carrying the collaborator's persistent raw id.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub raw_id: i64,
    pub bbox: BBox,
    pub confidence: f32,
}

/// Narrow seam over the external detector+tracker collaborator. Per frame it
/// returns zero or more person detections, each with a raw id the collaborator
/// keeps stable across frames by its own association logic.
pub trait PersonDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>>;
}

/// Production collaborator: YOLO ONNX inference with ByteTrack association.
/// The confidence threshold is pushed into the model config, so everything
/// this returns already cleared it.
pub struct YoloByteTrack {
    model: YOLOModel,
    tracker: ByteTracker,
}

impl YoloByteTrack {
    pub fn new(model_path: &Path, conf_thresh: f32, fps: f64) -> Result<Self> {
        let config = InferenceConfig::new()
            .with_confidence(conf_thresh)
            .with_iou(NMS_IOU)
            .with_max_det(MAX_DETECTIONS);
        let model = YOLOModel::load_with_config(model_path.to_path_buf(), config)
            .with_context(|| format!("failed to load model {}", model_path.display()))?;
        let tracker = ByteTracker::new(
            fps.round().max(1.0) as usize,
            TRACK_BUFFER,
            TRACK_THRESH,
            HIGH_THRESH,
            MATCH_THRESH,
        );
        Ok(Self { model, tracker })
    }
}

impl PersonDetector for YoloByteTrack {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let input = mat_to_array3_rgb(frame)?;
        let results = self.model.predict_array(&input, String::new())?;

        let mut objects: Vec<Object> = Vec::new();
        if let Some(result) = results.first() {
            if let Some(boxes) = result.boxes.as_ref() {
                let xyxy = boxes.xyxy().to_owned();
                let conf = boxes.conf().to_owned();
                let cls = boxes.cls().to_owned();

                for i in 0..boxes.len() {
                    if cls[i] as i64 != PERSON_CLASS {
                        continue;
                    }
                    let x1 = xyxy[[i, 0]];
                    let y1 = xyxy[[i, 1]];
                    let x2 = xyxy[[i, 2]];
                    let y2 = xyxy[[i, 3]];
                    if x2 <= x1 || y2 <= y1 {
                        continue;
                    }
                    objects.push(Object::new(TrackRect::from_xyxy(x1, y1, x2, y2), conf[i], None));
                }
            }
        }

        let tracked = self.tracker.update(&objects)?;
        let mut detections = Vec::with_capacity(tracked.len());
        for object in tracked {
            // detections the tracker could not associate carry no raw id
            let Some(raw_id) = object.get_track_id() else {
                continue;
            };
            let [x1, y1, x2, y2] = object.get_rect().get_xyxy();
            detections.push(Detection {
                raw_id: raw_id as i64,
                bbox: BBox { x1, y1, x2, y2 },
                confidence: object.get_prob(),
            });
        }
        Ok(detections)
    }
}

/// BGR `Mat` to the RGB HWC array the inference collaborator consumes.
pub fn mat_to_array3_rgb(mat: &Mat) -> Result<Array3<u8>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        mat,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let rows = rgb.rows() as usize;
    let cols = rgb.cols() as usize;
    let data = rgb.data_bytes()?.to_vec();
    Ok(Array3::from_shape_vec((rows, cols, 3), data)?)
}
