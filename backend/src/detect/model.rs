use std::sync::{Arc, Mutex};

use image::RgbImage;
use image::imageops::FilterType;
use ndarray::Array;
use tch::{CModule, Device, Kind, Tensor};

use crate::detect::config::ModelParams;
use crate::detect::{BoundingBox, Detect, Detection};

/// The fixed label vocabulary of the detection model (COCO, 80 classes).
pub const CLASS_NAMES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model load failed: {0}")]
    Load(tch::TchError),
    #[error("model forward failed: {0}")]
    Model(tch::TchError),
    #[error("unexpected model output length: {0}")]
    OutputShape(usize),
}

/// YOLOv8 TorchScript module. The raw output is `[1, 4 + classes, boxes]`;
/// candidates below the confidence threshold are dropped and the rest go
/// through per-class non-maximum suppression.
#[derive(Clone)]
pub struct YoloModel {
    module: Arc<Mutex<CModule>>,
    device: Device,
    params: ModelParams,
}

impl YoloModel {
    pub fn load(model_path: &str, params: ModelParams) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(model_path, device).map_err(InferenceError::Load)?;
        Ok(Self {
            module: Arc::new(Mutex::new(module)),
            device,
            params,
        })
    }

    fn preprocess(&self, frame: &RgbImage) -> Tensor {
        let size = self.params.input_size;
        let resized = image::imageops::resize(frame, size, size, FilterType::Triangle);

        // HWC bytes to normalized NCHW float planes.
        let plane = (size * size) as usize;
        let mut chw = vec![0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let idx = (y * size + x) as usize;
            chw[idx] = pixel[0] as f32 / 255.0;
            chw[plane + idx] = pixel[1] as f32 / 255.0;
            chw[2 * plane + idx] = pixel[2] as f32 / 255.0;
        }

        Tensor::from_slice(&chw)
            .view([1, 3, size as i64, size as i64])
            .to_device(self.device)
    }

    fn forward(&self, input: Tensor) -> Result<Vec<f32>, InferenceError> {
        let output = tch::no_grad(|| self.module.lock().unwrap().forward_ts(&[input]))
            .map_err(InferenceError::Model)?;
        let flat = output.to_kind(Kind::Float).view([-1]);
        Vec::<f32>::try_from(&flat).map_err(InferenceError::Model)
    }
}

impl Detect for YoloModel {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        let raw = self.forward(self.preprocess(frame))?;
        let candidates = parse_output(
            &raw,
            self.params.input_size as f32,
            self.params.confidence_threshold,
        )?;
        Ok(non_maximum_suppression(
            candidates,
            self.params.iou_threshold,
        ))
    }
}

/// Turn the flattened `[4 + classes, boxes]` output into thresholded
/// detections with normalized corner-format boxes.
fn parse_output(
    raw: &[f32],
    input_size: f32,
    confidence_threshold: f32,
) -> Result<Vec<Detection>, InferenceError> {
    let num_features = 4 + CLASS_NAMES.len();
    if raw.is_empty() || raw.len() % num_features != 0 {
        return Err(InferenceError::OutputShape(raw.len()));
    }
    let num_boxes = raw.len() / num_features;

    let grid = Array::from_shape_vec((num_features, num_boxes), raw.to_vec())
        .map_err(|_| InferenceError::OutputShape(raw.len()))?;
    let grid = grid.t();

    let mut candidates = Vec::new();
    for b in 0..num_boxes {
        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..CLASS_NAMES.len() {
            let score = grid[[b, 4 + c]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }
        if best_score < confidence_threshold {
            continue;
        }

        // Center format in model pixels to normalized corner format.
        let cx = grid[[b, 0]] / input_size;
        let cy = grid[[b, 1]] / input_size;
        let w = grid[[b, 2]] / input_size;
        let h = grid[[b, 3]] / input_size;
        let x = (cx - w / 2.0).clamp(0.0, 1.0);
        let y = (cy - h / 2.0).clamp(0.0, 1.0);

        candidates.push(Detection {
            class_id: best_class,
            label: CLASS_NAMES[best_class].to_string(),
            confidence: best_score,
            bbox: BoundingBox {
                x,
                y,
                width: w.min(1.0 - x),
                height: h.min(1.0 - y),
            },
        });
    }
    Ok(candidates)
}

/// Drop detections whose box overlaps a higher-confidence detection of the
/// same class beyond the IoU threshold.
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        let overlaps = keep.iter().any(|kept| {
            kept.class_id == detection.class_id
                && iou(&kept.bbox, &detection.bbox) > iou_threshold
        });
        if !overlaps {
            keep.push(detection);
        }
    }
    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;
    if union > 0.0 { intersection / union } else { 0.0 }
}
