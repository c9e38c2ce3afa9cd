use std::collections::BTreeSet;

use image::RgbImage;
use log::info;
use shared::MediaCategory;

use crate::detect::frames::VideoFrames;
use crate::detect::{Detect, PipelineError, health};

/// Distinct labels seen across all frames of one media item. The ordered
/// set keeps the joined output deterministic.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub labels: BTreeSet<String>,
    pub frames_seen: usize,
    pub truncated: bool,
}

fn scan_frames(
    detector: &dyn Detect,
    frames: impl Iterator<Item = RgbImage>,
) -> Result<(BTreeSet<String>, usize), PipelineError> {
    let mut labels = BTreeSet::new();
    let mut frames_seen = 0;
    for frame in frames {
        frames_seen += 1;
        for detection in detector.detect(&frame)? {
            labels.insert(detection.label);
        }
    }
    Ok((labels, frames_seen))
}

pub fn scan_image(
    detector: &dyn Detect,
    frame: &RgbImage,
) -> Result<DetectionOutcome, PipelineError> {
    let mut labels = BTreeSet::new();
    for detection in detector.detect(frame)? {
        labels.insert(detection.label);
    }
    Ok(DetectionOutcome {
        labels,
        frames_seen: 1,
        truncated: false,
    })
}

pub fn scan_video(
    detector: &dyn Detect,
    mut frames: VideoFrames,
) -> Result<DetectionOutcome, PipelineError> {
    let (labels, frames_seen) = scan_frames(detector, &mut frames)?;
    info!(
        "video scan finished: {} frames, {} distinct labels",
        frames_seen,
        labels.len()
    );
    Ok(DetectionOutcome {
        labels,
        frames_seen,
        truncated: frames.hit_cap(),
    })
}

/// The user-facing result line: label list or the no-detection text, a
/// truncation note when the video hit the frame cap, then the health
/// suffix when any label was seen.
pub fn summarize(category: MediaCategory, outcome: &DetectionOutcome) -> String {
    let mut text = if outcome.labels.is_empty() {
        match category {
            MediaCategory::Video => "No animal detected in video".to_string(),
            _ => "No animal detected".to_string(),
        }
    } else {
        let joined = outcome
            .labels
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        match category {
            MediaCategory::Video => format!("Detected in Video: {joined}"),
            _ => format!("Detected: {joined}"),
        }
    };

    if outcome.truncated {
        text.push_str(&format!(" (first {} frames analyzed)", outcome.frames_seen));
    }
    if let Some(status) = health::assess(&outcome.labels) {
        text.push_str(status.suffix());
    }
    text
}
