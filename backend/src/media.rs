use std::path::PathBuf;

use shared::MediaCategory;

const IMAGE_EXT: &[&str] = &["jpg", "jpeg", "png"];
const VIDEO_EXT: &[&str] = &["mp4", "avi", "mov"];
const AUDIO_EXT: &[&str] = &["mp3", "wav", "aac"];
const DOC_EXT: &[&str] = &["pdf", "docx", "txt"];

/// One uploaded file, classified at upload time. Immutable afterwards.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub path: PathBuf,
    pub extension: String,
    pub category: MediaCategory,
}

impl MediaItem {
    pub fn from_upload(file_name: &str, path: PathBuf) -> Self {
        let extension = extension_of(file_name);
        let category = classify(file_name);
        Self {
            path,
            extension,
            category,
        }
    }
}

/// The substring after the last `.`, lowercased. A name without a dot
/// degenerates to the whole name, which matches no table.
pub fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or(file_name)
        .to_lowercase()
}

pub fn classify(file_name: &str) -> MediaCategory {
    let ext = extension_of(file_name);
    let ext = ext.as_str();
    if IMAGE_EXT.contains(&ext) {
        MediaCategory::Image
    } else if VIDEO_EXT.contains(&ext) {
        MediaCategory::Video
    } else if AUDIO_EXT.contains(&ext) {
        MediaCategory::Audio
    } else if DOC_EXT.contains(&ext) {
        MediaCategory::Document
    } else {
        MediaCategory::Unknown
    }
}
