use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use image::RgbImage;
use log::{debug, warn};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("ffprobe failed: {0}")]
    Probe(String),
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode an uploaded still image into its single frame.
pub fn single_frame(path: &Path) -> Result<RgbImage, FrameError> {
    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(image.to_rgb8())
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

fn probe_dimensions(path: &Path) -> Result<(u32, u32), FrameError> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        return Err(FrameError::Probe(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    let probe: FfprobeOutput =
        serde_json::from_slice(&output.stdout).map_err(|e| FrameError::Probe(e.to_string()))?;
    probe
        .streams
        .iter()
        .find(|stream| stream.codec_type == "video")
        .and_then(|stream| Some((stream.width?, stream.height?)))
        .ok_or_else(|| FrameError::Probe("no video stream found".to_string()))
}

/// Frames of one video, decoded by an ffmpeg child process writing rgb24
/// rawvideo to its stdout. The sequence is finite and not restartable;
/// end-of-stream and short reads both end iteration. The child is killed
/// and reaped when the source is dropped.
pub struct VideoFrames {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    produced: usize,
    max_frames: usize,
    hit_cap: bool,
}

impl VideoFrames {
    pub fn open(path: &Path, max_frames: usize) -> Result<Self, FrameError> {
        let (width, height) = probe_dimensions(path)?;

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-pix_fmt", "rgb24", "-f", "rawvideo", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(FrameError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FrameError::Spawn(std::io::Error::other("ffmpeg stdout not captured")))?;

        debug!("decoding {}x{} video {}", width, height, path.display());
        Ok(Self {
            child,
            stdout,
            width,
            height,
            produced: 0,
            max_frames,
            hit_cap: false,
        })
    }

    /// Whether iteration stopped at the frame cap rather than end-of-stream.
    pub fn hit_cap(&self) -> bool {
        self.hit_cap
    }
}

impl Iterator for VideoFrames {
    type Item = RgbImage;

    fn next(&mut self) -> Option<RgbImage> {
        if self.produced >= self.max_frames {
            self.hit_cap = true;
            return None;
        }

        let mut buf = vec![0u8; (self.width * self.height * 3) as usize];
        if let Err(e) = self.stdout.read_exact(&mut buf) {
            // A truncated or corrupt stream yields whatever decoded so far.
            if e.kind() != std::io::ErrorKind::UnexpectedEof {
                warn!("video stream read ended early: {e}");
            }
            return None;
        }

        let frame = RgbImage::from_raw(self.width, self.height, buf)?;
        self.produced += 1;
        Some(frame)
    }
}

impl Drop for VideoFrames {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
