// src/video_processor.rs

use crate::types::{Frame, VideoConfig};
use anyhow::{bail, Context, Result};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTraitConst},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct VideoProcessor {
    config: VideoConfig,
}

impl VideoProcessor {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn find_video_files(&self) -> Result<Vec<PathBuf>> {
        let mut videos = Vec::new();

        for entry in WalkDir::new(&self.config.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && self.is_video(path) {
                videos.push(path.to_path_buf());
            }
        }
        videos.sort();

        info!("Found {} video files in {}", videos.len(), self.config.input_dir);
        Ok(videos)
    }

    pub fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

pub fn open_video(path: &Path) -> Result<VideoReader> {
    info!("Opening video: {}", path.display());

    if !path.is_file() {
        bail!("File does not exist");
    }
    let path_str = path.to_str().context("Video path is not valid UTF-8")?;

    let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        bail!("Failed to open video file");
    }

    let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
    let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i64;
    let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as usize;
    let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as usize;

    info!(
        "Video properties: {}x{} @ {:.1} FPS, {} frames",
        width, height, fps, total_frames
    );

    Ok(VideoReader {
        cap,
        // webm from browsers often reports 0 fps
        fps: if fps > 0.0 { fps } else { 30.0 },
        frames_read: 0,
    })
}

pub struct VideoReader {
    cap: VideoCapture,
    fps: f64,
    frames_read: u64,
}

impl VideoReader {
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        use opencv::videoio::VideoCaptureTrait;

        let mut mat = Mat::default();

        if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? || mat.empty() {
            return Ok(None);
        }

        self.frames_read += 1;
        let timestamp_ms = (self.frames_read as f64 / self.fps) * 1000.0;

        let mut rgb_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;

        let data = rgb_mat.data_bytes()?.to_vec();
        debug!("Decoded frame {}", self.frames_read);

        Ok(Some(Frame {
            data,
            width: rgb_mat.cols() as usize,
            height: rgb_mat.rows() as usize,
            timestamp_ms,
        }))
    }
}

impl Iterator for VideoReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> VideoProcessor {
        VideoProcessor::new(VideoConfig::default())
    }

    #[test]
    fn test_is_video_ignores_case() {
        let p = processor();
        assert!(p.is_video(Path::new("clips/session.MP4")));
        assert!(p.is_video(Path::new("camera_ab12.webm")));
        assert!(!p.is_video(Path::new("notes.txt")));
        assert!(!p.is_video(Path::new("no_extension")));
    }

    #[test]
    fn test_open_missing_video_fails() {
        assert!(open_video(Path::new("/definitely/not/here.mp4")).is_err());
    }
}
