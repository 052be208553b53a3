use opencv::{core::Mat, prelude::*, videoio};
use std::path::Path;

use super::frame_data::FrameData;
use crate::error::VideoError;
use crate::utils::logger;

/// Anything that yields decoded frames in stream order.
pub trait FrameSource {
    /// `Ok(None)` marks the end of the stream.
    fn read_frame(&mut self) -> Result<Option<Mat>, VideoError>;
}

pub struct VideoDecoder {
    capture: videoio::VideoCapture,
    path: String,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let path = path.to_string_lossy().into_owned();

        // CAP_ANY lets OpenCV pick the backend for the container
        let capture = videoio::VideoCapture::from_file(&path, videoio::CAP_ANY)
            .map_err(|e| VideoError::Open(format!("{}: {}", path, e)))?;

        if !capture.is_opened()? {
            return Err(VideoError::Open(path));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let frames = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        logger::debug(&format!(
            "opened {}: {}x{} @ {:.2} fps, ~{} frames",
            path, width, height, fps, frames as i64
        ));

        Ok(Self { capture, path })
    }
}

impl FrameSource for VideoDecoder {
    fn read_frame(&mut self) -> Result<Option<Mat>, VideoError> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? {
            return Ok(None);
        }
        if frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            logger::error(&format!("failed to release {}: {}", self.path, e));
        }
    }
}

/// Walks a [`FrameSource`] one frame at a time, numbering frames from 0.
///
/// Decode errors end the walk the same way end-of-stream does. With
/// `skip_first` the first decoded image is discarded, so frame N carries
/// the image at stream position N+1.
pub struct FrameCursor<'s, S: FrameSource + ?Sized> {
    source: &'s mut S,
    next_index: u64,
    skip_first: bool,
    finished: bool,
}

impl<'s, S: FrameSource + ?Sized> FrameCursor<'s, S> {
    pub fn new(source: &'s mut S, skip_first: bool) -> Self {
        Self {
            source,
            next_index: 0,
            skip_first,
            finished: false,
        }
    }

    /// Frames handed out so far.
    pub fn position(&self) -> u64 {
        self.next_index
    }

    fn pull(&mut self) -> Option<Mat> {
        match self.source.read_frame() {
            Ok(Some(image)) => Some(image),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                logger::debug(&format!("decoding stopped at frame {}: {}", self.next_index, e));
                self.finished = true;
                None
            }
        }
    }
}

impl<S: FrameSource + ?Sized> Iterator for FrameCursor<'_, S> {
    type Item = FrameData;

    fn next(&mut self) -> Option<FrameData> {
        if self.finished {
            return None;
        }
        if self.skip_first {
            self.skip_first = false;
            self.pull()?;
        }

        let image = self.pull()?;
        let frame = FrameData::new(self.next_index, image);
        self.next_index += 1;
        Some(frame)
    }
}
