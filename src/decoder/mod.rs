pub mod frame_data;
pub mod video;

pub use video::{FrameCursor, FrameSource, VideoDecoder};
