use opencv::core::Mat;

/// A decoded frame and its position in the stream.
pub struct FrameData {
    pub index: u64,
    pub image: Mat,
}

impl FrameData {
    pub fn new(index: u64, image: Mat) -> Self {
        Self { index, image }
    }
}
