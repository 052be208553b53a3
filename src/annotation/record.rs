use serde::Serialize;

/// Box corners in pixels, top-left and bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x_tl: i32,
    pub y_tl: i32,
    pub x_br: i32,
    pub y_br: i32,
}

impl BoundingBox {
    pub fn new(x_tl: i32, y_tl: i32, x_br: i32, y_br: i32) -> Self {
        Self { x_tl, y_tl, x_br, y_br }
    }
}

/// One tracked subject at one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectRecord {
    pub track_id: u32,
    pub bbox: BoundingBox,
    pub behavior: Option<String>,
    pub occluded: bool,
}

impl SubjectRecord {
    pub fn behavior(&self) -> Option<&str> {
        self.behavior.as_deref()
    }
}
