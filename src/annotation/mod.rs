pub mod index;
pub mod record;

pub use index::AnnotationIndex;
pub use record::{BoundingBox, SubjectRecord};
