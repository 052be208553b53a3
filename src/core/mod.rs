pub mod crop_writer;
pub mod dispatcher;
pub mod layout;
pub mod video_job;

pub use video_job::JobSettings;
