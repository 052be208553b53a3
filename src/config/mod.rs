pub mod rules;

pub use rules::{DatasetConfig, LabelMapping, OcclusionMode, SamplingRules};
