pub mod policy;

pub use policy::SamplingPolicy;
