use crate::annotation::SubjectRecord;
use crate::config::{OcclusionMode, SamplingRules};
use crate::shared::constants;

/// Decides which frames are materialized as crops.
pub struct SamplingPolicy<'a> {
    rules: &'a SamplingRules,
}

impl<'a> SamplingPolicy<'a> {
    pub fn new(rules: &'a SamplingRules) -> Self {
        Self { rules }
    }

    /// The stride that applies to a frame holding `records`.
    ///
    /// An occluded subject switches the whole frame to the occlusion period
    /// when occlusion is handled. Otherwise the most frequently sampled
    /// behavior present wins, so rare behaviors are never starved.
    pub fn effective_period(&self, records: &[SubjectRecord], mode: OcclusionMode) -> u32 {
        let is_occluded = records.iter().any(|record| record.occluded);
        if is_occluded && mode.handles_occlusion() {
            return self.rules.occluded_period;
        }

        records
            .iter()
            .map(|record| self.rules.period_for(record.behavior()))
            .min()
            .unwrap_or(constants::DEFAULT_PERIOD)
    }

    pub fn should_sample(&self, records: &[SubjectRecord], frame_index: u64, mode: OcclusionMode) -> bool {
        let period = self.effective_period(records, mode).max(1);
        frame_index % u64::from(period) == 0
    }
}
