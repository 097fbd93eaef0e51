//! Per-frame counters.

use serde::Serialize;

/// What the device did since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub draw_calls: u64,
    /// Fixed-pipeline state calls actually issued.
    pub state_changes: u64,
    /// State requests that matched the snapshot and issued nothing.
    pub redundant_requests: u64,
    pub program_binds: u64,
    pub texture_binds: u64,
    pub param_uploads: u64,
    /// Constant uploads skipped by the register value cache.
    pub cached_params: u64,
    pub target_switches: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialize_with_field_names() {
        let stats = FrameStats {
            draw_calls: 3,
            ..FrameStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["draw_calls"], 3);
        assert_eq!(json["target_switches"], 0);
    }
}
