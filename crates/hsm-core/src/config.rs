use serde::{Deserialize, Serialize};

/// Runtime-tunable constants governing the spine walker and arc fitter.
///
/// These mirror the compile-time constants of the reference design as
/// plain fields so an embedding application can load them from its own
/// configuration surface (TOML, CLI flags, ...) instead of recompiling.
/// `PlannerConfig::default()` reproduces the documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum controller iterations per arc before giving up and
    /// falling back to the best candidate seen.
    pub iteration_count: u32,

    /// When true, the spine walker prefers the shortest unvisited
    /// branch at each junction; when false, the longest.
    pub breadth_first: bool,

    /// Radius threshold, expressed as a multiple of `step`, below which
    /// the desired step-over is shrunk to avoid overshooting a corner.
    pub corner_zoom: f64,

    /// How strongly `corner_zoom` shrinks the desired step once the
    /// tentative radius falls under the threshold.
    pub corner_zoom_effect: f64,

    /// Arcs whose fragment lies within this distance of the pocket
    /// boundary are suppressed as near-edge jitter.
    pub jitter_filter: f64,

    /// Proportional gain of the arc-fit controller.
    pub kp: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            iteration_count: 50,
            breadth_first: false,
            corner_zoom: 2.0,
            corner_zoom_effect: 1.0,
            jitter_filter: 0.02,
            kp: 0.76,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_table() {
        let cfg = PlannerConfig::default();
        assert_eq!(cfg.iteration_count, 50);
        assert!(!cfg.breadth_first);
        assert_eq!(cfg.corner_zoom, 2.0);
        assert_eq!(cfg.corner_zoom_effect, 1.0);
        assert_eq!(cfg.jitter_filter, 0.02);
        assert_eq!(cfg.kp, 0.76);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = PlannerConfig {
            kp: 0.8,
            ..PlannerConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PlannerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn missing_fields_fall_back_to_default() {
        let cfg: PlannerConfig = serde_json::from_str("{\"kp\": 0.7}").unwrap();
        assert_eq!(cfg.kp, 0.7);
        assert_eq!(cfg.iteration_count, 50);
    }
}
