//! Transcoder engine selection.
//!
//! Building the actual FFmpeg/GStreamer command line is explicitly out of
//! scope; this module only models which engine a job wants
//! and how `auto` resolves to a concrete one given a scenario and a worker's
//! capabilities.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Auto,
    Ffmpeg,
    Gstreamer,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::Auto
    }
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Auto => "auto",
            Engine::Ffmpeg => "ffmpeg",
            Engine::Gstreamer => "gstreamer",
        }
    }

    /// Resolve `auto` to a concrete engine. GStreamer is only picked for
    /// scenarios that name it explicitly; everything else prefers FFmpeg,
    /// which covers the broadest codec/hardware-acceleration surface.
    pub fn resolve(&self, scenario: &str) -> Engine {
        match self {
            Engine::Auto => {
                if scenario.to_ascii_lowercase().contains("gstreamer") {
                    Engine::Gstreamer
                } else {
                    Engine::Ffmpeg
                }
            }
            concrete => *concrete,
        }
    }
}

/// Scenario names containing any of these substrings are presumed to
/// benefit from hardware acceleration when scheduling.
const HARDWARE_SCENARIO_HINTS: &[&str] = &["4k", "hevc", "av1", "hdr", "realtime", "live"];

pub fn scenario_wants_hardware_acceleration(scenario: &str) -> bool {
    let scenario = scenario.to_ascii_lowercase();
    HARDWARE_SCENARIO_HINTS.iter().any(|hint| scenario.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_resolves_to_ffmpeg_by_default() {
        assert_eq!(Engine::Auto.resolve("standard_1080p"), Engine::Ffmpeg);
    }

    #[test]
    fn auto_resolves_to_gstreamer_when_named() {
        assert_eq!(Engine::Auto.resolve("gstreamer_pipeline"), Engine::Gstreamer);
    }

    #[test]
    fn hardware_hint_detection() {
        assert!(scenario_wants_hardware_acceleration("4k_hevc_transcode"));
        assert!(!scenario_wants_hardware_acceleration("standard_1080p"));
    }
}
