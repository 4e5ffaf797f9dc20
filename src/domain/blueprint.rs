use serde::{Deserialize, Serialize};

/// Declarative description of one video-assembly job: an ordered set of
/// clips, one audio track, and the output encoding. Immutable once built;
/// produced by [`crate::domain::validator::Validator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub task_id: String,
    pub audio_path: String,
    pub moves: Vec<Move>,
    pub output_config: OutputConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_tempo: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<TransitionType>,
    /// Passthrough metadata from the task creator; never interpreted here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_parameters: Option<serde_json::Value>,
}

/// One clip reference and its placement. Clips are concatenated strictly in
/// array order; `start_time` is informational unless strict timeline
/// validation is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Move {
    pub clip_id: String,
    pub video_path: String,
    pub start_time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    Cut,
    Crossfade,
    FadeBlack,
    FadeWhite,
}

/// Encoding parameters for the mux stage with every default resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub frame_rate: u32,
}

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_VIDEO_BITRATE: &str = "2000k";
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
pub const DEFAULT_FRAME_RATE: u32 = 30;

impl OutputConfig {
    /// Resolve optional codec/bitrate fields against the defaults.
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self
                .video_codec
                .clone()
                .unwrap_or_else(|| DEFAULT_VIDEO_CODEC.to_string()),
            audio_codec: self
                .audio_codec
                .clone()
                .unwrap_or_else(|| DEFAULT_AUDIO_CODEC.to_string()),
            video_bitrate: self
                .video_bitrate
                .clone()
                .unwrap_or_else(|| DEFAULT_VIDEO_BITRATE.to_string()),
            audio_bitrate: self
                .audio_bitrate
                .clone()
                .unwrap_or_else(|| DEFAULT_AUDIO_BITRATE.to_string()),
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

impl Blueprint {
    /// Sum of per-move durations, the fallback when the muxed output cannot
    /// be probed.
    pub fn planned_duration(&self) -> f64 {
        self.moves.iter().map(|m| m.duration).sum()
    }
}
