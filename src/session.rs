use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MINIMUM_IMAGE_SECS: u32 = 5;

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PracticeMode {
    /// every image shown for the same duration, looping over the set
    #[default]
    Normal,
    /// durations grow over a fixed session budget
    Precision,
    /// durations shrink over a fixed session budget
    Speed,
    /// untimed, manual navigation only
    Zen,
    /// generated geometric shapes
    Shapes,
    /// generated figures and poses
    Poses,
}

impl PracticeMode {
    /// Modes whose per-image duration comes from the duration planner.
    pub fn is_ramped(self) -> bool {
        matches!(self, PracticeMode::Precision | PracticeMode::Speed)
    }

    pub fn is_timed(self) -> bool {
        !matches!(self, PracticeMode::Zen)
    }

    /// Bounded sessions finish after the last image; the rest wrap around.
    pub fn is_bounded(self) -> bool {
        matches!(
            self,
            PracticeMode::Precision | PracticeMode::Speed | PracticeMode::Shapes | PracticeMode::Poses
        )
    }

    pub fn is_generative(self) -> bool {
        matches!(self, PracticeMode::Shapes | PracticeMode::Poses)
    }

    pub fn image_set(self) -> ImageSet {
        if self.is_generative() {
            ImageSet::Ai
        } else {
            ImageSet::Custom
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PracticeMode::Normal => "Normal",
            PracticeMode::Precision => "Precision",
            PracticeMode::Speed => "Speed",
            PracticeMode::Zen => "Zen Mode",
            PracticeMode::Shapes => "AI Shapes",
            PracticeMode::Poses => "AI Poses",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageSet {
    Custom,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: PracticeMode,
    /// fixed duration per image for non-ramped modes
    pub per_image_secs: u32,
    /// budget shared by all images in ramped modes
    pub total_session_secs: u32,
    pub interval_secs: u32,
    pub minimum_image_secs: u32,
    pub shuffle: bool,
    pub audible_alerts: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: PracticeMode::Normal,
            per_image_secs: 30,
            total_session_secs: 600,
            interval_secs: 5,
            minimum_image_secs: DEFAULT_MINIMUM_IMAGE_SECS,
            shuffle: true,
            audible_alerts: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_image_secs == 0 {
            return Err(ConfigError::ZeroMinimumDuration);
        }
        if self.mode.is_ramped() && self.total_session_secs < self.minimum_image_secs {
            return Err(ConfigError::BudgetBelowMinimum {
                total: self.total_session_secs,
                minimum: self.minimum_image_secs,
            });
        }
        Ok(())
    }

    /// Duration used for every image outside ramped modes.
    pub fn fixed_duration(&self) -> u32 {
        self.per_image_secs.max(1)
    }
}
