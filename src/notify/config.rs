//! Popup stack configuration from the `[popups]` table.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::model::NotificationKind;

// Default values for popup configuration
const DEFAULT_MAX_VISIBLE: usize = 4;
const DEFAULT_WIDTH_PX: u32 = 380;
const DEFAULT_MARGIN_RIGHT_PX: u32 = 16;
const DEFAULT_MARGIN_BOTTOM_PX: u32 = 16;
const DEFAULT_GAP_PX: u32 = 8;
const DEFAULT_DISMISS_ANIMATION_MS: u64 = 300;
const DEFAULT_ACK_LINGER_MS: u64 = 2_000;
const DEFAULT_MIN_RESUME_MS: u64 = 1_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PopupConfigError {
    #[error("max_visible must be at least 1")]
    ZeroCapacity,
    #[error("popup {field} must be greater than zero")]
    ZeroDimension { field: &'static str },
}

/// Popup heights in pixels per notification type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PopupHeights {
    pub toast: u32,
    pub briefing: u32,
    pub alert: u32,
    pub production_card: u32,
}

impl Default for PopupHeights {
    fn default() -> Self {
        Self {
            toast: 120,
            briefing: 280,
            alert: 200,
            production_card: 240,
        }
    }
}

impl PopupHeights {
    /// Unknown types take the smallest configured height.
    pub fn for_kind(&self, kind: NotificationKind) -> u32 {
        match kind {
            NotificationKind::Toast => self.toast,
            NotificationKind::Briefing => self.briefing,
            NotificationKind::Alert => self.alert,
            NotificationKind::ProductionCard => self.production_card,
            NotificationKind::Other => self.smallest(),
        }
    }

    fn smallest(&self) -> u32 {
        self.toast
            .min(self.briefing)
            .min(self.alert)
            .min(self.production_card)
    }
}

/// Auto-dismiss delays in milliseconds per notification type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PopupDurations {
    pub toast_ms: u64,
    pub briefing_ms: u64,
    pub alert_ms: u64,
    pub production_card_ms: u64,
    pub other_ms: u64,
}

impl Default for PopupDurations {
    fn default() -> Self {
        Self {
            toast_ms: 8_000,
            briefing_ms: 10_000,
            alert_ms: 15_000,
            production_card_ms: 10_000,
            other_ms: 10_000,
        }
    }
}

impl PopupDurations {
    pub fn for_kind(&self, kind: NotificationKind) -> Duration {
        Duration::from_millis(match kind {
            NotificationKind::Toast => self.toast_ms,
            NotificationKind::Briefing => self.briefing_ms,
            NotificationKind::Alert => self.alert_ms,
            NotificationKind::ProductionCard => self.production_card_ms,
            NotificationKind::Other => self.other_ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Popups visible at once; showing one more evicts the oldest.
    pub max_visible: usize,
    pub width_px: u32,
    pub margin_right_px: u32,
    pub margin_bottom_px: u32,
    pub gap_px: u32,
    /// Delay between starting the exit animation and destroying the window.
    pub dismiss_animation_ms: u64,
    /// How long an acknowledged popup stays up before dismissing itself.
    pub ack_linger_ms: u64,
    /// Floor applied to the remaining time when a hover ends.
    pub min_resume_ms: u64,
    pub heights: PopupHeights,
    pub durations: PopupDurations,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            max_visible: DEFAULT_MAX_VISIBLE,
            width_px: DEFAULT_WIDTH_PX,
            margin_right_px: DEFAULT_MARGIN_RIGHT_PX,
            margin_bottom_px: DEFAULT_MARGIN_BOTTOM_PX,
            gap_px: DEFAULT_GAP_PX,
            dismiss_animation_ms: DEFAULT_DISMISS_ANIMATION_MS,
            ack_linger_ms: DEFAULT_ACK_LINGER_MS,
            min_resume_ms: DEFAULT_MIN_RESUME_MS,
            heights: PopupHeights::default(),
            durations: PopupDurations::default(),
        }
    }
}

impl PopupConfig {
    pub fn dismiss_animation(&self) -> Duration {
        Duration::from_millis(self.dismiss_animation_ms)
    }

    pub fn ack_linger(&self) -> Duration {
        Duration::from_millis(self.ack_linger_ms)
    }

    pub fn min_resume(&self) -> Duration {
        Duration::from_millis(self.min_resume_ms)
    }

    pub fn validate(&self) -> Result<(), PopupConfigError> {
        if self.max_visible == 0 {
            return Err(PopupConfigError::ZeroCapacity);
        }
        let dimensions = [
            ("width_px", self.width_px),
            ("heights.toast", self.heights.toast),
            ("heights.briefing", self.heights.briefing),
            ("heights.alert", self.heights.alert),
            ("heights.production_card", self.heights.production_card),
        ];
        for (field, value) in dimensions {
            if value == 0 {
                return Err(PopupConfigError::ZeroDimension { field });
            }
        }
        Ok(())
    }
}
