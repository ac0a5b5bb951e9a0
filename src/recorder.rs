//! Action Recorder
//!
//! TigerStyle: Every operator stimulus is data, so a session can be saved,
//! inspected, trimmed and replayed against a fresh rack.
//!
//! The recorder only remembers; it never applies anything by itself.
//! Replay drives an [`ActionTarget`] directly, so replayed actions are not
//! recorded a second time.

use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simengine_core::{AssetKey, BusError, EventBus};
use uuid::Uuid;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Maximum number of actions kept by one recorder
pub const RECORDER_ACTIONS_COUNT_MAX: usize = 100_000;

/// Recorded action ID prefix
pub const ACTION_ID_PREFIX: &str = "act_";

/// File extension for saved recordings
pub const RECORDING_FILE_EXTENSION: &str = "json";

// =============================================================================
// Types
// =============================================================================

/// An operator stimulus that can be recorded and replayed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Stimulus {
    PowerUp { key: AssetKey },
    PowerOff { key: AssetKey },
    ShutDown { key: AssetKey },
    PressPowerButton { key: AssetKey, up: bool },
    SetInputVoltage { key: AssetKey, volts: f64 },
}

impl Stimulus {
    /// Asset the stimulus is aimed at.
    pub fn key(&self) -> AssetKey {
        match self {
            Self::PowerUp { key }
            | Self::PowerOff { key }
            | Self::ShutDown { key }
            | Self::PressPowerButton { key, .. }
            | Self::SetInputVoltage { key, .. } => *key,
        }
    }
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerUp { key } => write!(f, "power_up({key})"),
            Self::PowerOff { key } => write!(f, "power_off({key})"),
            Self::ShutDown { key } => write!(f, "shut_down({key})"),
            Self::PressPowerButton { key, up } => {
                let direction = if *up { "up" } else { "down" };
                write!(f, "press_power_button({key}, {direction})")
            }
            Self::SetInputVoltage { key, volts } => write!(f, "set_input_voltage({key}, {volts})"),
        }
    }
}

/// One recorded stimulus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    /// Unique action ID
    pub id: String,
    /// Wall-clock time the action was recorded
    pub recorded_at: DateTime<Utc>,
    /// What the operator did
    pub stimulus: Stimulus,
}

impl RecordedAction {
    fn new(stimulus: Stimulus) -> Self {
        Self {
            id: format!("{}{}", ACTION_ID_PREFIX, &Uuid::new_v4().to_string()[..8]),
            recorded_at: Utc::now(),
            stimulus,
        }
    }

    /// Human-readable one-liner, e.g. `power_off(3)`.
    pub fn details(&self) -> String {
        self.stimulus.to_string()
    }
}

// =============================================================================
// Replay target
// =============================================================================

/// Anything recorded stimuli can be applied to.
#[async_trait]
pub trait ActionTarget: Send + Sync {
    /// Apply one stimulus and wait for it to settle.
    async fn apply(&self, stimulus: &Stimulus) -> Result<(), RecorderError>;
}

#[async_trait]
impl ActionTarget for EventBus {
    async fn apply(&self, stimulus: &Stimulus) -> Result<(), RecorderError> {
        match *stimulus {
            Stimulus::PowerUp { key } => {
                self.power_up(key).await?;
            }
            Stimulus::PowerOff { key } => {
                self.power_off(key).await?;
            }
            Stimulus::ShutDown { key } => {
                self.shut_down(key).await?;
            }
            Stimulus::PressPowerButton { key, up } => {
                self.press_power_button(key, up).await?;
            }
            Stimulus::SetInputVoltage { key, volts } => {
                self.set_input_voltage(key, volts).await?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Recorder
// =============================================================================

/// Ordered log of operator stimuli
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorder {
    actions: Vec<RecordedAction>,
    #[serde(skip, default = "enabled_default")]
    enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            enabled: true,
        }
    }
}

impl Recorder {
    /// Create an empty, enabled recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Is recording switched on?
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch recording on or off. Existing actions are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Record a stimulus. Returns `None` when recording is switched off.
    pub fn record(&mut self, stimulus: Stimulus) -> Result<Option<&RecordedAction>, RecorderError> {
        if !self.enabled {
            return Ok(None);
        }
        if self.actions.len() >= RECORDER_ACTIONS_COUNT_MAX {
            return Err(RecorderError::TooManyActions {
                count: self.actions.len(),
                max: RECORDER_ACTIONS_COUNT_MAX,
            });
        }

        self.actions.push(RecordedAction::new(stimulus));
        tracing::debug!(%stimulus, "recorded action");
        Ok(self.actions.last())
    }

    /// Recorded actions, oldest first
    pub fn actions(&self) -> &[RecordedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// One human-readable line per action
    pub fn action_details(&self) -> Vec<String> {
        self.actions.iter().map(RecordedAction::details).collect()
    }

    /// Forget every action
    pub fn erase_all(&mut self) {
        self.actions.clear();
    }

    /// Forget the actions in `range` (clamped to what was recorded)
    pub fn erase_range(&mut self, range: impl RangeBounds<usize>) {
        let (start, end) = self.clamp(range);
        self.actions.drain(start..end);
    }

    /// Apply every action to `target`, in order
    pub async fn replay_all(&self, target: &dyn ActionTarget) -> Result<usize, RecorderError> {
        self.replay_range(.., target).await
    }

    /// Apply the actions in `range` to `target`, in order
    pub async fn replay_range(
        &self,
        range: impl RangeBounds<usize>,
        target: &dyn ActionTarget,
    ) -> Result<usize, RecorderError> {
        let (start, end) = self.clamp(range);
        for action in &self.actions[start..end] {
            tracing::info!(id = %action.id, stimulus = %action.stimulus, "replaying action");
            target.apply(&action.stimulus).await?;
        }
        Ok(end - start)
    }

    fn clamp(&self, range: impl RangeBounds<usize>) -> (usize, usize) {
        let len = self.actions.len();
        let start = match range.start_bound() {
            Bound::Included(s) => *s,
            Bound::Excluded(s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(e) => e.saturating_add(1),
            Bound::Excluded(e) => *e,
            Bound::Unbounded => len,
        };
        let end = end.min(len);
        (start.min(end), end)
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Write the recording as JSON
    pub async fn save(&self, path: &Path) -> Result<(), RecorderError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        tracing::info!(path = %path.display(), actions = self.actions.len(), "saved recording");
        Ok(())
    }

    /// Read a recording written by [`Recorder::save`]
    pub async fn load(path: &Path) -> Result<Self, RecorderError> {
        let json = tokio::fs::read_to_string(path).await?;
        let recorder: Self = serde_json::from_str(&json)?;
        tracing::info!(path = %path.display(), actions = recorder.actions.len(), "loaded recording");
        Ok(recorder)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Recorder-related errors
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("too many recorded actions: {count} >= {max}")]
    TooManyActions { count: usize, max: usize },

    #[error("replay failed: {0}")]
    Bus(#[from] BusError),

    #[error("recording I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("recording is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Target that remembers what it was asked to do.
    #[derive(Default)]
    struct Probe {
        applied: Mutex<Vec<Stimulus>>,
    }

    #[async_trait]
    impl ActionTarget for Probe {
        async fn apply(&self, stimulus: &Stimulus) -> Result<(), RecorderError> {
            self.applied.lock().unwrap().push(*stimulus);
            Ok(())
        }
    }

    fn recorder_with(stimuli: &[Stimulus]) -> Recorder {
        let mut recorder = Recorder::new();
        for s in stimuli {
            recorder.record(*s).unwrap();
        }
        recorder
    }

    fn sample() -> Vec<Stimulus> {
        vec![
            Stimulus::PowerOff { key: 3 },
            Stimulus::SetInputVoltage { key: 1, volts: 0.0 },
            Stimulus::SetInputVoltage { key: 1, volts: 120.0 },
            Stimulus::PressPowerButton { key: 4, up: true },
        ]
    }

    #[test]
    fn test_action_details() {
        let recorder = recorder_with(&sample());
        assert_eq!(
            recorder.action_details(),
            vec![
                "power_off(3)",
                "set_input_voltage(1, 0)",
                "set_input_voltage(1, 120)",
                "press_power_button(4, up)",
            ]
        );
        assert!(recorder.actions()[0].id.starts_with(ACTION_ID_PREFIX));
    }

    #[test]
    fn test_disabled_recorder_drops_actions() {
        let mut recorder = Recorder::new();
        recorder.set_enabled(false);
        assert!(recorder.record(Stimulus::PowerUp { key: 1 }).unwrap().is_none());
        assert!(recorder.is_empty());

        recorder.set_enabled(true);
        assert!(recorder.record(Stimulus::PowerUp { key: 1 }).unwrap().is_some());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_erase_range_and_all() {
        let mut recorder = recorder_with(&sample());

        recorder.erase_range(1..3);
        assert_eq!(
            recorder.action_details(),
            vec!["power_off(3)", "press_power_button(4, up)"]
        );

        // out of bounds is clamped
        recorder.erase_range(1..99);
        assert_eq!(recorder.len(), 1);

        recorder.erase_all();
        assert!(recorder.is_empty());
    }

    #[tokio::test]
    async fn test_replay_range_in_order() {
        let recorder = recorder_with(&sample());
        let probe = Probe::default();

        let replayed = recorder.replay_range(1..=2, &probe).await.unwrap();

        assert_eq!(replayed, 2);
        assert_eq!(*probe.applied.lock().unwrap(), sample()[1..=2].to_vec());
    }

    #[tokio::test]
    async fn test_replay_does_not_record() {
        let recorder = recorder_with(&sample());
        let probe = Probe::default();

        recorder.replay_all(&probe).await.unwrap();

        assert_eq!(recorder.len(), sample().len());
        assert_eq!(probe.applied.lock().unwrap().len(), sample().len());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions").join("outage.json");
        let recorder = recorder_with(&sample());

        recorder.save(&path).await.unwrap();
        let loaded = Recorder::load(&path).await.unwrap();

        assert_eq!(loaded.actions(), recorder.actions());
        assert!(loaded.is_enabled());
    }

    #[test]
    fn test_stimulus_wire_format() {
        let json = serde_json::to_value(Stimulus::PressPowerButton { key: 7, up: false }).unwrap();
        assert_eq!(json, serde_json::json!({ "op": "press_power_button", "key": 7, "up": false }));
        assert_eq!(Stimulus::PressPowerButton { key: 7, up: false }.key(), 7);
    }
}
