//! Scenarios - scripted and randomized outage rehearsals
//!
//! A scenario is an ordered list of operator stimuli, each optionally
//! preceded by a simulated clock advance:
//!
//! ```json
//! {
//!   "name": "utility-blip",
//!   "steps": [
//!     { "op": "set_input_voltage", "key": 1, "volts": 0.0 },
//!     { "advance_ms": 3000, "op": "set_input_voltage", "key": 1, "volts": 120.0 },
//!     { "op": "press_power_button", "key": 4, "up": true }
//!   ]
//! }
//! ```
//!
//! Random walks are seeded with `ChaCha8Rng`, so the same seed over the same
//! topology always produces the same rehearsal.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use simengine_core::{AssetKey, SimClock};

use crate::recorder::{ActionTarget, Recorder, RecorderError, Stimulus};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Maximum number of steps in one scenario
pub const SCENARIO_STEPS_COUNT_MAX: usize = 10_000;

/// Largest clock advance a random walk inserts between steps
pub const RANDOM_WALK_ADVANCE_MS_MAX: u64 = 10_000;

/// Feed voltages a random walk picks from
pub const RANDOM_WALK_FEED_VOLTS: [f64; 5] = [0.0, 95.0, 120.0, 208.0, 240.0];

// =============================================================================
// Types
// =============================================================================

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Simulated time to let pass before the stimulus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_ms: Option<u64>,
    #[serde(flatten)]
    pub stimulus: Stimulus,
}

impl ScenarioStep {
    pub fn now(stimulus: Stimulus) -> Self {
        Self {
            advance_ms: None,
            stimulus,
        }
    }
}

/// A named list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<ScenarioStep>,
}

/// What a scenario run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Steps applied
    pub steps: usize,
    /// Simulated milliseconds advanced
    pub advanced_ms: u64,
}

impl Scenario {
    /// Parse and check a scenario
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read a scenario file
    pub async fn load(path: &Path) -> Result<Self, ScenarioError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.steps.len() > SCENARIO_STEPS_COUNT_MAX {
            return Err(ScenarioError::TooManySteps {
                name: self.name.clone(),
                count: self.steps.len(),
                max: SCENARIO_STEPS_COUNT_MAX,
            });
        }
        Ok(())
    }

    /// Apply every step to `target`, advancing `clock` where asked and
    /// recording each stimulus when a recorder is supplied.
    pub async fn run(
        &self,
        target: &dyn ActionTarget,
        clock: &SimClock,
        mut recorder: Option<&mut Recorder>,
    ) -> Result<ScenarioReport, ScenarioError> {
        let mut report = ScenarioReport::default();

        for (index, step) in self.steps.iter().enumerate() {
            if let Some(ms) = step.advance_ms {
                clock.advance_ms(ms);
                report.advanced_ms += ms;
            }

            tracing::info!(scenario = %self.name, index, stimulus = %step.stimulus, "scenario step");
            target.apply(&step.stimulus).await?;

            if let Some(recorder) = recorder.as_deref_mut() {
                recorder.record(step.stimulus)?;
            }
            report.steps += 1;
        }

        Ok(report)
    }
}

/// Build a reproducible random rehearsal.
///
/// Feed keys receive voltage changes; every key may receive power
/// operations and button presses.
pub fn random_walk(seed: u64, steps: usize, keys: &[AssetKey], feeds: &[AssetKey]) -> Scenario {
    assert!(steps <= SCENARIO_STEPS_COUNT_MAX, "too many steps: {steps}");

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut walk = Vec::with_capacity(steps);

    for _ in 0..steps {
        let stimulus = match (feeds.choose(&mut rng), keys.choose(&mut rng)) {
            (Some(&feed), _) if rng.gen_bool(0.4) => Stimulus::SetInputVoltage {
                key: feed,
                volts: RANDOM_WALK_FEED_VOLTS[rng.gen_range(0..RANDOM_WALK_FEED_VOLTS.len())],
            },
            (_, Some(&key)) => match rng.gen_range(0..4) {
                0 => Stimulus::PowerUp { key },
                1 => Stimulus::PowerOff { key },
                2 => Stimulus::ShutDown { key },
                _ => Stimulus::PressPowerButton {
                    key,
                    up: rng.gen_bool(0.5),
                },
            },
            _ => break,
        };

        let advance_ms = rng.gen_bool(0.5).then(|| rng.gen_range(1..=RANDOM_WALK_ADVANCE_MS_MAX));
        walk.push(ScenarioStep { advance_ms, stimulus });
    }

    Scenario {
        name: format!("random-{seed}"),
        steps: walk,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Scenario-related errors
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("scenario {name} has too many steps: {count} > {max}")]
    TooManySteps { name: String, count: usize, max: usize },

    #[error("scenario step failed: {0}")]
    Step(#[from] RecorderError),

    #[error("scenario I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("scenario is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Tests
// =============================================================================
