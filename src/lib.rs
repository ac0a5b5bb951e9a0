//! SimEngine - operator rehearsal on top of the propagation engine
//!
//! The engine itself lives in `simengine-core`. This crate adds the pieces
//! an operator drives: recording and replaying stimuli, scripted and
//! randomized scenarios, and the `simengine` command line.

pub mod recorder;
pub mod scenario;

pub use recorder::{ActionTarget, RecordedAction, Recorder, RecorderError, Stimulus};
pub use scenario::{random_walk, Scenario, ScenarioError, ScenarioReport, ScenarioStep};
