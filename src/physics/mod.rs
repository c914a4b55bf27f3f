//! Physics Entropy Source
//!
//! A chaotic three-body simulation used only to produce high-entropy,
//! reproducible digests. It is not a general physics engine.

pub mod body;
pub mod simulation;

pub use body::{Body, SimulationState, ThetaAngles, BODY_COUNT};
pub use simulation::{
    simulate, integrate, format_component, EntropyOutput, Schedule,
    GRAVITY, SOFTENING, TIME_STEP,
};
