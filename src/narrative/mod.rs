// Branching narrative: story graph, decision countdowns, and the engine that
// drives playback through them.

pub mod countdown;
pub mod engine;
pub mod story;

pub use countdown::Countdown;
pub use engine::{EngineError, NarrativeEngine, NarrativeEvent, NarrativeState};
pub use story::{Choice, NarrativeNode, Story, StoryError};
