pub(crate) mod beat;
pub(crate) mod click;
pub(crate) mod metronome;

pub use beat::{opens_group, Beat, BeatListener, BeatScheduler};
pub use click::{Click, ClickSettings};
pub use metronome::Metronome;
