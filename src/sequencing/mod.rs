//! Musical timing: tick clocks, note values, and the Part/Phrase/Score
//! sequencer built on top of them.

pub mod clock;
pub mod duration;
pub mod notes;
pub mod part;
pub mod phrase;
pub mod score;

pub use clock::{Clock, ClockState, Tick};
pub use duration::Duration;
pub use notes::{freq_to_midi, midi_to_freq, Note, NoteKey};
pub use part::{Part, StepCallback, StepOutcome};
pub use phrase::{Phrase, PhraseCallback};
pub use score::Score;
