#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::sequencing::notes::Note;

/// Note requests queued by a UI or MIDI thread for the thread that owns the
/// synth. Times are offsets from the moment the message is processed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn {
        note: Note,
        velocity: f32,
        time_from_now: f64,
    },
    NoteOff {
        note: Note,
        time_from_now: f64,
    },
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::collections::VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}
