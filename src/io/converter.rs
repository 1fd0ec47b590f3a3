use crate::{io::midi::MidiEvent, sequencing::notes::Note, synth::message::SynthMessage};

/// CC 123, "all notes off".
const ALL_NOTES_OFF: u8 = 123;

/// Translate a MIDI event on `channel_filter` into a synth request.
///
/// Note-on with velocity 0 is a note-off, as running-status keyboards send
/// it. Velocity is scaled to 0..=1.
pub fn midi_to_synth(
    midi: MidiEvent,
    channel_filter: u8,
    time_from_now: f64,
) -> Option<SynthMessage> {
    if midi.channel() != channel_filter {
        return None;
    }
    match midi {
        MidiEvent::NoteOn { key, velocity, .. } if velocity > 0 => Some(SynthMessage::NoteOn {
            note: Note::Midi(key),
            velocity: velocity as f32 / 127.0,
            time_from_now,
        }),
        MidiEvent::NoteOn { key, .. } | MidiEvent::NoteOff { key, .. } => {
            Some(SynthMessage::NoteOff {
                note: Note::Midi(key),
                time_from_now,
            })
        }
        MidiEvent::ControlChange {
            controller: ALL_NOTES_OFF,
            ..
        } => Some(SynthMessage::AllNotesOff),
        _ => None,
    }
}

/// Decodes raw MIDI input for one channel and queues the resulting
/// messages for the synth thread.
#[cfg(feature = "rtrb")]
pub struct MidiRouter {
    channel: u8,
    latency: f64,
    producer: rtrb::Producer<SynthMessage>,
    dropped: u64,
}

#[cfg(feature = "rtrb")]
impl MidiRouter {
    /// `latency` is added to every message so notes land on the audio clock
    /// slightly ahead of when the synth thread picks them up.
    pub fn new(channel: u8, latency: f64, producer: rtrb::Producer<SynthMessage>) -> Self {
        Self {
            channel,
            latency,
            producer,
            dropped: 0,
        }
    }

    /// Returns whether a message was queued.
    pub fn handle(&mut self, bytes: &[u8]) -> bool {
        let Some(message) =
            MidiEvent::parse(bytes).and_then(|e| midi_to_synth(e, self.channel, self.latency))
        else {
            return false;
        };
        if self.producer.push(message).is_err() {
            self.dropped += 1;
            tracing::warn!(dropped = self.dropped, "synth queue full, dropping MIDI message");
            return false;
        }
        true
    }

    /// Messages lost to a full queue.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
