// Purpose - external interfaces, format conversions

pub mod converter;
pub mod midi;

pub use converter::midi_to_synth;
#[cfg(feature = "rtrb")]
pub use converter::MidiRouter;
pub use midi::MidiEvent;
