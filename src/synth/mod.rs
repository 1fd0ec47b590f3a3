// Purpose: Voice management, polyphony, note requests
// This layer sits above the node graph and schedules automation on it

pub mod envelope;
pub mod factory;
pub mod message;
pub mod mono;
pub mod poly;
pub mod pulse;
pub mod voice;

pub use envelope::{Envelope, EnvelopeStage};
pub use factory::VoiceFactory;
pub use message::{MessageReceiver, SynthMessage};
pub use mono::MonoSynth;
pub use poly::PolySynth;
pub use pulse::PulseSynth;
pub use voice::Voice;
