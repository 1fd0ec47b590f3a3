use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/*
Notes
=====

Anything that plays a pitch accepts a `Note`: a raw frequency in Hz, a MIDI
note number, or a name like "C4", "F#3" or "Bb2".

  Note::from(440.0_f32) → 440 Hz
  Note::from(69u8)      → MIDI 69 → 440 Hz
  "A4".parse::<Note>()  → MIDI 69 → 440 Hz

MIDI formula: note_number = 12 * (octave + 1) + semitone
Where semitone: C=0, C#=1, D=2, D#=3, E=4, F=5, F#=6, G=7, G#=8, A=9, A#=10, B=11

Middle C (C4) is MIDI 60. Frequencies use 12-tone equal temperament with
A4 = 440 Hz.

The voice allocator keys its bookkeeping on frequency, so "A4", 69u8 and
440.0 all refer to the same sounding note. `NoteKey` is that frequency
rounded to a millihertz so it can be hashed.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Note {
    Freq(f32),
    Midi(u8),
}

impl Note {
    /// Frequency in Hz. Non-positive or non-finite frequencies are errors.
    pub fn frequency(&self) -> Result<f32> {
        let freq = match *self {
            Note::Freq(freq) => freq,
            Note::Midi(note) => midi_to_freq(note),
        };
        if freq.is_finite() && freq > 0.0 {
            Ok(freq)
        } else {
            Err(Error::InvalidFrequency(freq as f64))
        }
    }

    /// Nearest MIDI note.
    pub fn midi(&self) -> Result<u8> {
        match *self {
            Note::Midi(note) => Ok(note),
            Note::Freq(_) => Ok(freq_to_midi(self.frequency()?)),
        }
    }

    pub fn key(&self) -> Result<NoteKey> {
        Ok(NoteKey::from_freq(self.frequency()?))
    }
}

impl From<f32> for Note {
    fn from(freq: f32) -> Self {
        Note::Freq(freq)
    }
}

impl From<u8> for Note {
    fn from(note: u8) -> Self {
        Note::Midi(note)
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidNote(s.to_string());
        let mut chars = s.trim().chars().peekable();

        let semitone: i64 = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(invalid()),
        };

        let accidental = match chars.peek() {
            Some('#') | Some('s') => 1,
            Some('b') => -1,
            _ => 0,
        };
        if accidental != 0 {
            chars.next();
        }

        let octave: i64 = chars.collect::<String>().parse().map_err(|_| invalid())?;
        let midi = 12 * (octave + 1) + semitone + accidental;
        u8::try_from(midi)
            .ok()
            .filter(|n| *n <= 127)
            .map(Note::Midi)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        match *self {
            Note::Midi(note) => {
                let octave = note as i32 / 12 - 1;
                write!(f, "{}{}", NAMES[note as usize % 12], octave)
            }
            Note::Freq(freq) => write!(f, "{freq}Hz"),
        }
    }
}

/// Hashable identity of a sounding pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteKey(u64);

impl NoteKey {
    pub fn from_freq(freq: f32) -> Self {
        NoteKey((freq as f64 * 1000.0).round() as u64)
    }

    pub fn frequency(&self) -> f32 {
        (self.0 as f64 / 1000.0) as f32
    }
}

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

pub fn freq_to_midi(freq: f32) -> u8 {
    let note = 69.0 + 12.0 * (freq / 440.0).log2();
    note.round().clamp(0.0, 127.0) as u8
}
