#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A note value as an exact fraction of a whole note.
///
/// Parts use it as their tatum: the subdivision their clock ticks through.
/// A beat is a quarter note, so `SIXTEENTH` gives four ticks per beat.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    pub numerator: u32,
    pub denominator: u32,
}

impl Duration {
    pub const WHOLE: Duration = Duration::of(1, 1);
    pub const HALF: Duration = Duration::of(1, 2);
    pub const QUARTER: Duration = Duration::of(1, 4);
    pub const EIGHTH: Duration = Duration::of(1, 8);
    pub const SIXTEENTH: Duration = Duration::of(1, 16);
    pub const THIRTY_SECOND: Duration = Duration::of(1, 32);

    pub const EIGHTH_TRIPLET: Duration = Duration::EIGHTH.triplet();
    pub const SIXTEENTH_TRIPLET: Duration = Duration::SIXTEENTH.triplet();

    const fn of(numerator: u32, denominator: u32) -> Self {
        Duration {
            numerator,
            denominator,
        }
    }

    /// Checked constructor; zero in either position is not a duration.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(Error::InvalidTatum);
        }
        Ok(Duration::of(numerator, denominator).reduce())
    }

    /// Multiply by 3/2.
    pub const fn dotted(self) -> Self {
        Duration::of(self.numerator * 3, self.denominator * 2).reduce()
    }

    /// Three in the time of two.
    pub const fn triplet(self) -> Self {
        Duration::of(self.numerator * 2, self.denominator * 3).reduce()
    }

    pub const fn reduce(self) -> Self {
        let gcd = const_gcd(self.numerator, self.denominator);
        if gcd == 0 {
            return self;
        }
        Duration::of(self.numerator / gcd, self.denominator / gcd)
    }

    /// Fraction of a whole note.
    pub fn as_fraction(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// How many of these fit in one quarter-note beat.
    pub fn per_beat(&self) -> f64 {
        0.25 / self.as_fraction()
    }

    /// Length in seconds at `bpm` quarter-note beats per minute.
    pub fn seconds_at(&self, bpm: f64) -> f64 {
        60.0 / bpm / self.per_beat()
    }

    /// Clock frequency (ticks per second) that steps through this
    /// subdivision at `bpm`.
    pub fn ticks_per_second(&self, bpm: f64) -> f64 {
        bpm / 60.0 * self.per_beat()
    }
}

impl Default for Duration {
    fn default() -> Self {
        Duration::SIXTEENTH
    }
}

const fn const_gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}
