use std::fmt;

/// Called with the user state, seconds from now until the step is due, and
/// the step's value.
pub type PhraseCallback<S> = Box<dyn FnMut(&mut S, f64, f32) + Send>;

/// A named sequence of step values played by a [`Part`](super::part::Part).
///
/// `0.0` (or NaN) in the input marks a rest: the callback is skipped for that
/// step. Internally rests are `None`.
pub struct Phrase<S> {
    name: String,
    sequence: Vec<Option<f32>>,
    callback: PhraseCallback<S>,
    step: usize,
}

impl<S> Phrase<S> {
    pub fn new(
        name: impl Into<String>,
        callback: impl FnMut(&mut S, f64, f32) + Send + 'static,
        sequence: Vec<f32>,
    ) -> Self {
        Self::from_steps(name, callback, sequence.into_iter().map(step).collect())
    }

    pub fn from_steps(
        name: impl Into<String>,
        callback: impl FnMut(&mut S, f64, f32) + Send + 'static,
        sequence: Vec<Option<f32>>,
    ) -> Self {
        Self {
            name: name.into(),
            sequence,
            callback: Box::new(callback),
            step: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &[Option<f32>] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Index the next tick will play.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn set_sequence(&mut self, sequence: Vec<f32>) {
        self.sequence = sequence.into_iter().map(step).collect();
        if self.step >= self.sequence.len() {
            self.step = 0;
        }
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Value for a part tick; phrases wrap independently of the part length.
    pub fn value_at(&self, tick: u64) -> Option<f32> {
        if self.sequence.is_empty() {
            return None;
        }
        self.sequence[(tick % self.sequence.len() as u64) as usize]
    }

    /// Play the step for `tick`. Returns whether the callback ran.
    pub(crate) fn play(&mut self, state: &mut S, tick: u64, offset: f64) -> bool {
        if self.sequence.is_empty() {
            return false;
        }
        let index = (tick % self.sequence.len() as u64) as usize;
        self.step = (index + 1) % self.sequence.len();

        match self.sequence[index] {
            Some(value) => {
                (self.callback)(state, offset, value);
                true
            }
            None => false,
        }
    }
}

impl<S> fmt::Debug for Phrase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phrase")
            .field("name", &self.name)
            .field("sequence", &self.sequence)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

fn step(value: f32) -> Option<f32> {
    if value == 0.0 || value.is_nan() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_rest() {
        let mut phrase = Phrase::new(
            "kick",
            |hits: &mut Vec<f32>, _, v| hits.push(v),
            vec![1.0, 0.0, 2.0],
        );
        let mut hits = Vec::new();

        let fired: Vec<bool> = (0..6)
            .map(|tick| phrase.play(&mut hits, tick, 0.0))
            .collect();

        assert_eq!(fired, vec![true, false, true, true, false, true]);
        assert_eq!(hits, vec![1.0, 2.0, 1.0, 2.0]);
        assert_eq!(phrase.sequence()[1], None);
    }

    #[test]
    fn step_follows_ticks() {
        let mut phrase = Phrase::new("hat", |_: &mut (), _, _| {}, vec![1.0, 1.0, 1.0]);
        phrase.play(&mut (), 4, 0.0);
        assert_eq!(phrase.step(), 2);

        phrase.set_sequence(vec![1.0]);
        assert_eq!(phrase.step(), 0);
        assert_eq!(phrase.value_at(7), Some(1.0));
    }

    #[test]
    fn empty_phrase_never_fires() {
        let mut phrase =
            Phrase::from_steps("none", |_: &mut (), _, _| panic!("fired"), Vec::new());
        assert!(!phrase.play(&mut (), 0, 0.0));
        assert_eq!(phrase.value_at(3), None);
    }
}
