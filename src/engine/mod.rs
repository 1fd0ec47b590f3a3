//! The audio context: hardware time base, node graph and sound registry.
//!
//! All scheduling in this crate is expressed against
//! [`AudioContext::current_time`], a sample counter advanced by the host's
//! audio callback. Nothing reads wall-clock or frame-loop time.

pub mod registry;

use tracing::debug;

use crate::{
    config::EngineConfig,
    error::{check_offset, Result},
    graph::node::{AudioGraph, NodeId},
};

use self::registry::{SoundId, SoundRegistry};

/// Anything that can report the audio clock's current time in seconds.
///
/// Sequencing code only accepts time through this trait. User state passed
/// to part callbacks implements it by delegating to its `AudioContext`.
pub trait TimeBase {
    fn current_time(&self) -> f64;
}

pub struct AudioContext {
    config: EngineConfig,
    frames: u64,
    graph: AudioGraph,
    registry: SoundRegistry,
}

impl Default for AudioContext {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            frames: 0,
            graph: AudioGraph::new(),
            registry: SoundRegistry::new(),
        }
    }
}

impl AudioContext {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    pub fn current_frame(&self) -> u64 {
        self.frames
    }

    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.config.sample_rate as f64
    }

    /// Advance the clock by one rendered block.
    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }

    /// Move the clock forward to the first frame at or after `seconds`.
    /// Earlier times are ignored; the clock is monotonic.
    pub fn advance_to(&mut self, seconds: f64) {
        let frame = (seconds * self.config.sample_rate as f64).ceil();
        if frame.is_finite() && frame > self.frames as f64 {
            self.frames = frame as u64;
        }
    }

    /// Absolute audio time for an offset from now.
    pub fn time_from_now(&self, seconds: f64) -> Result<f64> {
        Ok(self.current_time() + check_offset(seconds)?)
    }

    pub fn destination(&self) -> NodeId {
        self.graph.destination()
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AudioGraph {
        &mut self.graph
    }

    pub fn registry(&self) -> &SoundRegistry {
        &self.registry
    }

    pub fn register(&mut self, kind: &'static str, nodes: Vec<NodeId>) -> SoundId {
        self.registry.register(kind, nodes)
    }

    /// Disconnect and remove every node an object owns, and drop its entry.
    /// Safe to call for ids that were already released.
    pub fn release(&mut self, id: SoundId) -> bool {
        match self.registry.unregister(id) {
            Some(entry) => {
                for node in entry.nodes {
                    self.graph.disconnect(node);
                    self.graph.remove(node);
                }
                debug!(kind = entry.kind, "disposed sound object");
                true
            }
            None => false,
        }
    }

    pub(crate) fn adopt(&mut self, id: SoundId, nodes: impl IntoIterator<Item = NodeId>) {
        self.registry.adopt(id, nodes);
    }

    /// Tear down every registered sound object. Returns how many there were.
    pub fn dispose_all(&mut self) -> usize {
        let entries = self.registry.drain();
        let count = entries.len();
        for entry in entries {
            for node in entry.nodes {
                self.graph.disconnect(node);
                self.graph.remove(node);
            }
        }
        debug!(count, "disposed all sound objects");
        count
    }
}

impl TimeBase for AudioContext {
    fn current_time(&self) -> f64 {
        AudioContext::current_time(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn time_follows_frames() {
        let mut ctx = AudioContext::default();
        ctx.advance(24_000);
        assert_eq!(ctx.current_time(), 0.5);

        ctx.advance_to(0.25);
        assert_eq!(ctx.current_time(), 0.5, "clock never runs backwards");

        ctx.advance_to(1.0);
        assert_eq!(ctx.current_time(), 1.0);
    }

    #[test]
    fn negative_offsets_are_rejected() {
        let ctx = AudioContext::default();
        assert_eq!(ctx.time_from_now(-0.1), Err(Error::InvalidTime(-0.1)));
        assert!(ctx.time_from_now(f64::NAN).is_err());
        assert_eq!(ctx.time_from_now(0.2), Ok(0.2));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            sample_rate: 0.0,
            ..EngineConfig::default()
        };
        assert!(AudioContext::new(config).is_err());
    }

    #[test]
    fn dispose_all_removes_registered_nodes() {
        let mut ctx = AudioContext::default();
        let a = ctx.graph_mut().create_gain(1.0);
        let b = ctx.graph_mut().create_gain(1.0);
        let dest = ctx.destination();
        ctx.graph_mut().connect(a, b).unwrap();
        ctx.graph_mut().connect(b, dest).unwrap();
        let id = ctx.register("test", vec![a, b]);

        assert_eq!(ctx.dispose_all(), 1);
        assert!(!ctx.graph().contains(a));
        assert!(!ctx.graph().contains(b));
        assert!(ctx.graph().contains(dest));
        assert!(!ctx.release(id), "entry already swept");
    }
}
