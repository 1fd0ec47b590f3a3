#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::{
    dsp::automation::AudioParam,
    error::{Error, Result},
};

/*
The Node Graph
==============

The native audio graph (oscillators, biquads, convolvers, compressors) is not
ours to implement. What the scheduling core needs from it is narrow:

  - create a node of some kind and get back an opaque handle
  - connect a node's output to another node or to one of its parameters
  - disconnect everything a node feeds
  - schedule automation on a node's parameters and read the curve back

`AudioGraph` is that boundary, kept in-process so everything above it can be
tested without a sound card. Nodes live in a slot map: a removed handle can
never alias a newer node, so a second `remove` on the same handle is a
harmless no-op rather than a double free.

Control-rate read-back
----------------------

Envelopes drive parameters by connecting a constant-source node to them. The
value a parameter actually takes is therefore its own automation plus the
output of every constant source feeding it:

    envelope control ──▶ gain.Gain
                           │
    value_at(gain.Gain, t) = gain.Gain.value_at(t) + control.Offset.value_at(t)

Audio-rate inputs (oscillators into a parameter) are not evaluated here.
*/

new_key_type! {
    /// Handle to a node inside an [`AudioGraph`].
    pub struct NodeId;
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    LowShelf,
    HighShelf,
    Peaking,
    Notch,
    AllPass,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversample {
    None,
    X2,
    X4,
}

/// Parameters of the impulse a convolver is loaded with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    pub seconds: f32,
    pub decay: f32,
    pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Destination,
    Gain,
    Oscillator(Waveform),
    Biquad(FilterType),
    Convolver(Option<Impulse>),
    Compressor,
    StereoPanner,
    Delay { max_time: f32 },
    ConstantSource,
    WaveShaper { amount: f32, oversample: Oversample },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Gain,
    Frequency,
    Detune,
    Q,
    FilterGain,
    Offset,
    Pan,
    DelayTime,
    Threshold,
    Knee,
    Ratio,
    Attack,
    Release,
}

/// A parameter on a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamId {
    pub node: NodeId,
    pub kind: ParamKind,
}

impl ParamId {
    pub fn new(node: NodeId, kind: ParamKind) -> Self {
        Self { node, kind }
    }
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Node(NodeId),
    Param(ParamId),
}

impl Destination {
    pub fn node(&self) -> NodeId {
        match self {
            Destination::Node(node) => *node,
            Destination::Param(param) => param.node,
        }
    }
}

impl From<NodeId> for Destination {
    fn from(node: NodeId) -> Self {
        Destination::Node(node)
    }
}

impl From<ParamId> for Destination {
    fn from(param: ParamId) -> Self {
        Destination::Param(param)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    params: Vec<(ParamKind, AudioParam)>,
    outputs: Vec<Destination>,
    started: Option<f64>,
    stopped: Option<f64>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        let params = default_params(&kind);
        Self {
            kind,
            params,
            outputs: Vec::new(),
            started: None,
            stopped: None,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn outputs(&self) -> &[Destination] {
        &self.outputs
    }

    pub fn param(&self, kind: ParamKind) -> Option<&AudioParam> {
        self.params.iter().find(|(k, _)| *k == kind).map(|(_, p)| p)
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        self.params
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p)
    }

    /// Scheduled start time for source nodes.
    pub fn started(&self) -> Option<f64> {
        self.started
    }

    pub fn stopped(&self) -> Option<f64> {
        self.stopped
    }

    fn is_source(&self) -> bool {
        matches!(self.kind, NodeKind::Oscillator(_) | NodeKind::ConstantSource)
    }
}

fn default_params(kind: &NodeKind) -> Vec<(ParamKind, AudioParam)> {
    use ParamKind::*;
    match kind {
        NodeKind::Destination | NodeKind::Convolver(_) | NodeKind::WaveShaper { .. } => Vec::new(),
        NodeKind::Gain => vec![(Gain, AudioParam::new(1.0))],
        NodeKind::Oscillator(_) => vec![
            (Frequency, AudioParam::with_range(440.0, 0.0, 24_000.0)),
            (Detune, AudioParam::new(0.0)),
        ],
        NodeKind::Biquad(_) => vec![
            (Frequency, AudioParam::with_range(350.0, 0.0, 24_000.0)),
            (Q, AudioParam::new(1.0)),
            (FilterGain, AudioParam::new(0.0)),
            (Detune, AudioParam::new(0.0)),
        ],
        NodeKind::Compressor => vec![
            (Threshold, AudioParam::with_range(-24.0, -100.0, 0.0)),
            (Knee, AudioParam::with_range(30.0, 0.0, 40.0)),
            (Ratio, AudioParam::with_range(12.0, 1.0, 20.0)),
            (Attack, AudioParam::with_range(0.003, 0.0, 1.0)),
            (Release, AudioParam::with_range(0.25, 0.0, 1.0)),
        ],
        NodeKind::StereoPanner => vec![(Pan, AudioParam::with_range(0.0, -1.0, 1.0))],
        NodeKind::Delay { max_time } => {
            vec![(DelayTime, AudioParam::with_range(0.0, 0.0, *max_time))]
        }
        NodeKind::ConstantSource => vec![(Offset, AudioParam::new(1.0))],
    }
}

/// Arena of nodes and the edges between them.
#[derive(Debug)]
pub struct AudioGraph {
    nodes: SlotMap<NodeId, Node>,
    destination: NodeId,
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraph {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let destination = nodes.insert(Node::new(NodeKind::Destination));
        Self { nodes, destination }
    }

    /// The master output every sound object connects to by default.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node)
    }

    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind))
    }

    pub fn create_gain(&mut self, gain: f32) -> NodeId {
        let node = self.create(NodeKind::Gain);
        if let Some(param) = self.nodes[node].param_mut(ParamKind::Gain) {
            *param = AudioParam::new(gain);
        }
        node
    }

    pub fn create_oscillator(&mut self, waveform: Waveform) -> NodeId {
        self.create(NodeKind::Oscillator(waveform))
    }

    pub fn create_biquad(&mut self, filter_type: FilterType) -> NodeId {
        self.create(NodeKind::Biquad(filter_type))
    }

    pub fn create_constant(&mut self, offset: f32) -> NodeId {
        let node = self.create(NodeKind::ConstantSource);
        if let Some(param) = self.nodes[node].param_mut(ParamKind::Offset) {
            *param = AudioParam::new(offset);
        }
        node
    }

    pub fn create_delay(&mut self, max_time: f32) -> NodeId {
        self.create(NodeKind::Delay { max_time })
    }

    /// Replace the kind-specific settings of a node (filter type, impulse,
    /// shaper curve). Parameters and edges are kept.
    pub fn set_kind(&mut self, node: NodeId, kind: NodeKind) -> Result<()> {
        let entry = self.nodes.get_mut(node).ok_or(Error::NodeGone)?;
        debug_assert_eq!(
            std::mem::discriminant(&entry.kind),
            std::mem::discriminant(&kind)
        );
        entry.kind = kind;
        Ok(())
    }

    pub fn connect(&mut self, from: NodeId, to: impl Into<Destination>) -> Result<()> {
        let to = to.into();
        match to {
            Destination::Node(node) if !self.nodes.contains_key(node) => {
                return Err(Error::NodeGone)
            }
            Destination::Param(param) => {
                let target = self.nodes.get(param.node).ok_or(Error::NodeGone)?;
                if target.param(param.kind).is_none() {
                    return Err(Error::MissingParam(param.kind));
                }
            }
            _ => {}
        }

        let source = self.nodes.get_mut(from).ok_or(Error::NodeGone)?;
        if !source.outputs.contains(&to) {
            source.outputs.push(to);
        }
        Ok(())
    }

    /// Drop every outgoing edge of `from`. Returns `false` for removed nodes.
    pub fn disconnect(&mut self, from: NodeId) -> bool {
        match self.nodes.get_mut(from) {
            Some(node) => {
                node.outputs.clear();
                true
            }
            None => false,
        }
    }

    pub fn disconnect_from(&mut self, from: NodeId, to: impl Into<Destination>) -> bool {
        let to = to.into();
        match self.nodes.get_mut(from) {
            Some(node) => {
                let before = node.outputs.len();
                node.outputs.retain(|d| *d != to);
                node.outputs.len() != before
            }
            None => false,
        }
    }

    pub fn is_connected(&self, from: NodeId, to: impl Into<Destination>) -> bool {
        let to = to.into();
        self.nodes
            .get(from)
            .is_some_and(|node| node.outputs.contains(&to))
    }

    /// Nodes feeding `node` (directly or through one of its parameters).
    pub fn inputs(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.outputs.iter().any(|d| d.node() == node))
            .map(|(id, _)| id)
            .collect()
    }

    /// Remove a node and every edge pointing at it. The destination node is
    /// permanent.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.destination || self.nodes.remove(node).is_none() {
            return false;
        }
        for (_, other) in self.nodes.iter_mut() {
            other.outputs.retain(|d| d.node() != node);
        }
        true
    }

    pub fn param(&self, param: ParamId) -> Result<&AudioParam> {
        self.nodes
            .get(param.node)
            .ok_or(Error::NodeGone)?
            .param(param.kind)
            .ok_or(Error::MissingParam(param.kind))
    }

    pub fn param_mut(&mut self, param: ParamId) -> Result<&mut AudioParam> {
        self.nodes
            .get_mut(param.node)
            .ok_or(Error::NodeGone)?
            .param_mut(param.kind)
            .ok_or(Error::MissingParam(param.kind))
    }

    /// Control-rate value of a parameter at `time`: its own curve plus every
    /// constant source connected to it.
    pub fn value_at(&self, param: ParamId, time: f64) -> Result<f32> {
        let own = self.param(param)?.value_at(time);
        let target = Destination::Param(param);
        let modulation: f32 = self
            .nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::ConstantSource))
            .filter(|n| n.outputs.contains(&target))
            .filter_map(|n| n.param(ParamKind::Offset))
            .map(|offset| offset.value_at(time))
            .sum();
        Ok(own + modulation)
    }

    pub fn start(&mut self, node: NodeId, time: f64) -> Result<()> {
        let entry = self.nodes.get_mut(node).ok_or(Error::NodeGone)?;
        if entry.is_source() {
            entry.started = Some(time);
            entry.stopped = None;
        }
        Ok(())
    }

    pub fn stop(&mut self, node: NodeId, time: f64) -> Result<()> {
        let entry = self.nodes.get_mut(node).ok_or(Error::NodeGone)?;
        if entry.is_source() {
            entry.stopped = Some(time);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_removed_nodes() {
        let mut graph = AudioGraph::new();
        let a = graph.create_gain(1.0);
        let b = graph.create_gain(1.0);
        graph.remove(b);

        assert_eq!(graph.connect(a, b), Err(Error::NodeGone));
        assert_eq!(graph.connect(b, a), Err(Error::NodeGone));
    }

    #[test]
    fn connect_to_missing_param_fails() {
        let mut graph = AudioGraph::new();
        let a = graph.create_gain(1.0);
        let b = graph.create_gain(1.0);

        assert_eq!(
            graph.connect(a, ParamId::new(b, ParamKind::Frequency)),
            Err(Error::MissingParam(ParamKind::Frequency))
        );
    }

    #[test]
    fn remove_drops_incoming_edges_and_is_idempotent() {
        let mut graph = AudioGraph::new();
        let a = graph.create_gain(1.0);
        let b = graph.create_gain(1.0);
        graph.connect(a, b).unwrap();

        assert!(graph.remove(b));
        assert!(!graph.remove(b));
        assert!(graph.node(a).unwrap().outputs().is_empty());
    }

    #[test]
    fn destination_survives_remove() {
        let mut graph = AudioGraph::new();
        let out = graph.destination();
        assert!(!graph.remove(out));
        assert!(graph.contains(out));
    }

    #[test]
    fn constant_sources_modulate_param_read_back() {
        let mut graph = AudioGraph::new();
        let amp = graph.create_gain(0.0);
        let control = graph.create_constant(0.0);
        let gain = ParamId::new(amp, ParamKind::Gain);
        let offset = ParamId::new(control, ParamKind::Offset);

        graph.connect(control, gain).unwrap();
        graph.param_mut(offset).unwrap().set_value_at_time(0.5, 1.0);
        graph.param_mut(gain).unwrap().set_value_at_time(0.25, 0.0);

        assert_eq!(graph.value_at(gain, 0.5).unwrap(), 0.25);
        assert_eq!(graph.value_at(gain, 1.0).unwrap(), 0.75);

        graph.disconnect(control);
        assert_eq!(graph.value_at(gain, 1.0).unwrap(), 0.25);
    }

    #[test]
    fn inputs_include_param_connections() {
        let mut graph = AudioGraph::new();
        let osc = graph.create_oscillator(Waveform::Sine);
        let filter = graph.create_biquad(FilterType::LowPass);
        let lfo = graph.create_oscillator(Waveform::Triangle);

        graph.connect(osc, filter).unwrap();
        graph
            .connect(lfo, ParamId::new(filter, ParamKind::Frequency))
            .unwrap();

        let mut inputs = graph.inputs(filter);
        inputs.sort();
        let mut expected = vec![osc, lfo];
        expected.sort();
        assert_eq!(inputs, expected);
    }
}
