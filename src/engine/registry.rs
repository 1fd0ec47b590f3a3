use slotmap::{new_key_type, SlotMap};

use crate::graph::node::NodeId;

new_key_type! {
    /// Handle a sound object keeps to find its registry entry again.
    pub struct SoundId;
}

/// One live sound object: what it is and which graph nodes it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEntry {
    pub kind: &'static str,
    pub nodes: Vec<NodeId>,
}

/// Every sound object alive in one [`AudioContext`](super::AudioContext).
///
/// Objects append themselves on creation and remove themselves on dispose.
/// A context-wide sweep (`AudioContext::dispose_all`) tears down whatever is
/// still registered; objects disposed after the sweep find their entry gone
/// and do nothing.
#[derive(Debug, Default)]
pub struct SoundRegistry {
    sounds: SlotMap<SoundId, SoundEntry>,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: &'static str, nodes: Vec<NodeId>) -> SoundId {
        self.sounds.insert(SoundEntry { kind, nodes })
    }

    /// Record more nodes as owned by an existing entry.
    pub fn adopt(&mut self, id: SoundId, nodes: impl IntoIterator<Item = NodeId>) -> bool {
        match self.sounds.get_mut(id) {
            Some(entry) => {
                entry.nodes.extend(nodes);
                true
            }
            None => false,
        }
    }

    /// Remove an entry. A second call for the same id returns `None`.
    pub fn unregister(&mut self, id: SoundId) -> Option<SoundEntry> {
        self.sounds.remove(id)
    }

    pub fn contains(&self, id: SoundId) -> bool {
        self.sounds.contains_key(id)
    }

    pub fn get(&self, id: SoundId) -> Option<&SoundEntry> {
        self.sounds.get(id)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.sounds.values().filter(|e| e.kind == kind).count()
    }

    pub(crate) fn drain(&mut self) -> Vec<SoundEntry> {
        self.sounds.drain().map(|(_, entry)| entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_unregister_is_noop() {
        let mut registry = SoundRegistry::new();
        let id = registry.register("envelope", Vec::new());

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn adopt_requires_live_entry() {
        let mut registry = SoundRegistry::new();
        let id = registry.register("filter", Vec::new());
        registry.unregister(id);

        assert!(!registry.adopt(id, Vec::new()));
    }
}
