//! Observer registry: routes mutation records to interested observers.

use core::mem;

use crate::{MutationKind, MutationRecord, NodeKey, ObserveOptions, ObserverId};

#[derive(Debug)]
struct ObserverEntry {
    id: ObserverId,
    target: NodeKey,
    options: ObserveOptions,
    queue: Vec<MutationRecord>,
}

impl ObserverEntry {
    /// Whether a record on a node with the given inclusive ancestor chain is of interest.
    fn wants(&self, record: &MutationRecord, ancestors: &[NodeKey]) -> bool {
        let in_scope = record.target == self.target
            || (self.options.subtree && ancestors.contains(&self.target));
        if !in_scope {
            return false;
        }
        match &record.kind {
            MutationKind::ChildList { .. } => self.options.child_list,
            MutationKind::Attributes { name, .. } => {
                self.options.attributes
                    && self
                        .options
                        .attribute_filter
                        .as_ref()
                        .is_none_or(|filter| filter.iter().any(|wanted| wanted == name))
            }
            MutationKind::CharacterData { .. } => self.options.character_data,
        }
    }

    /// Copy of `record` trimmed to what this observer asked for.
    fn shape(&self, record: &MutationRecord) -> MutationRecord {
        let mut shaped = record.clone();
        match &mut shaped.kind {
            MutationKind::Attributes { old_value, .. }
                if !self.options.attribute_old_value =>
            {
                *old_value = None;
            }
            MutationKind::CharacterData { old_value } => {
                *old_value = None;
            }
            _ => {}
        }
        shaped
    }
}

/// Observers registered on one document.
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    entries: Vec<ObserverEntry>,
}

impl ObserverRegistry {
    pub(crate) fn observe(&mut self, target: NodeKey, options: ObserveOptions) -> ObserverId {
        self.next_id = self.next_id.saturating_add(1);
        let id = ObserverId(self.next_id);
        self.entries.push(ObserverEntry {
            id,
            target,
            options,
            queue: Vec::new(),
        });
        id
    }

    pub(crate) fn disconnect(&mut self, observer: ObserverId) {
        self.entries.retain(|entry| entry.id != observer);
    }

    pub(crate) fn take(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == observer)
            .map(|entry| mem::take(&mut entry.queue))
            .unwrap_or_default()
    }

    /// Queue `record` for every interested observer. `ancestors` is the inclusive ancestor
    /// chain of the record target at the time of the change.
    pub(crate) fn notify(&mut self, record: &MutationRecord, ancestors: &[NodeKey]) {
        for entry in &mut self.entries {
            if entry.wants(record, ancestors) {
                let shaped = entry.shape(record);
                entry.queue.push(shaped);
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
