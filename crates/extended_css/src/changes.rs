//! Sources of "the document changed, re-evaluate" signals.

use dom::{MutationRecord, MutationSource, NodeKey, ObserveOptions, ObserverId};
use log::debug;

/// Feeds the engine's re-apply scheduler.
pub trait ChangeNotifier {
    /// Start watching the tree under `root`. Connecting twice is a no-op.
    fn connect(&mut self, source: &mut dyn MutationSource, root: NodeKey);

    fn disconnect(&mut self, source: &mut dyn MutationSource);

    fn is_connected(&self) -> bool;

    /// Drain everything observed since the last call.
    fn take_changes(&mut self, source: &mut dyn MutationSource) -> Vec<MutationRecord>;
}

/// Watches child lists across the whole subtree plus `id` and `class` changes, which are
/// what can make a selector start or stop matching.
#[derive(Debug, Default)]
pub struct DocumentChangeNotifier {
    observer: Option<ObserverId>,
}

impl DocumentChangeNotifier {
    pub const fn new() -> Self {
        Self { observer: None }
    }

    fn options() -> ObserveOptions {
        ObserveOptions {
            child_list: true,
            subtree: true,
            attributes: true,
            attribute_filter: Some(vec!["id".to_owned(), "class".to_owned()]),
            ..ObserveOptions::default()
        }
    }
}

impl ChangeNotifier for DocumentChangeNotifier {
    fn connect(&mut self, source: &mut dyn MutationSource, root: NodeKey) {
        if self.observer.is_none() {
            self.observer = Some(source.observe(root, Self::options()));
            debug!("observing document changes under {root}");
        }
    }

    fn disconnect(&mut self, source: &mut dyn MutationSource) {
        if let Some(observer) = self.observer.take() {
            source.disconnect(observer);
        }
    }

    fn is_connected(&self) -> bool {
        self.observer.is_some()
    }

    fn take_changes(&mut self, source: &mut dyn MutationSource) -> Vec<MutationRecord> {
        self.observer
            .map(|observer| source.take_records(observer))
            .unwrap_or_default()
    }
}
