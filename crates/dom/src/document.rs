//! In-memory document: an `indextree` arena of nodes addressed by stable [`NodeKey`]s.

use crate::computed::{self, AuthorStyles};
use crate::mutation::ObserverRegistry;
use crate::xpath;
use crate::{
    DomAccess, DomMutation, HostError, MutationKind, MutationRecord, MutationSource, NodeKey,
    ObserveOptions, ObserverId, PropertyValue, PseudoElement,
};
use anyhow::{Result, anyhow, bail};
use core::mem;
use css_selectors::{ElementAdapter, matches_selector_list, parse_selector_list};
use indexmap::IndexMap;
use indextree::{Arena, Node, NodeId};
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub(crate) enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct DomNode {
    pub(crate) key: NodeKey,
    pub(crate) kind: NodeKind,
    pub(crate) attrs: SmallVec<(String, String), 4>,
    /// Script-side expando properties.
    pub(crate) properties: IndexMap<String, PropertyValue>,
}

impl DomNode {
    fn new(key: NodeKey, kind: NodeKind) -> Self {
        Self {
            key,
            kind,
            attrs: SmallVec::new(),
            properties: IndexMap::new(),
        }
    }

    pub(crate) fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A mutable document tree with observers, author styles and script properties.
pub struct Document {
    pub(crate) arena: Arena<DomNode>,
    pub(crate) root: NodeId,
    ids: HashMap<NodeKey, NodeId>,
    next_key: u64,
    observers: ObserverRegistry,
    pub(crate) styles: AuthorStyles,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document with only the document node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(DomNode::new(NodeKey::ROOT, NodeKind::Document));
        let mut ids = HashMap::new();
        ids.insert(NodeKey::ROOT, root);
        Self {
            arena,
            root,
            ids,
            next_key: 1,
            observers: ObserverRegistry::default(),
            styles: AuthorStyles::default(),
        }
    }

    pub(crate) fn node_id(&self, key: NodeKey) -> Option<NodeId> {
        self.ids
            .get(&key)
            .copied()
            .filter(|id| !id.is_removed(&self.arena))
    }

    pub(crate) fn node(&self, key: NodeKey) -> Option<&DomNode> {
        let id = self.node_id(key)?;
        self.arena.get(id).map(Node::get)
    }

    fn node_mut(&mut self, key: NodeKey) -> Option<&mut DomNode> {
        let id = self.node_id(key)?;
        self.arena.get_mut(id).map(Node::get_mut)
    }

    pub(crate) fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.arena.get(id).map(|node| node.get().key)
    }

    fn mint(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.saturating_add(1);
        let id = self.arena.new_node(DomNode::new(key, kind));
        self.ids.insert(key, id);
        key
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        self.mint(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.mint(NodeKind::Text {
            text: text.to_owned(),
        })
    }

    /// Append `child` as the last child of `parent`, moving it if it is already attached.
    ///
    /// # Errors
    /// Returns an error for unknown nodes, text parents or an insertion that would create a cycle.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when `reference` is `None`.
    ///
    /// # Errors
    /// Returns an error for unknown nodes, text parents, a reference that is not a child of
    /// `parent`, or an insertion that would create a cycle.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<()> {
        let parent_id = self
            .node_id(parent)
            .ok_or_else(|| anyhow!("unknown parent {parent}"))?;
        let child_id = self
            .node_id(child)
            .ok_or_else(|| anyhow!("unknown child {child}"))?;
        if matches!(self.node(parent).map(|node| &node.kind), Some(NodeKind::Text { .. })) {
            bail!("text node {parent} cannot have children");
        }
        if parent_id.ancestors(&self.arena).any(|ancestor| ancestor == child_id) {
            bail!("inserting {child} under {parent} would create a cycle");
        }
        if self.parent_node(child).is_some() {
            self.detach_with_record(child);
        }
        match reference {
            Some(reference_key) => {
                let reference_id = self
                    .node_id(reference_key)
                    .ok_or_else(|| anyhow!("unknown reference {reference_key}"))?;
                if self.arena.get(reference_id).and_then(Node::parent) != Some(parent_id) {
                    bail!("{reference_key} is not a child of {parent}");
                }
                reference_id
                    .checked_insert_before(child_id, &mut self.arena)
                    .map_err(|err| anyhow!("insert failed: {err}"))?;
            }
            None => parent_id
                .checked_append(child_id, &mut self.arena)
                .map_err(|err| anyhow!("append failed: {err}"))?,
        }
        self.record(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        });
        Ok(())
    }

    /// Create an element with attributes and append it to `parent`.
    ///
    /// # Errors
    /// Returns an error if `parent` cannot take children.
    pub fn append_element(
        &mut self,
        parent: NodeKey,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeKey> {
        let element = self.create_element_with_attrs(
            tag,
            attrs
                .iter()
                .map(|(name, value)| ((*name).to_owned(), (*value).to_owned())),
        );
        self.append_child(parent, element)?;
        Ok(element)
    }

    /// Create a detached element. Later duplicates of an attribute name are dropped.
    pub(crate) fn create_element_with_attrs<I>(&mut self, tag: &str, attrs: I) -> NodeKey
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let element = self.create_element(tag);
        if let Some(node) = self.node_mut(element) {
            for (name, value) in attrs {
                let lowered = name.to_ascii_lowercase();
                if node.attr(&lowered).is_none() {
                    node.attrs.push((lowered, value));
                }
            }
        }
        element
    }

    /// Insert text under `parent` before `reference`, extending the text node in front of it.
    pub(crate) fn insert_text(
        &mut self,
        parent: NodeKey,
        text: &str,
        reference: Option<NodeKey>,
    ) -> Result<()> {
        let parent_id = self
            .node_id(parent)
            .ok_or_else(|| anyhow!("unknown parent {parent}"))?;
        let previous = match reference {
            Some(reference_key) => self
                .node_id(reference_key)
                .and_then(|id| self.arena.get(id))
                .and_then(Node::previous_sibling),
            None => self.arena.get(parent_id).and_then(Node::last_child),
        };
        if let Some(previous_id) = previous
            && let Some(node) = self.arena.get_mut(previous_id)
            && let NodeKind::Text { text: existing } = &mut node.get_mut().kind
        {
            existing.push_str(text);
            return Ok(());
        }
        let node = self.create_text(text);
        self.insert_before(parent, node, reference)
    }

    /// Every child of `node`, text included.
    pub(crate) fn child_nodes(&self, node: NodeKey) -> Vec<NodeKey> {
        self.node_id(node)
            .map(|id| {
                id.children(&self.arena)
                    .filter_map(|child| self.key_of(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Create a text node and append it to `parent`.
    ///
    /// # Errors
    /// Returns an error if `parent` cannot take children.
    pub fn append_text(&mut self, parent: NodeKey, text: &str) -> Result<NodeKey> {
        let node = self.create_text(text);
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Replace every child of `element` with one text node.
    ///
    /// # Errors
    /// Returns an error if `element` is unknown or is a text node.
    pub fn set_text_content(&mut self, element: NodeKey, text: &str) -> Result<()> {
        if self.node_id(element).is_none() {
            bail!("unknown node {element}");
        }
        for child in self.child_nodes(element) {
            self.detach_with_record(child);
        }
        if !text.is_empty() {
            self.append_text(element, text)?;
        }
        Ok(())
    }

    /// Set a script-side property on an element.
    ///
    /// # Errors
    /// Returns an error if `element` is not an element.
    pub fn set_property(
        &mut self,
        element: NodeKey,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let node = self
            .node_mut(element)
            .filter(|node| node.tag().is_some())
            .ok_or_else(|| anyhow!("{element} is not an element"))?;
        node.properties.insert(name.to_owned(), value);
        Ok(())
    }

    /// Register author CSS used by computed style. Rules may target `::before`/`::after`.
    ///
    /// # Errors
    /// Returns an error if a rule does not parse.
    pub fn add_stylesheet(&mut self, css: &str) -> Result<()> {
        self.styles.add(css)
    }

    /// First element whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.descendant_elements(NodeKey::ROOT)
            .into_iter()
            .find(|&element| self.attr(element, "id") == Some(id))
    }

    /// All elements matching a standard selector, in document order.
    ///
    /// # Errors
    /// Returns an error if the selector does not parse.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeKey>> {
        Ok(self.query_selector_all(NodeKey::ROOT, selector)?)
    }

    /// First element matching a standard selector.
    ///
    /// # Errors
    /// Returns an error if the selector does not parse.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeKey>> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// Number of live observations, for leak checks.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Inclusive ancestor chain of `node`, nearest first.
    fn ancestors_inclusive(&self, node: NodeKey) -> Vec<NodeKey> {
        self.node_id(node)
            .map(|id| {
                id.ancestors(&self.arena)
                    .filter_map(|ancestor| self.key_of(ancestor))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn record(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let ancestors = self.ancestors_inclusive(record.target);
        self.observers.notify(&record, &ancestors);
    }

    /// Detach `node` from its parent and report the removal.
    fn detach_with_record(&mut self, node: NodeKey) {
        let Some(parent) = self.parent_node(node) else {
            return;
        };
        if let Some(id) = self.node_id(node) {
            id.detach(&mut self.arena);
        }
        self.record(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![node],
            },
        });
    }

    fn sibling_element(&self, element: NodeKey, forward: bool) -> Option<NodeKey> {
        let id = self.node_id(element)?;
        let is_element = |candidate: &NodeId| {
            self.arena
                .get(*candidate)
                .is_some_and(|node| node.get().tag().is_some())
        };
        let found = if forward {
            id.following_siblings(&self.arena).skip(1).find(is_element)
        } else {
            id.preceding_siblings(&self.arena).skip(1).find(is_element)
        };
        found.and_then(|sibling| self.key_of(sibling))
    }
}

impl ElementAdapter for Document {
    type Handle = NodeKey;

    fn parent(&self, element: NodeKey) -> Option<NodeKey> {
        self.parent_element(element)
    }

    fn previous_sibling_element(&self, element: NodeKey) -> Option<NodeKey> {
        self.sibling_element(element, false)
    }

    fn next_sibling_element(&self, element: NodeKey) -> Option<NodeKey> {
        self.sibling_element(element, true)
    }

    fn tag_name(&self, element: NodeKey) -> &str {
        self.node(element)
            .and_then(DomNode::tag)
            .unwrap_or_default()
    }

    fn attr(&self, element: NodeKey, name: &str) -> Option<&str> {
        self.node(element)?.attr(name)
    }

    fn has_child_nodes(&self, element: NodeKey) -> bool {
        let Some(id) = self.node_id(element) else {
            return false;
        };
        id.children(&self.arena).any(|child| {
            self.arena
                .get(child)
                .is_some_and(|node| match &node.get().kind {
                    NodeKind::Text { text } => !text.is_empty(),
                    NodeKind::Element { .. } | NodeKind::Document => true,
                })
        })
    }
}

impl DomAccess for Document {
    fn document(&self) -> NodeKey {
        NodeKey::ROOT
    }

    fn is_element(&self, node: NodeKey) -> bool {
        self.node(node).is_some_and(|data| data.tag().is_some())
    }

    fn parent_node(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.node_id(node)?;
        let parent = self.arena.get(id)?.parent()?;
        self.key_of(parent)
    }

    fn element_children(&self, node: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.node_id(node) else {
            return Vec::new();
        };
        id.children(&self.arena)
            .filter_map(|child| {
                let data = self.arena.get(child)?.get();
                data.tag().map(|_| data.key)
            })
            .collect()
    }

    fn next_element_sibling(&self, element: NodeKey) -> Option<NodeKey> {
        self.sibling_element(element, true)
    }

    fn previous_element_sibling(&self, element: NodeKey) -> Option<NodeKey> {
        self.sibling_element(element, false)
    }

    fn tag_name(&self, element: NodeKey) -> Option<String> {
        self.node(element)?.tag().map(str::to_owned)
    }

    fn attribute(&self, element: NodeKey, name: &str) -> Option<String> {
        self.node(element)?
            .attr(&name.to_ascii_lowercase())
            .map(str::to_owned)
    }

    fn attributes(&self, element: NodeKey) -> Vec<(String, String)> {
        self.node(element)
            .map(|node| node.attrs.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn text_content(&self, node: NodeKey) -> String {
        let Some(id) = self.node_id(node) else {
            return String::new();
        };
        let mut text = String::new();
        for descendant in id.descendants(&self.arena) {
            if let Some(data) = self.arena.get(descendant)
                && let NodeKind::Text { text: chunk } = &data.get().kind
            {
                text.push_str(chunk);
            }
        }
        text
    }

    fn computed_style_value(
        &self,
        element: NodeKey,
        pseudo: Option<PseudoElement>,
        property: &str,
    ) -> Option<String> {
        computed::computed_value(self, element, pseudo, property)
    }

    fn element_properties(&self, element: NodeKey) -> IndexMap<String, PropertyValue> {
        let Some(node) = self.node(element) else {
            return IndexMap::new();
        };
        let Some(tag) = node.tag() else {
            return IndexMap::new();
        };
        let mut properties = IndexMap::new();
        properties.insert(
            "tagName".to_owned(),
            PropertyValue::String(tag.to_ascii_uppercase()),
        );
        properties.insert(
            "nodeName".to_owned(),
            PropertyValue::String(tag.to_ascii_uppercase()),
        );
        properties.insert("nodeType".to_owned(), PropertyValue::Number(1.0));
        properties.insert(
            "id".to_owned(),
            PropertyValue::String(node.attr("id").unwrap_or_default().to_owned()),
        );
        properties.insert(
            "className".to_owned(),
            PropertyValue::String(node.attr("class").unwrap_or_default().to_owned()),
        );
        for (name, value) in &node.properties {
            properties.insert(name.clone(), value.clone());
        }
        properties
    }

    fn evaluate_xpath(
        &self,
        context: NodeKey,
        expression: &str,
    ) -> Result<Vec<NodeKey>, HostError> {
        if self.node_id(context).is_none() {
            return Err(HostError::UnknownNode(context));
        }
        xpath::evaluate(self, context, expression).map_err(HostError::InvalidXPath)
    }

    fn query_selector_all(
        &self,
        scope: NodeKey,
        selector: &str,
    ) -> Result<Vec<NodeKey>, HostError> {
        let list = parse_selector_list(selector)
            .map_err(|err| HostError::InvalidSelector(format!("{selector}: {err}")))?;
        Ok(self
            .descendant_elements(scope)
            .into_iter()
            .filter(|&element| matches_selector_list(self, element, &list))
            .collect())
    }

    fn matches_selector(&self, element: NodeKey, selector: &str) -> Result<bool, HostError> {
        if !self.is_element(element) {
            return Err(HostError::NotAnElement(element));
        }
        let list = parse_selector_list(selector)
            .map_err(|err| HostError::InvalidSelector(format!("{selector}: {err}")))?;
        Ok(matches_selector_list(self, element, &list))
    }
}

impl DomMutation for Document {
    fn set_attribute(
        &mut self,
        element: NodeKey,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let lowered = name.to_ascii_lowercase();
        let node = self
            .node_mut(element)
            .ok_or(HostError::UnknownNode(element))?;
        if node.tag().is_none() {
            return Err(HostError::NotAnElement(element));
        }
        let old_value = if let Some(slot) = node.attrs.iter_mut().find(|(key, _)| *key == lowered)
        {
            Some(mem::replace(&mut slot.1, value.to_owned()))
        } else {
            node.attrs.push((lowered.clone(), value.to_owned()));
            None
        };
        self.record(MutationRecord {
            target: element,
            kind: MutationKind::Attributes {
                name: lowered,
                old_value,
            },
        });
        Ok(())
    }

    fn remove_attribute(&mut self, element: NodeKey, name: &str) -> Result<(), HostError> {
        let lowered = name.to_ascii_lowercase();
        let node = self
            .node_mut(element)
            .ok_or(HostError::UnknownNode(element))?;
        if node.tag().is_none() {
            return Err(HostError::NotAnElement(element));
        }
        let Some(index) = node.attrs.iter().position(|(key, _)| *key == lowered) else {
            return Ok(());
        };
        let (_, old_value) = node.attrs.remove(index);
        self.record(MutationRecord {
            target: element,
            kind: MutationKind::Attributes {
                name: lowered,
                old_value: Some(old_value),
            },
        });
        Ok(())
    }

    fn remove_node(&mut self, node: NodeKey) -> Result<(), HostError> {
        if self.node_id(node).is_none() || node == NodeKey::ROOT {
            return Err(HostError::UnknownNode(node));
        }
        self.detach_with_record(node);
        Ok(())
    }
}

impl MutationSource for Document {
    fn observe(&mut self, target: NodeKey, options: ObserveOptions) -> ObserverId {
        self.observers.observe(target, options)
    }

    fn disconnect(&mut self, observer: ObserverId) {
        self.observers.disconnect(observer);
    }

    fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take(observer)
    }
}
