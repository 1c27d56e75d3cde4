//! Building documents from markup with `html5ever`.
//!
//! The tree builder drives [`DocumentSink`], which creates nodes straight in the document's
//! arena. Comments, processing instructions and the doctype are dropped.

use crate::document::Document;
use crate::{DomAccess as _, DomMutation as _, NodeKey};
use anyhow::{Error, Result};
use core::cell::RefCell;
use html5ever::tendril::{StrTendril, TendrilSink as _};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{
    Attribute, ExpandedName, LocalName, Namespace, ParseOpts, QualName, parse_document,
};
use log::{trace, warn};
use std::borrow::Cow;
use std::rc::Rc;

impl Document {
    /// Build a document from markup using the HTML5 tree construction rules.
    ///
    /// Malformed markup is repaired the way a browser would repair it.
    ///
    /// # Errors
    /// Returns an error if the tree builder asks for an insertion the document refuses.
    pub fn parse_html(html: &str) -> Result<Self> {
        parse_document(DocumentSink::new(), ParseOpts::default()).one(html)
    }
}

/// A node as seen by the tree builder.
#[derive(Clone)]
struct SinkHandle {
    /// `None` for nodes the document does not keep.
    key: Option<NodeKey>,
    name: Rc<QualName>,
}

struct DocumentSink {
    document: RefCell<Document>,
    /// Name reported for the document node and dropped nodes.
    unnamed: Rc<QualName>,
    failure: RefCell<Option<Error>>,
}

impl DocumentSink {
    fn new() -> Self {
        Self {
            document: RefCell::new(Document::new()),
            unnamed: Rc::new(QualName::new(None, Namespace::from(""), LocalName::from(""))),
            failure: RefCell::new(None),
        }
    }

    fn handle(&self, key: Option<NodeKey>) -> SinkHandle {
        SinkHandle {
            key,
            name: Rc::clone(&self.unnamed),
        }
    }

    /// Keep the first failure; the tree builder cannot be stopped mid-parse.
    fn note(&self, result: Result<()>) {
        if let Err(err) = result {
            warn!("markup: {err:#}");
            self.failure.borrow_mut().get_or_insert(err);
        }
    }

    fn insert(
        &self,
        parent: NodeKey,
        child: NodeOrText<SinkHandle>,
        reference: Option<NodeKey>,
    ) -> Result<()> {
        let mut document = self.document.borrow_mut();
        match child {
            NodeOrText::AppendNode(handle) => match handle.key {
                Some(key) => document.insert_before(parent, key, reference),
                None => Ok(()),
            },
            NodeOrText::AppendText(text) => document.insert_text(parent, &text, reference),
        }
    }

    fn parent_of(&self, node: NodeKey) -> Option<NodeKey> {
        self.document.borrow().parent_node(node)
    }
}

impl TreeSink for DocumentSink {
    type Handle = SinkHandle;
    type Output = Result<Document>;
    type ElemName<'a> = ExpandedName<'a>;

    fn finish(self) -> Self::Output {
        match self.failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(self.document.into_inner()),
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        trace!("html5ever: {msg}");
    }

    fn get_document(&self) -> SinkHandle {
        self.handle(Some(NodeKey::ROOT))
    }

    fn elem_name<'a>(&'a self, target: &'a SinkHandle) -> ExpandedName<'a> {
        target.name.expanded()
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> SinkHandle {
        let key = self.document.borrow_mut().create_element_with_attrs(
            &name.local,
            attrs
                .into_iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string())),
        );
        SinkHandle {
            key: Some(key),
            name: Rc::new(name),
        }
    }

    fn create_comment(&self, _text: StrTendril) -> SinkHandle {
        self.handle(None)
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> SinkHandle {
        self.handle(None)
    }

    fn append(&self, parent: &SinkHandle, child: NodeOrText<SinkHandle>) {
        if let Some(parent_key) = parent.key {
            self.note(self.insert(parent_key, child, None));
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &SinkHandle,
        prev_element: &SinkHandle,
        child: NodeOrText<SinkHandle>,
    ) {
        let attached = element
            .key
            .is_some_and(|key| self.parent_of(key).is_some());
        if attached {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &SinkHandle) -> SinkHandle {
        target.clone()
    }

    fn same_node(&self, x: &SinkHandle, y: &SinkHandle) -> bool {
        x.key == y.key && Rc::ptr_eq(&x.name, &y.name)
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &SinkHandle, new_node: NodeOrText<SinkHandle>) {
        let Some(sibling_key) = sibling.key else {
            return;
        };
        if let Some(parent) = self.parent_of(sibling_key) {
            self.note(self.insert(parent, new_node, Some(sibling_key)));
        }
    }

    fn add_attrs_if_missing(&self, target: &SinkHandle, attrs: Vec<Attribute>) {
        let Some(key) = target.key else {
            return;
        };
        let mut document = self.document.borrow_mut();
        for attr in attrs {
            let name = attr.name.local.to_string();
            if document.attribute(key, &name).is_none() {
                self.note(
                    document
                        .set_attribute(key, &name, &attr.value)
                        .map_err(Error::from),
                );
            }
        }
    }

    fn remove_from_parent(&self, target: &SinkHandle) {
        let Some(key) = target.key else {
            return;
        };
        if self.parent_of(key).is_some() {
            let result = self.document.borrow_mut().remove_node(key);
            self.note(result.map_err(Error::from));
        }
    }

    fn reparent_children(&self, node: &SinkHandle, new_parent: &SinkHandle) {
        let (Some(from), Some(to)) = (node.key, new_parent.key) else {
            return;
        };
        let mut document = self.document.borrow_mut();
        for child in document.child_nodes(from) {
            self.note(document.append_child(to, child));
        }
    }
}
