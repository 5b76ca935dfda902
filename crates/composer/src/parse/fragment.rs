// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! html5ever adapter: parses an HTML fragment into a flat arena of nodes.
//!
//! [`FragmentDom`] exists only inside the parsing step. All nodes live in
//! one arena owned by the dom; parents reference children by
//! [`FragmentHandle`]. Parse notices reported by html5ever are collected
//! rather than aborting, so that a best-effort tree is always available.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};

use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{namespace_url, ns, parse_fragment, Attribute, LocalName, QualName};

pub(crate) fn qual_name(tag: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(tag))
}

/// Handle into the [`FragmentDom`] arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FragmentHandle(pub(crate) usize);

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FragmentElement {
    pub(crate) name: QualName,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<FragmentHandle>,
}

impl FragmentElement {
    pub(crate) fn tag(&self) -> &str {
        self.name.local.as_ref()
    }

    pub(crate) fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FragmentNode {
    Document(Vec<FragmentHandle>),
    Element(FragmentElement),
    Text(String),
    /// Comments, processing instructions and other content the document
    /// model has no use for; kept in the arena so handles stay valid.
    Ignored,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FragmentDom {
    nodes: Vec<FragmentNode>,
    document: FragmentHandle,
    document_name: QualName,
    pub(crate) parse_errors: Vec<String>,
}

impl FragmentDom {
    fn new() -> Self {
        Self {
            nodes: vec![FragmentNode::Document(Vec::new())],
            document: FragmentHandle(0),
            document_name: qual_name("html"),
            parse_errors: Vec::new(),
        }
    }

    fn name_of(&self, handle: &FragmentHandle) -> &QualName {
        match self.get(handle) {
            FragmentNode::Element(el) => &el.name,
            _ => &self.document_name,
        }
    }

    /// Parse an HTML fragment. Never fails: parse notices are collected in
    /// `parse_errors` on the returned dom.
    pub(crate) fn parse(html: &str) -> FragmentDom {
        parse_fragment(
            FragmentSink::default(),
            Default::default(),
            qual_name("div"),
            vec![],
        )
        .from_utf8()
        .one(html.as_bytes())
    }

    pub(crate) fn document_handle(&self) -> FragmentHandle {
        self.document.clone()
    }

    pub(crate) fn get(&self, handle: &FragmentHandle) -> &FragmentNode {
        &self.nodes[handle.0]
    }

    fn get_mut(&mut self, handle: &FragmentHandle) -> &mut FragmentNode {
        &mut self.nodes[handle.0]
    }

    fn add(&mut self, node: FragmentNode) -> FragmentHandle {
        self.nodes.push(node);
        FragmentHandle(self.nodes.len() - 1)
    }

    fn children_mut(
        &mut self,
        handle: &FragmentHandle,
    ) -> Option<&mut Vec<FragmentHandle>> {
        match self.get_mut(handle) {
            FragmentNode::Document(children) => Some(children),
            FragmentNode::Element(el) => Some(&mut el.children),
            _ => None,
        }
    }

    /// Find the parent of a node by scanning the arena. The arena is tiny
    /// (one message), so a linear scan is fine.
    fn parent_of(
        &self,
        handle: &FragmentHandle,
    ) -> Option<(FragmentHandle, usize)> {
        for (i, node) in self.nodes.iter().enumerate() {
            let children = match node {
                FragmentNode::Document(children) => children,
                FragmentNode::Element(el) => &el.children,
                _ => continue,
            };
            if let Some(pos) = children.iter().position(|c| c == handle) {
                return Some((FragmentHandle(i), pos));
            }
        }
        None
    }
}

struct FragmentSink {
    state: RefCell<FragmentDom>,
}

impl Default for FragmentSink {
    fn default() -> Self {
        Self {
            state: RefCell::new(FragmentDom::new()),
        }
    }
}

impl FragmentSink {
    fn append_text(&self, parent: &FragmentHandle, tendril: StrTendril) {
        let dom = &mut *self.state.borrow_mut();
        // Extend the previous text child if there is one, so runs split by
        // the tokenizer come out whole.
        let last_text = match dom.get(parent) {
            FragmentNode::Document(children) => children.last().cloned(),
            FragmentNode::Element(el) => el.children.last().cloned(),
            _ => None,
        }
        .filter(|last| matches!(dom.get(last), FragmentNode::Text(_)));

        if let Some(last) = last_text {
            if let FragmentNode::Text(content) = dom.get_mut(&last) {
                content.push_str(tendril.as_ref());
            }
            return;
        }

        let handle = dom.add(FragmentNode::Text(tendril.as_ref().to_owned()));
        if let Some(children) = dom.children_mut(parent) {
            children.push(handle);
        }
    }
}

impl TreeSink for FragmentSink {
    type Handle = FragmentHandle;
    type Output = FragmentDom;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        self.state.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.state.borrow_mut().parse_errors.push(String::from(msg));
    }

    fn get_document(&self) -> Self::Handle {
        self.state.borrow().document_handle()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |dom| dom.name_of(target))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .iter()
            .map(|attr| {
                (
                    attr.name.local.as_ref().to_owned(),
                    attr.value.as_ref().to_owned(),
                )
            })
            .collect();
        self.state.borrow_mut().add(FragmentNode::Element(
            FragmentElement {
                name,
                attrs,
                children: Vec::new(),
            },
        ))
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        self.state.borrow_mut().add(FragmentNode::Ignored)
    }

    fn create_pi(
        &self,
        _target: StrTendril,
        _data: StrTendril,
    ) -> Self::Handle {
        self.state.borrow_mut().add(FragmentNode::Ignored)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(child) => {
                let dom = &mut *self.state.borrow_mut();
                if let Some(children) = dom.children_mut(parent) {
                    children.push(child);
                }
            }
            NodeOrText::AppendText(tendril) => {
                self.append_text(parent, tendril);
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent =
            self.state.borrow().parent_of(element).is_some();
        if has_parent {
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
        // Fragments carry no doctype worth keeping.
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    fn pop(&self, _node: &Self::Handle) {}

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Treat template contents as ordinary children so their text
        // survives the unwrap pass.
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let parent = self.state.borrow().parent_of(sibling);
        let Some((parent, pos)) = parent else {
            return;
        };
        match new_node {
            NodeOrText::AppendNode(node) => {
                let dom = &mut *self.state.borrow_mut();
                if let Some(children) = dom.children_mut(&parent) {
                    children.insert(pos, node);
                }
            }
            NodeOrText::AppendText(tendril) => {
                let dom = &mut *self.state.borrow_mut();
                let handle =
                    dom.add(FragmentNode::Text(tendril.as_ref().to_owned()));
                if let Some(children) = dom.children_mut(&parent) {
                    children.insert(pos, handle);
                }
            }
        }
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<Attribute>,
    ) {
        let dom = &mut *self.state.borrow_mut();
        if let FragmentNode::Element(el) = dom.get_mut(target) {
            for attr in attrs {
                let name = attr.name.local.as_ref();
                if el.get_attr(name).is_none() {
                    el.attrs
                        .push((name.to_owned(), attr.value.as_ref().to_owned()));
                }
            }
        }
    }

    fn associate_with_form(
        &self,
        _target: &Self::Handle,
        _form: &Self::Handle,
        _nodes: (&Self::Handle, Option<&Self::Handle>),
    ) {
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        let parent = self.state.borrow().parent_of(target);
        if let Some((parent, pos)) = parent {
            let dom = &mut *self.state.borrow_mut();
            if let Some(children) = dom.children_mut(&parent) {
                children.remove(pos);
            }
        }
    }

    fn reparent_children(
        &self,
        node: &Self::Handle,
        new_parent: &Self::Handle,
    ) {
        let dom = &mut *self.state.borrow_mut();
        let moved = match dom.children_mut(node) {
            Some(children) => std::mem::take(children),
            None => return,
        };
        if let Some(children) = dom.children_mut(new_parent) {
            children.extend(moved);
        }
    }

    fn is_mathml_annotation_xml_integration_point(
        &self,
        _handle: &Self::Handle,
    ) -> bool {
        false
    }

    fn set_current_line(&self, _line_number: u64) {}

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    fn allow_declarative_shadow_roots(
        &self,
        _intended_parent: &Self::Handle,
    ) -> bool {
        false
    }

    fn attach_declarative_shadow(
        &self,
        _location: &Self::Handle,
        _template: &Self::Handle,
        _attrs: Vec<Attribute>,
    ) -> Result<(), String> {
        Ok(())
    }
}
