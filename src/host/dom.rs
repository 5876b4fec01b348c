//! Arena-backed element tree.
//!
//! Elements and text runs live in one arena and are addressed by
//! [`ElementId`]. Removing an element only detaches it (parent cleared), so
//! node handles can move their element between parents. Slots are reclaimed
//! explicitly with [`Document::free_subtree`]; each slot carries a generation,
//! so a handle to a freed element never resolves to the slot's next occupant.
//!
//! `class` and `style` are stored as ordinary attributes; the class-list and
//! style helpers parse and rewrite them, so serialization and attribute reads
//! always agree with the helper views.

use crate::types::{ClassList, ScrollBehavior};

/// Handle to an element (or text run) in the host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    /// Arena slot index.
    pub fn raw(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct HostNode {
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) data: NodeData,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<HostNode>,
}

/// The host document: element arena plus document-level state (focus,
/// caret ranges, scroll position).
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Slot>,
    /// Indices of vacant slots, reused before the arena grows.
    free: Vec<u32>,
    body: ElementId,
    pub(crate) selection: Vec<(ElementId, usize, usize)>,
    pub(crate) scroll_top: f32,
    pub(crate) scroll_behavior: ScrollBehavior,
    pub(crate) viewport: (f32, f32),
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            body: ElementId {
                index: 0,
                generation: 0,
            },
            selection: Vec::new(),
            scroll_top: 0.0,
            scroll_behavior: ScrollBehavior::Auto,
            viewport: (1024.0, 768.0),
        };
        doc.body = doc.create_element("body");
        doc
    }

    /// The document surface every connected element descends from.
    pub fn body(&self) -> ElementId {
        self.body
    }

    /// Number of live elements and text runs.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node(&self, id: ElementId) -> Option<&HostNode> {
        self.nodes
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut HostNode> {
        self.nodes
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn push(&mut self, data: NodeData) -> ElementId {
        let node = HostNode {
            parent: None,
            children: Vec::new(),
            data,
        };
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.nodes.get_mut(index as usize) {
                slot.node = Some(node);
                return ElementId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        let index = self.nodes.len() as u32;
        self.nodes.push(Slot {
            generation: 0,
            node: Some(node),
        });
        ElementId {
            index,
            generation: 0,
        }
    }

    fn release_slot(&mut self, id: ElementId) {
        let Some(slot) = self.nodes.get_mut(id.index as usize) else { return };
        if slot.generation == id.generation && slot.node.take().is_some() {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a detached element. Tag names are lower-cased.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached text run.
    pub fn create_text(&mut self, text: &str) -> ElementId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn contains_id(&self, id: ElementId) -> bool {
        self.node(id).is_some()
    }

    /// Tag name, or `None` for text runs and unknown handles.
    pub fn tag(&self, id: ElementId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: ElementId) -> bool {
        self.tag(id).is_some()
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.parent
    }

    /// All child nodes, text runs included.
    pub fn child_nodes(&self, id: ElementId) -> Vec<ElementId> {
        self.node(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    /// Element children only.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.child_nodes(id)
            .into_iter()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    fn detach(&mut self, id: ElementId) {
        let Some(parent) = self.parent(id) else { return };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if parent == child || self.contains(child, parent) {
            tracing::warn!(?parent, ?child, "refusing to create a cycle in the host tree");
            return;
        }
        if !self.contains_id(parent) || !self.contains_id(child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Put `new` where `old` is. No-op when `old` has no parent.
    pub fn replace_with(&mut self, old: ElementId, new: ElementId) {
        if old == new {
            return;
        }
        let Some(parent) = self.parent(old) else { return };
        if self.contains(new, parent) {
            tracing::warn!(?old, ?new, "refusing to create a cycle in the host tree");
            return;
        }
        self.detach(new);
        let Some(index) = self
            .node(parent)
            .and_then(|n| n.children.iter().position(|c| *c == old))
        else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children[index] = new;
        }
        if let Some(node) = self.node_mut(old) {
            node.parent = None;
        }
        if let Some(node) = self.node_mut(new) {
            node.parent = Some(parent);
        }
    }

    /// Detach an element from its parent.
    pub fn remove(&mut self, id: ElementId) {
        self.detach(id);
    }

    /// Free a detached element and its subtree, returning the freed handles.
    ///
    /// Descendants for which `keep` returns true are detached and survive
    /// with their own subtrees. Attached elements, the body, and kept roots
    /// are left alone.
    pub fn free_subtree(&mut self, id: ElementId, keep: &dyn Fn(ElementId) -> bool) -> Vec<ElementId> {
        if id == self.body || !self.contains_id(id) || self.parent(id).is_some() || keep(id) {
            return Vec::new();
        }
        let mut freed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.child_nodes(current) {
                if keep(child) {
                    self.detach(child);
                } else {
                    stack.push(child);
                }
            }
            self.release_slot(current);
            freed.push(current);
        }
        self.selection.retain(|(el, _, _)| !freed.contains(el));
        freed
    }

    /// Inclusive ancestor test: is `node` equal to or inside `ancestor`?
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Ancestor chain from `id` (inclusive) up to its topmost ancestor.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }
        chain
    }

    /// True when the element descends from the document body.
    pub fn is_connected(&self, id: ElementId) -> bool {
        self.contains(self.body, id)
    }

    /// Descendant elements with the given tag, in document order.
    /// The root itself is not included.
    pub fn query_all(&self, root: ElementId, tag: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = self.child_nodes(root).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if self.tag(id) == Some(tag) {
                found.push(id);
            }
            stack.extend(self.child_nodes(id).into_iter().rev());
        }
        found
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn set_attribute(&mut self, id: ElementId, key: &str, value: &str) {
        if let Some(HostNode {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.node_mut(id)
        {
            match attrs.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((key.to_string(), value.to_string())),
            }
        }
    }

    pub fn get_attribute(&self, id: ElementId, key: &str) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn remove_attribute(&mut self, id: ElementId, key: &str) {
        if let Some(HostNode {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.node_mut(id)
        {
            attrs.retain(|(k, _)| k != key);
        }
    }

    pub fn attributes(&self, id: ElementId) -> Vec<(String, String)> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs.clone(),
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // Class list
    // =========================================================================

    pub fn class_list(&self, id: ElementId) -> ClassList {
        ClassList::from(self.get_attribute(id, "class").unwrap_or(""))
    }

    fn write_class_list(&mut self, id: ElementId, list: &ClassList) {
        self.set_attribute(id, "class", &list.joined());
    }

    pub fn add_class(&mut self, id: ElementId, class: &str) {
        let mut list = self.class_list(id);
        list.push(class.trim());
        self.write_class_list(id, &list);
    }

    pub fn remove_class(&mut self, id: ElementId, class: &str) {
        if self.get_attribute(id, "class").is_none() {
            return;
        }
        let mut list = self.class_list(id);
        list.remove(class.trim());
        self.write_class_list(id, &list);
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.class_list(id).contains(class)
    }

    // =========================================================================
    // Inline style
    // =========================================================================

    /// Parsed `style` attribute as `(property, value)` pairs.
    pub fn style_entries(&self, id: ElementId) -> Vec<(String, String)> {
        self.get_attribute(id, "style")
            .map(parse_style)
            .unwrap_or_default()
    }

    fn write_style(&mut self, id: ElementId, entries: &[(String, String)]) {
        if entries.is_empty() {
            self.remove_attribute(id, "style");
            return;
        }
        let serialized = entries
            .iter()
            .map(|(k, v)| format!("{k}: {v};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "style", &serialized);
    }

    /// Set one style property. CamelCase names are normalized to kebab-case.
    pub fn set_style(&mut self, id: ElementId, prop: &str, value: &str) {
        let prop = kebab_case(prop);
        let mut entries = self.style_entries(id);
        match entries.iter_mut().find(|(k, _)| *k == prop) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((prop, value.to_string())),
        }
        self.write_style(id, &entries);
    }

    pub fn remove_style(&mut self, id: ElementId, prop: &str) {
        let prop = kebab_case(prop);
        let mut entries = self.style_entries(id);
        entries.retain(|(k, _)| *k != prop);
        self.write_style(id, &entries);
    }

    pub fn get_style(&self, id: ElementId, prop: &str) -> Option<String> {
        let prop = kebab_case(prop);
        self.style_entries(id)
            .into_iter()
            .find(|(k, _)| *k == prop)
            .map(|(_, v)| v)
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Replace all children with a single text run (none when `text` is empty).
    pub fn set_text_content(&mut self, id: ElementId, text: &str) {
        if let Some(HostNode {
            data: NodeData::Text(contents),
            ..
        }) = self.node_mut(id)
        {
            *contents = text.to_string();
            return;
        }
        // Replaced text runs are freed; child elements may still be owned
        // elsewhere, so they are only detached.
        for child in self.child_nodes(id) {
            self.detach(child);
            if !self.is_element(child) {
                self.release_slot(child);
            }
        }
        if !text.is_empty() {
            let run = self.create_text(text);
            self.append_child(id, run);
        }
    }

    /// Concatenated text of all descendant text runs.
    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: ElementId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Serialized markup of the element including its own tag.
    pub fn outer_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.serialize(id, &mut out);
        out
    }

    /// Serialized markup of the element's children.
    pub fn inner_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        for child in self.child_nodes(id) {
            self.serialize(child, &mut out);
        }
        out
    }

    fn serialize(&self, id: ElementId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in &node.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    // =========================================================================
    // Document state
    // =========================================================================

    /// Record a caret range for an element (last write wins).
    pub fn set_selection_range(&mut self, id: ElementId, start: usize, end: usize) {
        self.selection.retain(|(el, _, _)| *el != id);
        self.selection.push((id, start, end));
    }

    pub fn selection_range(&self, id: ElementId) -> Option<(usize, usize)> {
        self.selection
            .iter()
            .find(|(el, _, _)| *el == id)
            .map(|(_, start, end)| (*start, *end))
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    pub fn scroll_behavior(&self) -> ScrollBehavior {
        self.scroll_behavior
    }

    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_style(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_string(), v.to_string()))
        })
        .collect()
}

/// `minHeight` -> `min-height`. Custom properties (`--x`) pass through.
pub(crate) fn kebab_case(prop: &str) -> String {
    if prop.starts_with("--") {
        return prop.to_string();
    }
    let mut out = String::with_capacity(prop.len() + 4);
    for ch in prop.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_replace() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.create_element("div");
        let b = doc.create_element("span");
        doc.append_child(body, a);
        assert!(doc.is_connected(a));

        doc.replace_with(a, b);
        assert!(!doc.is_connected(a));
        assert!(doc.is_connected(b));
        assert_eq!(doc.children(body), vec![b]);
    }

    #[test]
    fn test_replace_detached_is_noop() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        doc.replace_with(a, b);
        assert_eq!(doc.parent(b), None);
    }

    #[test]
    fn test_outer_html_placeholder_form() {
        let mut doc = Document::new();
        let el = doc.create_element("cmp");
        doc.set_attribute(el, "id", "c-1");
        assert_eq!(doc.outer_html(el), r#"<cmp id="c-1"></cmp>"#);
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let mut doc = Document::new();
        let el = doc.create_element("input");
        doc.set_attribute(el, "type", "text");
        assert_eq!(doc.outer_html(el), r#"<input type="text">"#);
    }

    #[test]
    fn test_style_roundtrip_and_kebab_case() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_style(el, "minHeight", "100vh");
        doc.set_style(el, "color", "red");
        assert_eq!(doc.get_attribute(el, "style"), Some("min-height: 100vh; color: red;"));
        doc.remove_style(el, "min-height");
        assert_eq!(doc.get_style(el, "minHeight"), None);
        doc.remove_style(el, "color");
        assert_eq!(doc.get_attribute(el, "style"), None);
    }

    #[test]
    fn test_text_content_replaces_children() {
        let mut doc = Document::new();
        let el = doc.create_element("p");
        let child = doc.create_element("b");
        doc.append_child(el, child);
        doc.set_text_content(el, "a < b");
        assert_eq!(doc.text_content(el), "a < b");
        assert_eq!(doc.inner_html(el), "a &lt; b");
        assert_eq!(doc.parent(child), None);
    }

    #[test]
    fn test_query_all_document_order() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let first = doc.create_element("cmp");
        let wrapper = doc.create_element("p");
        let nested = doc.create_element("cmp");
        let last = doc.create_element("cmp");
        doc.append_child(root, first);
        doc.append_child(root, wrapper);
        doc.append_child(wrapper, nested);
        doc.append_child(root, last);
        assert_eq!(doc.query_all(root, "cmp"), vec![first, nested, last]);
    }

    #[test]
    fn test_no_cycles() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner);
        doc.append_child(inner, outer);
        assert_eq!(doc.parent(outer), None);
    }

    #[test]
    fn test_text_updates_reuse_slots() {
        let mut doc = Document::new();
        let el = doc.create_element("p");
        doc.set_text_content(el, "0");
        let before = doc.len();
        for i in 1..1000 {
            doc.set_text_content(el, &i.to_string());
        }
        assert_eq!(doc.len(), before);
        assert_eq!(doc.text_content(el), "999");
    }

    #[test]
    fn test_free_subtree_keeps_owned_descendants() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let owned = doc.create_element("li");
        let plain = doc.create_element("span");
        doc.append_child(root, owned);
        doc.append_child(root, plain);
        doc.set_text_content(owned, "kept");

        let freed = doc.free_subtree(root, &|el| el == owned);
        assert_eq!(freed.len(), 2);
        assert!(!doc.contains_id(root));
        assert!(!doc.contains_id(plain));
        assert_eq!(doc.parent(owned), None);
        assert_eq!(doc.text_content(owned), "kept");
    }

    #[test]
    fn test_freed_handles_never_alias_new_elements() {
        let mut doc = Document::new();
        let old = doc.create_element("div");
        doc.free_subtree(old, &|_| false);
        let new = doc.create_element("span");
        assert_eq!(new.raw(), old.raw());
        assert_ne!(new, old);
        assert_eq!(doc.tag(old), None);
        assert_eq!(doc.tag(new), Some("span"));
    }

    #[test]
    fn test_attached_elements_are_not_freed() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, el);
        assert!(doc.free_subtree(el, &|_| false).is_empty());
        assert!(doc.free_subtree(body, &|_| false).is_empty());
        assert!(doc.is_connected(el));
    }
}
