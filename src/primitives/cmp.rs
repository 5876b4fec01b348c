//! Node handle - a live, mutable reference to one element in the tree.
//!
//! `Cmp` is a cheap clone (`Rc`) of the node record. The registry owns one
//! strong handle per live node and each parent owns its children; parent links,
//! listener closures, and timer callbacks only hold [`WeakCmp`]s, so removing a
//! node releases it.
//!
//! No `RefCell` borrow is held while user callbacks or host dispatch run.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::engine::settings;
use crate::error::{Error, Result};
use crate::host::{self, ElementId, ListenerId, TimerId};
use crate::state::animate::{self, AnimPhase, AnimTimer};
use crate::state::focus;
use crate::types::{
    AttrKeys, Attrs, ClassAction, ClassList, CmpFlags, ScrollIntoViewOptions, StyleMap,
};

use super::lifecycle;
use super::types::Props;

/// Tag of the placeholder element a node serializes to inside markup.
pub const PLACEHOLDER_TAG: &str = "cmp";

/// Canonical empty placeholder markup for a node id.
pub fn placeholder(id: &str) -> String {
    placeholder_with_tag(id, PLACEHOLDER_TAG)
}

pub(crate) fn placeholder_with_tag(id: &str, tag: &str) -> String {
    format!(r#"<{tag} id="{id}"></{tag}>"#)
}

// =============================================================================
// Node Record
// =============================================================================

/// Stored rebuild capability of a wrapper node.
#[derive(Clone)]
pub(crate) struct Wrapper {
    pub(crate) rebuild: Rc<dyn Fn(Props) -> Result<Cmp>>,
    /// Props the node was last built from; update merges into these.
    pub(crate) baseline: Props,
}

pub(crate) struct CmpData {
    pub(crate) id: String,
    pub(crate) elem: ElementId,
    pub(crate) parent: Option<WeakCmp>,
    pub(crate) children: Vec<Cmp>,
    pub(crate) props: Props,
    /// Host listeners currently attached to `elem`, by event kind.
    pub(crate) listeners: HashMap<String, Vec<ListenerId>>,
    pub(crate) anim: Option<AnimTimer>,
    pub(crate) scroll_timer: Option<TimerId>,
    pub(crate) flags: CmpFlags,
    pub(crate) wrapper: Option<Wrapper>,
}

impl CmpData {
    pub(crate) fn is_removed(&self) -> bool {
        self.flags.contains(CmpFlags::REMOVED)
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Live node handle.
#[derive(Clone)]
pub struct Cmp(Rc<RefCell<CmpData>>);

/// Non-owning node handle.
#[derive(Clone)]
pub struct WeakCmp(Weak<RefCell<CmpData>>);

impl WeakCmp {
    pub fn upgrade(&self) -> Option<Cmp> {
        self.0.upgrade().map(Cmp)
    }
}

impl PartialEq for Cmp {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Cmp {}

impl fmt::Debug for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Cmp")
                .field("id", &data.id)
                .field("elem", &data.elem)
                .field("flags", &data.flags)
                .field("children", &data.children.len())
                .finish(),
            Err(_) => f.write_str("Cmp(<borrowed>)"),
        }
    }
}

/// Formats as the node's placeholder, for embedding in markup:
/// `format!("<p>{child}</p>")`.
impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&placeholder(&self.id()))
    }
}

impl Cmp {
    pub(crate) fn new(id: String, elem: ElementId, props: Props) -> Self {
        Cmp(Rc::new(RefCell::new(CmpData {
            id,
            elem,
            parent: None,
            children: Vec::new(),
            props,
            listeners: HashMap::new(),
            anim: None,
            scroll_timer: None,
            flags: CmpFlags::empty(),
            wrapper: None,
        })))
    }

    pub(crate) fn borrow(&self) -> Ref<'_, CmpData> {
        self.0.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, CmpData> {
        self.0.borrow_mut()
    }

    pub fn downgrade(&self) -> WeakCmp {
        WeakCmp(Rc::downgrade(&self.0))
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> String {
        self.borrow().id.clone()
    }

    pub fn elem(&self) -> ElementId {
        self.borrow().elem
    }

    pub fn parent(&self) -> Option<Cmp> {
        self.borrow().parent.as_ref().and_then(WeakCmp::upgrade)
    }

    pub fn children(&self) -> Vec<Cmp> {
        self.borrow().children.clone()
    }

    /// Snapshot of the props last applied.
    pub fn props(&self) -> Props {
        self.borrow().props.clone()
    }

    pub fn flags(&self) -> CmpFlags {
        self.borrow().flags
    }

    pub fn is_root(&self) -> bool {
        self.flags().contains(CmpFlags::ROOT)
    }

    pub fn is_template_child(&self) -> bool {
        self.flags().contains(CmpFlags::TEMPLATE_CHILD)
    }

    pub fn is_removed(&self) -> bool {
        self.borrow().is_removed()
    }

    pub fn is_wrapper(&self) -> bool {
        self.borrow().wrapper.is_some()
    }

    /// Event kinds with at least one attached host listener.
    pub fn listener_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.borrow().listeners.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Attached host listeners for one event kind.
    pub fn listener_count(&self, kind: &str) -> usize {
        self.borrow().listeners.get(kind).map_or(0, Vec::len)
    }

    pub(crate) fn set_flag(&self, flag: CmpFlags, on: bool) {
        self.borrow_mut().flags.set(flag, on);
    }

    /// True (with a warning) when DOM-presence checks are enabled and the
    /// element is detached.
    pub(crate) fn skip_detached(&self, op: &str) -> bool {
        if !settings().do_check_is_in_dom || host::is_connected(self.elem()) {
            return false;
        }
        tracing::warn!(id = %self.id(), op, "element is not in the document; skipped");
        true
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Append a child: a fresh empty node, a node built from props, or an
    /// existing node.
    pub fn add(&self, child: impl Into<Child>) -> Result<Cmp> {
        lifecycle::add_child(self, child.into())
    }

    /// Remove this node and its whole subtree. Idempotent.
    pub fn remove(&self) -> &Self {
        lifecycle::remove(self, false);
        self
    }

    pub fn remove_children(&self) -> &Self {
        for child in self.children() {
            lifecycle::remove(&child, false);
        }
        self
    }

    /// Re-derive this node from merged props. Returns the live node, which
    /// for wrapper nodes is a new handle replacing this one.
    pub fn update(&self, props: Props) -> Result<Cmp> {
        lifecycle::update(self, props, None)
    }

    /// [`Cmp::update`], then run `callback` with the live node.
    pub fn update_with<F>(&self, props: Props, callback: F) -> Result<Cmp>
    where
        F: FnOnce(&Cmp) + 'static,
    {
        lifecycle::update(self, props, Some(Box::new(callback)))
    }

    // -------------------------------------------------------------------------
    // Targeted mutators
    // -------------------------------------------------------------------------

    /// Change classes. `None` means [`ClassAction::Replace`].
    pub fn update_class(
        &self,
        classes: impl Into<ClassList>,
        action: impl Into<Option<ClassAction>>,
    ) -> &Self {
        if self.skip_detached("update_class") {
            return self;
        }
        self.apply_class(&classes.into(), action.into().unwrap_or_default());
        self
    }

    pub fn update_attr(&self, attrs: impl Into<Attrs>) -> &Self {
        if self.skip_detached("update_attr") {
            return self;
        }
        let attrs = attrs.into();
        let elem = self.elem();
        for (key, value) in attrs.iter() {
            host::set_attribute(elem, key, value);
        }
        let mut data = self.borrow_mut();
        let stored = data.props.attr.get_or_insert_with(Attrs::new);
        for (key, value) in attrs.iter() {
            stored.set(key, value);
        }
        self
    }

    pub fn remove_attr(&self, keys: impl Into<AttrKeys>) -> &Self {
        if self.skip_detached("remove_attr") {
            return self;
        }
        let keys = keys.into();
        let elem = self.elem();
        let mut data = self.borrow_mut();
        for key in keys.iter() {
            host::remove_attribute(elem, key);
            if let Some(stored) = data.props.attr.as_mut() {
                stored.remove(key);
            }
        }
        self
    }

    pub fn update_style(&self, style: impl Into<StyleMap>) -> &Self {
        if self.skip_detached("update_style") {
            return self;
        }
        self.apply_style(&style.into());
        self
    }

    /// Replace the text of a text node.
    ///
    /// Fails with [`Error::NotATextNode`] unless the node was created with
    /// literal text.
    pub fn update_text(&self, text: &str) -> Result<&Self> {
        if self.borrow().props.text.is_none() {
            return Err(Error::NotATextNode { id: self.id() });
        }
        if self.skip_detached("update_text") {
            return Ok(self);
        }
        host::set_text_content(self.elem(), text);
        self.borrow_mut().props.text = Some(text.to_string());
        Ok(self)
    }

    /// Replace the running animation chain. An empty chain stops it.
    pub fn update_anim(&self, chain: Vec<AnimPhase>) -> &Self {
        animate::update_anim(self, chain);
        self
    }

    /// Focus the element. `to_props` also records the flag in props.
    pub fn focus(&self, to_props: Option<bool>) -> &Self {
        focus::focus_cmp(self, to_props);
        self
    }

    pub fn blur(&self, to_props: Option<bool>) -> &Self {
        focus::blur_cmp(self, to_props);
        self
    }

    /// Scroll the element into view, now or after `timeout` milliseconds.
    pub fn scroll_into_view(&self, options: ScrollIntoViewOptions, timeout: Option<u64>) -> &Self {
        focus::scroll_cmp_into_view(self, options, timeout);
        self
    }

    // -------------------------------------------------------------------------
    // Unchecked mutation (shared with the animation interpreter)
    // -------------------------------------------------------------------------

    pub(crate) fn apply_class(&self, classes: &ClassList, action: ClassAction) {
        let elem = self.elem();
        let mut stored = self.borrow().props.class.clone().unwrap_or_default();
        match action {
            ClassAction::Remove => {
                for class in classes.iter() {
                    stored.remove(class);
                    host::remove_class(elem, class);
                }
            }
            ClassAction::Toggle => {
                for class in classes.iter() {
                    stored.remove(class);
                    if host::has_class(elem, class) {
                        host::remove_class(elem, class);
                    } else {
                        host::add_class(elem, class);
                        stored.push(class);
                    }
                }
            }
            ClassAction::Replace => {
                host::remove_attribute(elem, "class");
                stored = classes.clone();
                for class in classes.iter() {
                    host::add_class(elem, class);
                }
            }
            ClassAction::Add => {
                for class in classes.iter() {
                    stored.push(class);
                    host::add_class(elem, class);
                }
            }
        }
        self.borrow_mut().props.class = Some(stored);
    }

    pub(crate) fn apply_style(&self, style: &StyleMap) {
        let elem = self.elem();
        let mut data = self.borrow_mut();
        for (prop, value) in style.iter() {
            match value {
                Some(value) => {
                    host::set_style(elem, prop, value);
                    data.props
                        .style
                        .get_or_insert_with(StyleMap::new)
                        .set(prop, Some(value.to_string()));
                }
                None => {
                    host::remove_style(elem, prop);
                    if let Some(stored) = data.props.style.as_mut() {
                        stored.remove(prop);
                    }
                }
            }
        }
    }
}

// =============================================================================
// Child argument
// =============================================================================

/// What [`Cmp::add`] appends.
pub enum Child {
    /// A fresh empty node.
    Empty,
    Props(Props),
    Cmp(Cmp),
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

impl From<Props> for Child {
    fn from(value: Props) -> Self {
        Child::Props(value)
    }
}

impl From<Cmp> for Child {
    fn from(value: Cmp) -> Self {
        Child::Cmp(value)
    }
}

impl From<&Cmp> for Child {
    fn from(value: &Cmp) -> Self {
        Child::Cmp(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::add;

    fn setup() -> Cmp {
        crate::reset_all();
        let mount = host::create_element("main");
        host::append_child(host::body(), mount);
        add(Props::new().id("root").attach(mount)).unwrap()
    }

    #[test]
    fn test_display_is_placeholder() {
        setup();
        let cmp = add(Props::new().id("c-1")).unwrap();
        assert_eq!(cmp.to_string(), r#"<cmp id="c-1"></cmp>"#);
    }

    #[test]
    fn test_update_class_actions() {
        let root = setup();
        let cmp = root.add(Props::new().class("a b")).unwrap();

        cmp.update_class("c", ClassAction::Add);
        assert_eq!(host::get_attribute(cmp.elem(), "class").as_deref(), Some("a b c"));

        cmp.update_class("a", ClassAction::Remove);
        assert_eq!(cmp.props().class, Some(ClassList::from("b c")));

        cmp.update_class("b d", ClassAction::Toggle);
        assert!(!host::has_class(cmp.elem(), "b"));
        assert!(host::has_class(cmp.elem(), "d"));
        assert_eq!(cmp.props().class, Some(ClassList::from("c d")));

        cmp.update_class("only", None);
        assert_eq!(host::get_attribute(cmp.elem(), "class").as_deref(), Some("only"));
        assert_eq!(cmp.props().class, Some(ClassList::from("only")));
    }

    #[test]
    fn test_attr_mutators_keep_props_in_sync() {
        let root = setup();
        let cmp = root.add(Props::new().tag("input")).unwrap();
        cmp.update_attr([("type", "text"), ("name", "q")]);
        assert_eq!(host::get_attribute(cmp.elem(), "type").as_deref(), Some("text"));
        assert_eq!(cmp.props().attr.and_then(|a| a.get("name").map(str::to_string)).as_deref(), Some("q"));

        cmp.remove_attr(["type", "name"]);
        assert_eq!(host::get_attribute(cmp.elem(), "type"), None);
        assert!(cmp.props().attr.is_some_and(|a| a.is_empty()));
    }

    #[test]
    fn test_update_style_null_removes_rule() {
        let root = setup();
        let cmp = root.add(Props::new().style([("color", "red")])).unwrap();
        cmp.update_style(StyleMap::new().without("color").with("minHeight", "10px"));
        assert_eq!(host::get_style(cmp.elem(), "color"), None);
        assert_eq!(host::get_style(cmp.elem(), "min-height").as_deref(), Some("10px"));
        let style = cmp.props().style.unwrap_or_default();
        assert_eq!(style.get("color"), None);
        assert_eq!(style.get("minHeight"), Some("10px"));
    }

    #[test]
    fn test_update_text_requires_text_node() {
        let root = setup();
        let text = root.add(Props::new().text("a")).unwrap();
        text.update_text("b").unwrap();
        assert_eq!(host::text_content(text.elem()), "b");
        assert_eq!(text.props().text.as_deref(), Some("b"));

        let markup = root.add(Props::new().html("<p>hi</p>")).unwrap();
        let id = markup.id();
        assert_eq!(markup.update_text("x").unwrap_err(), Error::NotATextNode { id });
    }

    #[test]
    fn test_dom_check_skips_detached_mutations() {
        let root = setup();
        crate::engine::apply_settings(&crate::engine::Settings::new().do_check_is_in_dom(true));
        let detached = add(Props::new()).unwrap();
        detached.update_class("x", ClassAction::Add);
        assert!(!host::has_class(detached.elem(), "x"));

        let attached = root.add(Props::new()).unwrap();
        attached.update_class("x", ClassAction::Add);
        assert!(host::has_class(attached.elem(), "x"));
    }
}
