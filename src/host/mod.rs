//! Host element tree - the surface components render into.
//!
//! A single-threaded, in-memory document: an element arena, a listener table
//! with DOM-ordered dispatch, a focus slot, and a virtual-clock timer queue.
//! Everything lives in thread-local state and is reached through free
//! functions, the same way the rest of the crate reaches its registries.
//!
//! # Example
//!
//! ```ignore
//! use lighter::host;
//!
//! let el = host::create_element("div");
//! host::append_child(host::body(), el);
//! host::set_attribute(el, "role", "dialog");
//! assert!(host::is_connected(el));
//! ```

mod dom;
mod events;
mod markup;
mod timers;

use std::cell::RefCell;

use spark_signals::{signal, Signal};

pub use dom::{Document, ElementId};
pub use events::{
    add_event_listener, add_window_listener, change, click, dispatch_event, hover, input,
    is_listening, listener_count, remove_event_listener, window_listener_count, Event,
    EventCallback, ListenerId, MouseButton,
};
pub use timers::{advance, clear_timeout, is_pending, now, pending_timers, run_pending, set_timeout, TimerId};

use crate::error::Result;
use crate::types::{ClassList, ScrollBehavior};

// =============================================================================
// DOCUMENT STATE
// =============================================================================

thread_local! {
    static DOCUMENT: RefCell<Document> = RefCell::new(Document::new());

    /// The element holding input focus.
    static FOCUSED: Signal<Option<ElementId>> = signal(None);
}

/// Read access to the document.
///
/// Never call back into the host from inside `f`.
pub fn with_document<R>(f: impl FnOnce(&Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&doc.borrow()))
}

/// Write access to the document.
pub fn with_document_mut<R>(f: impl FnOnce(&mut Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&mut doc.borrow_mut()))
}

/// Drop the whole document, every listener, and every pending timer.
pub fn reset() {
    let old = DOCUMENT.with(|doc| std::mem::replace(&mut *doc.borrow_mut(), Document::new()));
    drop(old);
    events::reset_listeners();
    timers::reset_timers();
    FOCUSED.with(|f| f.set(None));
}

// =============================================================================
// TREE
// =============================================================================

pub fn body() -> ElementId {
    with_document(|doc| doc.body())
}

pub fn create_element(tag: &str) -> ElementId {
    with_document_mut(|doc| doc.create_element(tag))
}

pub fn create_text(text: &str) -> ElementId {
    with_document_mut(|doc| doc.create_text(text))
}

pub fn tag(id: ElementId) -> Option<String> {
    with_document(|doc| doc.tag(id).map(str::to_string))
}

pub fn append_child(parent: ElementId, child: ElementId) {
    with_document_mut(|doc| doc.append_child(parent, child));
}

/// Put `new` where `old` is. No-op when `old` is detached.
pub fn replace_with(old: ElementId, new: ElementId) {
    with_document_mut(|doc| doc.replace_with(old, new));
}

pub fn remove(id: ElementId) {
    with_document_mut(|doc| doc.remove(id));
}

/// Free a detached element and everything under it.
///
/// Descendants for which `keep` returns true are detached instead of freed.
/// Listeners, focus, and caret ranges of freed elements are dropped, and
/// their handles no longer resolve. Returns the number of freed nodes.
pub fn release(id: ElementId, keep: impl Fn(ElementId) -> bool) -> usize {
    let freed = with_document_mut(|doc| doc.free_subtree(id, &keep));
    if freed.is_empty() {
        return 0;
    }
    events::forget_elements(&freed);
    if focused_element().is_some_and(|el| freed.contains(&el)) {
        FOCUSED.with(|f| f.set(None));
    }
    freed.len()
}

/// Number of live elements and text runs in the document.
pub fn element_count() -> usize {
    with_document(|doc| doc.len())
}

pub fn parent(id: ElementId) -> Option<ElementId> {
    with_document(|doc| doc.parent(id))
}

pub fn children(id: ElementId) -> Vec<ElementId> {
    with_document(|doc| doc.children(id))
}

pub fn child_nodes(id: ElementId) -> Vec<ElementId> {
    with_document(|doc| doc.child_nodes(id))
}

pub fn is_connected(id: ElementId) -> bool {
    with_document(|doc| doc.is_connected(id))
}

/// Inclusive: an element contains itself.
pub fn contains(ancestor: ElementId, node: ElementId) -> bool {
    with_document(|doc| doc.contains(ancestor, node))
}

pub fn query_all(root: ElementId, tag: &str) -> Vec<ElementId> {
    with_document(|doc| doc.query_all(root, tag))
}

// =============================================================================
// ATTRIBUTES, CLASSES, STYLE
// =============================================================================

pub fn set_attribute(id: ElementId, key: &str, value: &str) {
    with_document_mut(|doc| doc.set_attribute(id, key, value));
}

pub fn get_attribute(id: ElementId, key: &str) -> Option<String> {
    with_document(|doc| doc.get_attribute(id, key).map(str::to_string))
}

pub fn remove_attribute(id: ElementId, key: &str) {
    with_document_mut(|doc| doc.remove_attribute(id, key));
}

pub fn attributes(id: ElementId) -> Vec<(String, String)> {
    with_document(|doc| doc.attributes(id))
}

pub fn class_list(id: ElementId) -> ClassList {
    with_document(|doc| doc.class_list(id))
}

pub fn add_class(id: ElementId, class: &str) {
    with_document_mut(|doc| doc.add_class(id, class));
}

pub fn remove_class(id: ElementId, class: &str) {
    with_document_mut(|doc| doc.remove_class(id, class));
}

pub fn has_class(id: ElementId, class: &str) -> bool {
    with_document(|doc| doc.has_class(id, class))
}

pub fn set_style(id: ElementId, prop: &str, value: &str) {
    with_document_mut(|doc| doc.set_style(id, prop, value));
}

pub fn remove_style(id: ElementId, prop: &str) {
    with_document_mut(|doc| doc.remove_style(id, prop));
}

pub fn get_style(id: ElementId, prop: &str) -> Option<String> {
    with_document(|doc| doc.get_style(id, prop))
}

// =============================================================================
// CONTENT
// =============================================================================

pub fn set_text_content(id: ElementId, text: &str) {
    with_document_mut(|doc| doc.set_text_content(id, text));
}

pub fn text_content(id: ElementId) -> String {
    with_document(|doc| doc.text_content(id))
}

pub fn outer_html(id: ElementId) -> String {
    with_document(|doc| doc.outer_html(id))
}

pub fn inner_html(id: ElementId) -> String {
    with_document(|doc| doc.inner_html(id))
}

/// Parse markup into detached top-level nodes.
pub fn parse_fragment(markup: &str) -> Result<Vec<ElementId>> {
    with_document_mut(|doc| markup::parse_fragment(doc, markup))
}

/// Parse markup and return its first top-level element, detached.
pub fn parse_first_element(markup: &str) -> Result<ElementId> {
    with_document_mut(|doc| markup::parse_first_element(doc, markup))
}

// =============================================================================
// FOCUS
// =============================================================================

pub fn focused_element() -> Option<ElementId> {
    FOCUSED.with(|f| f.get())
}

pub fn is_focused(id: ElementId) -> bool {
    focused_element() == Some(id)
}

/// Move input focus to `id`. The previous holder receives `blur`, then `id`
/// receives `focus`. Neither event bubbles.
pub fn focus(id: ElementId) {
    let previous = focused_element();
    if previous == Some(id) {
        return;
    }
    if let Some(old) = previous {
        FOCUSED.with(|f| f.set(None));
        dispatch_event(&Event::new("blur", old).non_bubbling());
    }
    FOCUSED.with(|f| f.set(Some(id)));
    dispatch_event(&Event::new("focus", id).non_bubbling());
}

/// Drop focus from `id`. No-op unless `id` holds focus.
pub fn blur(id: ElementId) {
    if !is_focused(id) {
        return;
    }
    FOCUSED.with(|f| f.set(None));
    dispatch_event(&Event::new("blur", id).non_bubbling());
}

pub fn set_selection_range(id: ElementId, start: usize, end: usize) {
    with_document_mut(|doc| doc.set_selection_range(id, start, end));
}

pub fn selection_range(id: ElementId) -> Option<(usize, usize)> {
    with_document(|doc| doc.selection_range(id))
}

// =============================================================================
// VIEWPORT
// =============================================================================

pub fn scroll_top() -> f32 {
    with_document(|doc| doc.scroll_top())
}

pub fn scroll_behavior() -> ScrollBehavior {
    with_document(|doc| doc.scroll_behavior())
}

pub fn viewport() -> (f32, f32) {
    with_document(|doc| doc.viewport())
}

pub fn set_viewport(width: f32, height: f32) {
    with_document_mut(|doc| doc.set_viewport(width, height));
}

pub(crate) fn set_scroll(top: f32, behavior: ScrollBehavior) {
    with_document_mut(|doc| {
        doc.scroll_top = top;
        doc.scroll_behavior = behavior;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use crate::types::ListenerOptions;

    fn setup() {
        reset();
    }

    #[test]
    fn test_reset_clears_everything() {
        setup();
        let el = create_element("div");
        append_child(body(), el);
        add_event_listener(el, "click", ListenerOptions::CAPTURE, |_| {});
        set_timeout(10, || {});
        focus(el);

        reset();
        assert!(children(body()).is_empty());
        assert_eq!(pending_timers(), 0);
        assert_eq!(focused_element(), None);
    }

    #[test]
    fn test_focus_moves_with_blur_first() {
        setup();
        let a = create_element("input");
        let b = create_element("input");
        append_child(body(), a);
        append_child(body(), b);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        add_event_listener(a, "blur", ListenerOptions::CAPTURE, move |_| o.borrow_mut().push("a-blur"));
        let o = order.clone();
        add_event_listener(b, "focus", ListenerOptions::CAPTURE, move |_| o.borrow_mut().push("b-focus"));

        focus(a);
        focus(b);
        assert_eq!(*order.borrow(), vec!["a-blur", "b-focus"]);
        assert!(is_focused(b));

        blur(a);
        assert!(is_focused(b));
        blur(b);
        assert_eq!(focused_element(), None);
    }

    #[test]
    fn test_focus_does_not_bubble() {
        setup();
        let parent = create_element("div");
        let child = create_element("input");
        append_child(body(), parent);
        append_child(parent, child);

        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        add_event_listener(parent, "focus", ListenerOptions::empty(), move |_| *h.borrow_mut() += 1);
        focus(child);
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_release_drops_listeners_and_focus() {
        setup();
        let el = create_element("input");
        append_child(body(), el);
        let listener = add_event_listener(el, "click", ListenerOptions::CAPTURE, |_| {});
        focus(el);
        remove(el);

        let before = element_count();
        assert_eq!(release(el, |_| false), 1);
        assert_eq!(element_count(), before - 1);
        assert!(!is_listening(listener));
        assert_eq!(focused_element(), None);
        assert_eq!(tag(el), None);
    }
}
