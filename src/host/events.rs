//! Host event system - listener table and DOM-ordered dispatch.
//!
//! Listeners are kept in one table keyed by a monotonically increasing
//! [`ListenerId`], so iterating the table visits listeners in registration
//! order. Dispatch snapshots the callbacks for each path node and releases
//! every borrow before invoking them: callbacks are free to add or remove
//! listeners, mutate the tree, or dispatch nested events.
//!
//! # Phases
//!
//! ```text
//! window (capture) -> root .. parent (capture) -> target -> parent .. root (bubble) -> window (bubble)
//! ```
//!
//! Window listeners only take part when the target is connected to the
//! document.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use super::dom::ElementId;
use crate::types::ListenerOptions;

// =============================================================================
// TYPES
// =============================================================================

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Pointer button carried by activation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Primary,
    Auxiliary,
    Secondary,
}

/// A native event travelling through the host tree.
#[derive(Debug)]
pub struct Event {
    kind: String,
    target: ElementId,
    button: MouseButton,
    value: Option<String>,
    bubbles: bool,
    current_target: Cell<Option<ElementId>>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
    passive: Cell<bool>,
}

impl Event {
    /// A bubbling event of the given kind.
    pub fn new(kind: &str, target: ElementId) -> Self {
        Self {
            kind: kind.to_string(),
            target,
            button: MouseButton::Primary,
            value: None,
            bubbles: true,
            current_target: Cell::new(None),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
            passive: Cell::new(false),
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    /// The element whose listener is currently running; `None` for window
    /// listeners.
    pub fn current_target(&self) -> Option<ElementId> {
        self.current_target.get()
    }

    pub fn button(&self) -> MouseButton {
        self.button
    }

    /// Value carried by `input`/`change` events.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Ignored while a passive listener runs.
    pub fn prevent_default(&self) {
        if !self.passive.get() {
            self.default_prevented.set(true);
        }
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Listener callback stored by the host.
pub type EventCallback = Rc<dyn Fn(&Event)>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ListenerTarget {
    Window,
    Element(ElementId),
}

struct Registered {
    target: ListenerTarget,
    kind: String,
    options: ListenerOptions,
    callback: EventCallback,
}

struct ListenerTable {
    entries: BTreeMap<ListenerId, Registered>,
    next_id: u64,
}

impl ListenerTable {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, target: ListenerTarget, kind: &str, options: ListenerOptions, callback: EventCallback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            Registered {
                target,
                kind: kind.to_string(),
                options,
                callback,
            },
        );
        id
    }

    /// Listeners on `target` for `kind` whose capture flag equals `capture`.
    fn snapshot(&self, target: ListenerTarget, kind: &str, capture: bool) -> Vec<(ListenerId, ListenerOptions, EventCallback)> {
        self.entries
            .iter()
            .filter(|(_, r)| {
                r.target == target
                    && r.kind == kind
                    && r.options.contains(ListenerOptions::CAPTURE) == capture
            })
            .map(|(id, r)| (*id, r.options, Rc::clone(&r.callback)))
            .collect()
    }
}

thread_local! {
    static LISTENERS: RefCell<ListenerTable> = RefCell::new(ListenerTable::new());
}

// =============================================================================
// PUBLIC API - REGISTRATION
// =============================================================================

/// Add a listener to an element.
pub fn add_event_listener<F>(target: ElementId, kind: &str, options: ListenerOptions, callback: F) -> ListenerId
where
    F: Fn(&Event) + 'static,
{
    LISTENERS.with(|table| {
        table.borrow_mut().insert(
            ListenerTarget::Element(target),
            kind,
            options,
            Rc::new(callback),
        )
    })
}

/// Add a window-level listener.
pub fn add_window_listener<F>(kind: &str, options: ListenerOptions, callback: F) -> ListenerId
where
    F: Fn(&Event) + 'static,
{
    LISTENERS.with(|table| {
        table
            .borrow_mut()
            .insert(ListenerTarget::Window, kind, options, Rc::new(callback))
    })
}

/// Remove a listener. Removing an unknown or already removed id is a no-op.
pub fn remove_event_listener(id: ListenerId) {
    LISTENERS.with(|table| {
        table.borrow_mut().entries.remove(&id);
    });
}

pub fn is_listening(id: ListenerId) -> bool {
    LISTENERS.with(|table| table.borrow().entries.contains_key(&id))
}

/// Number of listeners attached to an element (all kinds).
pub fn listener_count(target: ElementId) -> usize {
    LISTENERS.with(|table| {
        table
            .borrow()
            .entries
            .values()
            .filter(|r| r.target == ListenerTarget::Element(target))
            .count()
    })
}

/// Number of window-level listeners for one event kind.
pub fn window_listener_count(kind: &str) -> usize {
    LISTENERS.with(|table| {
        table
            .borrow()
            .entries
            .values()
            .filter(|r| r.target == ListenerTarget::Window && r.kind == kind)
            .count()
    })
}

/// Drop every listener attached to one of `elements`.
pub(crate) fn forget_elements(elements: &[ElementId]) {
    let dropped: Vec<Registered> = LISTENERS.with(|table| {
        let mut table = table.borrow_mut();
        let ids: Vec<ListenerId> = table
            .entries
            .iter()
            .filter(|(_, r)| matches!(r.target, ListenerTarget::Element(el) if elements.contains(&el)))
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| table.entries.remove(id)).collect()
    });
    // Callbacks are dropped once the table is released.
    drop(dropped);
}

pub(crate) fn reset_listeners() {
    LISTENERS.with(|table| *table.borrow_mut() = ListenerTable::new());
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Dispatch an event through the capture, target, and bubble phases.
/// Returns false if a listener called `prevent_default`.
pub fn dispatch_event(event: &Event) -> bool {
    // Path from the target up to its topmost ancestor.
    let path = super::with_document(|doc| doc.ancestors(event.target));
    let connected = super::with_document(|doc| doc.is_connected(event.target));
    let kind = event.kind.clone();

    // 1. Window capture
    if connected && !run_listeners(event, ListenerTarget::Window, &kind, true) {
        return !event.is_default_prevented();
    }

    // 2. Ancestor capture, root first
    for el in path.iter().skip(1).rev() {
        if !run_listeners(event, ListenerTarget::Element(*el), &kind, true) {
            return !event.is_default_prevented();
        }
    }

    // 3. At target: capture listeners, then bubble listeners
    let target = ListenerTarget::Element(event.target);
    if !run_listeners(event, target, &kind, true) || !run_listeners(event, target, &kind, false) {
        return !event.is_default_prevented();
    }

    // 4. Bubble
    if event.bubbles {
        for el in path.iter().skip(1) {
            if !run_listeners(event, ListenerTarget::Element(*el), &kind, false) {
                return !event.is_default_prevented();
            }
        }
        if connected {
            run_listeners(event, ListenerTarget::Window, &kind, false);
        }
    }

    !event.is_default_prevented()
}

/// Run one node's listeners for a phase. Returns false once propagation stops.
fn run_listeners(event: &Event, target: ListenerTarget, kind: &str, capture: bool) -> bool {
    let snapshot = LISTENERS.with(|table| table.borrow().snapshot(target, kind, capture));

    event.current_target.set(match target {
        ListenerTarget::Element(el) => Some(el),
        ListenerTarget::Window => None,
    });

    for (id, options, callback) in snapshot {
        // An earlier listener in this phase may have removed this one.
        if !is_listening(id) {
            continue;
        }
        if options.contains(ListenerOptions::ONCE) {
            remove_event_listener(id);
        }
        event.passive.set(options.contains(ListenerOptions::PASSIVE));
        callback(event);
        event.passive.set(false);
    }

    !event.is_propagation_stopped()
}

// =============================================================================
// CONVENIENCE DISPATCHERS
// =============================================================================

/// Primary-button click on an element.
pub fn click(target: ElementId) -> bool {
    dispatch_event(&Event::new("click", target))
}

/// Pointer movement over an element.
pub fn hover(target: ElementId) -> bool {
    dispatch_event(&Event::new("mousemove", target))
}

/// Text entry: writes the `value` attribute, then fires `input`.
pub fn input(target: ElementId, value: &str) -> bool {
    super::with_document_mut(|doc| doc.set_attribute(target, "value", value));
    dispatch_event(&Event::new("input", target).with_value(value))
}

/// Committed value change.
pub fn change(target: ElementId) -> bool {
    let value = super::with_document(|doc| doc.get_attribute(target, "value").map(str::to_string));
    let event = Event::new("change", target);
    let event = match value {
        Some(value) => event.with_value(value),
        None => event,
    };
    dispatch_event(&event)
}
