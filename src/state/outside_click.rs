//! Outside-Click Dispatcher - one shared window listener fanning out to
//! per-node callbacks.
//!
//! # Pattern
//!
//! - The first registration installs a single window-level `click` listener
//! - The last deregistration removes it
//! - On a primary-button click, every registered callback whose element does
//!   not contain the click target runs
//!
//! The `active` signal mirrors whether the shared listener is installed.

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::host::{self, ElementId, Event, ListenerId, MouseButton};
use crate::types::ListenerOptions;

// =============================================================================
// REGISTRY
// =============================================================================

/// Callback run for clicks outside the registered element.
pub type OutsideClickCallback = Rc<dyn Fn(&Event)>;

struct Registration {
    id: String,
    elem: ElementId,
    callback: OutsideClickCallback,
}

#[derive(Default)]
struct OutsideClickRegistry {
    /// In registration order; at most one entry per node id.
    entries: Vec<Registration>,
    /// The shared window listener, while any registration exists.
    listener: Option<ListenerId>,
}

thread_local! {
    static REGISTRY: RefCell<OutsideClickRegistry> = RefCell::new(OutsideClickRegistry::default());
    static ACTIVE: Signal<bool> = signal(false);
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Register (or replace) the outside-click callback for node `id`.
pub fn register<F>(id: &str, elem: ElementId, callback: F)
where
    F: Fn(&Event) + 'static,
{
    let callback: OutsideClickCallback = Rc::new(callback);
    let install = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        match reg.entries.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                existing.elem = elem;
                existing.callback = callback;
            }
            None => reg.entries.push(Registration {
                id: id.to_string(),
                elem,
                callback,
            }),
        }
        reg.listener.is_none()
    });

    if install {
        let listener = host::add_window_listener("click", ListenerOptions::empty(), dispatch);
        REGISTRY.with(|reg| reg.borrow_mut().listener = Some(listener));
        ACTIVE.with(|a| a.set(true));
        tracing::trace!("outside-click listener installed");
    }
}

/// Drop node `id`'s registration. No-op when it is not registered.
pub fn unregister(id: &str) {
    let listener = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let before = reg.entries.len();
        reg.entries.retain(|r| r.id != id);
        if reg.entries.len() == before || !reg.entries.is_empty() {
            return None;
        }
        reg.listener.take()
    });

    if let Some(listener) = listener {
        host::remove_event_listener(listener);
        ACTIVE.with(|a| a.set(false));
        tracing::trace!("outside-click listener removed");
    }
}

pub fn is_registered(id: &str) -> bool {
    REGISTRY.with(|reg| reg.borrow().entries.iter().any(|r| r.id == id))
}

/// Number of active registrations.
pub fn registration_count() -> usize {
    REGISTRY.with(|reg| reg.borrow().entries.len())
}

/// Whether the shared window listener is installed.
pub fn is_active() -> bool {
    ACTIVE.with(|a| a.get())
}

pub fn reset_outside_click() {
    let old = REGISTRY.with(|reg| std::mem::take(&mut *reg.borrow_mut()));
    if let Some(listener) = old.listener {
        host::remove_event_listener(listener);
    }
    ACTIVE.with(|a| a.set(false));
}

// =============================================================================
// DISPATCH
// =============================================================================

fn dispatch(event: &Event) {
    if event.button() != MouseButton::Primary {
        return;
    }
    let target = event.target();
    let snapshot: Vec<(String, ElementId, OutsideClickCallback)> = REGISTRY.with(|reg| {
        reg.borrow()
            .entries
            .iter()
            .map(|r| (r.id.clone(), r.elem, Rc::clone(&r.callback)))
            .collect()
    });

    for (id, elem, callback) in snapshot {
        // An earlier callback may have removed this registration.
        if !is_registered(&id) {
            continue;
        }
        if !host::contains(elem, target) {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn setup() {
        host::reset();
        reset_outside_click();
    }

    fn attached(tag: &str) -> ElementId {
        let el = host::create_element(tag);
        host::append_child(host::body(), el);
        el
    }

    #[test]
    fn test_shared_listener_is_reference_counted() {
        setup();
        let a = attached("div");
        let b = attached("div");
        register("a", a, |_| {});
        register("b", b, |_| {});
        assert!(is_active());
        assert_eq!(host::window_listener_count("click"), 1);

        unregister("a");
        assert!(is_active());
        unregister("a");
        assert_eq!(registration_count(), 1);

        unregister("b");
        assert!(!is_active());
        assert_eq!(host::window_listener_count("click"), 0);
    }

    #[test]
    fn test_reregistering_replaces_entry() {
        setup();
        let a = attached("div");
        register("a", a, |_| {});
        register("a", a, |_| {});
        assert_eq!(registration_count(), 1);
        unregister("a");
        assert!(!is_active());
    }

    #[test]
    fn test_fan_out_skips_containing_node() {
        setup();
        let a = attached("div");
        let inside_a = host::create_element("span");
        host::append_child(a, inside_a);
        let b = attached("div");
        let elsewhere = attached("p");

        let hits_a = Rc::new(Cell::new(0));
        let hits_b = Rc::new(Cell::new(0));
        let h = hits_a.clone();
        register("a", a, move |_| h.set(h.get() + 1));
        let h = hits_b.clone();
        register("b", b, move |_| h.set(h.get() + 1));

        host::click(inside_a);
        assert_eq!((hits_a.get(), hits_b.get()), (0, 1));

        host::click(elsewhere);
        assert_eq!((hits_a.get(), hits_b.get()), (1, 2));
    }

    #[test]
    fn test_secondary_button_is_ignored() {
        setup();
        let a = attached("div");
        let other = attached("div");
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        register("a", a, move |_| h.set(h.get() + 1));

        host::dispatch_event(&Event::new("click", other).with_button(MouseButton::Secondary));
        assert_eq!(hits.get(), 0);
    }
}
