//! Listener Manager - host listener bindings for a node.
//!
//! Every (re)attach first detaches all recorded listeners, so attaching twice
//! with the same props leaves exactly one handler per binding. Engine
//! listeners always use capture, running top-down before bubble listeners.

use std::rc::Rc;

use crate::host;
use crate::state::outside_click;
use crate::types::ListenerOptions;

use super::cmp::Cmp;
use super::types::Listener;

/// Record a host listener on `elem` that forwards to `callback` with the node.
fn bind(cmp: &Cmp, kind: &str, options: ListenerOptions, callback: Listener) {
    let elem = cmp.elem();
    let weak = cmp.downgrade();
    let id = host::add_event_listener(elem, kind, options | ListenerOptions::CAPTURE, move |event| {
        if let Some(cmp) = weak.upgrade() {
            callback(&cmp, event);
        }
    });
    cmp.borrow_mut()
        .listeners
        .entry(kind.to_string())
        .or_default()
        .push(id);
}

/// Attach the node's listeners from its current props.
pub(crate) fn attach_listeners(cmp: &Cmp) {
    detach_all(cmp);

    let props = cmp.props();
    let well_known = [
        ("click", &props.on_click),
        ("mousemove", &props.on_hover),
        ("focus", &props.on_focus),
        ("blur", &props.on_blur),
        ("input", &props.on_input),
        ("change", &props.on_change),
    ];
    for (kind, callback) in well_known {
        if let Some(callback) = callback {
            bind(cmp, kind, ListenerOptions::empty(), Rc::clone(callback));
        }
    }

    for custom in props.listeners.iter().flatten() {
        bind(cmp, &custom.kind, custom.options, Rc::clone(&custom.callback));
    }

    let id = cmp.id();
    match props.on_click_outside {
        Some(callback) => {
            let weak = cmp.downgrade();
            outside_click::register(&id, cmp.elem(), move |event| {
                if let Some(cmp) = weak.upgrade() {
                    callback(&cmp, event);
                }
            });
        }
        None => outside_click::unregister(&id),
    }

    tracing::trace!(id = %id, kinds = ?cmp.listener_kinds(), "listeners attached");
}

/// Remove every host listener the node recorded and clear the records.
pub(crate) fn detach_all(cmp: &Cmp) {
    let recorded = std::mem::take(&mut cmp.borrow_mut().listeners);
    for id in recorded.into_values().flatten() {
        host::remove_event_listener(id);
    }
}
