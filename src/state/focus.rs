//! Focus and scrolling for nodes.
//!
//! The focused element itself is tracked by the host (`host::focused_element`,
//! backed by a signal); this module adds node-level behavior on top:
//! - caret placement at the end of focused inputs
//! - writing the focus flag back into props
//! - immediate or deferred scroll-into-view with a per-node scroll timer
//!
//! # Example
//!
//! ```ignore
//! use lighter::state::focus;
//!
//! focus::focus_cmp(&input, Some(true));
//! assert!(focus::is_cmp_focused(&input));
//! ```

use crate::engine;
use crate::host;
use crate::layout;
use crate::primitives::Cmp;
use crate::types::ScrollIntoViewOptions;

// =============================================================================
// FOCUS
// =============================================================================

/// The live node whose element holds focus.
pub fn get_focused_cmp() -> Option<Cmp> {
    let focused = host::focused_element()?;
    engine::get_live_ids()
        .into_iter()
        .filter_map(|id| engine::get_cmp_by_id(&id))
        .find(|cmp| cmp.elem() == focused)
}

pub fn is_cmp_focused(cmp: &Cmp) -> bool {
    host::is_focused(cmp.elem())
}

/// Focus a node's element. Inputs get their caret moved to the end of the
/// current value. `to_props` records the focus flag in props.
pub fn focus_cmp(cmp: &Cmp, to_props: Option<bool>) {
    if cmp.skip_detached("focus") {
        return;
    }
    let elem = cmp.elem();
    host::focus(elem);
    if host::tag(elem).as_deref() == Some("input") {
        let end = host::get_attribute(elem, "value")
            .map(|v| v.chars().count())
            .unwrap_or(0);
        host::set_selection_range(elem, end, end);
    }
    if let Some(value) = to_props {
        cmp.borrow_mut().props.focus = Some(value);
    }
}

pub fn blur_cmp(cmp: &Cmp, to_props: Option<bool>) {
    if cmp.skip_detached("blur") {
        return;
    }
    host::blur(cmp.elem());
    if let Some(value) = to_props {
        cmp.borrow_mut().props.focus = Some(value);
    }
}

// =============================================================================
// SCROLL
// =============================================================================

fn scroll_now(cmp: &Cmp, options: ScrollIntoViewOptions) {
    if let Err(err) = layout::scroll_into_view(cmp.elem(), options) {
        tracing::warn!(id = %cmp.id(), %err, "scroll into view failed");
    }
}

/// Scroll a node into view, immediately or after `timeout` milliseconds.
///
/// A newer deferred scroll replaces a pending one.
pub fn scroll_cmp_into_view(cmp: &Cmp, options: ScrollIntoViewOptions, timeout: Option<u64>) {
    if timeout.is_none() && cmp.skip_detached("scroll_into_view") {
        return;
    }
    let Some(ms) = timeout else {
        scroll_now(cmp, options);
        return;
    };

    let pending = cmp.borrow_mut().scroll_timer.take();
    if let Some(timer) = pending {
        host::clear_timeout(timer);
    }
    let weak = cmp.downgrade();
    let timer = host::set_timeout(ms, move || {
        let Some(cmp) = weak.upgrade() else { return };
        cmp.borrow_mut().scroll_timer = None;
        if cmp.is_removed() {
            tracing::warn!(id = %cmp.id(), "deferred scroll found its node removed");
            return;
        }
        if cmp.skip_detached("scroll_into_view") {
            return;
        }
        scroll_now(&cmp, options);
    });
    cmp.borrow_mut().scroll_timer = Some(timer);
}

/// Cancel a pending deferred scroll.
pub fn cancel_scroll(cmp: &Cmp) {
    let pending = cmp.borrow_mut().scroll_timer.take();
    if let Some(timer) = pending {
        host::clear_timeout(timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{add, Props};
    use crate::types::Attrs;

    fn setup() -> Cmp {
        crate::reset_all();
        let mount = host::create_element("main");
        host::append_child(host::body(), mount);
        add(Props::new().id("root").attach(mount)).unwrap()
    }

    #[test]
    fn test_focus_input_moves_caret_to_end() {
        let root = setup();
        let input = root
            .add(Props::new().tag("input").attr(Attrs::from([("value", "hello")])))
            .unwrap();
        focus_cmp(&input, Some(true));
        assert!(is_cmp_focused(&input));
        assert_eq!(host::selection_range(input.elem()), Some((5, 5)));
        assert_eq!(input.props().focus, Some(true));
        assert_eq!(get_focused_cmp(), Some(input.clone()));

        blur_cmp(&input, Some(false));
        assert!(!is_cmp_focused(&input));
        assert_eq!(input.props().focus, Some(false));
    }

    #[test]
    fn test_deferred_scroll_replaces_pending() {
        let root = setup();
        root.add(Props::new().style([("height", "2000px")])).unwrap();
        let target = root.add(Props::new().style([("height", "10px")])).unwrap();

        scroll_cmp_into_view(&target, ScrollIntoViewOptions::default(), Some(50));
        scroll_cmp_into_view(&target, ScrollIntoViewOptions::default(), Some(100));
        assert_eq!(host::pending_timers(), 1);

        host::advance(100);
        assert_eq!(host::scroll_top(), 2000.0);
        assert!(target.borrow().scroll_timer.is_none());
    }

    #[test]
    fn test_remove_clears_deferred_scroll() {
        let root = setup();
        let target = root.add(Props::new()).unwrap();
        scroll_cmp_into_view(&target, ScrollIntoViewOptions::default(), Some(50));
        target.remove();
        assert_eq!(host::pending_timers(), 0);
    }
}
