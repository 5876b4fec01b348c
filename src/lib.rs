//! # lighter
//!
//! Retained-mode UI component engine for Rust.
//!
//! Nodes are live, mutable handles to elements of a host tree. Each node is
//! built from declarative [`Props`], keeps its listeners, timers and children,
//! and is patched in place (or rebuilt wholesale) on update.
//!
//! Process-wide state (registry, settings, listeners, timers) is observable
//! through [spark-signals](https://github.com/RLabs-Inc/spark-signals).
//!
//! ## Architecture
//!
//! ```text
//! Props → build element → attach listeners → register → resolve <cmp> placeholders
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Shared value types (ClassList, Attrs, StyleMap, flags)
//! - [`engine`] - Node registry and global settings
//! - [`primitives`] - Node handles, props, and the create/update/remove lifecycle
//! - [`state`] - Animation chains, outside-click dispatch, focus and scrolling
//! - [`host`] - In-memory element tree, events, and virtual timers
//! - [`layout`] - Taffy block layout for element geometry
//!
//! ## Example
//!
//! ```ignore
//! use lighter::{add, host, ClassAction, Props};
//!
//! let mount = host::create_element("main");
//! host::append_child(host::body(), mount);
//!
//! let app = add(Props::new().id("app").attach(mount))?;
//! let label = app.add(Props::new().id("x").text("hi"))?;
//! label.update_class("big", ClassAction::Add);
//! label.remove();
//! assert!(lighter::get_cmp_by_id("x").is_none());
//! ```

pub mod engine;
pub mod error;
pub mod host;
pub mod layout;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Error, Result};

pub use engine::{
    apply_settings, get_cmp_by_id, get_live_ids, get_root_id, is_registered, mint_identifier,
    node_count, settings, GlobalSettings, Sanitizer, Settings,
};

pub use primitives::{
    add, add_wrapped, placeholder, Child, Cmp, CustomListener, Hook, Html, HtmlFn, Listener,
    PropKeys, Props, WeakCmp, DEFAULT_TAG, PLACEHOLDER_TAG,
};

pub use state::{AnimPhase, AnimState, GotoFn, GotoIndex, PhaseFn};

pub use layout::{bounding_rect, BoundingRect};

pub use host::{ElementId, Event, MouseButton};

/// Reset every piece of thread-local state: registry, outside-click
/// dispatch, settings, and the host document with its listeners and timers.
///
/// Intended for tests, which share one thread per test case.
pub fn reset_all() {
    engine::reset_registry();
    state::outside_click::reset_outside_click();
    engine::reset_settings();
    host::reset();
}
